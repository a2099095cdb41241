//! AutoCoder GitHub: REST implementation of `RemoteRepository`
//!
//! - `GithubConfig`: endpoint, token, timeout and retry settings (env-driven defaults)
//! - `GithubClient`: read-only client for one repository

pub mod client;
pub mod config;
mod dto;

pub use client::GithubClient;
pub use config::{GithubConfig, DEFAULT_API_URL};
