//! AutoCoder Stages - verify a repository against one course stage
//!
//! Provides a stage runner that:
//! - Plans the checks of a stage
//! - Runs each check against a per-run memoized repository snapshot
//! - Classifies every failure into a learner-facing diagnostic
//! - Isolates checks from one another, panics included

pub mod check;
pub mod checks;
pub mod diagnostics;
pub mod obs;
pub mod runner;
pub mod target;
pub mod telemetry;

// Re-export key types
pub use check::CheckId;
pub use diagnostics::{CheckError, CheckResult, Failure, FailureKind};
pub use runner::{failures, CheckOutcome, RunOptions, StageReport, StageRunner};
pub use target::{RepoTarget, TargetError};
pub use telemetry::init_tracing;

pub use autocoder_rules::Stage;
