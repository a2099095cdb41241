//! AutoCoder Rules - what each course stage expects of a repository
//!
//! Provides:
//! - `Stage` and the per-stage `RuleSpecification` bundle
//! - `ValueTree`, a closed tree for decoded manifests
//! - Pure validators for workflow manifests, action metadata, issues,
//!   pull requests, file layout and workflow runs

pub mod action;
mod error;
pub mod files;
pub mod issue;
pub mod pull_request;
pub mod rules;
pub mod stage;
pub mod value;
pub mod workflow;

// Re-export key types
pub use action::validate_action;
pub use error::{ManifestError, RuleError, RuleResult};
pub use files::{
    compare_file_sets, sha256_hex, validate_latest_run, validate_readme, validate_script,
    validate_visibility,
};
pub use issue::{validate_issues, validate_issues_exist};
pub use pull_request::{latest_pull_request, referenced_issue, validate_pull_request};
pub use rules::RuleSpecification;
pub use stage::{Stage, StageParseError};
pub use value::ValueTree;
pub use workflow::{find_step, validate_workflow};
