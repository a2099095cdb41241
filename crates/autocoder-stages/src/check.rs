//! Check catalogue and the per-stage plan.

use std::fmt;

use autocoder_rules::Stage;
use serde::{Deserialize, Serialize};

/// One named check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    /// Configured repository URL is present and well formed
    UrlSet,
    /// Public repository, exact file set and a descriptive README
    RepositoryLayout,
    /// Exact file set
    FileSet,
    /// `scripts/script.sh` exists, is non-empty and optionally matches a reference
    ScriptFile,
    /// `.github/workflows` holds the manifest
    WorkflowExists,
    /// Manifest satisfies the stage's workflow rules
    WorkflowManifest,
    /// At least one open issue
    IssuesExist,
    /// Open bot issues are well formed
    IssueProperties,
    /// Most recent workflow run (and its artifact)
    LatestWorkflowRun,
    /// `action.yml` exists
    ActionExists,
    /// `action.yml` satisfies the action rules
    ActionMetadata,
    /// Most recent open pull request
    PullRequest,
}

impl CheckId {
    /// Get the check name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            CheckId::UrlSet => "url_set",
            CheckId::RepositoryLayout => "repository_layout",
            CheckId::FileSet => "file_set",
            CheckId::ScriptFile => "script_file",
            CheckId::WorkflowExists => "workflow_exists",
            CheckId::WorkflowManifest => "workflow_manifest",
            CheckId::IssuesExist => "issues_exist",
            CheckId::IssueProperties => "issue_properties",
            CheckId::LatestWorkflowRun => "latest_workflow_run",
            CheckId::ActionExists => "action_exists",
            CheckId::ActionMetadata => "action_metadata",
            CheckId::PullRequest => "pull_request",
        }
    }

    /// Resource-specific wording for a 404, where the generic one would
    /// not tell the learner what is missing.
    pub fn not_found_message(&self) -> Option<&'static str> {
        match self {
            CheckId::RepositoryLayout | CheckId::FileSet => {
                Some("The repository does not exist or is private.")
            }
            CheckId::ScriptFile => Some("The file 'scripts/script.sh' does not exist."),
            CheckId::WorkflowExists => {
                Some("The '.github/workflows' directory does not exist.")
            }
            CheckId::WorkflowManifest => {
                Some("The workflow file '.github/workflows/main.yml' does not exist.")
            }
            CheckId::ActionExists | CheckId::ActionMetadata => {
                Some("The file 'action.yml' does not exist.")
            }
            _ => None,
        }
    }

    /// Checks run for `stage`, in order.
    pub fn plan(stage: Stage) -> &'static [CheckId] {
        use CheckId::*;
        match stage {
            Stage::One => &[UrlSet, RepositoryLayout],
            Stage::Two => &[
                UrlSet,
                FileSet,
                WorkflowExists,
                WorkflowManifest,
                LatestWorkflowRun,
            ],
            Stage::Three => &[
                FileSet,
                WorkflowExists,
                WorkflowManifest,
                IssuesExist,
                LatestWorkflowRun,
            ],
            Stage::Four => &[FileSet, IssuesExist, IssueProperties],
            Stage::Five => &[
                FileSet,
                ScriptFile,
                WorkflowExists,
                WorkflowManifest,
                IssuesExist,
                IssueProperties,
                LatestWorkflowRun,
            ],
            Stage::Six => &[
                FileSet,
                ScriptFile,
                WorkflowExists,
                WorkflowManifest,
                IssuesExist,
                IssueProperties,
                LatestWorkflowRun,
                PullRequest,
            ],
            Stage::Seven => &[
                FileSet,
                ActionExists,
                ActionMetadata,
                WorkflowExists,
                WorkflowManifest,
                LatestWorkflowRun,
                PullRequest,
            ],
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
