//! Declarative rule model.
//!
//! A [`RuleSpecification`] is pure data: what one stage expects of the
//! learner's repository. Validators read it and never mutate it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Path of the workflow manifest.
pub const WORKFLOW_PATH: &str = ".github/workflows/main.yml";
/// Accepted alternative spelling of the manifest path.
pub const WORKFLOW_PATH_ALT: &str = ".github/workflows/main.yaml";
/// Directory holding workflow manifests.
pub const WORKFLOWS_DIR: &str = ".github/workflows";
pub const README_PATH: &str = "README.md";
pub const SCRIPT_PATH: &str = "scripts/script.sh";
pub const ACTION_PATH: &str = "action.yml";

/// Label the automation looks for on issues and pull requests.
pub const BOT_LABEL: &str = "autocoder-bot";
/// Login of the platform's automation account.
pub const BOT_LOGIN: &str = "github-actions[bot]";
pub const BOT_COMMIT_NAME: &str = "autocoder-bot";
pub const BOT_COMMIT_EMAIL: &str = "actions@github.com";
pub const BRANCH_PREFIX: &str = "autocoder-branch-";
pub const ARTIFACT_NAME: &str = "autocoder-artifact";

/// How a declared list is compared with the expected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    /// Every expected value must appear in the declared list.
    Membership,
    /// The declared list must equal the expected list, order included.
    Exact,
}

/// A constraint on a list nested under an event, e.g. `issues.types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCondition {
    /// Key under the event, e.g. `types` or `branches`
    pub key: String,
    pub values: Vec<String>,
    pub mode: ListMode,
    /// When false the condition only applies if the key is declared.
    pub required: bool,
    /// Failure message
    pub message: String,
}

/// One expected workflow trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub event: String,
    /// Failure message when the event is not declared
    pub message: String,
    pub condition: Option<SubCondition>,
}

impl TriggerRule {
    pub fn event(event: &str) -> Self {
        Self {
            event: event.to_string(),
            message: format!("The workflow does not run on {event}."),
            condition: None,
        }
    }

    /// Optional membership condition: checked only if `key` is declared.
    pub fn when_declared(mut self, key: &str, values: &[&str], message: &str) -> Self {
        self.condition = Some(SubCondition {
            key: key.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            mode: ListMode::Membership,
            required: false,
            message: message.to_string(),
        });
        self
    }

    /// Required condition compared with `mode`.
    pub fn requiring(mut self, key: &str, values: &[&str], mode: ListMode, message: &str) -> Self {
        self.condition = Some(SubCondition {
            key: key.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            mode,
            required: true,
            message: message.to_string(),
        });
        self
    }
}

/// Which step field a descriptor inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTarget {
    Uses,
    Run,
    /// Either field may satisfy the descriptor.
    UsesOrRun,
}

/// How a step field is compared with the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Prefix,
    Exact,
    /// Whole-field regular expression match.
    Regex,
}

/// A step that must be present somewhere in a step sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Completes "does not have a step to ..."
    pub label: String,
    pub target: StepTarget,
    pub mode: MatchMode,
    pub pattern: String,
}

impl StepDescriptor {
    pub fn new(label: &str, target: StepTarget, mode: MatchMode, pattern: &str) -> Self {
        Self {
            label: label.to_string(),
            target,
            mode,
            pattern: pattern.to_string(),
        }
    }

    pub fn uses_prefix(label: &str, pattern: &str) -> Self {
        Self::new(label, StepTarget::Uses, MatchMode::Prefix, pattern)
    }

    pub fn run_prefix(label: &str, pattern: &str) -> Self {
        Self::new(label, StepTarget::Run, MatchMode::Prefix, pattern)
    }

    pub fn any_prefix(label: &str, pattern: &str) -> Self {
        Self::new(label, StepTarget::UsesOrRun, MatchMode::Prefix, pattern)
    }
}

/// Expected shape of the workflow manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRules {
    pub triggers: Vec<TriggerRule>,
    pub runner: String,
    pub steps: Vec<StepDescriptor>,
    /// Expected literal of the first job's `if` condition
    pub guard: Option<String>,
    /// Values that must appear in some step's `env` mapping
    pub required_env_values: Vec<String>,
}

/// Expected shape of `action.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRules {
    pub name: String,
    pub required_inputs: Vec<String>,
    pub runs_using: String,
    pub steps: Vec<StepDescriptor>,
}

/// Rules for open issues carrying the bot label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRules {
    pub label: String,
    /// Require labels, with `label` first
    pub label_first: bool,
    /// Minimum whitespace-delimited word count; 0 only requires a body
    pub min_body_words: usize,
}

/// Rules for the most recently created open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRules {
    pub author_login: String,
    pub label: String,
    pub mergeable_state: String,
    pub commit_author_name: String,
    pub commit_author_email: String,
    /// Head branch must be this prefix followed by the referenced issue number
    pub branch_prefix: String,
    /// Message when the mergeable state does not match
    pub conflict_message: String,
}

/// Rules for `README.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeRules {
    pub min_words: usize,
    pub require_repo_name: bool,
}

/// Rules for `scripts/script.sh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRules {
    pub path: String,
    /// Compare content with the reference script supplied at run time
    pub match_reference: bool,
}

/// Rules for the most recent workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunRules {
    pub event: String,
    /// Failure message when the event differs
    pub event_message: String,
    pub conclusion: String,
    /// Name the first artifact must carry
    pub artifact: Option<String>,
}

/// Everything one stage expects of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpecification {
    pub expected_files: BTreeSet<String>,
    pub readme: Option<ReadmeRules>,
    pub script: Option<ScriptRules>,
    pub workflow: Option<WorkflowRules>,
    pub workflow_run: Option<WorkflowRunRules>,
    pub action: Option<ActionRules>,
    pub issues: Option<IssueRules>,
    pub pull_request: Option<PullRequestRules>,
}

impl PullRequestRules {
    /// Bot-authored, labeled, conflict-free pull request on an issue branch.
    pub fn bot(conflict_message: &str) -> Self {
        Self {
            author_login: BOT_LOGIN.to_string(),
            label: BOT_LABEL.to_string(),
            mergeable_state: "clean".to_string(),
            commit_author_name: BOT_COMMIT_NAME.to_string(),
            commit_author_email: BOT_COMMIT_EMAIL.to_string(),
            branch_prefix: BRANCH_PREFIX.to_string(),
            conflict_message: conflict_message.to_string(),
        }
    }
}
