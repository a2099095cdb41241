//! Course stages and the rule bundle each one applies.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::*;

/// One of the course stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Public repository with README, workflow and script files
    #[serde(rename = "stage1")]
    One,
    /// Workflow runs on push and greets the world
    #[serde(rename = "stage2")]
    Two,
    /// Workflow reacts to issues and exposes issue data to steps
    #[serde(rename = "stage3")]
    Three,
    /// Well-formed bot issues
    #[serde(rename = "stage4")]
    Four,
    /// Label-gated job runs the script and uploads an artifact
    #[serde(rename = "stage5")]
    Five,
    /// Workflow opens a pull request with the generated code
    #[serde(rename = "stage6")]
    Six,
    /// Logic moved into a composite action
    #[serde(rename = "stage7")]
    Seven,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown stage '{0}': expected a number from 1 to 7")]
pub struct StageParseError(String);

const CHECKOUT: &str = "checkout the repository";
const CONFIGURE_GIT: &str = "git config --local user.email \"actions@github.com\"\n\
                             git config --local user.name \"autocoder-bot\"\n\
                             git add .\n\
                             git commit -m";
const LABEL_GUARD: &str = "contains(github.event.issue.labels.*.name, 'autocoder-bot')";

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::One,
        Stage::Two,
        Stage::Three,
        Stage::Four,
        Stage::Five,
        Stage::Six,
        Stage::Seven,
    ];

    pub fn number(&self) -> u8 {
        match self {
            Stage::One => 1,
            Stage::Two => 2,
            Stage::Three => 3,
            Stage::Four => 4,
            Stage::Five => 5,
            Stage::Six => 6,
            Stage::Seven => 7,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    /// Build this stage's rules for the repository `owner/name`.
    pub fn rules(&self, repo_full_name: &str) -> RuleSpecification {
        let mut expected_files: BTreeSet<String> = [README_PATH, WORKFLOW_PATH, SCRIPT_PATH]
            .iter()
            .map(|p| p.to_string())
            .collect();
        if *self == Stage::Seven {
            expected_files.insert(ACTION_PATH.to_string());
        }

        RuleSpecification {
            expected_files,
            readme: self.readme_rules(),
            script: self.script_rules(),
            workflow: self.workflow_rules(repo_full_name),
            workflow_run: self.workflow_run_rules(),
            action: self.action_rules(),
            issues: self.issue_rules(),
            pull_request: self.pull_request_rules(),
        }
    }

    fn readme_rules(&self) -> Option<ReadmeRules> {
        (*self == Stage::One).then_some(ReadmeRules {
            min_words: 50,
            require_repo_name: true,
        })
    }

    fn script_rules(&self) -> Option<ScriptRules> {
        match self {
            Stage::Five | Stage::Six => Some(ScriptRules {
                path: SCRIPT_PATH.to_string(),
                match_reference: *self == Stage::Six,
            }),
            _ => None,
        }
    }

    fn workflow_rules(&self, repo_full_name: &str) -> Option<WorkflowRules> {
        let issue_types = || {
            TriggerRule::event("issues").requiring(
                "types",
                &["opened", "reopened", "labeled"],
                ListMode::Exact,
                "The workflow does not run on opened, reopened, and labeled issues.",
            )
        };

        let rules = match self {
            Stage::One | Stage::Four => return None,
            Stage::Two => WorkflowRules {
                triggers: vec![TriggerRule::event("push").when_declared(
                    "branches",
                    &["main"],
                    "The workflow does not run on the main branch.",
                )],
                runner: "ubuntu-latest".to_string(),
                steps: vec![
                    StepDescriptor::uses_prefix("checkout repository", "actions/checkout@"),
                    StepDescriptor::run_prefix(
                        "print hello world using the echo command",
                        "echo \"Hello, world!\"",
                    ),
                ],
                guard: None,
                required_env_values: vec![],
            },
            Stage::Three => WorkflowRules {
                triggers: vec![TriggerRule::event("issues").requiring(
                    "types",
                    &["opened", "reopened"],
                    ListMode::Membership,
                    "The workflow does not run on opened and reopened issues.",
                )],
                runner: "ubuntu-latest".to_string(),
                steps: vec![StepDescriptor::new(
                    CHECKOUT,
                    StepTarget::Uses,
                    MatchMode::Regex,
                    r"actions/checkout@v\d+(\.\d+)*",
                )],
                guard: None,
                required_env_values: [
                    "${{ github.event.issue.number }}",
                    "${{ github.event.issue.title }}",
                    "${{ github.event.issue.body }}",
                    "${{ join(github.event.issue.labels.*.name, ', ') }}",
                    "${{ join(github.event.issue.assignees.*.login, ', ') }}",
                ]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            },
            Stage::Five => WorkflowRules {
                triggers: vec![issue_types()],
                runner: "ubuntu-latest".to_string(),
                steps: vec![
                    StepDescriptor::any_prefix("make script file executable", "chmod"),
                    StepDescriptor::any_prefix("checkout repository", "actions/checkout@v"),
                    StepDescriptor::any_prefix("upload artifact", "actions/upload-artifact@v"),
                    StepDescriptor::any_prefix(
                        "download artifact",
                        "actions/download-artifact@v",
                    ),
                    StepDescriptor::any_prefix("list files", "ls -R ./autocoder-artifact"),
                    StepDescriptor::any_prefix("run the script", "./scripts/script.sh $"),
                ],
                guard: Some(LABEL_GUARD.to_string()),
                required_env_values: vec![],
            },
            Stage::Six => WorkflowRules {
                triggers: vec![issue_types()],
                runner: "ubuntu-latest".to_string(),
                steps: vec![
                    StepDescriptor::any_prefix(
                        "make the script executable",
                        "chmod +x ./scripts/script.sh",
                    ),
                    StepDescriptor::any_prefix(CHECKOUT, "actions/checkout@"),
                    StepDescriptor::any_prefix(
                        "create pull request",
                        "peter-evans/create-pull-request@",
                    ),
                    StepDescriptor::any_prefix("run script", "./scripts/script.sh"),
                    StepDescriptor::any_prefix(
                        "configure credentials or commit files",
                        CONFIGURE_GIT,
                    ),
                ],
                guard: Some(LABEL_GUARD.to_string()),
                required_env_values: vec![],
            },
            Stage::Seven => WorkflowRules {
                triggers: vec![issue_types()],
                runner: "ubuntu-latest".to_string(),
                steps: vec![
                    StepDescriptor::uses_prefix(CHECKOUT, "actions/checkout@"),
                    StepDescriptor::uses_prefix(
                        "interact with ChatGPT",
                        &format!("{repo_full_name}@"),
                    ),
                ],
                guard: Some(LABEL_GUARD.to_string()),
                required_env_values: vec![],
            },
        };
        Some(rules)
    }

    fn workflow_run_rules(&self) -> Option<WorkflowRunRules> {
        let on_issues = |artifact: Option<&str>| WorkflowRunRules {
            event: "issues".to_string(),
            event_message: "The latest workflow run was not triggered by an issue event."
                .to_string(),
            conclusion: "success".to_string(),
            artifact: artifact.map(str::to_string),
        };
        match self {
            Stage::One | Stage::Four => None,
            Stage::Two => Some(WorkflowRunRules {
                event: "push".to_string(),
                event_message: "The latest workflow run was not triggered by a push event."
                    .to_string(),
                conclusion: "success".to_string(),
                artifact: None,
            }),
            Stage::Five => Some(on_issues(Some(ARTIFACT_NAME))),
            Stage::Three | Stage::Six | Stage::Seven => Some(on_issues(None)),
        }
    }

    fn action_rules(&self) -> Option<ActionRules> {
        (*self == Stage::Seven).then(|| ActionRules {
            name: "AutoCoder".to_string(),
            required_inputs: [
                "GITHUB_TOKEN",
                "REPOSITORY",
                "ISSUE_NUMBER",
                "OPENAI_API_KEY",
                "SCRIPT_PATH",
                "LABEL",
            ]
            .iter()
            .map(|i| i.to_string())
            .collect(),
            runs_using: "composite".to_string(),
            steps: vec![
                StepDescriptor::any_prefix("make the script executable", "chmod +x"),
                StepDescriptor::any_prefix(CHECKOUT, "actions/checkout@"),
                StepDescriptor::any_prefix(
                    "create pull request",
                    "peter-evans/create-pull-request@",
                ),
                StepDescriptor::any_prefix("configure credentials or commit files", CONFIGURE_GIT),
            ],
        })
    }

    fn issue_rules(&self) -> Option<IssueRules> {
        match self {
            Stage::Four => Some(IssueRules {
                label: BOT_LABEL.to_string(),
                label_first: true,
                min_body_words: 50,
            }),
            Stage::Five | Stage::Six => Some(IssueRules {
                label: BOT_LABEL.to_string(),
                label_first: false,
                min_body_words: 0,
            }),
            _ => None,
        }
    }

    fn pull_request_rules(&self) -> Option<PullRequestRules> {
        match self {
            Stage::Six => Some(PullRequestRules::bot(
                "The pull request has conflicts with the base branch.",
            )),
            Stage::Seven => Some(PullRequestRules::bot(
                "The pull request has conflicts with the base branch. Rerun the workflow.",
            )),
            _ => None,
        }
    }
}

impl RuleSpecification {
    /// Rule bundle for `stage` applied to the repository `owner/name`.
    pub fn for_stage(stage: Stage, repo_full_name: &str) -> Self {
        stage.rules(repo_full_name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage{}", self.number())
    }
}

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("stage")
            .unwrap_or(trimmed)
            .trim_start();
        digits
            .parse::<u8>()
            .ok()
            .and_then(Stage::from_number)
            .ok_or_else(|| StageParseError(s.to_string()))
    }
}
