//! Workflow manifest validation.
//!
//! Evaluation order is fixed: document, triggers, job and runner, steps,
//! guard, env values. The first violated rule is reported.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::debug;

use crate::error::{RuleError, RuleResult};
use crate::rules::{ListMode, MatchMode, StepDescriptor, StepTarget, SubCondition, TriggerRule, WorkflowRules};
use crate::value::ValueTree;

/// Validate a decoded workflow manifest against `rules`.
pub fn validate_workflow(doc: &ValueTree, rules: &WorkflowRules) -> RuleResult {
    if doc.is_empty() {
        return Err(RuleError::violation("The workflow file is empty."));
    }

    check_triggers(doc, &rules.triggers)?;

    let jobs = doc
        .get("jobs")
        .filter(|jobs| !jobs.is_empty())
        .ok_or_else(|| RuleError::violation("The workflow does not have a job."))?;

    let runner_message = || {
        RuleError::violation(format!(
            "The job does not run on '{}' runner or is missing.",
            rules.runner
        ))
    };
    let (job_name, job) = jobs
        .first_entry()
        .filter(|(_, job)| job.as_mapping().is_some())
        .ok_or_else(runner_message)?;
    if job.get("runs-on").and_then(ValueTree::as_str) != Some(rules.runner.as_str()) {
        return Err(runner_message());
    }
    debug!(job = %job_name, "validating first job");

    let steps = job
        .get("steps")
        .and_then(ValueTree::as_sequence)
        .unwrap_or_default();
    require_steps(steps, &rules.steps, "The job")?;

    if let Some(guard) = &rules.guard {
        if job.get("if").and_then(ValueTree::as_str) != Some(guard.as_str()) {
            return Err(RuleError::violation(format!(
                "The job does not have the expected 'if' condition: {guard}"
            )));
        }
    }

    check_env_values(jobs, &rules.required_env_values)
}

fn check_triggers(doc: &ValueTree, triggers: &[TriggerRule]) -> RuleResult {
    let on = doc.get("on");
    for trigger in triggers {
        let Some(on) = on.filter(|on| on.contains(&trigger.event)) else {
            return Err(RuleError::violation(trigger.message.clone()));
        };
        let Some(condition) = &trigger.condition else {
            continue;
        };
        match on.get(&trigger.event).and_then(|event| event.get(&condition.key)) {
            Some(declared) if list_satisfies(declared, condition) => {}
            None if !condition.required => {}
            _ => return Err(RuleError::violation(condition.message.clone())),
        }
    }
    Ok(())
}

fn list_satisfies(declared: &ValueTree, condition: &SubCondition) -> bool {
    match condition.mode {
        ListMode::Membership => condition.values.iter().all(|v| declared.contains(v)),
        ListMode::Exact => declared
            .str_items()
            .is_some_and(|items| items.iter().copied().eq(condition.values.iter().map(String::as_str))),
    }
}

enum Matcher<'a> {
    Prefix(&'a str),
    Exact(&'a str),
    Regex(Regex),
}

impl<'a> Matcher<'a> {
    fn new(descriptor: &'a StepDescriptor) -> Result<Self, RuleError> {
        Ok(match descriptor.mode {
            MatchMode::Prefix => Matcher::Prefix(&descriptor.pattern),
            MatchMode::Exact => Matcher::Exact(&descriptor.pattern),
            MatchMode::Regex => {
                let anchored = format!("^(?:{})$", descriptor.pattern);
                Matcher::Regex(Regex::new(&anchored).map_err(|e| {
                    RuleError::processing(format!(
                        "invalid step pattern '{}': {e}",
                        descriptor.pattern
                    ))
                })?)
            }
        })
    }

    fn matches(&self, field: &str) -> bool {
        match self {
            Matcher::Prefix(prefix) => field.starts_with(prefix),
            Matcher::Exact(expected) => field == *expected,
            Matcher::Regex(re) => re.is_match(field),
        }
    }
}

fn target_fields(target: StepTarget) -> &'static [&'static str] {
    match target {
        StepTarget::Uses => &["uses"],
        StepTarget::Run => &["run"],
        StepTarget::UsesOrRun => &["run", "uses"],
    }
}

/// First step satisfying `descriptor`, if any.
pub fn find_step<'s>(
    steps: &'s [ValueTree],
    descriptor: &StepDescriptor,
) -> Result<Option<&'s ValueTree>, RuleError> {
    let matcher = Matcher::new(descriptor)?;
    let fields = target_fields(descriptor.target);
    Ok(steps.iter().find(|step| {
        fields.iter().any(|field| {
            step.get(field)
                .and_then(ValueTree::as_str)
                .is_some_and(|value| matcher.matches(value))
        })
    }))
}

/// Every descriptor must be satisfied by some step; order does not matter.
/// `subject` starts the failure message, e.g. "The job".
pub(crate) fn require_steps(
    steps: &[ValueTree],
    descriptors: &[StepDescriptor],
    subject: &str,
) -> RuleResult {
    for descriptor in descriptors {
        if find_step(steps, descriptor)?.is_none() {
            return Err(RuleError::violation(format!(
                "{subject} does not have a step to {}.",
                descriptor.label
            )));
        }
    }
    Ok(())
}

fn check_env_values(jobs: &ValueTree, required: &[String]) -> RuleResult {
    if required.is_empty() {
        return Ok(());
    }

    let present: BTreeSet<&str> = jobs
        .as_mapping()
        .unwrap_or_default()
        .iter()
        .filter_map(|(_, job)| job.get("steps").and_then(ValueTree::as_sequence))
        .flatten()
        .filter_map(|step| step.get("env").and_then(ValueTree::as_mapping))
        .flatten()
        .filter_map(|(_, value)| value.as_str())
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .map(String::as_str)
        .filter(|value| !present.contains(value))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RuleError::violation(format!(
            "The following environment variables are missing in the 'env' key of a step: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    fn rules(triggers: Vec<TriggerRule>, steps: Vec<StepDescriptor>) -> WorkflowRules {
        WorkflowRules {
            triggers,
            runner: "ubuntu-latest".to_string(),
            steps,
            guard: None,
            required_env_values: vec![],
        }
    }

    fn issues_membership() -> TriggerRule {
        TriggerRule::event("issues").requiring(
            "types",
            &["opened", "reopened"],
            ListMode::Membership,
            "The workflow does not run on opened and reopened issues.",
        )
    }

    fn decode(text: &str) -> ValueTree {
        ValueTree::decode(text).unwrap()
    }

    const JOB: &str = "jobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n";

    #[test]
    fn test_issue_types_membership_passes() {
        let doc = decode(&format!("on:\n  issues:\n    types: [opened, reopened]\n{JOB}"));
        assert_eq!(validate_workflow(&doc, &rules(vec![issues_membership()], vec![])), Ok(()));
    }

    #[test]
    fn test_issue_types_missing_reopened_fails() {
        let doc = decode(&format!("on:\n  issues:\n    types: [opened]\n{JOB}"));
        let err = validate_workflow(&doc, &rules(vec![issues_membership()], vec![])).unwrap_err();
        assert!(err.is_violation());
        assert!(err.to_string().contains("reopened issues"));
    }

    #[test]
    fn test_exact_list_is_order_sensitive() {
        let exact = TriggerRule::event("issues").requiring(
            "types",
            &["opened", "reopened", "labeled"],
            ListMode::Exact,
            "wrong types",
        );
        let ok = decode(&format!("on:\n  issues:\n    types: [opened, reopened, labeled]\n{JOB}"));
        let reordered = decode(&format!("on:\n  issues:\n    types: [labeled, opened, reopened]\n{JOB}"));
        let superset = decode(&format!(
            "on:\n  issues:\n    types: [opened, reopened, labeled, closed]\n{JOB}"
        ));
        let r = rules(vec![exact], vec![]);
        assert!(validate_workflow(&ok, &r).is_ok());
        assert!(validate_workflow(&reordered, &r).is_err());
        assert!(validate_workflow(&superset, &r).is_err());
    }

    #[test]
    fn test_optional_branch_condition() {
        let push = TriggerRule::event("push").when_declared(
            "branches",
            &["main"],
            "The workflow does not run on the main branch.",
        );
        let r = rules(vec![push], vec![]);
        let bare = decode(&format!("on: push\n{JOB}"));
        let main = decode(&format!("on:\n  push:\n    branches: [main]\n{JOB}"));
        let dev = decode(&format!("on:\n  push:\n    branches: [dev]\n{JOB}"));
        assert!(validate_workflow(&bare, &r).is_ok());
        assert!(validate_workflow(&main, &r).is_ok());
        assert_eq!(
            validate_workflow(&dev, &r).unwrap_err().to_string(),
            "The workflow does not run on the main branch."
        );
    }

    #[test]
    fn test_missing_event_reported_first() {
        let doc = decode("on: pull_request\n");
        let err = validate_workflow(&doc, &rules(vec![TriggerRule::event("push")], vec![])).unwrap_err();
        assert_eq!(err.to_string(), "The workflow does not run on push.");
    }

    #[test]
    fn test_no_jobs() {
        let doc = decode("on: push\njobs: {}\n");
        let err = validate_workflow(&doc, &rules(vec![TriggerRule::event("push")], vec![])).unwrap_err();
        assert_eq!(err.to_string(), "The workflow does not have a job.");
    }

    #[test]
    fn test_first_job_runner_checked() {
        let doc = decode(
            "on: push\njobs:\n  first:\n    runs-on: macos-latest\n  second:\n    runs-on: ubuntu-latest\n",
        );
        let err = validate_workflow(&doc, &rules(vec![], vec![])).unwrap_err();
        assert!(err.to_string().contains("'ubuntu-latest'"));
    }

    #[test]
    fn test_checkout_prefix_matches_versioned_uses() {
        let doc = decode("steps:\n  - uses: actions/checkout@v4\n");
        let steps = doc.get("steps").unwrap().as_sequence().unwrap();
        let descriptor = StepDescriptor::uses_prefix("checkout repository", "actions/checkout@");
        assert!(find_step(steps, &descriptor).unwrap().is_some());
    }

    #[test]
    fn test_echo_prefix_is_quote_and_case_sensitive() {
        let doc = decode("steps:\n  - run: echo 'hi'\n  - run: ECHO \"Hello, world!\"\n");
        let steps = doc.get("steps").unwrap().as_sequence().unwrap();
        let descriptor =
            StepDescriptor::run_prefix("print hello world", "echo \"Hello, world!\"");
        assert!(find_step(steps, &descriptor).unwrap().is_none());
    }

    #[test]
    fn test_target_field_is_respected() {
        let doc = decode("steps:\n  - run: actions/checkout@v4\n");
        let steps = doc.get("steps").unwrap().as_sequence().unwrap();
        let uses_only = StepDescriptor::uses_prefix("checkout", "actions/checkout@");
        let either = StepDescriptor::any_prefix("checkout", "actions/checkout@");
        assert!(find_step(steps, &uses_only).unwrap().is_none());
        assert!(find_step(steps, &either).unwrap().is_some());
    }

    #[test]
    fn test_regex_is_full_match() {
        let descriptor = StepDescriptor::new(
            "checkout the repository",
            StepTarget::Uses,
            MatchMode::Regex,
            r"actions/checkout@v\d+(\.\d+)*",
        );
        let doc = decode(
            "ok:\n  - uses: actions/checkout@v4.1.7\nbad:\n  - uses: actions/checkout@main\n  - uses: actions/checkout@v4-beta\n",
        );
        let ok = doc.get("ok").unwrap().as_sequence().unwrap();
        let bad = doc.get("bad").unwrap().as_sequence().unwrap();
        assert!(find_step(ok, &descriptor).unwrap().is_some());
        assert!(find_step(bad, &descriptor).unwrap().is_none());
    }

    #[test]
    fn test_invalid_regex_is_processing_error() {
        let descriptor = StepDescriptor::new("x", StepTarget::Uses, MatchMode::Regex, "(");
        let err = find_step(&[], &descriptor).unwrap_err();
        assert!(!err.is_violation());
    }

    #[test]
    fn test_missing_step_names_label() {
        let doc = decode(&format!("on: push\n{JOB}"));
        let r = rules(
            vec![],
            vec![StepDescriptor::run_prefix("print hello world", "echo \"Hello, world!\"")],
        );
        assert_eq!(
            validate_workflow(&doc, &r).unwrap_err().to_string(),
            "The job does not have a step to print hello world."
        );
    }

    #[test]
    fn test_guard_must_match_literal() {
        let mut r = rules(vec![], vec![]);
        r.guard = Some("contains(github.event.issue.labels.*.name, 'autocoder-bot')".to_string());
        let ok = decode(
            "jobs:\n  j:\n    runs-on: ubuntu-latest\n    if: contains(github.event.issue.labels.*.name, 'autocoder-bot')\n",
        );
        let other = decode(
            "jobs:\n  j:\n    runs-on: ubuntu-latest\n    if: contains(github.event.issue.labels.*.name, 'bug')\n",
        );
        assert!(validate_workflow(&ok, &r).is_ok());
        assert!(validate_workflow(&other, &r).is_err());
    }

    #[test]
    fn test_env_values_collected_across_steps_and_jobs() {
        let mut r = rules(vec![], vec![]);
        r.required_env_values = vec![
            "${{ github.event.issue.number }}".to_string(),
            "${{ github.event.issue.title }}".to_string(),
        ];
        let doc = decode(
            r#"
jobs:
  first:
    runs-on: ubuntu-latest
    steps:
      - run: echo one
        env:
          NUMBER: ${{ github.event.issue.number }}
  second:
    steps:
      - run: echo two
        env:
          TITLE: ${{ github.event.issue.title }}
"#,
        );
        assert!(validate_workflow(&doc, &r).is_ok());
    }

    #[test]
    fn test_env_values_missing_listed() {
        let mut r = rules(vec![], vec![]);
        r.required_env_values = vec!["${{ a }}".to_string(), "${{ b }}".to_string()];
        let doc = decode(
            "jobs:\n  j:\n    runs-on: ubuntu-latest\n    steps:\n      - env:\n          A: ${{ a }}\n",
        );
        let err = validate_workflow(&doc, &r).unwrap_err().to_string();
        assert!(err.ends_with("${{ b }}"));
        assert!(!err.contains("${{ a }}"));
    }

    #[test]
    fn test_empty_document() {
        let err = validate_workflow(&decode(""), &rules(vec![], vec![])).unwrap_err();
        assert_eq!(err.to_string(), "The workflow file is empty.");
    }

    #[test]
    fn test_stage_two_reference_workflow() {
        let doc = decode(
            r#"
name: Hello
on:
  push:
    branches: [main]
jobs:
  greet:
    runs-on: ubuntu-latest
    steps:
      - name: Checkout
        uses: actions/checkout@v4
      - name: Greet
        run: echo "Hello, world!"
"#,
        );
        let rules = Stage::Two.rules("octo/autocoder").workflow.unwrap();
        assert_eq!(validate_workflow(&doc, &rules), Ok(()));
    }
}
