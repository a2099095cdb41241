//! Composite action metadata validation.

use crate::error::{RuleError, RuleResult};
use crate::rules::ActionRules;
use crate::value::ValueTree;
use crate::workflow::require_steps;

/// Validate a decoded `action.yml` against `rules`.
///
/// Checked in order: name, inputs, `runs.using`, then steps.
pub fn validate_action(doc: &ValueTree, rules: &ActionRules) -> RuleResult {
    if doc.get("name").and_then(ValueTree::as_str) != Some(rules.name.as_str()) {
        return Err(RuleError::violation(format!(
            "The name of the action in 'action.yml' should be '{}'.",
            rules.name
        )));
    }

    let inputs = doc.get("inputs");
    for input in &rules.required_inputs {
        if !inputs.is_some_and(|inputs| inputs.get(input).is_some()) {
            return Err(RuleError::violation(format!(
                "The input '{input}' is missing in 'action.yml'."
            )));
        }
    }

    let runs = doc.get("runs");
    if runs.and_then(|runs| runs.get("using")).and_then(ValueTree::as_str)
        != Some(rules.runs_using.as_str())
    {
        return Err(RuleError::violation(format!(
            "The 'action.yml' should specify that it's using '{}' for 'runs'.",
            rules.runs_using
        )));
    }

    let steps = runs
        .and_then(|runs| runs.get("steps"))
        .and_then(ValueTree::as_sequence)
        .filter(|steps| !steps.is_empty())
        .ok_or_else(|| {
            RuleError::violation("The 'runs' section of 'action.yml' does not have any steps.")
        })?;
    require_steps(steps, &rules.steps, "The 'runs' section of 'action.yml'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    const ACTION: &str = r#"
name: AutoCoder
description: Generates code from issues
inputs:
  GITHUB_TOKEN:
    required: true
  REPOSITORY:
    required: true
  ISSUE_NUMBER:
    required: true
  OPENAI_API_KEY:
    required: true
  SCRIPT_PATH:
    required: true
  LABEL:
    required: true
runs:
  using: composite
  steps:
    - uses: actions/checkout@v4
    - run: chmod +x ${{ inputs.SCRIPT_PATH }}
      shell: bash
    - run: |
        git config --local user.email "actions@github.com"
        git config --local user.name "autocoder-bot"
        git add .
        git commit -m "Add generated code"
      shell: bash
    - uses: peter-evans/create-pull-request@v6
"#;

    fn rules() -> ActionRules {
        Stage::Seven.rules("octo/autocoder").action.unwrap()
    }

    #[test]
    fn test_reference_action_passes() {
        let doc = ValueTree::decode(ACTION).unwrap();
        assert_eq!(validate_action(&doc, &rules()), Ok(()));
    }

    #[test]
    fn test_wrong_name() {
        let doc = ValueTree::decode(&ACTION.replace("name: AutoCoder", "name: Coder")).unwrap();
        assert_eq!(
            validate_action(&doc, &rules()).unwrap_err().to_string(),
            "The name of the action in 'action.yml' should be 'AutoCoder'."
        );
    }

    #[test]
    fn test_missing_input_named() {
        let doc = ValueTree::decode(&ACTION.replace("  LABEL:\n", "  TAG:\n")).unwrap();
        assert_eq!(
            validate_action(&doc, &rules()).unwrap_err().to_string(),
            "The input 'LABEL' is missing in 'action.yml'."
        );
    }

    #[test]
    fn test_runs_using_must_be_composite() {
        let doc = ValueTree::decode(&ACTION.replace("using: composite", "using: node20")).unwrap();
        assert!(validate_action(&doc, &rules())
            .unwrap_err()
            .to_string()
            .contains("'composite'"));
    }

    #[test]
    fn test_missing_step() {
        let doc = ValueTree::decode(&ACTION.replace("peter-evans/create-pull-request@v6", "x/y@v1"))
            .unwrap();
        assert_eq!(
            validate_action(&doc, &rules()).unwrap_err().to_string(),
            "The 'runs' section of 'action.yml' does not have a step to create pull request."
        );
    }

    #[test]
    fn test_no_steps() {
        let doc = ValueTree::decode(
            "name: AutoCoder\ninputs: {GITHUB_TOKEN: {}, REPOSITORY: {}, ISSUE_NUMBER: {}, OPENAI_API_KEY: {}, SCRIPT_PATH: {}, LABEL: {}}\nruns:\n  using: composite\n",
        )
        .unwrap();
        assert_eq!(
            validate_action(&doc, &rules()).unwrap_err().to_string(),
            "The 'runs' section of 'action.yml' does not have any steps."
        );
    }
}
