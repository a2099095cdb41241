//! Open issue validation.

use autocoder_snapshot::Issue;

use crate::error::{RuleError, RuleResult};
use crate::rules::IssueRules;

/// At least one open issue must exist.
pub fn validate_issues_exist(issues: &[Issue]) -> RuleResult {
    if issues.iter().any(|issue| !issue.is_pull_request) {
        Ok(())
    } else {
        Err(RuleError::violation("No open issues found in the repository."))
    }
}

/// Validate every open issue carrying the bot label. Pull requests reported
/// through the issues listing are skipped.
pub fn validate_issues(issues: &[Issue], rules: &IssueRules) -> RuleResult {
    issues
        .iter()
        .filter(|issue| !issue.is_pull_request)
        .filter(|issue| issue.labels.iter().any(|l| *l == rules.label))
        .try_for_each(|issue| validate_issue(issue, rules))
}

fn validate_issue(issue: &Issue, rules: &IssueRules) -> RuleResult {
    let number = issue.number;
    if rules.label_first && issue.labels.is_empty() {
        return Err(RuleError::violation(format!(
            "The issue #{number} does not have any labels."
        )));
    }

    let body = issue.body.as_deref().unwrap_or_default();
    if body.trim().is_empty() {
        return Err(RuleError::violation(format!(
            "The issue #{number} does not have any content."
        )));
    }

    if rules.label_first && issue.labels.first() != Some(&rules.label) {
        return Err(RuleError::violation(format!(
            "The issue #{number} does not have the label '{}'.",
            rules.label
        )));
    }

    if body.split_whitespace().count() < rules.min_body_words {
        return Err(RuleError::violation(format!(
            "The issue #{number} is too short. Please provide more details."
        )));
    }
    Ok(())
}
