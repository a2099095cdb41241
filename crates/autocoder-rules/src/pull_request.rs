//! Pull request validation.

use autocoder_snapshot::{CommitAuthor, PullRequest};
use regex::Regex;

use crate::error::{RuleError, RuleResult};
use crate::rules::PullRequestRules;

/// Most recently created pull request, or a violation when there is none.
pub fn latest_pull_request(pulls: &[PullRequest]) -> Result<&PullRequest, RuleError> {
    pulls
        .iter()
        .max_by_key(|pr| pr.created_at)
        .ok_or_else(|| RuleError::violation("No open pull requests found in the repository."))
}

/// Issue number referenced as `#<number>` in a pull request title.
pub fn referenced_issue(title: &str) -> Result<u64, RuleError> {
    let re = Regex::new(r"#(\d+)").map_err(|e| RuleError::processing(e.to_string()))?;
    re.captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| {
            RuleError::processing(format!(
                "no issue reference '#<number>' in pull request title '{title}'"
            ))
        })
}

/// Validate one pull request. Checked in order: author, label, mergeable
/// state, commit authors, then the head branch name.
pub fn validate_pull_request(
    pr: &PullRequest,
    mergeable_state: Option<&str>,
    commits: &[CommitAuthor],
    rules: &PullRequestRules,
) -> RuleResult {
    if pr.author_login != rules.author_login {
        return Err(RuleError::violation(
            "The pull request was not created by GitHub Actions.",
        ));
    }

    if !pr.labels.iter().any(|l| *l == rules.label) {
        return Err(RuleError::violation(format!(
            "The pull request does not have the '{}' label.",
            rules.label
        )));
    }

    if mergeable_state != Some(rules.mergeable_state.as_str()) {
        return Err(RuleError::violation(rules.conflict_message.clone()));
    }

    if let Some(commit) = commits.iter().find(|c| {
        c.name != rules.commit_author_name || c.email != rules.commit_author_email
    }) {
        return Err(RuleError::violation(format!(
            "The commit was not made by '{}' with the email '{}'. Found name: '{}', email: '{}'.",
            rules.commit_author_name, rules.commit_author_email, commit.name, commit.email
        )));
    }

    let issue = referenced_issue(&pr.title)?;
    let expected = format!("{}{issue}", rules.branch_prefix);
    if pr.head_ref != expected {
        return Err(RuleError::violation(format!(
            "The pull request branch name does not follow the convention '{}issueNumber'. Expected '{expected}', found '{}'.",
            rules.branch_prefix, pr.head_ref
        )));
    }
    Ok(())
}
