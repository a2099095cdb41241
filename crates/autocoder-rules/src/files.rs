//! Repository layout, file content and workflow run validation.

use std::collections::BTreeSet;

use autocoder_snapshot::{Artifact, RepositoryInfo, WorkflowRun};
use sha2::{Digest, Sha256};

use crate::error::{RuleError, RuleResult};
use crate::rules::{ReadmeRules, ScriptRules, WorkflowRunRules, WORKFLOW_PATH, WORKFLOW_PATH_ALT};

/// The repository must be public.
pub fn validate_visibility(info: &RepositoryInfo) -> RuleResult {
    if info.private {
        Err(RuleError::violation(
            "The repository is private. Make sure it's public.",
        ))
    } else {
        Ok(())
    }
}

/// Symmetric comparison of the repository's file paths with `expected`.
///
/// Missing files are reported before unexpected ones. A `main.yaml`
/// manifest stands in for `main.yml`.
pub fn compare_file_sets(expected: &BTreeSet<String>, actual: &BTreeSet<String>) -> RuleResult {
    let mut actual = actual.clone();
    if !actual.contains(WORKFLOW_PATH) && actual.remove(WORKFLOW_PATH_ALT) {
        actual.insert(WORKFLOW_PATH.to_string());
    }

    let missing: Vec<&str> = expected.difference(&actual).map(String::as_str).collect();
    if !missing.is_empty() {
        return Err(RuleError::violation(format!(
            "The repository is missing the following expected file(s): {}",
            missing.join(", ")
        )));
    }

    let extra: Vec<&str> = actual.difference(expected).map(String::as_str).collect();
    if !extra.is_empty() {
        return Err(RuleError::violation(format!(
            "The repository contains unexpected file(s): {}",
            extra.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_readme(text: &str, repo_name: &str, rules: &ReadmeRules) -> RuleResult {
    if text.trim().is_empty() {
        return Err(RuleError::violation("The README.md file is empty."));
    }
    if rules.require_repo_name && !text.contains(repo_name) {
        return Err(RuleError::violation(
            "The README.md file does not contain the repository name.",
        ));
    }
    if text.split_whitespace().count() < rules.min_words {
        return Err(RuleError::violation("The project description is too short."));
    }
    Ok(())
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// The script must be non-empty and, when required and a reference is
/// available, byte-identical to the reference.
pub fn validate_script(content: &[u8], reference: Option<&[u8]>, rules: &ScriptRules) -> RuleResult {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(RuleError::violation(format!(
            "The file '{}' is empty.",
            rules.path
        )));
    }
    if let (true, Some(reference)) = (rules.match_reference, reference) {
        if sha256_hex(content) != sha256_hex(reference) {
            return Err(RuleError::violation(format!(
                "The file '{}' does not have the expected content.",
                rules.path
            )));
        }
    }
    Ok(())
}

/// Validate the most recent workflow run and, when required, its artifacts.
pub fn validate_latest_run(
    run: Option<&WorkflowRun>,
    artifacts: &[Artifact],
    rules: &WorkflowRunRules,
) -> RuleResult {
    let run = run.ok_or_else(|| RuleError::violation("No workflow runs found in the repository."))?;
    if run.event != rules.event {
        return Err(RuleError::violation(rules.event_message.clone()));
    }
    if run.conclusion.as_deref() != Some(rules.conclusion.as_str()) {
        return Err(RuleError::violation("The latest workflow run did not succeed."));
    }
    if let Some(name) = &rules.artifact {
        let first = artifacts
            .first()
            .ok_or_else(|| RuleError::violation("No artifacts found in the latest workflow run."))?;
        if first.name != *name {
            return Err(RuleError::violation(format!(
                "The uploaded artifact is not named '{name}'."
            )));
        }
    }
    Ok(())
}
