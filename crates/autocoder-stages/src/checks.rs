//! Check bodies. Each reads what it needs from the snapshot and hands it to
//! a validator; no check depends on another having run.

use std::collections::BTreeSet;

use autocoder_rules::rules::{
    ACTION_PATH, BOT_LABEL, README_PATH, SCRIPT_PATH, WORKFLOWS_DIR, WORKFLOW_PATH,
    WORKFLOW_PATH_ALT,
};
use autocoder_rules::{
    compare_file_sets, latest_pull_request, validate_action, validate_issues,
    validate_issues_exist, validate_latest_run, validate_pull_request, validate_readme,
    validate_script, validate_visibility, validate_workflow, RuleError, RuleSpecification,
    ValueTree,
};
use autocoder_snapshot::{EntryKind, RepositorySnapshot};
use tracing::debug;

use crate::check::CheckId;
use crate::diagnostics::CheckError;
use crate::runner::RunOptions;
use crate::target::RepoTarget;

/// Everything a check may read.
pub struct CheckContext<'a> {
    pub target: &'a RepoTarget,
    pub snapshot: &'a RepositorySnapshot,
    pub rules: &'a RuleSpecification,
    pub options: &'a RunOptions,
}

type CheckOutput = Result<(), CheckError>;

/// Run the body of `check`.
pub async fn run(check: CheckId, ctx: &CheckContext<'_>) -> CheckOutput {
    match check {
        // The target parsed, so the URL is set.
        CheckId::UrlSet => Ok(()),
        CheckId::RepositoryLayout => repository_layout(ctx).await,
        CheckId::FileSet => file_set(ctx).await,
        CheckId::ScriptFile => script_file(ctx).await,
        CheckId::WorkflowExists => workflow_path(ctx).await.map(|_| ()),
        CheckId::WorkflowManifest => workflow_manifest(ctx).await,
        CheckId::IssuesExist => issues_exist(ctx).await,
        CheckId::IssueProperties => issue_properties(ctx).await,
        CheckId::LatestWorkflowRun => latest_workflow_run(ctx).await,
        CheckId::ActionExists => action_exists(ctx).await,
        CheckId::ActionMetadata => action_metadata(ctx).await,
        CheckId::PullRequest => pull_request(ctx).await,
    }
}

fn required<'r, T>(rules: &'r Option<T>, what: &str) -> Result<&'r T, CheckError> {
    rules
        .as_ref()
        .ok_or_else(|| RuleError::processing(format!("this stage defines no {what} rules")).into())
}

/// Every file path in the repository.
/// Symlinks and submodules count as files.
async fn repository_files(snapshot: &RepositorySnapshot) -> Result<BTreeSet<String>, CheckError> {
    let mut files = BTreeSet::new();
    let mut pending = vec![String::new()];
    while let Some(dir) = pending.pop() {
        let entries = snapshot.contents(&dir).await?;
        for entry in entries.iter() {
            match entry.kind {
                EntryKind::Dir => pending.push(entry.path.clone()),
                EntryKind::File | EntryKind::Other => {
                    files.insert(entry.path.clone());
                }
            }
        }
    }
    debug!(
        repository = snapshot.full_name(),
        count = files.len(),
        "walked repository tree"
    );
    Ok(files)
}

async fn repository_layout(ctx: &CheckContext<'_>) -> CheckOutput {
    let info = ctx.snapshot.repository().await?;
    validate_visibility(&info)?;

    let files = repository_files(ctx.snapshot).await?;
    compare_file_sets(&ctx.rules.expected_files, &files)?;

    let readme = required(&ctx.rules.readme, "README")?;
    let text = ctx.snapshot.file_text(README_PATH).await?;
    validate_readme(&text, &ctx.target.name, readme)?;
    Ok(())
}

async fn file_set(ctx: &CheckContext<'_>) -> CheckOutput {
    let files = repository_files(ctx.snapshot).await?;
    compare_file_sets(&ctx.rules.expected_files, &files)?;
    Ok(())
}

async fn script_file(ctx: &CheckContext<'_>) -> CheckOutput {
    let rules = required(&ctx.rules.script, "script")?;
    let content = ctx.snapshot.file_content(SCRIPT_PATH).await?;
    validate_script(&content, ctx.options.reference_script.as_deref(), rules)?;
    Ok(())
}

/// Path of the workflow manifest, preferring `main.yml`.
async fn workflow_path(ctx: &CheckContext<'_>) -> Result<&'static str, CheckError> {
    let entries = ctx.snapshot.contents(WORKFLOWS_DIR).await?;
    let present = |path: &str| entries.iter().any(|e| e.path == path && !e.is_dir());
    if present(WORKFLOW_PATH) {
        Ok(WORKFLOW_PATH)
    } else if present(WORKFLOW_PATH_ALT) {
        Ok(WORKFLOW_PATH_ALT)
    } else {
        Err(RuleError::violation(format!(
            "The workflow file '{WORKFLOW_PATH}' does not exist."
        ))
        .into())
    }
}

async fn workflow_manifest(ctx: &CheckContext<'_>) -> CheckOutput {
    let rules = required(&ctx.rules.workflow, "workflow")?;
    let path = workflow_path(ctx).await?;
    let text = ctx.snapshot.file_text(path).await?;
    let doc = ValueTree::decode(&text)?;
    validate_workflow(&doc, rules)?;
    Ok(())
}

async fn issues_exist(ctx: &CheckContext<'_>) -> CheckOutput {
    let issues = ctx.snapshot.open_issues(None).await?;
    validate_issues_exist(&issues)?;
    Ok(())
}

async fn issue_properties(ctx: &CheckContext<'_>) -> CheckOutput {
    let rules = required(&ctx.rules.issues, "issue")?;
    let issues = ctx.snapshot.open_issues(Some(BOT_LABEL)).await?;
    validate_issues(&issues, rules)?;
    Ok(())
}

async fn latest_workflow_run(ctx: &CheckContext<'_>) -> CheckOutput {
    let rules = required(&ctx.rules.workflow_run, "workflow run")?;
    let runs = ctx.snapshot.workflow_runs().await?;
    let latest = runs.first();
    let artifacts = match (latest, &rules.artifact) {
        (Some(run), Some(_)) => ctx.snapshot.artifacts(run.id).await?.to_vec(),
        _ => Vec::new(),
    };
    validate_latest_run(latest, &artifacts, rules)?;
    Ok(())
}

async fn action_exists(ctx: &CheckContext<'_>) -> CheckOutput {
    ctx.snapshot.file_content(ACTION_PATH).await?;
    Ok(())
}

async fn action_metadata(ctx: &CheckContext<'_>) -> CheckOutput {
    let rules = required(&ctx.rules.action, "action")?;
    let text = ctx.snapshot.file_text(ACTION_PATH).await?;
    let doc = ValueTree::decode(&text)?;
    validate_action(&doc, rules)?;
    Ok(())
}

async fn pull_request(ctx: &CheckContext<'_>) -> CheckOutput {
    let rules = required(&ctx.rules.pull_request, "pull request")?;
    let pulls = ctx.snapshot.open_pull_requests().await?;
    let pr = latest_pull_request(&pulls)?;
    let mergeable = ctx.snapshot.mergeable_state(pr.number).await?;
    let commits = ctx.snapshot.pull_request_commits(pr.number).await?;
    validate_pull_request(pr, mergeable.as_deref(), &commits, rules)?;
    Ok(())
}
