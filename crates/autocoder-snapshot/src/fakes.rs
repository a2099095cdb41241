//! In-memory fake of [`RemoteRepository`] (testing only)
//!
//! `MemoryRemote` serves canned repository state, counts calls per method and
//! can inject failures, so checks and the snapshot cache can be exercised
//! without network access.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::model::*;
use crate::remote::{RemoteRepository, RemoteResult};

#[derive(Debug, Clone)]
struct InjectedFailure {
    error: RemoteError,
    once: bool,
}

#[derive(Debug, Default)]
struct State {
    repository: Option<RepositoryInfo>,
    files: BTreeMap<String, Vec<u8>>,
    issues: Vec<Issue>,
    pull_requests: Vec<PullRequest>,
    mergeable_states: HashMap<u64, Option<String>>,
    commits: HashMap<u64, Vec<CommitAuthor>>,
    workflow_runs: Vec<WorkflowRun>,
    artifacts: HashMap<u64, Vec<Artifact>>,
    failures: HashMap<String, InjectedFailure>,
    calls: HashMap<String, usize>,
}

/// In-memory remote repository.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(self, full_name: &str, private: bool) -> Self {
        self.state.lock().unwrap().repository = Some(RepositoryInfo {
            full_name: full_name.to_string(),
            private,
            default_branch: "main".to_string(),
        });
        self
    }

    /// Add a file; parent directories are implied by the path.
    pub fn with_file(self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.as_ref().to_vec());
        self
    }

    pub fn with_issue(self, issue: Issue) -> Self {
        self.state.lock().unwrap().issues.push(issue);
        self
    }

    pub fn with_pull_request(
        self,
        pr: PullRequest,
        mergeable_state: Option<&str>,
        commits: Vec<CommitAuthor>,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .mergeable_states
                .insert(pr.number, mergeable_state.map(str::to_string));
            state.commits.insert(pr.number, commits);
            state.pull_requests.push(pr);
        }
        self
    }

    /// Add a workflow run. Runs are reported in insertion order, so add the
    /// newest first.
    pub fn with_workflow_run(self, run: WorkflowRun, artifacts: Vec<Artifact>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.artifacts.insert(run.id, artifacts);
            state.workflow_runs.push(run);
        }
        self
    }

    /// Make every call to `method` fail with `error`.
    pub fn fail_with(self, method: &str, error: RemoteError) -> Self {
        self.state.lock().unwrap().failures.insert(
            method.to_string(),
            InjectedFailure { error, once: false },
        );
        self
    }

    /// Make the next call to `method` fail with `error`.
    pub fn fail_once(self, method: &str, error: RemoteError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(method.to_string(), InjectedFailure { error, once: true });
        self
    }

    /// Delay every response, to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of calls made to `method` so far.
    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    async fn enter(&self, method: &str) -> RemoteResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method.to_string()).or_default() += 1;
        match state.failures.get(method).cloned() {
            Some(failure) => {
                if failure.once {
                    state.failures.remove(method);
                }
                Err(failure.error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteRepository for MemoryRemote {
    async fn get_repository(&self) -> RemoteResult<RepositoryInfo> {
        self.enter("get_repository").await?;
        self.state
            .lock()
            .unwrap()
            .repository
            .clone()
            .ok_or_else(|| RemoteError::not_found("Not Found"))
    }

    async fn list_contents(&self, path: &str) -> RemoteResult<Vec<ContentEntry>> {
        self.enter("list_contents").await?;
        let state = self.state.lock().unwrap();
        if state.files.contains_key(path) {
            return Ok(vec![ContentEntry::file(path)]);
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let mut entries: BTreeMap<String, ContentEntry> = BTreeMap::new();
        for file in state.files.keys() {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    let dir_path = format!("{prefix}{dir}");
                    entries.insert(dir_path.clone(), ContentEntry::dir(dir_path));
                }
                None => {
                    entries.insert(file.clone(), ContentEntry::file(file.clone()));
                }
            }
        }

        if entries.is_empty() && !path.is_empty() {
            return Err(RemoteError::not_found("Not Found"));
        }
        Ok(entries.into_values().collect())
    }

    async fn get_file_content(&self, path: &str) -> RemoteResult<Vec<u8>> {
        self.enter("get_file_content").await?;
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("Not Found"))
    }

    async fn list_open_issues(&self, label: Option<&str>) -> RemoteResult<Vec<Issue>> {
        self.enter("list_open_issues").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .issues
            .iter()
            .filter(|issue| label.map_or(true, |l| issue.labels.iter().any(|x| x == l)))
            .cloned()
            .collect())
    }

    async fn list_open_pull_requests(&self) -> RemoteResult<Vec<PullRequest>> {
        self.enter("list_open_pull_requests").await?;
        let mut pulls = self.state.lock().unwrap().pull_requests.clone();
        pulls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pulls)
    }

    async fn get_mergeable_state(&self, number: u64) -> RemoteResult<Option<String>> {
        self.enter("get_mergeable_state").await?;
        self.state
            .lock()
            .unwrap()
            .mergeable_states
            .get(&number)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("Not Found"))
    }

    async fn list_pull_request_commits(&self, number: u64) -> RemoteResult<Vec<CommitAuthor>> {
        self.enter("list_pull_request_commits").await?;
        self.state
            .lock()
            .unwrap()
            .commits
            .get(&number)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("Not Found"))
    }

    async fn list_workflow_runs(&self) -> RemoteResult<Vec<WorkflowRun>> {
        self.enter("list_workflow_runs").await?;
        Ok(self.state.lock().unwrap().workflow_runs.clone())
    }

    async fn list_artifacts(&self, run_id: u64) -> RemoteResult<Vec<Artifact>> {
        self.enter("list_artifacts").await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .artifacts
            .get(&run_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_contents_derives_directories() {
        let remote = MemoryRemote::new()
            .with_file("README.md", "x")
            .with_file(".github/workflows/main.yml", "on: push")
            .with_file("scripts/script.sh", "echo");

        let root = remote.list_contents("").await.unwrap();
        let paths: Vec<_> = root.iter().map(|e| (e.path.as_str(), e.kind)).collect();
        assert_eq!(
            paths,
            vec![
                (".github", EntryKind::Dir),
                ("README.md", EntryKind::File),
                ("scripts", EntryKind::Dir),
            ]
        );

        let workflows = remote.list_contents(".github/workflows").await.unwrap();
        assert_eq!(workflows, vec![ContentEntry::file(".github/workflows/main.yml")]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let remote = MemoryRemote::new().with_file("README.md", "x");
        let err = remote.list_contents(".github/workflows").await.unwrap_err();
        assert_eq!(err, RemoteError::not_found("Not Found"));
    }

    #[tokio::test]
    async fn test_issue_label_filter() {
        let remote = MemoryRemote::new()
            .with_issue(Issue {
                number: 1,
                title: "a".into(),
                body: None,
                labels: vec!["autocoder-bot".into()],
                is_pull_request: false,
            })
            .with_issue(Issue {
                number: 2,
                title: "b".into(),
                body: None,
                labels: vec![],
                is_pull_request: false,
            });

        assert_eq!(remote.list_open_issues(None).await.unwrap().len(), 2);
        let labeled = remote.list_open_issues(Some("autocoder-bot")).await.unwrap();
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].number, 1);
    }

    #[tokio::test]
    async fn test_fail_once_then_recovers() {
        let remote = MemoryRemote::new()
            .with_repository("octo/autocoder", false)
            .fail_once("get_repository", RemoteError::status(403, "rate limited"));

        assert!(remote.get_repository().await.is_err());
        assert!(remote.get_repository().await.is_ok());
        assert_eq!(remote.calls("get_repository"), 2);
    }
}
