//! Per-run memoized view of a remote repository.
//!
//! Every distinct remote resource is fetched at most once for the lifetime of
//! a [`RepositorySnapshot`]. Concurrent first accesses to the same resource
//! share a single in-flight fetch. Failed fetches are not cached, so a later
//! access retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::model::{
    Artifact, CommitAuthor, ContentEntry, Issue, PullRequest, RepositoryInfo, WorkflowRun,
};
use crate::remote::{RemoteRepository, RemoteResult};

type Cell<T> = OnceCell<Arc<T>>;

/// Memo cells keyed by a resource argument (path, label, number).
struct Keyed<T> {
    cells: Mutex<HashMap<String, Arc<Cell<T>>>>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Keyed<T> {
    fn cell(&self, key: &str) -> Arc<Cell<T>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(key.to_string()).or_default())
    }
}

async fn memo<T, F, Fut>(cell: &Cell<T>, resource: &str, fetch: F) -> RemoteResult<Arc<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    if let Some(value) = cell.get() {
        debug!(resource = %resource, "snapshot hit");
        return Ok(Arc::clone(value));
    }
    let value = cell
        .get_or_try_init(|| async {
            debug!(resource = %resource, "snapshot fetch");
            fetch().await.map(Arc::new)
        })
        .await?;
    Ok(Arc::clone(value))
}

/// Lazily fetched, run-scoped repository state.
///
/// Construct one per verification run and hand it to every check of that run.
pub struct RepositorySnapshot {
    remote: Arc<dyn RemoteRepository>,
    full_name: String,
    repository: Cell<RepositoryInfo>,
    contents: Keyed<Vec<ContentEntry>>,
    files: Keyed<Vec<u8>>,
    issues: Keyed<Vec<Issue>>,
    pull_requests: Cell<Vec<PullRequest>>,
    mergeable_states: Keyed<Option<String>>,
    commits: Keyed<Vec<CommitAuthor>>,
    workflow_runs: Cell<Vec<WorkflowRun>>,
    artifacts: Keyed<Vec<Artifact>>,
}

impl RepositorySnapshot {
    /// Create an empty snapshot over `remote`, which addresses `full_name`.
    pub fn new(remote: Arc<dyn RemoteRepository>, full_name: impl Into<String>) -> Self {
        Self {
            remote,
            full_name: full_name.into(),
            repository: OnceCell::new(),
            contents: Keyed::default(),
            files: Keyed::default(),
            issues: Keyed::default(),
            pull_requests: OnceCell::new(),
            mergeable_states: Keyed::default(),
            commits: Keyed::default(),
            workflow_runs: OnceCell::new(),
            artifacts: Keyed::default(),
        }
    }

    /// `owner/name` of the repository this snapshot addresses.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub async fn repository(&self) -> RemoteResult<Arc<RepositoryInfo>> {
        memo(&self.repository, "repository", || self.remote.get_repository()).await
    }

    pub async fn contents(&self, path: &str) -> RemoteResult<Arc<Vec<ContentEntry>>> {
        let cell = self.contents.cell(path);
        memo(&cell, &format!("contents:{path}"), || {
            self.remote.list_contents(path)
        })
        .await
    }

    pub async fn file_content(&self, path: &str) -> RemoteResult<Arc<Vec<u8>>> {
        let cell = self.files.cell(path);
        memo(&cell, &format!("file:{path}"), || {
            self.remote.get_file_content(path)
        })
        .await
    }

    /// File content decoded as UTF-8 (lossy).
    pub async fn file_text(&self, path: &str) -> RemoteResult<String> {
        let bytes = self.file_content(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn open_issues(&self, label: Option<&str>) -> RemoteResult<Arc<Vec<Issue>>> {
        let key = label.unwrap_or_default();
        let cell = self.issues.cell(key);
        memo(&cell, &format!("issues:{key}"), || {
            self.remote.list_open_issues(label)
        })
        .await
    }

    pub async fn open_pull_requests(&self) -> RemoteResult<Arc<Vec<PullRequest>>> {
        memo(&self.pull_requests, "pulls", || {
            self.remote.list_open_pull_requests()
        })
        .await
    }

    pub async fn mergeable_state(&self, number: u64) -> RemoteResult<Arc<Option<String>>> {
        let key = number.to_string();
        let cell = self.mergeable_states.cell(&key);
        memo(&cell, &format!("pull:{key}"), || {
            self.remote.get_mergeable_state(number)
        })
        .await
    }

    pub async fn pull_request_commits(&self, number: u64) -> RemoteResult<Arc<Vec<CommitAuthor>>> {
        let key = number.to_string();
        let cell = self.commits.cell(&key);
        memo(&cell, &format!("pull_commits:{key}"), || {
            self.remote.list_pull_request_commits(number)
        })
        .await
    }

    pub async fn workflow_runs(&self) -> RemoteResult<Arc<Vec<WorkflowRun>>> {
        memo(&self.workflow_runs, "workflow_runs", || {
            self.remote.list_workflow_runs()
        })
        .await
    }

    pub async fn artifacts(&self, run_id: u64) -> RemoteResult<Arc<Vec<Artifact>>> {
        let key = run_id.to_string();
        let cell = self.artifacts.cell(&key);
        memo(&cell, &format!("artifacts:{key}"), || {
            self.remote.list_artifacts(run_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryRemote;
    use crate::RemoteError;

    #[test]
    fn test_full_name() {
        let snapshot = RepositorySnapshot::new(Arc::new(MemoryRemote::new()), "octo/autocoder");
        assert_eq!(snapshot.full_name(), "octo/autocoder");
    }

    #[tokio::test]
    async fn test_file_fetched_once() {
        let remote = Arc::new(MemoryRemote::new().with_file("README.md", "hello"));
        let snapshot = RepositorySnapshot::new(remote.clone(), "octo/autocoder");

        assert_eq!(snapshot.file_text("README.md").await.unwrap(), "hello");
        assert_eq!(snapshot.file_text("README.md").await.unwrap(), "hello");
        assert_eq!(remote.calls("get_file_content"), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetched_separately() {
        let remote = Arc::new(
            MemoryRemote::new()
                .with_file("a.txt", "a")
                .with_file("b.txt", "b"),
        );
        let snapshot = RepositorySnapshot::new(remote.clone(), "octo/autocoder");

        snapshot.file_content("a.txt").await.unwrap();
        snapshot.file_content("b.txt").await.unwrap();
        snapshot.file_content("a.txt").await.unwrap();
        assert_eq!(remote.calls("get_file_content"), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_not_cached() {
        let remote = Arc::new(
            MemoryRemote::new().fail_once("list_workflow_runs", RemoteError::status(500, "boom")),
        );
        let snapshot = RepositorySnapshot::new(remote.clone(), "octo/autocoder");

        assert!(snapshot.workflow_runs().await.is_err());
        assert!(snapshot.workflow_runs().await.is_ok());
        assert_eq!(remote.calls("list_workflow_runs"), 2);
    }
}
