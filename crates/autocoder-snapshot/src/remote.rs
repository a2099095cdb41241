//! The remote repository capability set consumed by the verifier.
//!
//! Implementations talk to the hosting platform (see `autocoder-github`) or
//! serve canned data (see [`crate::fakes`]). All calls are read-only.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::model::{
    Artifact, CommitAuthor, ContentEntry, Issue, PullRequest, RepositoryInfo, WorkflowRun,
};

/// Result type for remote calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Read-only view of one remote repository.
///
/// The repository identity is fixed at construction; every method addresses
/// that repository.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Repository metadata. `NotFound` if the repository is absent or private
    /// and inaccessible.
    async fn get_repository(&self) -> RemoteResult<RepositoryInfo>;

    /// Entries directly under `path` (`""` is the root). Not recursive.
    async fn list_contents(&self, path: &str) -> RemoteResult<Vec<ContentEntry>>;

    /// Raw bytes of the file at `path`. `NotFound` if absent.
    async fn get_file_content(&self, path: &str) -> RemoteResult<Vec<u8>>;

    /// Open issues, optionally restricted to those carrying `label`.
    async fn list_open_issues(&self, label: Option<&str>) -> RemoteResult<Vec<Issue>>;

    /// Open pull requests, newest first.
    async fn list_open_pull_requests(&self) -> RemoteResult<Vec<PullRequest>>;

    /// Mergeable state of a pull request (`clean`, `dirty`, `unknown`, ...).
    async fn get_mergeable_state(&self, number: u64) -> RemoteResult<Option<String>>;

    /// Authors of every commit on a pull request.
    async fn list_pull_request_commits(&self, number: u64) -> RemoteResult<Vec<CommitAuthor>>;

    /// First page of workflow runs, newest first.
    async fn list_workflow_runs(&self) -> RemoteResult<Vec<WorkflowRun>>;

    /// Artifacts uploaded by a workflow run.
    async fn list_artifacts(&self, run_id: u64) -> RemoteResult<Vec<Artifact>>;
}
