//! Plain data describing the slices of remote repository state the
//! verifier reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// `owner/name`
    pub full_name: String,
    pub private: bool,
    pub default_branch: String,
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks and submodules; treated as files by the tree walk.
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Repository-root-relative path, e.g. `.github/workflows/main.yml`
    pub path: String,
    pub kind: EntryKind,
}

impl ContentEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// An open issue. Pull requests also show up in the issue listing; those have
/// `is_pull_request` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    /// `None` when the issue was opened without a description
    pub body: Option<String>,
    /// Label names in the order the platform reports them
    pub labels: Vec<String>,
    pub is_pull_request: bool,
}

/// An open pull request as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Head branch name
    pub head_ref: String,
    /// Login of the account that opened the pull request
    pub author_login: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Git author identity recorded on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub sha: String,
    pub name: String,
    pub email: String,
}

/// A workflow run. Listing order is newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    /// Triggering event, e.g. `push` or `issues`
    pub event: String,
    /// `None` while the run is still in progress
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An artifact uploaded by a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
}
