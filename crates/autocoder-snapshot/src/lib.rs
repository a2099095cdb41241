//! AutoCoder Snapshot: remote repository state for one verification run
//!
//! ## Key Components
//!
//! - `RemoteRepository`: read-only capability set of the hosting platform
//! - `RepositorySnapshot`: per-run memoized view over a `RemoteRepository`
//! - `RemoteError` / `ErrorClass`: transport failures and their classification
//! - `fakes::MemoryRemote`: in-memory implementation for tests

mod error;
pub mod fakes;
pub mod model;
pub mod remote;
pub mod snapshot;

pub use error::{ErrorClass, RemoteError};
pub use model::{
    Artifact, CommitAuthor, ContentEntry, EntryKind, Issue, PullRequest, RepositoryInfo,
    WorkflowRun,
};
pub use remote::{RemoteRepository, RemoteResult};
pub use snapshot::RepositorySnapshot;
