//! Wire shapes of the GitHub REST responses the client reads, and their
//! mapping onto the snapshot model.

use autocoder_snapshot::{
    Artifact, CommitAuthor, ContentEntry, EntryKind, Issue, PullRequest, RemoteError,
    RepositoryInfo, WorkflowRun,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RepoDto {
    full_name: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    default_branch: String,
}

impl From<RepoDto> for RepositoryInfo {
    fn from(dto: RepoDto) -> Self {
        RepositoryInfo {
            full_name: dto.full_name,
            private: dto.private,
            default_branch: dto.default_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentDto {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    content: Option<String>,
    encoding: Option<String>,
}

/// `contents/{path}` answers with a list for directories and an object for
/// files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentsDto {
    Listing(Vec<ContentDto>),
    Single(ContentDto),
}

impl ContentDto {
    fn entry(&self) -> ContentEntry {
        let kind = match self.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            _ => EntryKind::Other,
        };
        ContentEntry {
            path: self.path.clone(),
            kind,
        }
    }

    /// Decoded file bytes. The platform wraps base64 content at 60 columns.
    pub(crate) fn decode(self) -> Result<Vec<u8>, RemoteError> {
        let content = self.content.unwrap_or_default();
        match self.encoding.as_deref() {
            Some("base64") => {
                let compact: String = content.split_whitespace().collect();
                STANDARD
                    .decode(compact)
                    .map_err(|e| RemoteError::Decode(format!("{}: {e}", self.path)))
            }
            Some("none") | None if content.is_empty() => Err(RemoteError::Decode(format!(
                "{}: content not inlined (file too large)",
                self.path
            ))),
            _ => Ok(content.into_bytes()),
        }
    }
}

impl ContentsDto {
    pub(crate) fn entries(&self) -> Vec<ContentEntry> {
        match self {
            ContentsDto::Listing(items) => items.iter().map(ContentDto::entry).collect(),
            ContentsDto::Single(item) => vec![item.entry()],
        }
    }

    pub(crate) fn into_file(self, path: &str) -> Result<Vec<u8>, RemoteError> {
        match self {
            ContentsDto::Single(item) if item.kind == "file" => item.decode(),
            _ => Err(RemoteError::Decode(format!("{path} is not a file"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LabelDto {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserDto {
    login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueDto {
    number: u64,
    #[serde(default)]
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<LabelDto>,
    pull_request: Option<serde_json::Value>,
}

impl From<IssueDto> for Issue {
    fn from(dto: IssueDto) -> Self {
        Issue {
            number: dto.number,
            title: dto.title,
            body: dto.body,
            labels: dto.labels.into_iter().map(|l| l.name).collect(),
            is_pull_request: dto.pull_request.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeadDto {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullDto {
    number: u64,
    #[serde(default)]
    title: String,
    head: HeadDto,
    user: Option<UserDto>,
    #[serde(default)]
    labels: Vec<LabelDto>,
    created_at: DateTime<Utc>,
}

impl From<PullDto> for PullRequest {
    fn from(dto: PullDto) -> Self {
        PullRequest {
            number: dto.number,
            title: dto.title,
            head_ref: dto.head.ref_name,
            author_login: dto.user.unwrap_or_default().login,
            labels: dto.labels.into_iter().map(|l| l.name).collect(),
            created_at: dto.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullDetailDto {
    pub(crate) mergeable_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GitAuthorDto {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct GitCommitDto {
    author: Option<GitAuthorDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDto {
    sha: String,
    commit: GitCommitDto,
}

impl From<CommitDto> for CommitAuthor {
    fn from(dto: CommitDto) -> Self {
        let author = dto.commit.author.unwrap_or_default();
        CommitAuthor {
            sha: dto.sha,
            name: author.name,
            email: author.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunDto {
    id: u64,
    event: String,
    conclusion: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunsDto {
    workflow_runs: Vec<RunDto>,
}

impl RunsDto {
    pub(crate) fn into_runs(self) -> Vec<WorkflowRun> {
        self.workflow_runs
            .into_iter()
            .map(|run| WorkflowRun {
                id: run.id,
                event: run.event,
                conclusion: run.conclusion,
                created_at: run.created_at,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactDto {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtifactsDto {
    artifacts: Vec<ArtifactDto>,
}

impl ArtifactsDto {
    pub(crate) fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
            .into_iter()
            .map(|a| Artifact { name: a.name })
            .collect()
    }
}

/// Error body: `{"message": "...", "documentation_url": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBodyDto {
    pub(crate) message: String,
}
