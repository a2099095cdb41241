//! GitHub REST client
//!
//! Read-only, one repository per client. Rate-limited responses (429, or 403
//! with an exhausted quota) are retried with exponential backoff; every other
//! failure is returned as-is for classification by the caller.

use std::time::Duration;

use async_trait::async_trait;
use autocoder_snapshot::{
    Artifact, CommitAuthor, ContentEntry, Issue, PullRequest, RemoteError, RemoteRepository,
    RemoteResult, RepositoryInfo, WorkflowRun,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::GithubConfig;
use crate::dto::*;

const PER_PAGE: usize = 100;
/// Upper bound on pages fetched from a paginated listing.
const MAX_PAGES: usize = 10;

/// GitHub client bound to one `owner/repo`.
pub struct GithubClient {
    config: GithubConfig,
    http: reqwest::Client,
    owner: String,
    repo: String,
}

impl GithubClient {
    /// Create a new client for `owner/repo`
    pub fn new(config: GithubConfig, owner: &str, repo: &str) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| RemoteError::Transport(format!("invalid token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        debug!(api_url = %config.api_url, owner, repo, "created GitHub client");
        Ok(GithubClient {
            config,
            http,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// `{api_url}/repos/{owner}/{repo}/{path}?{query}`
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> RemoteResult<Url> {
        let invalid = |detail: String| {
            RemoteError::Transport(format!("invalid API URL '{}': {detail}", self.config.api_url))
        };
        let mut url = Url::parse(&self.config.api_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> RemoteResult<T> {
        let response = self.send(&url).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(format!("{}: {e}", url.path())))
    }

    /// Follow `page` numbers until a short page or the page cap.
    async fn get_paged<T: DeserializeOwned>(&self, url: Url) -> RemoteResult<Vec<T>> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<T> = self.get_json(page_url).await?;
            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                return Ok(items);
            }
        }
        warn!(path = url.path(), max_pages = MAX_PAGES, "listing truncated at page cap");
        Ok(items)
    }

    async fn send(&self, url: &Url) -> RemoteResult<Response> {
        let mut attempt = 0;
        loop {
            debug!(path = url.path(), attempt, "GET");
            let response = self
                .http
                .get(url.clone())
                .send()
                .await
                .map_err(|e| request_error(url, e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry = is_rate_limited(&response) && attempt < self.config.max_retries;
            let retry_after = retry_after(&response);
            let error = error_from_response(response).await;
            if !retry {
                return Err(error);
            }

            let delay = self.config.backoff(attempt, retry_after);
            warn!(
                path = url.path(),
                status = status.as_u16(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "rate limited, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn request_error(url: &Url, err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout(format!("GET {}", url.path()))
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// 429, or 403 once the primary quota is exhausted or the server asks to
/// back off.
fn is_rate_limited(response: &Response) -> bool {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            let headers = response.headers();
            headers.contains_key(RETRY_AFTER)
                || headers
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    == Some("0")
        }
        _ => false,
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Parse an error response into a status error carrying the platform message.
async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorBodyDto>(&body)
            .map(|b| b.message)
            .unwrap_or(fallback),
        Err(_) => fallback,
    };
    RemoteError::status(status.as_u16(), message)
}

#[async_trait]
impl RemoteRepository for GithubClient {
    async fn get_repository(&self) -> RemoteResult<RepositoryInfo> {
        let dto: RepoDto = self.get_json(self.endpoint("", &[])?).await?;
        Ok(dto.into())
    }

    async fn list_contents(&self, path: &str) -> RemoteResult<Vec<ContentEntry>> {
        let dto: ContentsDto = self
            .get_json(self.endpoint(&format!("contents/{path}"), &[])?)
            .await?;
        Ok(dto.entries())
    }

    async fn get_file_content(&self, path: &str) -> RemoteResult<Vec<u8>> {
        let dto: ContentsDto = self
            .get_json(self.endpoint(&format!("contents/{path}"), &[])?)
            .await?;
        dto.into_file(path)
    }

    async fn list_open_issues(&self, label: Option<&str>) -> RemoteResult<Vec<Issue>> {
        let mut query = vec![("state", "open")];
        if let Some(label) = label {
            query.push(("labels", label));
        }
        let issues: Vec<IssueDto> = self.get_paged(self.endpoint("issues", &query)?).await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn list_open_pull_requests(&self) -> RemoteResult<Vec<PullRequest>> {
        let url = self.endpoint(
            "pulls",
            &[
                ("state", "open"),
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", "100"),
            ],
        )?;
        let pulls: Vec<PullDto> = self.get_json(url).await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    async fn get_mergeable_state(&self, number: u64) -> RemoteResult<Option<String>> {
        let dto: PullDetailDto = self
            .get_json(self.endpoint(&format!("pulls/{number}"), &[])?)
            .await?;
        Ok(dto.mergeable_state)
    }

    async fn list_pull_request_commits(&self, number: u64) -> RemoteResult<Vec<CommitAuthor>> {
        let commits: Vec<CommitDto> = self
            .get_paged(self.endpoint(&format!("pulls/{number}/commits"), &[])?)
            .await?;
        Ok(commits.into_iter().map(CommitAuthor::from).collect())
    }

    async fn list_workflow_runs(&self) -> RemoteResult<Vec<WorkflowRun>> {
        let dto: RunsDto = self.get_json(self.endpoint("actions/runs", &[])?).await?;
        Ok(dto.into_runs())
    }

    async fn list_artifacts(&self, run_id: u64) -> RemoteResult<Vec<Artifact>> {
        let dto: ArtifactsDto = self
            .get_json(self.endpoint(&format!("actions/runs/{run_id}/artifacts"), &[])?)
            .await?;
        Ok(dto.into_artifacts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> GithubClient {
        GithubClient::new(GithubConfig::new(api_url), "octo", "autocoder").unwrap()
    }

    #[test]
    fn test_endpoint_layout() {
        let c = client("https://api.github.com");
        assert_eq!(
            c.endpoint("", &[]).unwrap().as_str(),
            "https://api.github.com/repos/octo/autocoder"
        );
        assert_eq!(
            c.endpoint("contents/.github/workflows", &[]).unwrap().as_str(),
            "https://api.github.com/repos/octo/autocoder/contents/.github/workflows"
        );
    }

    #[test]
    fn test_endpoint_keeps_enterprise_prefix_and_encodes_query() {
        let c = client("https://ghe.example.com/api/v3/");
        let url = c
            .endpoint("issues", &[("state", "open"), ("labels", "needs review")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/autocoder/issues?state=open&labels=needs+review"
        );
    }

    #[test]
    fn test_invalid_api_url() {
        let c = client("not a url");
        assert!(matches!(c.endpoint("", &[]), Err(RemoteError::Transport(_))));
    }
}
