//! GitHub REST client for commit statuses and releases.

use async_trait::async_trait;
use carto_ci_core::release::{Artifact, Release, ReleasePublisher, ReleaseRequest};
use carto_ci_core::status::{CommitState, CommitStatus, StatusHandle, StatusReporter, TerminalState};
use carto_ci_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub truncates longer status descriptions with an error.
const MAX_DESCRIPTION_CHARS: usize = 140;

/// GitHub API access settings.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub api_url: String,
}

impl GitHubConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// GitHub API client.
pub struct GitHubClient {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("User-Agent", "carto-ci")
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Create or replace the status for `status.context` on a commit.
    pub async fn create_commit_status(&self, status: &CommitStatus) -> std::result::Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/statuses/{}",
            self.config.api_url, status.repository, status.commit
        );

        let payload = serde_json::json!({
            "state": status.state,
            "context": status.context,
            "description": truncate_description(&status.description),
        });

        debug!(context = %status.context, state = %status.state, "Posting commit status");
        let response = self
            .request(Method::POST, &url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        check_status(response, "create commit status").await?;
        Ok(())
    }

    /// Create a release.
    pub async fn create_release_record(
        &self,
        repository: &str,
        request: &ReleaseRequest,
    ) -> std::result::Result<Release, GitHubError> {
        let url = format!("{}/repos/{}/releases", self.config.api_url, repository);

        let payload = serde_json::json!({
            "tag_name": request.tag,
            "name": request.name,
            "draft": request.draft,
        });

        let response = self
            .request(Method::POST, &url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        let created: ReleaseResponse = check_status(response, "create release")
            .await?
            .json()
            .await
            .map_err(|e| GitHubError::Parse(e.to_string()))?;

        info!(repo = %repository, tag = %created.tag_name, release_id = created.id, "Created release");

        Ok(Release {
            id: created.id,
            repository: repository.to_string(),
            tag: created.tag_name,
            name: created.name.unwrap_or_else(|| request.name.clone()),
            draft: created.draft,
            upload_url: strip_url_template(&created.upload_url),
        })
    }

    /// Upload one asset to a release.
    pub async fn upload_release_asset(
        &self,
        release: &Release,
        artifact: Artifact,
    ) -> std::result::Result<(), GitHubError> {
        let url = format!(
            "{}?name={}",
            release.upload_url,
            urlencoding::encode(&artifact.name)
        );
        let size = artifact.content.len();

        let response = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, artifact.content_type)
            .body(artifact.content)
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        check_status(response, "upload release asset").await?;
        info!(tag = %release.tag, asset = %artifact.name, size, "Uploaded release asset");
        Ok(())
    }
}

#[async_trait]
impl StatusReporter for GitHubClient {
    async fn open(&self, repository: &str, commit: &str, context: &str) -> Result<StatusHandle> {
        let status = CommitStatus {
            repository: repository.to_string(),
            commit: commit.to_string(),
            context: context.to_string(),
            state: CommitState::Pending,
            description: "Build pending".to_string(),
        };
        self.create_commit_status(&status)
            .await
            .map_err(|e| Error::StatusFailed(e.to_string()))?;
        Ok(StatusHandle::new(repository, commit, context))
    }

    async fn close(
        &self,
        handle: StatusHandle,
        state: TerminalState,
        description: &str,
    ) -> Result<()> {
        let status = handle.into_status(state, description);
        self.create_commit_status(&status)
            .await
            .map_err(|e| Error::StatusFailed(e.to_string()))
    }
}

#[async_trait]
impl ReleasePublisher for GitHubClient {
    async fn create_release(&self, repository: &str, request: &ReleaseRequest) -> Result<Release> {
        self.create_release_record(repository, request)
            .await
            .map_err(|e| Error::PublishFailed(e.to_string()))
    }

    async fn upload_artifact(&self, release: &Release, artifact: Artifact) -> Result<()> {
        self.upload_release_asset(release, artifact)
            .await
            .map_err(|e| Error::PublishFailed(e.to_string()))
    }
}

async fn check_status(
    response: reqwest::Response,
    action: &str,
) -> std::result::Result<reqwest::Response, GitHubError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(GitHubError::Api(format!(
        "Failed to {} ({}): {}",
        action, status, text
    )))
}

/// `upload_url` comes back as an RFC 6570 template: `.../assets{?name,label}`.
fn strip_url_template(url: &str) -> String {
    match url.find('{') {
        Some(idx) => url[..idx].to_string(),
        None => url.to_string(),
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_CHARS {
        return description.to_string();
    }
    let mut truncated: String = description.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    name: Option<String>,
    draft: bool,
    upload_url: String,
}

/// GitHub API errors.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
