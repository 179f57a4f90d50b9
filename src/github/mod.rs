pub mod types;

pub use types::{FileChange, PullRequestRef};

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::GitHubConfig;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),
}

/// Client for the two GitHub REST calls the service makes: listing a pull
/// request's changed files and posting the review comment.
///
/// The base URL is taken from configuration so tests can point the client at
/// a local double.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    retries: u32,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig, token: String) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            retries: config.retries,
        })
    }

    /// Fetch the changed files of a pull request, in the order the API
    /// returns them.
    ///
    /// Only the first page is requested (`per_page=100`); a pull request
    /// with more changed files than that is reviewed from a truncated list.
    ///
    /// Transient failures are retried up to the configured budget
    /// (default zero).
    #[instrument(skip(self, pr), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    pub async fn list_changed_files(
        &self,
        pr: &PullRequestRef,
    ) -> Result<Vec<FileChange>, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/files?per_page=100",
            self.api_url, pr.owner, pr.repo, pr.number
        );

        let mut attempt = 0;
        loop {
            match self.try_list_changed_files(&url).await {
                Ok(files) => {
                    debug!(files = files.len(), "fetched changed files");
                    return Ok(files);
                }
                Err(err) if attempt < self.retries && is_retryable(&err) => {
                    attempt += 1;
                    warn!(attempt, error = %err, "retrying changed-files fetch");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn try_list_changed_files(&self, url: &str) -> Result<Vec<FileChange>, reqwest::Error> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", "pr-review-bot")
            .header("Accept", "application/vnd.github.v3+json")
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        response.json::<Vec<FileChange>>().await
    }

    /// Post the review text as a comment on the pull request. Pull requests
    /// are commented on through the issues endpoint.
    ///
    /// Exactly one attempt is made per call; a failed post is surfaced to
    /// the caller rather than retried, so a delivery can never produce two
    /// comments.
    #[instrument(skip(self, pr, body), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    pub async fn post_issue_comment(
        &self,
        pr: &PullRequestRef,
        body: &str,
    ) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, pr.owner, pr.repo, pr.number
        );
        self.http
            .post(&url)
            .header("User-Agent", "pr-review-bot")
            .header("Accept", "application/vnd.github.v3+json")
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        debug!("review comment posted");
        Ok(())
    }
}

/// Transport failures and 5xx statuses qualify for a retry; 4xx responses
/// do not.
fn is_retryable(err: &reqwest::Error) -> bool {
    match err.status() {
        Some(status) => status.is_server_error(),
        None => err.is_timeout() || err.is_connect(),
    }
}
