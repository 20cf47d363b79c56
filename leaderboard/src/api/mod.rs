use std::sync::Arc;

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;
use shared::{RawPullRequest, RepositoryStats};
use thiserror::Error;
use tracing::{instrument, warn};

pub use attendance::{attendance_source, FileAttendance, HttpAttendance};

pub mod attendance;
pub mod prometheus;

const RATE_LIMIT_STATUS: u16 = 403;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GitHub API rate limit exceeded")]
    RateLimited,
    #[error("received HTTP {0}")]
    Status(u16),
    #[error("response could not be decoded: {0}")]
    InvalidPayload(String),
    #[error("response was empty")]
    EmptyPayload,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn from_status(status: u16) -> Self {
        if status == RATE_LIMIT_STATUS {
            Self::RateLimited
        } else {
            Self::Status(status)
        }
    }
}

impl From<octocrab::Error> for FetchError {
    fn from(e: octocrab::Error) -> Self {
        match &e {
            octocrab::Error::GitHub { source, .. } => Self::from_status(source.status_code.as_u16()),
            _ => Self::Transport(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::from_status(status.as_u16()),
            None if e.is_decode() => Self::InvalidPayload(e.to_string()),
            None => Self::Transport(e.to_string()),
        }
    }
}

/// Paginated listing of a repository's pull requests.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn fetch_page(&self, page: u32, per_page: u8) -> Result<Vec<RawPullRequest>, FetchError>;

    /// Stars, forks and commit count of the repository, when the source knows them.
    async fn repository_stats(&self) -> Result<Option<RepositoryStats>, FetchError> {
        Ok(None)
    }

    /// Requests already spent from the current API quota, when the source has one.
    async fn rate_limit_used(&self) -> Result<Option<u64>, FetchError> {
        Ok(None)
    }
}

/// Raw attendance sheet.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn fetch_csv(&self) -> Result<String, FetchError>;
}

/// Decodes a page record by record, so one malformed pull request only costs itself.
fn decode_page(values: Vec<serde_json::Value>) -> Vec<RawPullRequest> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| {
            serde_json::from_value(value)
                .map_err(|e| warn!("Dropping undecodable pull request at position {position}: {e}"))
                .ok()
        })
        .collect()
}

#[derive(Serialize)]
struct PullsQuery {
    state: &'static str,
    per_page: u8,
    page: u32,
}

#[derive(Clone)]
pub struct GithubClient {
    octocrab: Octocrab,
    prometheus: Arc<prometheus::PrometheusClient>,
    pub owner: String,
    pub repo: String,
}

impl GithubClient {
    pub fn new(
        github_token: Option<String>,
        owner: String,
        repo: String,
        prometheus: Arc<prometheus::PrometheusClient>,
    ) -> anyhow::Result<Self> {
        let builder = Octocrab::builder();
        let octocrab = match github_token {
            Some(token) => builder.personal_token(token).build()?,
            None => builder.build()?,
        };

        Ok(Self {
            octocrab,
            prometheus,
            owner,
            repo,
        })
    }
}

#[async_trait]
impl PullRequestSource for GithubClient {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn fetch_page(&self, page: u32, per_page: u8) -> Result<Vec<RawPullRequest>, FetchError> {
        let route = format!("/repos/{}/{}/pulls", self.owner, self.repo);
        let query = PullsQuery {
            state: "all",
            per_page,
            page,
        };
        let result: Result<Vec<serde_json::Value>, _> =
            self.octocrab.get(route, Some(&query)).await;
        self.prometheus.add_page_request(result.is_ok());
        Ok(decode_page(result?))
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn repository_stats(&self) -> Result<Option<RepositoryStats>, FetchError> {
        let repos = self.octocrab.repos(&self.owner, &self.repo);
        let (repository, commits) =
            tokio::join!(repos.get(), repos.list_commits().per_page(1).send());
        let repository = repository?;

        // One commit per page, so the last page number is the commit count
        let commits = commits
            .map(|page| {
                page.number_of_pages()
                    .unwrap_or(page.items.len() as u32)
            })
            .map_err(|e| warn!("Failed to count commits: {e}"))
            .ok();

        Ok(Some(RepositoryStats {
            stars: repository.stargazers_count.unwrap_or_default(),
            forks: repository.forks_count.unwrap_or_default(),
            commits,
        }))
    }

    async fn rate_limit_used(&self) -> Result<Option<u64>, FetchError> {
        let rate_limit = self.octocrab.ratelimit().get().await?;
        Ok(Some(rate_limit.resources.core.used as u64))
    }
}
