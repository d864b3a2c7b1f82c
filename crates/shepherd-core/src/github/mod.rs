//! Authenticated, rate-limit-aware GitHub API gateway.
//!
//! One [`GitHubClient`] per configuration; every request carries the pinned
//! API version headers and, when a credential is configured, a bearer
//! authorization. Absence of a credential is not an error; requests fall
//! back to anonymous, lower-rate-limit access.
//!
//! Rate-limit headers are inspected on every response. Exhaustion (429, or
//! 403 with a rate-limit body message) surfaces immediately as
//! [`ApiError::RateLimited`]; it is never absorbed or retried here; the
//! caller decides what to do with it.

mod error;
pub mod models;
pub mod query;

use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

pub use error::ApiError;
use models::{
    ApiErrorBody, CommentWire, CreatedForkWire, CreatedPrWire, IssueWire, SearchIssuesWire,
    SearchReposWire,
};
pub use models::{
    CreatedFork, CreatedPr, IssueComment, IssueDetail, IssueHit, NewPullRequest, RepoHit,
    RepoMetadata,
};

use crate::config::ShepherdConfig;

/// GitHub's documented per-page maximum; larger requests are clamped, not
/// silently ignored by the remote.
const MAX_PAGE_SIZE: u64 = 100;

/// Pinned REST API version.
const API_VERSION: &str = "2022-11-28";

/// Accept header for the REST API.
const ACCEPT: &str = "application/vnd.github+json";

/// Connect timeout for the underlying HTTP client.
const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Rate-limit state derived from one response's headers. Never persisted;
/// each response is evaluated independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitSnapshot {
    /// Request budget for the current window.
    pub limit: Option<u64>,
    /// Requests remaining in the current window.
    pub remaining: Option<u64>,
    /// Unix epoch at which the window resets.
    pub reset: Option<u64>,
}

impl RateLimitSnapshot {
    /// Extracts the snapshot from response headers; absent or malformed
    /// headers yield `None` fields.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
        };
        Self {
            limit: parse("x-ratelimit-limit"),
            remaining: parse("x-ratelimit-remaining"),
            reset: parse("x-ratelimit-reset"),
        }
    }

    /// Returns `true` when less than 10% of the budget remains.
    #[must_use]
    pub fn is_low(&self) -> bool {
        match (self.limit, self.remaining) {
            (Some(limit), Some(remaining)) if limit > 0 => remaining * 10 < limit,
            _ => false,
        }
    }

    fn warn_when_low(&self) {
        if self.is_low() {
            warn!(
                remaining = self.remaining,
                limit = self.limit,
                reset = self.reset,
                "GitHub rate limit budget is running low"
            );
        }
    }
}

/// Maps a non-success response onto the failure taxonomy.
///
/// Kept free of I/O so the classification rules are directly testable.
fn classify_failure(status: u16, snapshot: &RateLimitSnapshot, body: &ApiErrorBody) -> ApiError {
    let rate_limited =
        status == 429 || (status == 403 && body.message.to_lowercase().contains("rate limit"));
    if rate_limited {
        return ApiError::RateLimited {
            resets_at: snapshot.reset,
            remaining: snapshot.remaining.unwrap_or(0),
        };
    }
    match status {
        403 => ApiError::Forbidden {
            message: body.message.clone(),
        },
        404 => ApiError::NotFound {
            resource: "requested resource".to_string(),
        },
        422 => ApiError::Unprocessable {
            message: body.message.clone(),
            errors: body.errors.clone(),
        },
        _ => ApiError::Status {
            status,
            message: body.message.clone(),
        },
    }
}

/// The GitHub API gateway.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl GitHubClient {
    /// Builds a client from the startup configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be
    /// initialized.
    pub fn new(config: &ShepherdConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|error| ApiError::Transport {
                message: error.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Returns `true` when a credential is configured.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Builds a request with the pinned API headers and the ambient
    /// credential, when one is configured.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.request_unauthenticated(method, path);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Builds a request with the pinned API headers only; used by the write
    /// endpoints, which attach an explicitly resolved credential instead.
    fn request_unauthenticated(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Inspects rate-limit headers and converts non-success statuses into
    /// typed errors. Callers handle endpoint-specific statuses first.
    async fn check(&self, response: Response) -> Result<Response, ApiError> {
        let snapshot = RateLimitSnapshot::from_headers(response.headers());
        snapshot.warn_when_low();

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &snapshot, &body))
    }

    /// Searches issues with a prebuilt query string.
    ///
    /// `limit` is clamped to GitHub's documented page maximum.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the gateway taxonomy.
    pub async fn search_issues(
        &self,
        query: &str,
        sort: &str,
        limit: u64,
    ) -> Result<Vec<IssueHit>, ApiError> {
        let per_page = limit.min(MAX_PAGE_SIZE).to_string();
        debug!(query, sort, %per_page, "searching issues");
        let response = self
            .request(Method::GET, "/search/issues")
            .query(&[("q", query), ("sort", sort), ("per_page", per_page.as_str())])
            .send()
            .await?;
        let response = self.check(response).await?;
        let wire: SearchIssuesWire = response.json().await.map_err(ApiError::from)?;
        Ok(wire
            .items
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(IssueHit::from_wire)
            .collect())
    }

    /// Fetches one issue.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] on 404, the gateway taxonomy
    /// otherwise.
    pub async fn issue(&self, repo: &str, number: u64) -> Result<IssueDetail, ApiError> {
        let response = self
            .request(Method::GET, &format!("/repos/{repo}/issues/{number}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: format!("issue #{number} in repository {repo}"),
            });
        }
        let response = self.check(response).await?;
        let wire: IssueWire = response.json().await.map_err(ApiError::from)?;
        Ok(IssueDetail::from_wire(wire))
    }

    /// Fetches recent comments for an issue.
    ///
    /// A 404 on this sub-resource means the item legitimately has no
    /// comments (a just-created issue, an edge case) and degrades to an
    /// empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for non-404 failures.
    pub async fn issue_comments(
        &self,
        repo: &str,
        number: u64,
        max_comments: u64,
    ) -> Result<Vec<IssueComment>, ApiError> {
        let per_page = max_comments.min(MAX_PAGE_SIZE).to_string();
        let response = self
            .request(Method::GET, &format!("/repos/{repo}/issues/{number}/comments"))
            .query(&[
                ("per_page", per_page.as_str()),
                ("sort", "created"),
                ("direction", "desc"),
            ])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(repo, number, "comments endpoint returned 404, treating as empty");
            return Ok(Vec::new());
        }
        let response = self.check(response).await?;
        let wire: Vec<CommentWire> = response.json().await.map_err(ApiError::from)?;
        Ok(wire
            .into_iter()
            .take(usize::try_from(max_comments).unwrap_or(usize::MAX))
            .map(IssueComment::from_wire)
            .collect())
    }

    /// Fetches repository metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] on 404, the gateway taxonomy
    /// otherwise.
    pub async fn repository(&self, repo: &str) -> Result<RepoMetadata, ApiError> {
        let response = self
            .request(Method::GET, &format!("/repos/{repo}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: format!("repository {repo}"),
            });
        }
        let response = self.check(response).await?;
        let wire: models::RepoWire = response.json().await.map_err(ApiError::from)?;
        Ok(RepoMetadata::from_wire(wire))
    }

    /// Searches repositories by popularity (stars, descending).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the gateway taxonomy.
    pub async fn search_repositories(
        &self,
        query: &str,
        limit: u64,
    ) -> Result<Vec<RepoHit>, ApiError> {
        let per_page = limit.min(MAX_PAGE_SIZE).to_string();
        debug!(query, %per_page, "searching repositories");
        let response = self
            .request(Method::GET, "/search/repositories")
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;
        let response = self.check(response).await?;
        let wire: SearchReposWire = response.json().await.map_err(ApiError::from)?;
        Ok(wire
            .items
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(RepoHit::from_wire)
            .collect())
    }

    /// Creates a pull request with an explicit credential.
    ///
    /// # Errors
    ///
    /// 422 maps to [`ApiError::Unprocessable`] with the remote validation
    /// list preserved; everything else follows the gateway taxonomy.
    pub async fn create_pull_request(
        &self,
        token: &SecretString,
        repo: &str,
        new_pr: &NewPullRequest,
    ) -> Result<CreatedPr, ApiError> {
        let response = self
            .request_unauthenticated(Method::POST, &format!("/repos/{repo}/pulls"))
            .bearer_auth(token.expose_secret())
            .json(new_pr)
            .send()
            .await?;
        let response = self.check(response).await?;
        let wire: CreatedPrWire = response.json().await.map_err(ApiError::from)?;
        Ok(CreatedPr {
            pr_url: wire.html_url,
            pr_number: wire.number,
        })
    }

    /// Forks a repository with an explicit credential. POST with no body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the gateway taxonomy; a non-rate-limit 403
    /// surfaces as [`ApiError::Forbidden`].
    pub async fn fork(
        &self,
        token: &SecretString,
        repo: &str,
    ) -> Result<CreatedFork, ApiError> {
        let response = self
            .request_unauthenticated(Method::POST, &format!("/repos/{repo}/forks"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        let response = self.check(response).await?;
        let wire: CreatedForkWire = response.json().await.map_err(ApiError::from)?;
        Ok(CreatedFork {
            fork_full_name: wire.full_name,
            clone_url: wire.clone_url,
            ssh_url: wire.ssh_url,
        })
    }
}
