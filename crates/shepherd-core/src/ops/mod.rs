//! Thin per-operation glue: parameter validation, delegation, and envelope
//! formatting.
//!
//! Each function here is one externally visible operation. Input validation
//! happens first and fails fast with `VALIDATION_ERROR` before any external
//! action; everything after delegates to the gateway, the git executor, or
//! the safety gate and wraps the typed result into an [`Envelope`].

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::envelope::{Envelope, ErrorKind};
use crate::fsgate::{self, ValidationOutcome};
use crate::git::{CloneOutcome, CloneRequest, GitOps, RepoStatus};
use crate::github::query::{self, SearchFilters, SearchMode};
use crate::github::{GitHubClient, IssueComment, IssueDetail, IssueHit, RepoHit, RepoMetadata};

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u64 = 10;

/// Hard cap on search results per call.
pub const MAX_SEARCH_LIMIT: u64 = 30;

/// Default number of comments fetched with an issue.
pub const DEFAULT_MAX_COMMENTS: u64 = 10;

/// One search result with its match explanation.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredIssue {
    /// The issue.
    #[serde(flatten)]
    pub issue: IssueHit,
    /// Why this issue matched the filters.
    pub score_reason: Vec<String>,
}

/// Search operation result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Scored results.
    pub results: Vec<ScoredIssue>,
    /// The query string that was sent to GitHub.
    pub query: String,
    /// Number of results returned.
    pub total_found: usize,
}

/// Issue-details operation result.
#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    /// The issue.
    #[serde(flatten)]
    pub issue: IssueDetail,
    /// Recent comments, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<IssueComment>>,
}

/// Popularity-discovery operation result.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoverReport {
    /// Repositories, most-starred first.
    pub results: Vec<RepoHit>,
    /// The query string that was sent to GitHub.
    pub query: String,
    /// Number of results returned.
    pub total_found: usize,
}

fn valid_repo(repo: &str) -> bool {
    !repo.trim().is_empty() && repo.contains('/')
}

/// Searches for issues matching the structured filters.
pub async fn search_issues(
    client: &GitHubClient,
    filters: SearchFilters,
    sort: &str,
    limit: u64,
) -> Envelope<SearchReport> {
    if filters.mode == SearchMode::Repo {
        match filters.repo.as_deref() {
            None => {
                return Envelope::failure(
                    ErrorKind::ValidationError,
                    "repo is required when mode='repo'",
                );
            },
            Some(repo) if !valid_repo(repo) => {
                return Envelope::failure(
                    ErrorKind::ValidationError,
                    "repo must be in 'owner/repo' format",
                );
            },
            Some(_) => {},
        }
    }

    let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
    let query = query::build_search_query(&filters);
    debug!(%query, limit, "issue search");

    match client.search_issues(&query, sort, limit).await {
        Ok(hits) => {
            let results: Vec<ScoredIssue> = hits
                .into_iter()
                .map(|issue| ScoredIssue {
                    score_reason: query::score_hit(&issue, &filters),
                    issue,
                })
                .collect();
            let total_found = results.len();
            Envelope::success(SearchReport {
                results,
                query,
                total_found,
            })
        },
        Err(error) => Err::<SearchReport, _>(error).into(),
    }
}

/// Fetches one issue, optionally with its recent comments.
pub async fn issue_details(
    client: &GitHubClient,
    repo: &str,
    number: u64,
    include_comments: bool,
    max_comments: u64,
) -> Envelope<IssueReport> {
    if !valid_repo(repo) {
        return Envelope::failure(
            ErrorKind::ValidationError,
            "repo must be in 'owner/repo' format",
        );
    }
    if number == 0 {
        return Envelope::failure(ErrorKind::ValidationError, "number must be greater than 0");
    }

    let issue = match client.issue(repo, number).await {
        Ok(issue) => issue,
        Err(error) => return Err::<IssueReport, _>(error).into(),
    };

    let comments = if include_comments && max_comments > 0 {
        match client.issue_comments(repo, number, max_comments).await {
            Ok(comments) => Some(comments),
            Err(error) => return Err::<IssueReport, _>(error).into(),
        }
    } else {
        None
    };

    Envelope::success(IssueReport { issue, comments })
}

/// Fetches repository metadata.
pub async fn repo_metadata(client: &GitHubClient, repo: &str) -> Envelope<RepoMetadata> {
    if !valid_repo(repo) {
        return Envelope::failure(
            ErrorKind::ValidationError,
            "repo must be in 'owner/repo' format",
        );
    }
    client.repository(repo).await.into()
}

/// Discovers popular repositories by topic keywords and language.
pub async fn discover_repositories(
    client: &GitHubClient,
    keywords: &[String],
    language: Option<&str>,
    limit: u64,
) -> Envelope<DiscoverReport> {
    if keywords.is_empty() && language.is_none() {
        return Envelope::failure(
            ErrorKind::ValidationError,
            "at least one keyword or a language is required",
        );
    }

    let mut parts: Vec<String> = keywords.to_vec();
    if let Some(language) = language {
        parts.push(format!("language:{language}"));
    }
    let query = parts.join(" ");
    let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

    match client.search_repositories(&query, limit).await {
        Ok(results) => {
            let total_found = results.len();
            Envelope::success(DiscoverReport {
                results,
                query,
                total_found,
            })
        },
        Err(error) => Err::<DiscoverReport, _>(error).into(),
    }
}

/// Validates a target directory ahead of a clone.
pub fn prepare_clone(target_path: &str, must_be_empty: bool) -> Envelope<ValidationOutcome> {
    fsgate::prepare(target_path, must_be_empty).into()
}

/// Clones a repository into a validated directory.
pub async fn clone_repo(git: &GitOps, request: CloneRequest) -> Envelope<CloneOutcome> {
    if !valid_repo(&request.repo) {
        return Envelope::failure(
            ErrorKind::ValidationError,
            "repo must be in 'owner/repo' format",
        );
    }
    git.clone(&request).await.into()
}

/// Reports branch and working-tree state for a local repository.
pub async fn repo_status(git: &GitOps, repo_path: &str) -> Envelope<RepoStatus> {
    git.status(Path::new(repo_path)).await.into()
}
