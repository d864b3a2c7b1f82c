//! Fork and pull-request automation.
//!
//! These orchestrators compose credential resolution, input validation, and
//! the gateway into single-attempt operations. No retries: fork and PR
//! creation are not idempotent, so a failed attempt is surfaced to the
//! caller untouched.

pub mod guidance;

use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::ShepherdConfig;
use crate::envelope::{ErrorKind, ErrorRecord, IntoRecord};
use crate::github::{ApiError, GitHubClient, NewPullRequest};

/// Documentation pointer included with credential errors.
const TOKEN_DOCS: &str =
    "https://docs.github.com/en/authentication/keeping-your-account-and-data-secure/creating-a-personal-access-token";

/// Parameters for automated pull-request creation.
#[derive(Debug, Clone)]
pub struct PrRequest {
    /// Repository in `owner/repo` form.
    pub repo: String,
    /// Branch with the changes, `branch` or `owner:branch` for forks.
    pub head: String,
    /// Branch to merge into.
    pub base: String,
    /// Pull request title.
    pub title: String,
    /// Pull request description.
    pub body: String,
    /// Open as a draft.
    pub draft: bool,
    /// Explicit credential; falls back to the configured one.
    pub token: Option<SecretString>,
}

/// Result of automated pull-request creation.
#[derive(Debug, Clone, Serialize)]
pub struct PrCreatedReport {
    /// Pull request web URL.
    pub pr_url: String,
    /// Pull request number.
    pub pr_number: u64,
    /// Confirmation line for the caller.
    pub message: String,
}

/// Result of automated forking.
#[derive(Debug, Clone, Serialize)]
pub struct ForkCreatedReport {
    /// `owner/repo` of the fork.
    pub fork_full_name: String,
    /// HTTPS clone URL of the fork.
    pub clone_url: String,
    /// SSH clone URL of the fork.
    pub ssh_url: String,
    /// Confirmation line for the caller.
    pub message: String,
}

/// Errors from fork/PR orchestration.
#[derive(Debug, Error)]
pub enum PrError {
    /// No credential supplied and none configured.
    #[error("GitHub token required for {action}")]
    MissingToken {
        /// The operation that needs the credential.
        action: &'static str,
    },

    /// A required field was empty.
    #[error("missing required parameters: {}", required.join(", "))]
    MissingFields {
        /// The fields that must be non-empty.
        required: Vec<&'static str>,
    },

    /// The repository identifier is not `owner/repo`.
    #[error("repository must be in 'owner/repo' format, got '{repo}'")]
    InvalidRepo {
        /// The identifier as supplied.
        repo: String,
    },

    /// Gateway failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl IntoRecord for PrError {
    fn into_record(self) -> ErrorRecord {
        let message = self.to_string();
        match self {
            Self::MissingToken { .. } => ErrorRecord::new(ErrorKind::ValidationError, message)
                .with_detail("documentation", TOKEN_DOCS)
                .with_hint("provide a token or set the GITHUB_TOKEN environment variable"),
            Self::MissingFields { required } => {
                ErrorRecord::new(ErrorKind::ValidationError, message)
                    .with_detail("required", required)
            },
            Self::InvalidRepo { .. } => ErrorRecord::new(ErrorKind::ValidationError, message),
            Self::Api(error) => error.into_record(),
        }
    }
}

fn resolve_token(
    explicit: Option<SecretString>,
    config: &ShepherdConfig,
    action: &'static str,
) -> Result<SecretString, PrError> {
    explicit
        .or_else(|| config.token.clone())
        .ok_or(PrError::MissingToken { action })
}

fn require_repo_format(repo: &str) -> Result<(), PrError> {
    if repo.contains('/') && !repo.trim().is_empty() {
        Ok(())
    } else {
        Err(PrError::InvalidRepo {
            repo: repo.to_string(),
        })
    }
}

/// Creates a pull request, resolving the credential before any HTTP call.
///
/// # Errors
///
/// Validation failures ([`PrError::MissingToken`], [`PrError::MissingFields`],
/// [`PrError::InvalidRepo`]) are returned before the gateway is touched;
/// gateway failures pass through with their own classification; a
/// rate-limit error stays a rate-limit error.
pub async fn create_pull_request_automated(
    client: &GitHubClient,
    config: &ShepherdConfig,
    request: PrRequest,
) -> Result<PrCreatedReport, PrError> {
    let token = resolve_token(request.token.clone(), config, "PR creation")?;

    let mut missing = Vec::new();
    for (name, value) in [
        ("repo", &request.repo),
        ("head", &request.head),
        ("base", &request.base),
        ("title", &request.title),
    ] {
        if value.trim().is_empty() {
            missing.push(name);
        }
    }
    if !missing.is_empty() {
        return Err(PrError::MissingFields { required: missing });
    }
    require_repo_format(&request.repo)?;

    let created = client
        .create_pull_request(
            &token,
            &request.repo,
            &NewPullRequest {
                title: request.title,
                head: request.head,
                base: request.base,
                body: request.body,
                draft: request.draft,
            },
        )
        .await?;

    info!(repo = %request.repo, number = created.pr_number, "pull request created");
    Ok(PrCreatedReport {
        message: format!("Pull request #{} created successfully", created.pr_number),
        pr_url: created.pr_url,
        pr_number: created.pr_number,
    })
}

/// Forks a repository, resolving the credential before any HTTP call.
///
/// # Errors
///
/// Same contract as [`create_pull_request_automated`].
pub async fn fork_repository_automated(
    client: &GitHubClient,
    config: &ShepherdConfig,
    repo: &str,
    token: Option<SecretString>,
) -> Result<ForkCreatedReport, PrError> {
    let token = resolve_token(token, config, "forking")?;
    require_repo_format(repo)?;

    let fork = client.fork(&token, repo).await?;

    info!(repo, fork = %fork.fork_full_name, "repository forked");
    Ok(ForkCreatedReport {
        message: format!("Repository forked successfully to {}", fork.fork_full_name),
        fork_full_name: fork.fork_full_name,
        clone_url: fork.clone_url,
        ssh_url: fork.ssh_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new(&ShepherdConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn pr_without_any_token_fails_before_http() {
        let config = ShepherdConfig::default();
        let error = create_pull_request_automated(
            &client(),
            &config,
            PrRequest {
                repo: "owner/repo".to_string(),
                head: "feature".to_string(),
                base: "main".to_string(),
                title: "Fix".to_string(),
                body: String::new(),
                draft: false,
                token: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, PrError::MissingToken { .. }));
        let record = error.into_record();
        assert_eq!(record.code, ErrorKind::ValidationError);
        assert!(record.details["hint"].as_str().unwrap().contains("GITHUB_TOKEN"));
    }

    #[tokio::test]
    async fn fork_without_any_token_fails_before_http() {
        let config = ShepherdConfig::default();
        let error = fork_repository_automated(&client(), &config, "owner/repo", None)
            .await
            .unwrap_err();
        assert!(matches!(error, PrError::MissingToken { .. }));
    }

    #[tokio::test]
    async fn empty_required_fields_are_listed() {
        let config = ShepherdConfig::default().with_token(SecretString::from("t0ken"));
        let error = create_pull_request_automated(
            &client(),
            &config,
            PrRequest {
                repo: "owner/repo".to_string(),
                head: String::new(),
                base: "main".to_string(),
                title: "  ".to_string(),
                body: String::new(),
                draft: false,
                token: None,
            },
        )
        .await
        .unwrap_err();

        match error {
            PrError::MissingFields { required } => {
                assert_eq!(required, vec!["head", "title"]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_repo_is_rejected_before_http() {
        let config = ShepherdConfig::default().with_token(SecretString::from("t0ken"));
        let error = fork_repository_automated(&client(), &config, "just-a-name", None)
            .await
            .unwrap_err();
        assert!(matches!(error, PrError::InvalidRepo { .. }));
    }

    #[test]
    fn token_resolution_prefers_the_explicit_value() {
        use secrecy::ExposeSecret;

        let config = ShepherdConfig::default().with_token(SecretString::from("ambient"));
        let token = resolve_token(Some(SecretString::from("explicit")), &config, "test").unwrap();
        assert_eq!(token.expose_secret(), "explicit");

        let token = resolve_token(None, &config, "test").unwrap();
        assert_eq!(token.expose_secret(), "ambient");
    }
}
