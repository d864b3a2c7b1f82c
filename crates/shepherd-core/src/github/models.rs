//! Typed models for GitHub API responses.
//!
//! Loosely structured remote JSON is mapped into these shapes at the
//! gateway boundary, immediately on receipt; no untyped maps propagate past
//! the client. Wire structs (private, `Deserialize`) mirror GitHub's field
//! names; the public result structs carry only what callers consume.

use serde::{Deserialize, Serialize};

/// Length of the body snippet attached to search hits.
const SNIPPET_LENGTH: usize = 200;

#[derive(Debug, Deserialize)]
pub(crate) struct LabelWire {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserWire {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MilestoneWire {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LicenseWire {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchIssuesWire {
    #[serde(default)]
    pub items: Vec<IssueWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchReposWire {
    #[serde(default)]
    pub items: Vec<RepoWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueWire {
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<LabelWire>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assignees: Vec<UserWire>,
    #[serde(default)]
    pub milestone: Option<MilestoneWire>,
    #[serde(default)]
    pub user: Option<UserWire>,
}

fn default_state() -> String {
    "open".to_string()
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentWire {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub user: Option<UserWire>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoWire {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<LicenseWire>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub ssh_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPrWire {
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedForkWire {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub ssh_url: String,
}

/// Body shape of GitHub error responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// One issue from a search, trimmed to what discovery needs.
#[derive(Debug, Clone, Serialize)]
pub struct IssueHit {
    /// Repository in `owner/repo` form, derived from the repository URL.
    pub repo: String,
    /// Issue number.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Issue web URL.
    pub url: String,
    /// Label names.
    pub labels: Vec<String>,
    /// Comment count.
    pub comments: u64,
    /// Creation timestamp (RFC3339 string, as GitHub sends it).
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
    /// Truncated body snippet.
    pub snippet: String,
    /// Issue state.
    pub state: String,
    /// Full body, kept for scoring; not serialized.
    #[serde(skip)]
    pub body: String,
}

impl IssueHit {
    pub(crate) fn from_wire(wire: IssueWire) -> Self {
        let repo = wire
            .repository_url
            .split_once("/repos/")
            .map(|(_, tail)| tail.to_string())
            .unwrap_or_default();
        let body = wire.body.unwrap_or_default();
        Self {
            repo,
            number: wire.number,
            title: wire.title,
            url: wire.html_url,
            labels: wire.labels.into_iter().map(|label| label.name).collect(),
            comments: wire.comments,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            snippet: snippet(&body),
            state: wire.state,
            body,
        }
    }
}

/// Full detail for one issue.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    /// Issue number.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Full issue body.
    pub body: String,
    /// Issue web URL.
    pub url: String,
    /// Issue state.
    pub state: String,
    /// Label names.
    pub labels: Vec<String>,
    /// Assignee logins.
    pub assignees: Vec<String>,
    /// Milestone title, when set.
    pub milestone: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
    /// Close timestamp, when closed.
    pub closed_at: Option<String>,
    /// Author login.
    pub author: String,
    /// Comment count.
    pub comments_count: u64,
}

impl IssueDetail {
    pub(crate) fn from_wire(wire: IssueWire) -> Self {
        Self {
            number: wire.number,
            title: wire.title,
            body: wire.body.unwrap_or_default(),
            url: wire.html_url,
            state: wire.state,
            labels: wire.labels.into_iter().map(|label| label.name).collect(),
            assignees: wire
                .assignees
                .into_iter()
                .map(|user| user.login)
                .collect(),
            milestone: wire.milestone.map(|milestone| milestone.title),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            closed_at: wire.closed_at,
            author: wire.user.unwrap_or_default().login,
            comments_count: wire.comments,
        }
    }
}

/// One issue comment.
#[derive(Debug, Clone, Serialize)]
pub struct IssueComment {
    /// Comment identifier.
    pub id: u64,
    /// Author login.
    pub author: String,
    /// Comment body.
    pub body: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
    /// Comment web URL.
    pub url: String,
}

impl IssueComment {
    pub(crate) fn from_wire(wire: CommentWire) -> Self {
        Self {
            id: wire.id,
            author: wire.user.unwrap_or_default().login,
            body: wire.body,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            url: wire.html_url,
        }
    }
}

/// Repository metadata, the context a caller wants before cloning.
#[derive(Debug, Clone, Serialize)]
pub struct RepoMetadata {
    /// Short name.
    pub name: String,
    /// `owner/repo`.
    pub full_name: String,
    /// Description, when set.
    pub description: Option<String>,
    /// Default branch.
    pub default_branch: String,
    /// Primary language.
    pub language: Option<String>,
    /// License name, when declared.
    pub license: Option<String>,
    /// Star count.
    pub stars: u64,
    /// Fork count.
    pub forks: u64,
    /// Open issue count.
    pub open_issues: u64,
    /// HTTPS clone URL.
    pub clone_url: String,
    /// SSH clone URL.
    pub ssh_url: String,
    /// Topic names.
    pub topics: Vec<String>,
    /// Homepage, when set.
    pub homepage: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
}

impl RepoMetadata {
    pub(crate) fn from_wire(wire: RepoWire) -> Self {
        Self {
            name: wire.name,
            full_name: wire.full_name,
            description: wire.description,
            default_branch: wire.default_branch,
            language: wire.language,
            license: wire.license.map(|license| license.name),
            stars: wire.stargazers_count,
            forks: wire.forks_count,
            open_issues: wire.open_issues_count,
            clone_url: wire.clone_url,
            ssh_url: wire.ssh_url,
            topics: wire.topics,
            homepage: wire.homepage,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

/// One repository from popularity discovery.
#[derive(Debug, Clone, Serialize)]
pub struct RepoHit {
    /// `owner/repo`.
    pub full_name: String,
    /// Description, when set.
    pub description: Option<String>,
    /// Star count.
    pub stars: u64,
    /// Primary language.
    pub language: Option<String>,
    /// Open issue count.
    pub open_issues: u64,
    /// Repository web URL.
    pub url: String,
}

impl RepoHit {
    pub(crate) fn from_wire(wire: RepoWire) -> Self {
        Self {
            full_name: wire.full_name,
            description: wire.description,
            stars: wire.stargazers_count,
            language: wire.language,
            open_issues: wire.open_issues_count,
            url: wire.html_url,
        }
    }
}

/// A freshly created pull request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPr {
    /// Pull request web URL.
    pub pr_url: String,
    /// Pull request number.
    pub pr_number: u64,
}

/// A freshly created fork.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedFork {
    /// `owner/repo` of the fork.
    pub fork_full_name: String,
    /// HTTPS clone URL of the fork.
    pub clone_url: String,
    /// SSH clone URL of the fork.
    pub ssh_url: String,
}

/// Body posted to create a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    /// Pull request title.
    pub title: String,
    /// Branch with the changes, `branch` or `owner:branch` for forks.
    pub head: String,
    /// Branch to merge into.
    pub base: String,
    /// Pull request description.
    pub body: String,
    /// Open as a draft.
    pub draft: bool,
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "(No description)".to_string();
    }
    if body.chars().count() <= SNIPPET_LENGTH {
        return body.to_string();
    }
    let truncated: String = body.chars().take(SNIPPET_LENGTH).collect();
    format!("{truncated}...")
}
