//! GitHub search query construction and result scoring.

use serde::Deserialize;

use super::models::IssueHit;

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Search one repository.
    Repo,
    /// Search across GitHub.
    Global,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "repo" => Ok(Self::Repo),
            "global" => Ok(Self::Global),
            other => Err(format!("mode must be 'repo' or 'global', got '{other}'")),
        }
    }
}

/// Structured search filters, as supplied by the caller.
#[derive(Debug, Clone)]
pub struct SearchFilters {
    /// Search scope.
    pub mode: SearchMode,
    /// Repository for `repo` mode.
    pub repo: Option<String>,
    /// Skill keywords.
    pub skills: Vec<String>,
    /// Topic keywords.
    pub topics: Vec<String>,
    /// Language filter.
    pub language: Option<String>,
    /// Difficulty bucket: `good-first-issue`, `easy`, `medium`, `hard`.
    pub difficulty: Option<String>,
    /// Extra label filters.
    pub labels: Vec<String>,
    /// Issue state: `open`, `closed`, `all`.
    pub state: String,
}

/// Builds the GitHub issue-search query string.
#[must_use]
pub fn build_search_query(filters: &SearchFilters) -> String {
    let mut parts = vec!["is:issue".to_string()];

    if filters.state != "all" && !filters.state.is_empty() {
        parts.push(format!("is:{}", filters.state));
    }

    if filters.mode == SearchMode::Repo {
        if let Some(repo) = filters.repo.as_deref() {
            parts.push(format!("repo:{repo}"));
        }
    }

    match filters.difficulty.as_deref() {
        Some("good-first-issue") => parts.push(r#"label:"good first issue""#.to_string()),
        Some("easy") => {
            parts.push(r#"(label:"good first issue" OR label:easy OR label:beginner)"#.to_string());
        },
        Some("medium") => parts.push("(label:medium OR label:intermediate)".to_string()),
        Some("hard") => parts.push("(label:hard OR label:advanced OR label:expert)".to_string()),
        _ => {},
    }

    for label in &filters.labels {
        parts.push(format!(r#"label:"{label}""#));
    }

    if let Some(language) = filters.language.as_deref() {
        parts.push(format!("language:{language}"));
    }

    let keywords: Vec<&str> = filters
        .skills
        .iter()
        .chain(filters.topics.iter())
        .map(String::as_str)
        .collect();
    if !keywords.is_empty() {
        parts.push(keywords.join(" "));
    }

    parts.join(" ")
}

/// Produces human-readable reasons why a hit matched the filters.
#[must_use]
pub fn score_hit(hit: &IssueHit, filters: &SearchFilters) -> Vec<String> {
    let mut reasons = Vec::new();
    let labels: Vec<String> = hit
        .labels
        .iter()
        .map(|label| label.to_lowercase())
        .collect();

    if filters.difficulty.as_deref() == Some("good-first-issue")
        && labels.iter().any(|label| label == "good first issue")
    {
        reasons.push("Label match: good first issue".to_string());
    }

    for label in &filters.labels {
        if labels.contains(&label.to_lowercase()) {
            reasons.push(format!("Label match: {label}"));
        }
    }

    let title = hit.title.to_lowercase();
    let body = hit.body.to_lowercase();
    for skill in &filters.skills {
        let needle = skill.to_lowercase();
        if title.contains(&needle) || body.contains(&needle) {
            reasons.push(format!("Keyword match: {skill}"));
        }
    }
    for topic in &filters.topics {
        let needle = topic.to_lowercase();
        if title.contains(&needle) || body.contains(&needle) {
            reasons.push(format!("Topic match: {topic}"));
        }
    }

    if let Some(language) = filters.language.as_deref() {
        reasons.push(format!("Repository language filter: {language}"));
    }

    if reasons.is_empty() {
        reasons.push("General search match".to_string());
    }
    reasons
}
