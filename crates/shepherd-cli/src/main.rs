//! shepherd - discover GitHub issues, clone repositories, propose changes.
//!
//! Every subcommand prints a JSON result envelope to stdout (guidance
//! subcommands print Markdown instead) and exits 0 on `ok: true`, 1 on
//! `ok: false`. Logs go to stderr so stdout stays machine-readable.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use serde::Serialize;
use shepherd_core::git::{CloneMethod, CloneRequest, GitOps};
use shepherd_core::github::GitHubClient;
use shepherd_core::github::query::{SearchFilters, SearchMode};
use shepherd_core::pr::guidance::{self, ChecklistRequest};
use shepherd_core::pr::{self, PrRequest};
use shepherd_core::{Envelope, ErrorKind, ShepherdConfig, ops};
use tracing_subscriber::EnvFilter;

/// shepherd - GitHub issue discovery and contribution assistant
#[derive(Parser, Debug)]
#[command(name = "shepherd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for issues in a repository or across GitHub
    Search {
        /// Search scope: 'repo' or 'global'
        #[arg(long, default_value = "global")]
        mode: String,

        /// Repository in 'owner/repo' format (required for mode=repo)
        #[arg(long)]
        repo: Option<String>,

        /// Skill keyword (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,

        /// Topic keyword (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Programming language filter
        #[arg(long)]
        language: Option<String>,

        /// Difficulty: good-first-issue, easy, medium, hard
        #[arg(long)]
        difficulty: Option<String>,

        /// Additional label filter (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,

        /// Issue state: open, closed, all
        #[arg(long, default_value = "open")]
        state: String,

        /// Sort order: relevance, created, updated, comments
        #[arg(long, default_value = "relevance")]
        sort: String,

        /// Maximum results (1-30)
        #[arg(long, default_value_t = ops::DEFAULT_SEARCH_LIMIT)]
        limit: u64,
    },

    /// Show details for one issue
    Issue {
        /// Repository in 'owner/repo' format
        repo: String,

        /// Issue number
        number: u64,

        /// Include recent comments
        #[arg(long)]
        comments: bool,

        /// Maximum comments to include
        #[arg(long, default_value_t = ops::DEFAULT_MAX_COMMENTS)]
        max_comments: u64,
    },

    /// Show repository metadata
    Repo {
        /// Repository in 'owner/repo' format
        repo: String,
    },

    /// Discover popular repositories by keyword and language
    Discover {
        /// Search keyword (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Programming language filter
        #[arg(long)]
        language: Option<String>,

        /// Maximum results (1-30)
        #[arg(long, default_value_t = ops::DEFAULT_SEARCH_LIMIT)]
        limit: u64,
    },

    /// Validate (and create) a target directory ahead of a clone
    Prepare {
        /// Directory to validate
        target_path: String,

        /// Allow a non-empty directory
        #[arg(long)]
        allow_non_empty: bool,
    },

    /// Clone a repository into a validated directory
    Clone {
        /// Repository in 'owner/repo' format
        repo: String,

        /// Directory to clone into
        target_path: String,

        /// Clone transport: https or ssh
        #[arg(long, default_value = "https")]
        method: String,

        /// Shallow clone (--depth 1)
        #[arg(long)]
        shallow: bool,

        /// Branch to check out
        #[arg(long)]
        branch: Option<String>,

        /// Bypass the directory safety gate (use with caution)
        #[arg(long)]
        skip_validation: bool,
    },

    /// Show branch and working-tree status for a local repository
    Status {
        /// Path to the local repository
        repo_path: String,
    },

    /// Print a step-by-step PR creation checklist (Markdown)
    Checklist {
        /// Path to the local repository
        local_repo_path: String,

        /// Branch containing the changes
        head_branch: String,

        /// Proposed PR title
        pr_title: String,

        /// Base branch to merge into
        #[arg(long, default_value = "main")]
        base_branch: String,

        /// Proposed PR description
        #[arg(long, default_value = "")]
        pr_body: String,

        /// Not working from a fork
        #[arg(long)]
        no_fork: bool,
    },

    /// Print the fork workflow guide (Markdown)
    ForkGuide,

    /// Create a pull request via the GitHub API
    CreatePr {
        /// Repository in 'owner/repo' format
        repo: String,

        /// Branch with the changes ('branch' or 'owner:branch' for forks)
        head: String,

        /// Base branch to merge into
        base: String,

        /// PR title
        title: String,

        /// PR description
        #[arg(long, default_value = "")]
        body: String,

        /// Open as a draft
        #[arg(long)]
        draft: bool,

        /// Personal access token (falls back to GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },

    /// Fork a repository via the GitHub API
    Fork {
        /// Repository in 'owner/repo' format
        repo: String,

        /// Personal access token (falls back to GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(2);
        },
    };

    let code = run(cli.command, config).await;
    std::process::exit(code.into());
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ShepherdConfig> {
    match path {
        Some(path) => ShepherdConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ShepherdConfig::from_env()),
    }
}

async fn run(command: Commands, config: ShepherdConfig) -> u8 {
    match command {
        Commands::Search {
            mode,
            repo,
            skills,
            topics,
            language,
            difficulty,
            labels,
            state,
            sort,
            limit,
        } => {
            let mode = match mode.parse::<SearchMode>() {
                Ok(mode) => mode,
                Err(reason) => return emit(&Envelope::<()>::failure(ErrorKind::ValidationError, reason)),
            };
            let client = match gateway(&config) {
                Ok(client) => client,
                Err(code) => return code,
            };
            let filters = SearchFilters {
                mode,
                repo,
                skills,
                topics,
                language,
                difficulty,
                labels,
                state,
            };
            emit(&ops::search_issues(&client, filters, &sort, limit).await)
        },

        Commands::Issue {
            repo,
            number,
            comments,
            max_comments,
        } => {
            let client = match gateway(&config) {
                Ok(client) => client,
                Err(code) => return code,
            };
            emit(&ops::issue_details(&client, &repo, number, comments, max_comments).await)
        },

        Commands::Repo { repo } => {
            let client = match gateway(&config) {
                Ok(client) => client,
                Err(code) => return code,
            };
            emit(&ops::repo_metadata(&client, &repo).await)
        },

        Commands::Discover {
            keywords,
            language,
            limit,
        } => {
            let client = match gateway(&config) {
                Ok(client) => client,
                Err(code) => return code,
            };
            emit(&ops::discover_repositories(&client, &keywords, language.as_deref(), limit).await)
        },

        Commands::Prepare {
            target_path,
            allow_non_empty,
        } => emit(&ops::prepare_clone(&target_path, !allow_non_empty)),

        Commands::Clone {
            repo,
            target_path,
            method,
            shallow,
            branch,
            skip_validation,
        } => {
            let method = match method.parse::<CloneMethod>() {
                Ok(method) => method,
                Err(reason) => return emit(&Envelope::<()>::failure(ErrorKind::ValidationError, reason)),
            };
            let git = GitOps::new(&config);
            emit(
                &ops::clone_repo(
                    &git,
                    CloneRequest {
                        repo,
                        target_path,
                        method,
                        shallow,
                        branch,
                        skip_validation,
                    },
                )
                .await,
            )
        },

        Commands::Status { repo_path } => {
            let git = GitOps::new(&config);
            emit(&ops::repo_status(&git, &repo_path).await)
        },

        Commands::Checklist {
            local_repo_path,
            head_branch,
            pr_title,
            base_branch,
            pr_body,
            no_fork,
        } => {
            let git = GitOps::new(&config);
            let checklist = guidance::pr_checklist(
                &git,
                &ChecklistRequest {
                    local_repo_path,
                    base_branch,
                    head_branch,
                    pr_title,
                    pr_body,
                    fork_flow: !no_fork,
                },
            )
            .await;
            println!("{checklist}");
            0
        },

        Commands::ForkGuide => {
            println!("{}", guidance::fork_workflow_guide());
            0
        },

        Commands::CreatePr {
            repo,
            head,
            base,
            title,
            body,
            draft,
            token,
        } => {
            let client = match gateway(&config) {
                Ok(client) => client,
                Err(code) => return code,
            };
            let request = PrRequest {
                repo,
                head,
                base,
                title,
                body,
                draft,
                token: token.map(SecretString::from),
            };
            emit(&Envelope::from(
                pr::create_pull_request_automated(&client, &config, request).await,
            ))
        },

        Commands::Fork { repo, token } => {
            let client = match gateway(&config) {
                Ok(client) => client,
                Err(code) => return code,
            };
            emit(&Envelope::from(
                pr::fork_repository_automated(
                    &client,
                    &config,
                    &repo,
                    token.map(SecretString::from),
                )
                .await,
            ))
        },
    }
}

/// Builds the gateway, emitting a failure envelope when construction fails.
fn gateway(config: &ShepherdConfig) -> Result<GitHubClient, u8> {
    GitHubClient::new(config).map_err(|error| emit(&Envelope::<()>::from(Err(error))))
}

/// Prints an envelope as pretty JSON and maps it to an exit code.
fn emit<T: Serialize>(envelope: &Envelope<T>) -> u8 {
    match serde_json::to_string_pretty(envelope) {
        Ok(json) => println!("{json}"),
        Err(error) => {
            // Serialization of our own types failing is unexpected; still
            // emit a valid envelope so callers can parse stdout.
            println!(
                "{}",
                serde_json::json!({
                    "ok": false,
                    "error": {
                        "code": "UNEXPECTED",
                        "message": format!("failed to serialize response: {error}"),
                        "details": {}
                    }
                })
            );
            return 1;
        },
    }
    u8::from(!envelope.is_ok())
}
