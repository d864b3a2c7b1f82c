//! Clone and status operations driving the `git` binary.
//!
//! Every invocation goes through [`crate::process::run`] and is therefore
//! bounded and kill-on-timeout. Clones get the long budget from the config;
//! status-style sub-calls get the short one, because a hang there indicates
//! an unusual condition rather than legitimate work.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ShepherdConfig;
use crate::detect;
use crate::envelope::{ErrorKind, ErrorRecord, IntoRecord};
use crate::fsgate::{self, GateError};
use crate::process::{self, ProcessError};

/// Transport used for the clone URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneMethod {
    /// `https://github.com/{repo}.git`
    Https,
    /// `git@github.com:{repo}.git`
    Ssh,
}

impl CloneMethod {
    /// Returns the lowercase wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Ssh => "ssh",
        }
    }
}

impl std::str::FromStr for CloneMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "https" => Ok(Self::Https),
            "ssh" => Ok(Self::Ssh),
            other => Err(format!("clone method must be 'https' or 'ssh', got '{other}'")),
        }
    }
}

/// Parameters for one clone operation. Validated once at entry, never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    /// Repository in `owner/repo` form.
    pub repo: String,
    /// Local directory to clone into.
    pub target_path: String,
    /// Clone transport.
    pub method: CloneMethod,
    /// Add `--depth 1`.
    pub shallow: bool,
    /// Add `--branch <name>`.
    pub branch: Option<String>,
    /// Bypass the safety gate. Use with caution.
    pub skip_validation: bool,
}

/// Result of a successful clone.
#[derive(Debug, Clone, Serialize)]
pub struct CloneOutcome {
    /// Resolved local repository path.
    pub local_repo_path: String,
    /// The URL handed to git.
    pub remote_url_used: String,
    /// Checked-out branch, or `"unknown"` when the query failed.
    pub current_branch: String,
    /// Human-readable next-steps block from project detection.
    pub next_steps: String,
}

/// Result of a status query.
#[derive(Debug, Clone, Serialize)]
pub struct RepoStatus {
    /// Always `true`; a non-repository path is an error instead.
    pub is_git_repo: bool,
    /// Current branch, or `"unknown"`.
    pub current_branch: String,
    /// Whether the working tree has uncommitted changes.
    pub has_uncommitted_changes: bool,
    /// Porcelain output when dirty, otherwise a clean-tree note.
    pub status_summary: String,
}

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Subprocess-level failure (missing binary, timeout, spawn).
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Safety-gate rejection.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The remote rejected the clone because the repository is missing or
    /// unreadable.
    #[error("repository not found or inaccessible: {repo}")]
    RepoNotFound {
        /// The `owner/repo` identifier.
        repo: String,
        /// The URL that was attempted.
        clone_url: String,
        /// Trimmed git error output.
        git_error: String,
    },

    /// The remote refused authentication during clone.
    #[error("permission denied during clone")]
    AccessDenied {
        /// The URL that was attempted.
        clone_url: String,
        /// Trimmed git error output.
        git_error: String,
    },

    /// Any other non-zero clone exit.
    #[error("git clone failed: {git_error}")]
    CloneFailed {
        /// The URL that was attempted.
        clone_url: String,
        /// Trimmed git error output.
        git_error: String,
    },

    /// The path is not a git repository.
    #[error("not a git repository: {path}")]
    NotARepository {
        /// The path that was inspected.
        path: String,
    },
}

impl IntoRecord for GitError {
    fn into_record(self) -> ErrorRecord {
        let message = self.to_string();
        match self {
            Self::Process(error) => error.into_record(),
            Self::Gate(error) => error.into_record(),
            Self::RepoNotFound {
                clone_url,
                git_error,
                ..
            } => ErrorRecord::new(ErrorKind::OperationFailed, message)
                .with_detail("reason", "repository_not_found")
                .with_detail("clone_url", clone_url)
                .with_detail("git_error", git_error)
                .with_hint("check that the repository name is correct and you have access to it"),
            Self::AccessDenied {
                clone_url,
                git_error,
            } => ErrorRecord::new(ErrorKind::OperationFailed, message)
                .with_detail("reason", "permission_denied")
                .with_detail("clone_url", clone_url)
                .with_detail("git_error", git_error)
                .with_hint("if using SSH, ensure your SSH keys are set up correctly"),
            Self::CloneFailed {
                clone_url,
                git_error,
            } => ErrorRecord::new(ErrorKind::OperationFailed, message)
                .with_detail("reason", "clone_failed")
                .with_detail("clone_url", clone_url)
                .with_detail("git_error", git_error),
            Self::NotARepository { path } => {
                ErrorRecord::new(ErrorKind::PathInvalid, message).with_detail("path", path)
            },
        }
    }
}

/// Derives the clone URL for a repository identifier.
#[must_use]
pub fn clone_url(repo: &str, method: CloneMethod) -> String {
    match method {
        CloneMethod::Https => format!("https://github.com/{repo}.git"),
        CloneMethod::Ssh => format!("git@github.com:{repo}.git"),
    }
}

/// Git operations bound to one configuration.
#[derive(Debug)]
pub struct GitOps {
    binary: String,
    clone_timeout: std::time::Duration,
    quick_timeout: std::time::Duration,
}

impl GitOps {
    /// Creates git operations from the startup configuration.
    #[must_use]
    pub fn new(config: &ShepherdConfig) -> Self {
        Self {
            binary: config.git_binary.clone(),
            clone_timeout: config.clone_timeout(),
            quick_timeout: config.quick_timeout(),
        }
    }

    /// Returns `true` when the configured git binary can be located.
    #[must_use]
    pub fn binary_available(&self) -> bool {
        process::locate(&self.binary).is_some()
    }

    /// Clones a repository into a validated target directory.
    ///
    /// Pre-checks binary availability before any filesystem or network
    /// action, runs the safety gate unless bypassed, and classifies clone
    /// failures from git's own error text. The branch query afterwards is
    /// best-effort and degrades to `"unknown"`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] covering the gate, subprocess, and remote
    /// failure modes.
    pub async fn clone(&self, request: &CloneRequest) -> Result<CloneOutcome, GitError> {
        if !self.binary_available() {
            return Err(ProcessError::BinaryNotFound {
                binary: self.binary.clone(),
            }
            .into());
        }

        let target = if request.skip_validation {
            request.target_path.clone()
        } else {
            let outcome = fsgate::prepare(&request.target_path, true)?;
            outcome.resolved_path.display().to_string()
        };

        let url = clone_url(&request.repo, request.method);
        let mut args: Vec<&str> = vec!["clone"];
        if request.shallow {
            args.extend(["--depth", "1"]);
        }
        if let Some(branch) = request.branch.as_deref() {
            args.extend(["--branch", branch]);
        }
        args.extend([url.as_str(), target.as_str()]);

        info!(repo = %request.repo, target = %target, "cloning repository");
        let result = process::run(&self.binary, &args, None, self.clone_timeout).await?;

        if !result.success() {
            return Err(classify_clone_failure(
                &request.repo,
                &url,
                result.error_text(),
            ));
        }

        let current_branch = self.current_branch(Path::new(&target)).await;
        let next_steps = detect::format_next_steps(Path::new(&target), &request.repo, &current_branch);

        Ok(CloneOutcome {
            local_repo_path: target,
            remote_url_used: url,
            current_branch,
            next_steps,
        })
    }

    /// Reports branch and working-tree state for a local repository.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::NotARepository`] when the path fails the
    /// `rev-parse --git-dir` probe, and subprocess errors otherwise.
    pub async fn status(&self, repo_path: &Path) -> Result<RepoStatus, GitError> {
        let probe = self
            .quick(&["rev-parse", "--git-dir"], repo_path)
            .await?;
        if !probe.success() {
            return Err(GitError::NotARepository {
                path: repo_path.display().to_string(),
            });
        }

        let current_branch = self.current_branch(repo_path).await;

        let porcelain = self.quick(&["status", "--porcelain"], repo_path).await?;
        let changes = porcelain.stdout.trim();
        let has_uncommitted_changes = porcelain.success() && !changes.is_empty();

        Ok(RepoStatus {
            is_git_repo: true,
            current_branch,
            has_uncommitted_changes,
            status_summary: if has_uncommitted_changes {
                changes.to_string()
            } else {
                "Working tree clean".to_string()
            },
        })
    }

    /// Returns the checked-out branch name, degrading to `"unknown"` on any
    /// failure rather than failing the surrounding operation.
    pub async fn current_branch(&self, repo_path: &Path) -> String {
        match self
            .quick(&["rev-parse", "--abbrev-ref", "HEAD"], repo_path)
            .await
        {
            Ok(result) if result.success() => result.stdout.trim().to_string(),
            Ok(_) | Err(_) => "unknown".to_string(),
        }
    }

    /// Returns whether the working tree has uncommitted changes; `false` on
    /// any failure.
    pub async fn has_uncommitted_changes(&self, repo_path: &Path) -> bool {
        match self.quick(&["status", "--porcelain"], repo_path).await {
            Ok(result) => result.success() && !result.stdout.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Returns the URL of `remote`, or `None` when it cannot be read.
    pub async fn remote_url(&self, repo_path: &Path, remote: &str) -> Option<String> {
        match self.quick(&["remote", "get-url", remote], repo_path).await {
            Ok(result) if result.success() => Some(result.stdout.trim().to_string()),
            Ok(_) | Err(_) => None,
        }
    }

    async fn quick(
        &self,
        args: &[&str],
        cwd: &Path,
    ) -> Result<process::ProcessResult, ProcessError> {
        debug!(args = ?args, cwd = %cwd.display(), "running quick git command");
        process::run(&self.binary, args, Some(cwd), self.quick_timeout).await
    }
}

/// Maps git's textual clone error onto the failure taxonomy.
fn classify_clone_failure(repo: &str, url: &str, git_error: &str) -> GitError {
    if git_error.contains("Repository not found") || git_error.contains("could not read") {
        GitError::RepoNotFound {
            repo: repo.to_string(),
            clone_url: url.to_string(),
            git_error: git_error.to_string(),
        }
    } else if git_error.contains("Permission denied") {
        GitError::AccessDenied {
            clone_url: url.to_string(),
            git_error: git_error.to_string(),
        }
    } else {
        GitError::CloneFailed {
            clone_url: url.to_string(),
            git_error: git_error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_urls_for_both_methods() {
        assert_eq!(
            clone_url("rust-lang/rust", CloneMethod::Https),
            "https://github.com/rust-lang/rust.git"
        );
        assert_eq!(
            clone_url("rust-lang/rust", CloneMethod::Ssh),
            "git@github.com:rust-lang/rust.git"
        );
    }

    #[test]
    fn clone_failure_classification() {
        let error = classify_clone_failure("o/r", "u", "fatal: Repository not found.");
        assert!(matches!(error, GitError::RepoNotFound { .. }));

        let error = classify_clone_failure("o/r", "u", "git@github.com: Permission denied (publickey).");
        assert!(matches!(error, GitError::AccessDenied { .. }));

        let error = classify_clone_failure("o/r", "u", "fatal: unable to access: timed out");
        assert!(matches!(error, GitError::CloneFailed { .. }));
    }

    #[test]
    fn clone_failure_records_carry_sub_reason() {
        let record = classify_clone_failure("o/r", "https://u", "fatal: Repository not found.")
            .into_record();
        assert_eq!(record.code, ErrorKind::OperationFailed);
        assert_eq!(
            record.details["reason"],
            serde_json::json!("repository_not_found")
        );
    }

    #[test]
    fn missing_binary_record_is_binary_not_found() {
        let config = ShepherdConfig {
            git_binary: "definitely-not-a-real-binary-1df3".to_string(),
            ..ShepherdConfig::default()
        };
        let git = GitOps::new(&config);
        assert!(!git.binary_available());
    }

    #[cfg(unix)]
    mod fake_git {
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        use super::*;

        /// Writes an executable stand-in for git that scripts the behaviors
        /// under test, so no network or real repository is needed.
        fn install_fake_git(dir: &Path, script_body: &str) -> PathBuf {
            let path = dir.join("fake-git");
            let script = format!("#!/bin/sh\n{script_body}\n");
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn git_with_binary(binary: PathBuf) -> GitOps {
            let config = ShepherdConfig {
                git_binary: binary.display().to_string(),
                ..ShepherdConfig::default()
            };
            GitOps::new(&config)
        }

        #[tokio::test]
        async fn clone_success_reports_branch_and_next_steps() {
            let temp = tempfile::tempdir().unwrap();
            let fake = install_fake_git(
                temp.path(),
                r#"case "$1" in
  clone) mkdir -p "$3" && echo '[package]' > "$3/Cargo.toml" ;;
  rev-parse) echo main ;;
esac
exit 0"#,
            );
            let git = git_with_binary(fake);

            let target = temp.path().join("workdir");
            let outcome = git
                .clone(&CloneRequest {
                    repo: "owner/repo".to_string(),
                    target_path: target.display().to_string(),
                    method: CloneMethod::Https,
                    shallow: false,
                    branch: None,
                    skip_validation: false,
                })
                .await
                .unwrap();

            assert_eq!(outcome.current_branch, "main");
            assert_eq!(
                outcome.remote_url_used,
                "https://github.com/owner/repo.git"
            );
            assert!(outcome.next_steps.contains("Rust"));
        }

        #[tokio::test]
        async fn clone_not_found_is_classified() {
            let temp = tempfile::tempdir().unwrap();
            let fake = install_fake_git(
                temp.path(),
                r#"echo 'fatal: Repository not found.' >&2
exit 128"#,
            );
            let git = git_with_binary(fake);

            let target = temp.path().join("workdir");
            let error = git
                .clone(&CloneRequest {
                    repo: "owner/missing".to_string(),
                    target_path: target.display().to_string(),
                    method: CloneMethod::Https,
                    shallow: false,
                    branch: None,
                    skip_validation: false,
                })
                .await
                .unwrap_err();

            assert!(matches!(error, GitError::RepoNotFound { .. }));
        }

        #[tokio::test]
        async fn clone_into_populated_directory_is_gated() {
            let temp = tempfile::tempdir().unwrap();
            let fake = install_fake_git(temp.path(), "exit 0");
            let git = git_with_binary(fake);

            let target = temp.path().join("workdir");
            std::fs::create_dir(&target).unwrap();
            std::fs::write(target.join("existing.txt"), b"x").unwrap();

            let error = git
                .clone(&CloneRequest {
                    repo: "owner/repo".to_string(),
                    target_path: target.display().to_string(),
                    method: CloneMethod::Https,
                    shallow: false,
                    branch: None,
                    skip_validation: false,
                })
                .await
                .unwrap_err();

            assert!(matches!(error, GitError::Gate(GateError::NotEmpty { .. })));
        }

        #[tokio::test]
        async fn shallow_and_branch_flags_are_passed() {
            let temp = tempfile::tempdir().unwrap();
            let log = temp.path().join("args.log");
            let fake = install_fake_git(
                temp.path(),
                &format!(
                    r#"if [ "$1" = clone ]; then echo "$@" > {}; fi
exit 0"#,
                    log.display()
                ),
            );
            let git = git_with_binary(fake);

            let target = temp.path().join("workdir");
            git.clone(&CloneRequest {
                repo: "owner/repo".to_string(),
                target_path: target.display().to_string(),
                method: CloneMethod::Ssh,
                shallow: true,
                branch: Some("develop".to_string()),
                skip_validation: false,
            })
            .await
            .unwrap();

            let recorded = std::fs::read_to_string(&log).unwrap();
            assert!(recorded.contains("--depth 1"));
            assert!(recorded.contains("--branch develop"));
            assert!(recorded.contains("git@github.com:owner/repo.git"));
        }

        #[tokio::test]
        async fn status_reports_dirty_tree() {
            let temp = tempfile::tempdir().unwrap();
            let fake = install_fake_git(
                temp.path(),
                r#"case "$1 $2" in
  "rev-parse --git-dir") echo .git ;;
  "rev-parse --abbrev-ref") echo feature/x ;;
  "status --porcelain") echo ' M src/lib.rs' ;;
esac
exit 0"#,
            );
            let git = git_with_binary(fake);

            let status = git.status(temp.path()).await.unwrap();
            assert!(status.is_git_repo);
            assert_eq!(status.current_branch, "feature/x");
            assert!(status.has_uncommitted_changes);
            assert!(status.status_summary.contains("src/lib.rs"));
        }

        #[tokio::test]
        async fn remote_url_and_dirtiness_degrade_gracefully() {
            let temp = tempfile::tempdir().unwrap();
            let fake = install_fake_git(
                temp.path(),
                r#"case "$1" in
  remote) echo 'https://github.com/owner/repo.git' ;;
  status) exit 128 ;;
esac
exit 0"#,
            );
            let git = git_with_binary(fake);

            let url = git.remote_url(temp.path(), "origin").await;
            assert_eq!(url.as_deref(), Some("https://github.com/owner/repo.git"));

            // A failing status sub-call reads as "no changes", never an error.
            assert!(!git.has_uncommitted_changes(temp.path()).await);
        }

        #[tokio::test]
        async fn status_on_non_repository_errors() {
            let temp = tempfile::tempdir().unwrap();
            let fake = install_fake_git(temp.path(), "exit 128");
            let git = git_with_binary(fake);

            let error = git.status(temp.path()).await.unwrap_err();
            assert!(matches!(error, GitError::NotARepository { .. }));
        }
    }
}
