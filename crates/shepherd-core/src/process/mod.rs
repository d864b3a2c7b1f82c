//! Bounded subprocess execution.
//!
//! Runs an external binary with piped stdio under a hard time budget. The
//! timeout path actively terminates the child and reaps it before the error
//! is reported. An unterminated child after a reported timeout is treated
//! as a correctness bug, not an inconvenience. `kill_on_drop` additionally
//! covers the caller cancelling (dropping) an in-flight invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::envelope::{ErrorKind, ErrorRecord, IntoRecord};

/// Captured output of one completed subprocess invocation.
///
/// Owned by the executor for the duration of the call; stdout/stderr are
/// decoded with invalid bytes replaced rather than failing the call.
#[derive(Debug)]
pub struct ProcessResult {
    /// Child exit code; `-1` when terminated by a signal.
    pub exit_code: i32,
    /// Decoded standard output.
    pub stdout: String,
    /// Decoded standard error.
    pub stderr: String,
}

impl ProcessResult {
    /// Returns `true` when the child exited zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns trimmed stderr, falling back to stdout when stderr is empty.
    #[must_use]
    pub fn error_text(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Errors from subprocess execution.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The target executable cannot be located on the search path.
    #[error("`{binary}` is not installed or not found in PATH")]
    BinaryNotFound {
        /// The binary that was requested.
        binary: String,
    },

    /// The invocation exceeded its time budget.
    #[error("`{command}` timed out after {budget_secs}s")]
    Timeout {
        /// The command line that was running.
        command: String,
        /// The budget that was exceeded.
        budget_secs: u64,
    },

    /// The child could not be spawned for a non-lookup reason.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// The command line.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failed while draining the child's pipes or reaping it.
    #[error("i/o failure while running `{command}`: {source}")]
    Io {
        /// The command line.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl IntoRecord for ProcessError {
    fn into_record(self) -> ErrorRecord {
        let message = self.to_string();
        match self {
            Self::BinaryNotFound { binary } => {
                ErrorRecord::new(ErrorKind::BinaryNotFound, message)
                    .with_detail("binary", binary)
                    .with_hint("install it and ensure it is on your PATH")
            },
            Self::Timeout { budget_secs, .. } => ErrorRecord::new(ErrorKind::Timeout, message)
                .with_detail("budget_secs", budget_secs),
            Self::Spawn { .. } | Self::Io { .. } => {
                ErrorRecord::new(ErrorKind::Unexpected, message)
            },
        }
    }
}

/// Locates `binary` on the search path, honoring explicit paths.
///
/// Mirrors the lookup the OS performs at spawn time so callers can
/// pre-check availability before touching the filesystem or the network.
#[must_use]
pub fn locate(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs `binary` with `args`, bounded by `budget`.
///
/// stdout and stderr are captured fully; stdin is closed. On timeout the
/// child is killed and reaped before `ProcessError::Timeout` is returned.
///
/// # Errors
///
/// - [`ProcessError::BinaryNotFound`] when the executable is missing.
/// - [`ProcessError::Timeout`] when `budget` is exceeded.
/// - [`ProcessError::Spawn`] / [`ProcessError::Io`] for OS-level failures.
pub async fn run(
    binary: &str,
    args: &[&str],
    cwd: Option<&Path>,
    budget: Duration,
) -> Result<ProcessResult, ProcessError> {
    let command_line = display_command(binary, args);
    debug!(command = %command_line, budget_secs = budget.as_secs(), "spawning subprocess");

    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::BinaryNotFound {
                binary: binary.to_string(),
            }
        } else {
            ProcessError::Spawn {
                command: command_line.clone(),
                source: error,
            }
        }
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    match tokio::time::timeout(budget, drain(&mut child, stdout, stderr)).await {
        Ok(Ok((status, stdout, stderr))) => {
            let result = ProcessResult {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            };
            debug!(command = %command_line, exit_code = result.exit_code, "subprocess finished");
            Ok(result)
        },
        Ok(Err(error)) => Err(ProcessError::Io {
            command: command_line,
            source: error,
        }),
        Err(_elapsed) => {
            warn!(command = %command_line, "subprocess exceeded budget, killing");
            // Kill and reap before reporting, so no child outlives the
            // timeout we are about to surface.
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(ProcessError::Timeout {
                command: command_line,
                budget_secs: budget.as_secs(),
            })
        },
    }
}

/// Reads both pipes to EOF, then reaps the child.
///
/// The pipes are drained concurrently while the child runs, so a chatty
/// child cannot deadlock on a full pipe buffer.
async fn drain(
    child: &mut Child,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
) -> std::io::Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>)> {
    let read_stdout = async {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = stdout {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok::<_, std::io::Error>(buffer)
    };
    let read_stderr = async {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = stderr {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok::<_, std::io::Error>(buffer)
    };

    let (stdout, stderr) = tokio::try_join!(read_stdout, read_stderr)?;
    let status = child.wait().await?;
    Ok((status, stdout, stderr))
}

fn display_command(binary: &str, args: &[&str]) -> String {
    let mut line = binary.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
