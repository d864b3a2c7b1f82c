//! Filesystem safety gate run before any destructive clone operation.
//!
//! The gate inspects and, at most, creates an empty directory; it never
//! deletes or modifies an entry. Validation is advisory: the filesystem can
//! change between the check and the clone (TOCTOU), and downstream
//! operations must tolerate a late failure from git itself.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::envelope::{ErrorKind, ErrorRecord, IntoRecord};

/// Maximum directory entries included in a `NOT_EMPTY` preview.
const ENTRIES_PREVIEW_LIMIT: usize = 10;

/// Outcome of a successful validation.
///
/// Computed fresh on every call; the resolved path may be reused but is not
/// guaranteed to stay valid once time has passed.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    /// Canonical absolute form of the target path.
    pub resolved_path: PathBuf,
    /// Lexically sorted names already present, truncated to a preview.
    pub entries_preview: Vec<String>,
    /// True entry count before truncation.
    pub total_entries: usize,
    /// Whether the write probe succeeded.
    pub writable: bool,
}

/// Errors from the safety gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// The path cannot be resolved, created, or is not a directory.
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The offending path as provided or resolved.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The process lacks permission to create or write the directory.
    #[error("permission denied: cannot {action} {path}")]
    PermissionDenied {
        /// The action that was refused (`create`, `write to`).
        action: &'static str,
        /// The resolved path.
        path: String,
    },

    /// The directory must be empty but contains entries.
    #[error("directory is not empty: {path}")]
    NotEmpty {
        /// The resolved path.
        path: String,
        /// First entries, lexically sorted.
        preview: Vec<String>,
        /// True total count.
        total: usize,
    },
}

impl IntoRecord for GateError {
    fn into_record(self) -> ErrorRecord {
        let message = self.to_string();
        match self {
            Self::InvalidPath { path, .. } => ErrorRecord::new(ErrorKind::PathInvalid, message)
                .with_detail("provided_path", path),
            Self::PermissionDenied { path, .. } => {
                ErrorRecord::new(ErrorKind::PermissionDenied, message)
                    .with_detail("resolved_path", path)
                    .with_hint("check directory ownership and permission bits")
            },
            Self::NotEmpty {
                path,
                preview,
                total,
            } => ErrorRecord::new(ErrorKind::NotEmpty, message)
                .with_detail("resolved_path", path)
                .with_detail("entries_preview", preview)
                .with_detail("total_entries", total)
                .with_hint("choose an empty directory or clear this one manually"),
        }
    }
}

/// Validates and prepares a target directory.
///
/// Expands `~`, absolutizes, applies the parent-segment escape heuristic,
/// creates the directory (with parents) when missing, verifies it is a
/// writable directory, and, when `must_be_empty`, that it contains no
/// entries.
///
/// # Errors
///
/// Returns [`GateError`] per the taxonomy above. Creation failures caused by
/// permissions map to `PermissionDenied`; every other resolution or creation
/// failure maps to `InvalidPath`.
pub fn prepare(target_path: &str, must_be_empty: bool) -> Result<ValidationOutcome, GateError> {
    let expanded = expand_tilde(target_path);

    if escapes_via_parent_segments(&expanded) {
        return Err(GateError::InvalidPath {
            path: target_path.to_string(),
            reason: "path is dominated by parent-directory segments".to_string(),
        });
    }

    let absolute = absolutize(&expanded).map_err(|error| GateError::InvalidPath {
        path: target_path.to_string(),
        reason: error.to_string(),
    })?;

    if !absolute.exists() {
        debug!(path = %absolute.display(), "target missing, creating directory");
        std::fs::create_dir_all(&absolute).map_err(|error| {
            if error.kind() == std::io::ErrorKind::PermissionDenied {
                GateError::PermissionDenied {
                    action: "create",
                    path: absolute.display().to_string(),
                }
            } else {
                GateError::InvalidPath {
                    path: absolute.display().to_string(),
                    reason: format!("failed to create directory: {error}"),
                }
            }
        })?;
    }

    let resolved = absolute.canonicalize().map_err(|error| GateError::InvalidPath {
        path: absolute.display().to_string(),
        reason: error.to_string(),
    })?;

    if !resolved.is_dir() {
        return Err(GateError::InvalidPath {
            path: resolved.display().to_string(),
            reason: "path exists but is not a directory".to_string(),
        });
    }

    if !write_probe(&resolved) {
        return Err(GateError::PermissionDenied {
            action: "write to",
            path: resolved.display().to_string(),
        });
    }

    let mut entries = list_entries(&resolved);
    let total = entries.len();
    if must_be_empty && total > 0 {
        entries.truncate(ENTRIES_PREVIEW_LIMIT);
        return Err(GateError::NotEmpty {
            path: resolved.display().to_string(),
            preview: entries,
            total,
        });
    }

    entries.truncate(ENTRIES_PREVIEW_LIMIT);
    Ok(ValidationOutcome {
        resolved_path: resolved,
        entries_preview: entries,
        total_entries: total,
        writable: true,
    })
}

/// Rejects paths where parent-directory segments dominate.
///
/// More than half of all segments being `..` is treated as a deliberate
/// escape payload. This is a heuristic guard, not a sandbox boundary.
fn escapes_via_parent_segments(path: &Path) -> bool {
    let components: Vec<Component<'_>> = path.components().collect();
    if components.is_empty() {
        return false;
    }
    let parents = components
        .iter()
        .filter(|component| matches!(component, Component::ParentDir))
        .count();
    parents * 2 > components.len()
}

fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_lexically(path))
    } else {
        Ok(normalize_lexically(&std::env::current_dir()?.join(path)))
    }
}

/// Collapses `.` and `..` segments without touching the filesystem, so that
/// a not-yet-existing target can still be resolved to a stable absolute
/// form.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Checks write access by creating (and dropping) an anonymous file inside
/// the directory. More reliable than inspecting permission bits, which
/// ignore ACLs and read-only mounts.
fn write_probe(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}

fn list_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_empty_directory_validates() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("workdir");

        let outcome = prepare(&target.to_string_lossy(), true).unwrap();
        assert!(outcome.writable);
        assert_eq!(outcome.total_entries, 0);
        assert!(outcome.entries_preview.is_empty());
        assert!(target.is_dir(), "gate should have created the directory");
    }

    #[test]
    fn preexisting_file_flips_to_not_empty() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("keepme.txt"), b"data").unwrap();

        let error = prepare(&temp.path().to_string_lossy(), true).unwrap_err();
        match error {
            GateError::NotEmpty { preview, total, .. } => {
                assert_eq!(total, 1);
                assert_eq!(preview, vec!["keepme.txt".to_string()]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn preview_is_truncated_but_total_is_true() {
        let temp = tempfile::tempdir().unwrap();
        for index in 0..25 {
            std::fs::write(temp.path().join(format!("f{index:02}")), b"").unwrap();
        }

        let error = prepare(&temp.path().to_string_lossy(), true).unwrap_err();
        match error {
            GateError::NotEmpty { preview, total, .. } => {
                assert_eq!(total, 25);
                assert_eq!(preview.len(), ENTRIES_PREVIEW_LIMIT);
                assert_eq!(preview[0], "f00");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_empty_allowed_when_not_required_empty() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("a"), b"").unwrap();

        let outcome = prepare(&temp.path().to_string_lossy(), false).unwrap();
        assert_eq!(outcome.total_entries, 1);
        assert_eq!(outcome.entries_preview, vec!["a".to_string()]);
    }

    #[test]
    fn file_target_is_invalid_path() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let error = prepare(&file.to_string_lossy(), true).unwrap_err();
        assert!(matches!(error, GateError::InvalidPath { .. }));
    }

    #[test]
    fn parent_dominated_path_is_rejected() {
        let error = prepare("../../../../etc", true).unwrap_err();
        assert!(matches!(error, GateError::InvalidPath { .. }));
    }

    #[test]
    fn a_few_parent_segments_are_fine() {
        assert!(!escapes_via_parent_segments(Path::new("a/b/../c/d")));
        assert!(escapes_via_parent_segments(Path::new("../../../etc")));
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let locked = temp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = prepare(&locked.to_string_lossy(), true);
        // Root bypasses permission bits, so only assert when the probe fails.
        if let Err(error) = result {
            assert!(matches!(error, GateError::PermissionDenied { .. }));
        }

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn not_empty_record_reports_preview_and_total() {
        let record = GateError::NotEmpty {
            path: "/tmp/somewhere".to_string(),
            preview: vec!["a".to_string(), "b".to_string()],
            total: 12,
        }
        .into_record();

        assert_eq!(record.code, ErrorKind::NotEmpty);
        assert_eq!(record.details["total_entries"], serde_json::json!(12));
        assert_eq!(
            record.details["entries_preview"],
            serde_json::json!(["a", "b"])
        );
    }
}
