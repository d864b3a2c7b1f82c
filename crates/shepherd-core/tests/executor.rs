//! Process executor guarantees: bounded time, no zombie children, and the
//! binary pre-check firing before any filesystem action.

use std::time::Duration;

use shepherd_core::config::ShepherdConfig;
use shepherd_core::envelope::{ErrorKind, IntoRecord};
use shepherd_core::git::{CloneMethod, CloneRequest, GitOps};
use shepherd_core::process::{self, ProcessError};

/// Marker argument used to find our child in the process table.
const SLEEP_MARKER: &str = "31.4159";

#[cfg(target_os = "linux")]
fn process_table_contains(marker: &str) -> bool {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return false;
    };
    for entry in entries.filter_map(Result::ok) {
        let cmdline = entry.path().join("cmdline");
        if let Ok(bytes) = std::fs::read(cmdline) {
            if String::from_utf8_lossy(&bytes).contains(marker) {
                return true;
            }
        }
    }
    false
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_leaves_no_running_child() {
    let error = process::run(
        "sleep",
        &[SLEEP_MARKER],
        None,
        Duration::from_millis(200),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, ProcessError::Timeout { .. }));
    // The child was killed and reaped before the error was reported, so the
    // process table no longer knows about it.
    assert!(
        !process_table_contains(SLEEP_MARKER),
        "child process survived the reported timeout"
    );
}

#[tokio::test]
async fn timeout_record_maps_to_the_timeout_kind() {
    let error = process::run("sleep", &["5"], None, Duration::from_millis(100))
        .await
        .unwrap_err();
    let record = error.into_record();
    assert_eq!(record.code, ErrorKind::Timeout);
}

#[tokio::test]
async fn clone_with_absent_binary_touches_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("never-created");

    let config = ShepherdConfig {
        git_binary: "definitely-not-a-real-binary-1df3".to_string(),
        ..ShepherdConfig::default()
    };
    let git = GitOps::new(&config);

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

    let record = error.into_record();
    assert_eq!(record.code, ErrorKind::BinaryNotFound);
    // The pre-check fired before the safety gate: no directory was created.
    assert!(
        !target.exists(),
        "binary pre-check must precede filesystem actions"
    );
}

#[tokio::test]
async fn executor_output_is_captured_verbatim() {
    let result = process::run(
        "sh",
        &["-c", "printf 'line1\\nline2'; printf 'warning' >&2"],
        None,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(result.success());
    assert_eq!(result.stdout, "line1\nline2");
    assert_eq!(result.stderr, "warning");
}
