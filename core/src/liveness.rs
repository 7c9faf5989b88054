//! Best-effort detection of already running services
//!
//! Used only to avoid launching a second copy of a long-running daemon.
//! Name collisions can produce false positives and process listings that
//! truncate command lines can produce false negatives; neither is an error.

use crate::step::shell_command;
use schema::{LivenessCheck, Platform};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Evaluate a liveness check on this machine
pub async fn check(check: &LivenessCheck, platform: Platform) -> bool {
    match check {
        LivenessCheck::ProcessMatch { pattern } => is_process_running(pattern, platform).await,
        LivenessCheck::CommandProbe { command } => probe_succeeds(command).await,
    }
}

/// Whether a process matching `pattern` is running
///
/// Windows scans the `tasklist` table for the fragment; everywhere else
/// `pgrep -f` matches it against full command lines. Failing to run the
/// listing tool counts as not running.
pub async fn is_process_running(pattern: &str, platform: Platform) -> bool {
    let running = match platform {
        Platform::Windows => match Command::new("tasklist")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => tasklist_contains(&String::from_utf8_lossy(&output.stdout), pattern),
            Err(e) => {
                debug!("tasklist failed: {}", e);
                false
            }
        },
        Platform::MacOs | Platform::Unix => match Command::new("pgrep")
            .arg("-f")
            .arg(pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("pgrep failed: {}", e);
                false
            }
        },
    };
    debug!("Process matching '{}' running: {}", pattern, running);
    running
}

/// Whether a probe command exits with status 0
pub async fn probe_succeeds(command: &str) -> bool {
    let mut probe = shell_command(command);
    probe
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    let up = matches!(probe.status().await, Ok(status) if status.success());
    debug!("Probe '{}' reports running: {}", command, up);
    up
}

/// Substring match over `tasklist` output, case-insensitive like the table itself
pub fn tasklist_contains(listing: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    listing
        .to_ascii_lowercase()
        .contains(&pattern.to_ascii_lowercase())
}
