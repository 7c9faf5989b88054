//! Foreground shell steps
//!
//! A step is a shell command run to completion with the terminal attached:
//! its output streams straight to the user and only the exit code comes back.
//! A non-zero exit is reported, never turned into an error; only failing to
//! start the shell is.

use crate::output;
use crate::{CoreError, Result};
use std::future::Future;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// How long an interrupted foreground command gets to exit on its own
const INTERRUPT_GRACE: Duration = Duration::from_secs(10);

/// Exit code reported for a step whose shell could not be started
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// How a foreground command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundExit {
    /// The command exited by itself with this code
    Exited(i32),
    /// The user interrupted it
    Interrupted,
}

/// Build a command that runs `line` through the platform shell
pub fn shell_command(line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(line);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.arg("-c").arg(line);
        command
    }
}

/// Exit code of a finished process; signal deaths report -1
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Run a titled step in `dir` and report how it went
///
/// A step whose shell cannot be started (for example because `dir` does not
/// exist) is reported like any other failed step and yields
/// [`SPAWN_FAILURE_CODE`].
pub async fn run_step(name: &str, line: &str, dir: &Path) -> Result<i32> {
    output::step_header(name);
    output::command(line);

    let code = match run_shell(line, dir).await {
        Ok(code) => code,
        Err(CoreError::StepSpawn(reason)) => {
            warn!("Step '{}' could not start: {}", name, reason);
            output::failure(&format!("Could not start command: {}", reason));
            return Ok(SPAWN_FAILURE_CODE);
        }
        Err(e) => return Err(e),
    };
    if code == 0 {
        output::success("Success");
    } else {
        output::failure(&format!("Command completed with non-zero exit code: {}", code));
    }
    Ok(code)
}

/// Run a shell command line in `dir` with inherited stdio and return its exit code
pub async fn run_shell(line: &str, dir: &Path) -> Result<i32> {
    let mut child = spawn_attached(line, dir)?;
    let status = child
        .wait()
        .await
        .map_err(|e| CoreError::ProcessWait(format!("Failed to wait for '{}': {}", line, e)))?;
    debug!("'{}' exited with {}", line, status);
    Ok(exit_code(status))
}

/// Run a long-lived command in the foreground until it exits or `interrupt` resolves
///
/// The child shares our process group, so it sees the same Ctrl+C. After an
/// interrupt it gets a grace period to shut down before being killed.
pub async fn run_foreground<F>(line: &str, dir: &Path, interrupt: F) -> Result<ForegroundExit>
where
    F: Future<Output = ()>,
{
    let mut child = spawn_attached(line, dir)?;

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|e| {
                CoreError::ProcessWait(format!("Failed to wait for '{}': {}", line, e))
            })?;
            Ok(ForegroundExit::Exited(exit_code(status)))
        }
        _ = interrupt => {
            debug!("Interrupt received while '{}' was running", line);
            if tokio::time::timeout(INTERRUPT_GRACE, child.wait()).await.is_err() {
                warn!("'{}' still running {:?} after interrupt, killing it", line, INTERRUPT_GRACE);
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
            Ok(ForegroundExit::Interrupted)
        }
    }
}

fn spawn_attached(line: &str, dir: &Path) -> Result<tokio::process::Child> {
    let mut command = shell_command(line);
    command
        .current_dir(dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    command.spawn().map_err(|e| {
        CoreError::StepSpawn(format!(
            "Failed to run '{}' in {}: {}",
            line,
            dir.display(),
            e
        ))
    })
}
