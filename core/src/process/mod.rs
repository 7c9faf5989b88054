//! Process management for launched terminals and daemons
//!
//! This module provides the [`ManagedProcess`] abstraction the registry uses
//! to release what the orchestrator started, and a concrete
//! [`LaunchedProcess`] backed by a tokio child handle.
//!
//! ## Platform Support
//!
//! - **Unix**: launched processes get their own process group (`setsid`), so
//!   termination reaches the whole tree and a Ctrl+C typed at the
//!   orchestrator does not hit them directly
//! - **Windows**: launchers run without a window of their own (the terminal
//!   they open brings its own console) and are terminated forcefully

use crate::{CoreError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error};

#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

/// A spawned process that can be probed and released
pub trait ManagedProcess: Send + std::fmt::Debug {
    /// Process ID of the handle we own
    fn pid(&self) -> u32;

    /// Whether the process has not exited yet
    fn is_alive(&mut self) -> bool;

    /// Ask the process to exit (SIGTERM to its group on Unix)
    fn terminate(&mut self) -> Result<()>;

    /// Kill the process forcefully
    fn kill(&mut self) -> Result<()>;
}

/// A launcher process started by the orchestrator
///
/// The handle refers to the process we spawned, which is not necessarily the
/// process running the user's command (a terminal emulator may hand the
/// command off to a server process and exit).
#[derive(Debug)]
pub struct LaunchedProcess {
    pid: u32,
    child: Child,
}

impl LaunchedProcess {
    /// Try to wait for the process to exit without blocking
    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>> {
        self.child.try_wait().map_err(|e| {
            CoreError::ProcessWait(format!(
                "Failed to try_wait for process {}: {}",
                self.pid, e
            ))
        })
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        self.child.wait().await.map_err(|e| {
            CoreError::ProcessWait(format!("Failed to wait for process {}: {}", self.pid, e))
        })
    }
}

impl ManagedProcess for LaunchedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    fn terminate(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            unix::signal_term_group(self.pid)
        }
        #[cfg(not(unix))]
        {
            self.kill()
        }
    }

    fn kill(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            unix::signal_kill_group(self.pid)
        }
        #[cfg(not(unix))]
        {
            self.child.start_kill().map_err(|e| {
                CoreError::ProcessSignal(format!("Failed to kill process {}: {}", self.pid, e))
            })
        }
    }
}

/// Spawn a detached launcher process
///
/// `cwd` is applied only when given; terminal launchers carry their own
/// `cd` in the command line. Standard input is closed, output is inherited
/// on Unix and discarded on Windows.
pub fn spawn_launcher(program: &str, args: &[String], cwd: Option<&Path>) -> Result<LaunchedProcess> {
    spawn(program, args, cwd, false)
}

/// Like [`spawn_launcher`], but on Windows `args` reach the program verbatim,
/// joined by single spaces, instead of being quoted for the MSVC runtime
///
/// `cmd.exe` does its own quote parsing; escaped quotes break it.
pub fn spawn_launcher_verbatim(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> Result<LaunchedProcess> {
    spawn(program, args, cwd, true)
}

/// The argument string a verbatim launcher receives after its program name
pub fn verbatim_command_line(args: &[String]) -> String {
    args.join(" ")
}

fn spawn(program: &str, args: &[String], cwd: Option<&Path>, verbatim: bool) -> Result<LaunchedProcess> {
    debug!("Spawning launcher: {} {:?}", program, args);

    let mut command = Command::new(program);
    #[cfg(windows)]
    {
        if verbatim {
            windows::raw_args(&mut command, args);
        } else {
            command.args(args);
        }
    }
    #[cfg(not(windows))]
    {
        let _ = verbatim;
        command.args(args);
    }
    command.stdin(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    #[cfg(unix)]
    unix::detach(&mut command);
    #[cfg(windows)]
    windows::detach(&mut command);

    let child = command.spawn().map_err(|e| {
        error!("Failed to spawn launcher '{}': {}", program, e);
        CoreError::ProcessSpawn(format!("Failed to spawn '{}': {}", program, e))
    })?;

    // tokio::process::Child::id() returns None once the child has been reaped
    let pid = child
        .id()
        .ok_or_else(|| CoreError::ProcessSpawn("Spawned child did not have a PID".to_string()))?;
    debug!("Launcher '{}' running as PID {}", program, pid);

    Ok(LaunchedProcess { pid, child })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_launcher_reports_pid() {
        let mut child =
            spawn_launcher("true", &[], None).expect("Failed to spawn true");
        assert!(child.pid() > 0);
        let status = child.wait().await.expect("wait");
        assert!(status.success());
        assert!(!child.is_alive());
    }

    #[test]
    fn test_verbatim_command_line_is_not_requoted() {
        let args = vec!["/c".to_string(), "echo \"C:\\my dir\"".to_string()];
        assert_eq!(verbatim_command_line(&args), "/c echo \"C:\\my dir\"");
    }

    #[tokio::test]
    async fn test_verbatim_launcher_keeps_arguments_apart_on_unix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut child = spawn_launcher_verbatim(
            "sh",
            &["-c".to_string(), "test \"$0\" = 'a b'".to_string(), "a b".to_string()],
            Some(dir.path()),
        )
        .expect("spawn sh");
        assert!(child.wait().await.expect("wait").success());
    }

    #[tokio::test]
    async fn test_spawn_nonexistent_launcher() {
        let result = spawn_launcher("nonexistent_launcher_12345", &[], None);
        match result.unwrap_err() {
            CoreError::ProcessSpawn(_) => {}
            e => panic!("Expected ProcessSpawn error, got: {}", e),
        }
    }

    #[tokio::test]
    async fn test_terminate_stops_running_launcher() {
        let mut child = spawn_launcher("sleep", &["30".to_string()], None)
            .expect("Failed to spawn sleep");
        assert!(child.is_alive());

        child.terminate().expect("terminate");
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("sleep did not exit after SIGTERM")
            .expect("wait");
        assert!(!status.success());
        assert!(!child.is_alive());
    }

    #[tokio::test]
    async fn test_spawn_launcher_honours_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker"), b"x").unwrap();
        let mut child = spawn_launcher(
            "test",
            &["-f".to_string(), "marker".to_string()],
            Some(dir.path()),
        )
        .expect("spawn test");
        let status = child.wait().await.expect("wait");
        assert!(status.success());
    }
}
