//! Opening a new terminal window that runs a command
//!
//! Each platform family has its own mechanism:
//!
//! - macOS drives Terminal.app through `osascript`
//! - Windows has `cmd` `start` a second `cmd /k` in a new console window
//! - everything else tries a list of terminal emulators and keeps the first
//!   one that starts
//!
//! The candidate list is computed by [`invocations`] independently of the
//! host platform, so every mechanism can be tested anywhere.

use crate::output;
use crate::process::{
    spawn_launcher, spawn_launcher_verbatim, verbatim_command_line, LaunchedProcess,
};
use crate::Result;
use schema::Platform;
use std::path::Path;
use tracing::{debug, info};

/// One way of opening a terminal: a program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalInvocation {
    /// Executable to start
    pub program: String,
    /// Arguments, with the user's command already embedded
    pub args: Vec<String>,
    /// Pass `args` on the command line as written, without per-argument quoting
    pub verbatim: bool,
}

impl TerminalInvocation {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            verbatim: false,
        }
    }

    fn verbatim(program: &str, args: Vec<String>) -> Self {
        Self {
            verbatim: true,
            ..Self::new(program, args)
        }
    }

    /// Command line the program sees when the invocation is verbatim
    pub fn command_line(&self) -> String {
        verbatim_command_line(&self.args)
    }

    fn spawn(&self) -> Result<LaunchedProcess> {
        if self.verbatim {
            spawn_launcher_verbatim(&self.program, &self.args, None)
        } else {
            spawn_launcher(&self.program, &self.args, None)
        }
    }
}

/// Candidate invocations for `platform`, in preference order
pub fn invocations(platform: Platform, command: &str, dir: &Path) -> Vec<TerminalInvocation> {
    let dir = dir.display().to_string();
    match platform {
        Platform::MacOs => {
            let inner = format!("cd {} && {}", sh_quote(&dir), command);
            let script = format!(
                "tell app \"Terminal\" to do script \"{}\"",
                applescript_escape(&inner)
            );
            vec![TerminalInvocation::new(
                "osascript",
                vec!["-e".to_string(), script],
            )]
        }
        // the whole `/k` payload is quoted so the outer cmd leaves `&&` alone;
        // the inner cmd strips the outer pair again
        Platform::Windows => vec![TerminalInvocation::verbatim(
            "cmd",
            vec![
                "/c".to_string(),
                "start".to_string(),
                "\"\"".to_string(),
                "cmd".to_string(),
                "/k".to_string(),
                format!("\"cd /d \"{}\" && {}\"", dir, command),
            ],
        )],
        Platform::Unix => {
            let inner = format!("cd {} && {}", sh_quote(&dir), command);
            vec![
                TerminalInvocation::new(
                    "gnome-terminal",
                    vec![
                        "--".to_string(),
                        "bash".to_string(),
                        "-c".to_string(),
                        format!("{}; exec bash", inner),
                    ],
                ),
                TerminalInvocation::new(
                    "xterm",
                    vec!["-e".to_string(), format!("{}; bash", inner)],
                ),
                TerminalInvocation::new(
                    "konsole",
                    vec![
                        "--new-tab".to_string(),
                        "-e".to_string(),
                        format!("{}; bash", inner),
                    ],
                ),
            ]
        }
    }
}

/// Open a terminal running `command` in `dir`
///
/// Returns the handle of the launcher process, or `None` after printing
/// manual instructions when no candidate could be started.
pub fn open_terminal(platform: Platform, command: &str, dir: &Path) -> Option<LaunchedProcess> {
    let candidates = invocations(platform, command, dir);
    first_spawnable(&candidates, TerminalInvocation::spawn).or_else(
        || {
            output::warn(&format!(
                "Could not open a new terminal. Please run '{}' manually in another terminal.",
                command
            ));
            None
        },
    )
}

/// Try candidates in order and return the first successful spawn
///
/// Stops at the first success; a failing candidate is logged and skipped.
pub fn first_spawnable<T, F>(candidates: &[TerminalInvocation], mut spawn: F) -> Option<T>
where
    F: FnMut(&TerminalInvocation) -> Result<T>,
{
    for candidate in candidates {
        match spawn(candidate) {
            Ok(handle) => {
                info!("Opened terminal with {}", candidate.program);
                return Some(handle);
            }
            Err(e) => debug!("Terminal candidate {} unavailable: {}", candidate.program, e),
        }
    }
    None
}

/// Single-quote a string for POSIX shells
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    #[test]
    fn test_macos_uses_terminal_app() {
        let inv = invocations(Platform::MacOs, "npx hardhat node", Path::new("/work/blockchain"));
        assert_eq!(inv.len(), 1);
        assert_eq!(inv[0].program, "osascript");
        assert_eq!(
            inv[0].args,
            vec![
                "-e".to_string(),
                "tell app \"Terminal\" to do script \"cd '/work/blockchain' && npx hardhat node\""
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_macos_escapes_quotes_in_command() {
        let inv = invocations(Platform::MacOs, "echo \"hi\"", Path::new("/w"));
        assert!(inv[0].args[1].contains(r#"echo \"hi\""#));
    }

    #[test]
    fn test_windows_uses_native_console() {
        let inv = invocations(Platform::Windows, "ipfs daemon", Path::new(r"C:\work"));
        assert_eq!(inv.len(), 1);
        assert_eq!(inv[0].program, "cmd");
        assert!(inv[0].verbatim);
        assert_eq!(
            inv[0].command_line(),
            r#"/c start "" cmd /k "cd /d "C:\work" && ipfs daemon""#
        );
    }

    #[test]
    fn test_windows_command_line_has_no_escaped_quotes() {
        let inv = invocations(
            Platform::Windows,
            "npx hardhat node",
            Path::new(r"C:\Users\dev\my dapp\blockchain"),
        );
        let line = inv[0].command_line();
        assert!(!line.contains(r#"\""#), "cmd cannot read {}", line);
        assert!(line.ends_with(r#"/k "cd /d "C:\Users\dev\my dapp\blockchain" && npx hardhat node""#));
    }

    #[test]
    fn test_only_windows_is_verbatim() {
        for platform in [Platform::MacOs, Platform::Unix] {
            assert!(invocations(platform, "true", Path::new("/")).iter().all(|i| !i.verbatim));
        }
    }

    #[cfg(windows)]
    #[tokio::test]
    async fn test_windows_launcher_exits_after_start() {
        use crate::process::ManagedProcess;

        let inv = TerminalInvocation::verbatim(
            "cmd",
            vec!["/c".to_string(), "exit".to_string(), "0".to_string()],
        );
        let mut launcher = inv.spawn().expect("spawn cmd");
        let status = launcher.wait().await.expect("wait");
        assert!(status.success());
        assert!(!launcher.is_alive());
    }

    #[test]
    fn test_unix_candidate_order() {
        let inv = invocations(Platform::Unix, "firebase emulators:start", Path::new("/work"));
        let programs: Vec<_> = inv.iter().map(|i| i.program.as_str()).collect();
        assert_eq!(programs, vec!["gnome-terminal", "xterm", "konsole"]);
        assert_eq!(
            inv[0].args.last().map(String::as_str),
            Some("cd '/work' && firebase emulators:start; exec bash")
        );
        assert_eq!(
            inv[1].args,
            vec!["-e".to_string(), "cd '/work' && firebase emulators:start; bash".to_string()]
        );
    }

    #[test]
    fn test_every_platform_has_a_candidate() {
        for platform in [Platform::MacOs, Platform::Windows, Platform::Unix] {
            assert!(!invocations(platform, "true", Path::new("/")).is_empty());
        }
    }

    #[test]
    fn test_first_spawnable_picks_exactly_one() {
        let inv = invocations(Platform::Unix, "ipfs daemon", Path::new("/w"));
        let mut tried = Vec::new();
        let picked = first_spawnable(&inv, |c| {
            tried.push(c.program.clone());
            if c.program == "gnome-terminal" {
                Err(CoreError::ProcessSpawn("not installed".to_string()))
            } else {
                Ok(c.program.clone())
            }
        });
        assert_eq!(picked.as_deref(), Some("xterm"));
        // konsole is never tried once xterm started
        assert_eq!(tried, vec!["gnome-terminal", "xterm"]);
    }

    #[test]
    fn test_first_spawnable_none_when_all_fail() {
        let inv = invocations(Platform::Unix, "ipfs daemon", Path::new("/w"));
        let picked: Option<()> = first_spawnable(&inv, |_| {
            Err(CoreError::ProcessSpawn("not installed".to_string()))
        });
        assert!(picked.is_none());
    }

    #[test]
    fn test_sh_quote_escapes_single_quotes() {
        assert_eq!(sh_quote("/home/o'neil/app"), r"'/home/o'\''neil/app'");
    }
}
