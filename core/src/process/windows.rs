//! Windows launcher detachment

use std::process::Stdio;
use tokio::process::Command;

/// The launcher itself never shows a window; `start` opens the visible one
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Hide the launcher and keep its output off the orchestrator's console
pub fn detach(command: &mut Command) {
    command.creation_flags(CREATE_NO_WINDOW);
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());
}

/// Append `args` to the command line exactly as given
pub fn raw_args(command: &mut Command, args: &[String]) {
    command.raw_arg(super::verbatim_command_line(args));
}
