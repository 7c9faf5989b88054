//! Prerequisite checks: is a command resolvable on the search path

use schema::ToolRequirement;
use tracing::debug;

/// Whether `command` resolves to an executable on the current search path
pub fn command_exists(command: &str) -> bool {
    match which::which(command) {
        Ok(path) => {
            debug!("Found '{}' at {}", command, path.display());
            true
        }
        Err(e) => {
            debug!("'{}' not found: {}", command, e);
            false
        }
    }
}

/// First required tool that `exists` reports missing, in declaration order
pub fn first_missing<'a, F>(tools: &'a [ToolRequirement], mut exists: F) -> Option<&'a ToolRequirement>
where
    F: FnMut(&str) -> bool,
{
    tools.iter().find(|tool| !exists(&tool.command))
}
