//! User-facing progress output
//!
//! Diagnostics go through `tracing`; these helpers print the coloured lines a
//! developer watches while the environment comes up.

use console::style;

/// Print the welcome banner framed by rules
pub fn banner(title: &str) {
    let width = title.chars().count() + 4;
    let rule = "=".repeat(width);
    println!("{}", style(&rule).bold().green());
    println!("{}", style(format!("  {}  ", title)).bold().green());
    println!("{}\n", style(&rule).bold().green());
}

/// Print a phase heading
pub fn section(text: &str) {
    println!("{}", style(text).bold().blue());
}

/// Print a step header: `=== name ===` preceded by a blank line
pub fn step_header(name: &str) {
    println!("\n{}", style(format!("=== {} ===", name)).bold().magenta());
}

/// Echo a shell command line
pub fn command(cmd: &str) {
    println!("{}", style(format!("$ {}", cmd)).blue());
}

/// Print a success marker
pub fn success(text: &str) {
    println!("{}", style(format!("✓ {}", text)).green());
}

/// Print a failure marker
pub fn failure(text: &str) {
    println!("{}", style(failure_line(text)).yellow());
}

fn failure_line(text: &str) -> String {
    format!("⚠ {}", text)
}

/// Print an informational progress line
pub fn info(text: &str) {
    println!("{}", style(text).blue());
}

/// Print a positive notice
pub fn notice(text: &str) {
    println!("{}", style(text).green());
}

/// Print a warning
pub fn warn(text: &str) {
    println!("{}", style(text).yellow());
}
