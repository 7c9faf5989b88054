//! Library side of the `devboot` binary
//!
//! Argument parsing and the glue between the command line, plan resolution
//! and the sequencer. Kept out of `main.rs` so it can be driven with a
//! [`devboot_core::host::mock::MockHost`] in tests.

pub mod error;

pub use error::{CliError, Result};

use clap::Parser;
use devboot_core::config::{self, PlanSource};
use devboot_core::{DevPlan, Host, Sequencer, SystemHost};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bring up the local development environment
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "devboot")]
#[command(about = "Start the local blockchain, storage, emulators and dev server")]
#[command(version)]
pub struct Cli {
    /// Load the plan from this TOML file instead of ./devboot.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Print the effective plan as TOML and exit
    #[arg(long)]
    pub print_plan: bool,
}

/// Resolve the plan for `cli` relative to `root`
pub fn load_plan(cli: &Cli, root: &Path) -> Result<DevPlan> {
    if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(CliError::InvalidArgument(format!(
                "--config {}: no such file",
                path.display()
            )));
        }
    }
    let (plan, source) = config::resolve_plan(cli.config.as_deref(), root)?;
    match source {
        PlanSource::BuiltIn => debug!("Using built-in plan"),
        PlanSource::File(path) => info!("Using plan from {}", path.display()),
    }
    Ok(plan)
}

/// The effective plan rendered as TOML
pub fn render_plan(cli: &Cli, root: &Path) -> Result<String> {
    let plan = load_plan(cli, root)?;
    Ok(config::plan_to_toml(&plan)?)
}

/// Run against the real system from the current directory
pub async fn run(cli: &Cli) -> Result<i32> {
    let root = std::env::current_dir()?;
    run_with_host(cli, SystemHost::new(root)).await
}

/// Run against `host` and return the process exit code
pub async fn run_with_host<H: Host>(cli: &Cli, host: H) -> Result<i32> {
    if cli.print_plan {
        print!("{}", render_plan(cli, host.project_root())?);
        return Ok(0);
    }

    let plan = load_plan(cli, host.project_root())?;
    let report = Sequencer::new(plan, host).run().await?;
    debug!("Run finished: {:?}", report);
    Ok(report.outcome.exit_code())
}
