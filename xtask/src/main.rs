//! xtask automation tool for devboot
//!
//! Development tasks that are not part of the shipped binary.

mod gen_schemas;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development automation tool for devboot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the JSON schema for plan files
    GenSchemas {
        /// Output directory
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::GenSchemas { out_dir } => gen_schemas::run(&out_dir),
    }
}
