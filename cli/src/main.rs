//! devboot binary
//!
//! Starts the local development environment in the current directory.

#![allow(unused_crate_dependencies)]

use clap::Parser;
use cli::{Cli, CliError};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = devboot_core::utils::init_tracing(&cli.log_level) {
        eprintln!("[{}] {}", e.code(), e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = CliError::RuntimeError(e.to_string());
            error!("[{}] {}", err.code(), err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::run(&cli)) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("[{}] {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}
