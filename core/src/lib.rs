//! Core functionality for devboot
//!
//! This crate contains the orchestration logic that brings a local
//! development environment up: prerequisite checks, foreground steps,
//! terminal launches, liveness and readiness checks, the stage sequencer and
//! the registry that releases launched processes.

pub mod config;
pub mod error;
pub mod host;
pub mod interrupt;
pub mod liveness;
pub mod output;
pub mod prereq;
pub mod process;
pub mod readiness;
pub mod registry;
pub mod sequencer;
pub mod step;
pub mod terminal;


// Re-export schema types for convenience
pub use schema::*;

pub use error::{CoreError, Result};
pub use host::{Host, SystemHost};
pub use registry::{CleanupReport, ProcessRegistry};
pub use sequencer::{RunOutcome, RunReport, Sequencer};

/// Core utilities and helper functions
pub mod utils {
    use tracing::debug;

    /// Initialize tracing for the application
    ///
    /// `RUST_LOG` takes precedence over `level`.
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

        debug!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
