//! The machine the orchestrator drives
//!
//! The sequencer never touches processes directly. Every side effect goes
//! through a [`Host`], so the ordering rules of a run can be exercised with
//! [`mock::MockHost`] while [`SystemHost`] does the real work.

use crate::interrupt::InterruptLatch;
use crate::process::ManagedProcess;
use crate::readiness::{self, ReadyState};
use crate::step::{self, ForegroundExit};
use crate::{liveness, prereq, terminal, Result};
use async_trait::async_trait;
use schema::{LivenessCheck, Platform, Readiness};
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod mock;

/// Side effects available to the sequencer
#[async_trait]
pub trait Host: Send + Sync {
    /// Platform family used for terminal and termination mechanics
    fn platform(&self) -> Platform;

    /// Directory relative working directories are resolved against
    fn project_root(&self) -> &Path;

    /// Whether `command` is resolvable on the search path
    fn command_exists(&self, command: &str) -> bool;

    /// Whether the service described by `check` is already running
    async fn is_running(&self, check: &LivenessCheck) -> bool;

    /// Run a titled foreground step and return its exit code
    async fn run_step(&self, name: &str, command: &str, dir: &Path) -> Result<i32>;

    /// Open a terminal window running `command` in `dir`
    async fn open_terminal(&self, command: &str, dir: &Path) -> Option<Box<dyn ManagedProcess>>;

    /// Wait for a launched service
    async fn wait_ready(&self, service: &str, readiness: &Readiness) -> ReadyState;

    /// Run `command` in the foreground until it exits or the user interrupts
    async fn run_foreground(&self, command: &str, dir: &Path) -> Result<ForegroundExit>;

    /// Resolves when the user interrupts the run, immediately if they already have
    async fn interrupted(&self);
}

/// Host backed by the real operating system
#[derive(Debug, Clone)]
pub struct SystemHost {
    root: PathBuf,
    platform: Platform,
    interrupt: InterruptLatch,
}

impl SystemHost {
    /// Host rooted at `root` on the current platform
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            platform: Platform::current(),
            interrupt: InterruptLatch::new(),
        }
    }
}

#[async_trait]
impl Host for SystemHost {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn project_root(&self) -> &Path {
        &self.root
    }

    fn command_exists(&self, command: &str) -> bool {
        prereq::command_exists(command)
    }

    async fn is_running(&self, check: &LivenessCheck) -> bool {
        liveness::check(check, self.platform).await
    }

    async fn run_step(&self, name: &str, command: &str, dir: &Path) -> Result<i32> {
        step::run_step(name, command, dir).await
    }

    async fn open_terminal(&self, command: &str, dir: &Path) -> Option<Box<dyn ManagedProcess>> {
        terminal::open_terminal(self.platform, command, dir)
            .map(|p| Box::new(p) as Box<dyn ManagedProcess>)
    }

    async fn wait_ready(&self, _service: &str, readiness: &Readiness) -> ReadyState {
        readiness::wait_for(readiness).await
    }

    async fn run_foreground(&self, command: &str, dir: &Path) -> Result<ForegroundExit> {
        if self.interrupt.is_triggered() {
            debug!("Interrupted before '{}' started", command);
            return Ok(ForegroundExit::Interrupted);
        }
        step::run_foreground(command, dir, self.interrupt.wait()).await
    }

    async fn interrupted(&self) {
        self.interrupt.wait().await
    }
}
