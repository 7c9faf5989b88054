//! The fixed stage sequence that brings the environment up
//!
//! ```text
//! check-prerequisites → install-root-deps → install-nested-deps →
//! ensure-chain-node-running → deploy-contracts → ensure-storage-daemon-running →
//! start-backend-emulators → run-dev-server-foreground → cleanup
//! ```
//!
//! Every transition is unconditional except the liveness-gated service
//! stages and the prerequisite abort. Step failures are reported and the
//! sequence moves on. An interrupt before the dev server starts abandons the
//! current stage; an interrupt during the dev server ends the session
//! normally. The process registry is owned here and released on every path.

use crate::host::Host;
use crate::output;
use crate::readiness::ReadyState;
use crate::registry::{CleanupReport, ProcessRegistry};
use crate::step::ForegroundExit;
use crate::{prereq, Result};
use schema::{DevPlan, Readiness, ServiceSpec, Stage, StepSpec};
use std::path::PathBuf;
use tracing::{debug, info};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The dev server ran and ended
    Completed,
    /// A mandatory tool was missing; nothing was set up
    MissingPrerequisite(String),
    /// The user interrupted before the dev server started
    Interrupted,
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::MissingPrerequisite(_) | RunOutcome::Interrupted => 1,
        }
    }
}

/// Result of a run together with what cleanup did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// How the run ended
    pub outcome: RunOutcome,
    /// What releasing the registry did
    pub cleanup: CleanupReport,
}

/// What happened to a service stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStart {
    /// Its optional tool is missing
    Skipped,
    /// A running instance was detected
    AlreadyRunning,
    /// A terminal was opened (or attempted) and the wait performed
    Launched,
}

enum Setup {
    Ready,
    Abort(String),
}

/// Runs a [`DevPlan`] against a [`Host`]
#[derive(Debug)]
pub struct Sequencer<H: Host> {
    plan: DevPlan,
    host: H,
}

impl<H: Host> Sequencer<H> {
    /// Create a sequencer for `plan`
    pub fn new(plan: DevPlan, host: H) -> Self {
        Self { plan, host }
    }

    /// Run every stage and release launched processes
    pub async fn run(&self) -> Result<RunReport> {
        let mut registry = ProcessRegistry::new();
        let outcome = self.run_stages(&mut registry).await;
        debug!("Entering stage {}", Stage::Cleanup);
        let cleanup = registry.release();
        info!(
            "Cleanup terminated {} process(es), {} already exited, {} failed",
            cleanup.terminated.len(),
            cleanup.already_exited,
            cleanup.failed
        );
        Ok(RunReport {
            outcome: outcome?,
            cleanup,
        })
    }

    async fn run_stages(&self, registry: &mut ProcessRegistry) -> Result<RunOutcome> {
        output::banner(&self.plan.banner);

        let setup = tokio::select! {
            biased;
            _ = self.host.interrupted() => None,
            result = self.setup(registry) => Some(result),
        };
        match setup {
            None => {
                output::warn("\nSetup interrupted by user.");
                return Ok(RunOutcome::Interrupted);
            }
            Some(Err(e)) => return Err(e),
            Some(Ok(Setup::Abort(tool))) => return Ok(RunOutcome::MissingPrerequisite(tool)),
            Some(Ok(Setup::Ready)) => {}
        }

        self.run_dev_server().await?;

        output::notice("\nDevelopment environment shutdown");
        output::warn("Remember to close other terminal windows if you're done developing.");
        Ok(RunOutcome::Completed)
    }

    async fn setup(&self, registry: &mut ProcessRegistry) -> Result<Setup> {
        debug!("Entering stage {}", Stage::CheckPrerequisites);
        if let Some(tool) = self.check_prerequisites().await? {
            return Ok(Setup::Abort(tool));
        }

        output::section("\nSetting up development environment...");
        debug!("Entering stage {}", Stage::InstallRootDeps);
        self.run_plan_step(&self.plan.root_install).await?;
        debug!("Entering stage {}", Stage::InstallNestedDeps);
        self.run_plan_step(&self.plan.nested_install).await?;

        debug!("Entering stage {}", Stage::EnsureChainNode);
        self.ensure_service(&self.plan.chain_node, registry).await;

        debug!("Entering stage {}", Stage::DeployContracts);
        self.run_plan_step(&self.plan.deploy).await?;

        debug!("Entering stage {}", Stage::EnsureStorageDaemon);
        self.ensure_service(&self.plan.storage_daemon, registry).await;

        debug!("Entering stage {}", Stage::StartEmulators);
        self.ensure_service(&self.plan.emulators, registry).await;

        Ok(Setup::Ready)
    }

    /// Returns the display name of the first missing mandatory tool
    async fn check_prerequisites(&self) -> Result<Option<String>> {
        output::section("Checking prerequisites...");

        if let Some(tool) =
            prereq::first_missing(&self.plan.required_tools, |c| self.host.command_exists(c))
        {
            output::warn(&format!(
                "{} is not installed. Please install it first.",
                tool.display_name
            ));
            return Ok(Some(tool.display_name.clone()));
        }

        for tool in &self.plan.installable_tools {
            if self.host.command_exists(&tool.command) {
                continue;
            }
            output::warn(&format!(
                "{} is not installed. Installing it globally...",
                tool.display_name
            ));
            let name = format!("Installing {}", tool.display_name);
            let root = self.host.project_root().to_path_buf();
            self.host
                .run_step(&name, &tool.install_command, &root)
                .await?;
        }
        Ok(None)
    }

    async fn run_plan_step(&self, step: &StepSpec) -> Result<i32> {
        let dir = self.resolve_dir(step.working_dir.as_deref());
        let code = self.host.run_step(&step.name, &step.command, &dir).await?;
        if code != 0 {
            if let Some(hint) = &step.failure_hint {
                output::warn(hint);
            }
        }
        Ok(code)
    }

    /// Launch a service in its own terminal unless it is unavailable or already up
    pub async fn ensure_service(
        &self,
        service: &ServiceSpec,
        registry: &mut ProcessRegistry,
    ) -> ServiceStart {
        if let Some(tool) = &service.required_tool {
            if !self.host.command_exists(tool) {
                if service.missing_tool_hints.is_empty() {
                    output::warn(&format!(
                        "{} is not installed; skipping {}.",
                        tool, service.name
                    ));
                }
                for hint in &service.missing_tool_hints {
                    output::warn(hint);
                }
                return ServiceStart::Skipped;
            }
        }

        if let Some(check) = &service.liveness {
            if self.host.is_running(check).await {
                output::notice(&format!("{} is already running", service.name));
                return ServiceStart::AlreadyRunning;
            }
        }

        output::info(&format!("Starting {} in a new terminal...", service.name));
        let dir = self.resolve_dir(service.working_dir.as_deref());
        if let Some(process) = self.host.open_terminal(&service.command, &dir).await {
            registry.register(service.name.clone(), self.host.platform(), process);
        }

        output::info(&waiting_message(&service.name, &service.readiness));
        if self.host.wait_ready(&service.name, &service.readiness).await == ReadyState::TimedOut {
            output::warn(&format!(
                "{} did not become reachable in time; continuing anyway.",
                service.name
            ));
        }
        ServiceStart::Launched
    }

    async fn run_dev_server(&self) -> Result<()> {
        debug!("Entering stage {}", Stage::RunDevServer);
        let server = &self.plan.dev_server;
        output::step_header(&server.name);
        output::command(&server.command);
        output::warn("Press Ctrl+C to stop the dev server");

        let dir = self.resolve_dir(server.working_dir.as_deref());
        match self.host.run_foreground(&server.command, &dir).await? {
            ForegroundExit::Interrupted => debug!("Dev server interrupted by user"),
            ForegroundExit::Exited(code) => {
                debug!("Dev server exited with code {}", code);
                if code != 0 {
                    if let Some(hint) = &server.failure_hint {
                        output::warn(hint);
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_dir(&self, relative: Option<&str>) -> PathBuf {
        let root = self.host.project_root();
        match relative {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }
}

fn waiting_message(name: &str, readiness: &Readiness) -> String {
    match readiness {
        Readiness::FixedDelay { secs } => {
            format!("Waiting for {} to start ({} seconds)...", name, secs)
        }
        Readiness::TcpPoll {
            host,
            port,
            timeout_secs,
            ..
        } => format!(
            "Waiting for {} on {}:{} (up to {} seconds)...",
            name, host, port, timeout_secs
        ),
    }
}
