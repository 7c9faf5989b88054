//! Recording host for testing sequencer behaviour
//!
//! `MockHost` answers tool and liveness queries from configured sets,
//! returns configured exit codes, hands out [`MockProcess`] handles for
//! terminal launches and records every call in order. Clones share the call
//! log, so a test can keep one clone for assertions.

use super::Host;
use crate::process::ManagedProcess;
use crate::readiness::ReadyState;
use crate::step::ForegroundExit;
use crate::{CoreError, Result};
use async_trait::async_trait;
use schema::{LivenessCheck, Platform, Readiness};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A side effect requested from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// Tool lookup
    CommandExists(String),
    /// Liveness query
    IsRunning(LivenessCheck),
    /// Foreground step
    RunStep {
        /// Step title
        name: String,
        /// Shell command line
        command: String,
        /// Working directory
        dir: PathBuf,
    },
    /// Terminal launch
    OpenTerminal {
        /// Shell command line
        command: String,
        /// Working directory
        dir: PathBuf,
    },
    /// Readiness wait
    WaitReady {
        /// Service name
        service: String,
        /// Wait strategy
        readiness: Readiness,
    },
    /// Foreground dev server
    RunForeground {
        /// Shell command line
        command: String,
        /// Working directory
        dir: PathBuf,
    },
}

#[derive(Debug, Default)]
struct Shared {
    calls: Mutex<Vec<HostCall>>,
    launched: Mutex<Vec<MockProcess>>,
    interrupt: Notify,
    next_pid: AtomicU32,
}

/// Configurable, recording [`Host`] implementation
#[derive(Debug, Clone)]
pub struct MockHost {
    root: PathBuf,
    platform: Platform,
    tools: HashSet<String>,
    running: HashSet<String>,
    exit_codes: HashMap<String, i32>,
    terminal_available: bool,
    interrupt_on: Option<String>,
    shared: Arc<Shared>,
}

impl MockHost {
    /// Host with no tools, nothing running and a working terminal
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let shared = Shared {
            next_pid: AtomicU32::new(1000),
            ..Default::default()
        };
        Self {
            root: root.into(),
            platform: Platform::Unix,
            tools: HashSet::new(),
            running: HashSet::new(),
            exit_codes: HashMap::new(),
            terminal_available: true,
            interrupt_on: None,
            shared: Arc::new(shared),
        }
    }

    /// Make these commands resolvable
    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools.extend(tools.iter().map(|t| t.to_string()));
        self
    }

    /// Report a process pattern or probe command as running
    pub fn with_running(mut self, pattern_or_command: &str) -> Self {
        self.running.insert(pattern_or_command.to_string());
        self
    }

    /// Exit code returned for a step or foreground command line (default 0)
    pub fn with_exit_code(mut self, command: &str, code: i32) -> Self {
        self.exit_codes.insert(command.to_string(), code);
        self
    }

    /// Make every terminal launch fail
    pub fn without_terminal(mut self) -> Self {
        self.terminal_available = false;
        self
    }

    /// Simulate Ctrl+C while this step or foreground command is running
    pub fn interrupt_during(mut self, command: &str) -> Self {
        self.interrupt_on = Some(command.to_string());
        self
    }

    /// Use a different platform family
    pub fn on_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<HostCall> {
        lock(&self.shared.calls).clone()
    }

    /// Processes handed out by terminal launches
    pub fn launched(&self) -> Vec<MockProcess> {
        lock(&self.shared.launched).clone()
    }

    /// Commands of all terminal launches, in order
    pub fn terminal_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::OpenTerminal { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Commands of all foreground steps, in order
    pub fn step_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::RunStep { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Services waited for, in order
    pub fn waits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::WaitReady { service, .. } => Some(service),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        lock(&self.shared.calls).push(call);
    }

    fn interrupts(&self, command: &str) -> bool {
        self.interrupt_on.as_deref() == Some(command)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Host for MockHost {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn project_root(&self) -> &Path {
        &self.root
    }

    fn command_exists(&self, command: &str) -> bool {
        self.record(HostCall::CommandExists(command.to_string()));
        self.tools.contains(command)
    }

    async fn is_running(&self, check: &LivenessCheck) -> bool {
        self.record(HostCall::IsRunning(check.clone()));
        let key = match check {
            LivenessCheck::ProcessMatch { pattern } => pattern,
            LivenessCheck::CommandProbe { command } => command,
        };
        self.running.contains(key)
    }

    async fn run_step(&self, name: &str, command: &str, dir: &Path) -> Result<i32> {
        self.record(HostCall::RunStep {
            name: name.to_string(),
            command: command.to_string(),
            dir: dir.to_path_buf(),
        });
        if self.interrupts(command) {
            self.shared.interrupt.notify_one();
            std::future::pending::<()>().await;
        }
        Ok(self.exit_codes.get(command).copied().unwrap_or(0))
    }

    async fn open_terminal(&self, command: &str, dir: &Path) -> Option<Box<dyn ManagedProcess>> {
        self.record(HostCall::OpenTerminal {
            command: command.to_string(),
            dir: dir.to_path_buf(),
        });
        if !self.terminal_available {
            return None;
        }
        let pid = self.shared.next_pid.fetch_add(1, Ordering::SeqCst);
        let process = MockProcess::new(pid);
        lock(&self.shared.launched).push(process.clone());
        Some(Box::new(process))
    }

    async fn wait_ready(&self, service: &str, readiness: &Readiness) -> ReadyState {
        self.record(HostCall::WaitReady {
            service: service.to_string(),
            readiness: readiness.clone(),
        });
        match readiness {
            Readiness::FixedDelay { .. } => ReadyState::Elapsed,
            Readiness::TcpPoll { .. } => ReadyState::Reachable,
        }
    }

    async fn run_foreground(&self, command: &str, dir: &Path) -> Result<ForegroundExit> {
        self.record(HostCall::RunForeground {
            command: command.to_string(),
            dir: dir.to_path_buf(),
        });
        if self.interrupts(command) {
            return Ok(ForegroundExit::Interrupted);
        }
        Ok(ForegroundExit::Exited(
            self.exit_codes.get(command).copied().unwrap_or(0),
        ))
    }

    async fn interrupted(&self) {
        self.shared.interrupt.notified().await;
    }
}

#[derive(Debug, Default)]
struct ProcessState {
    alive: AtomicBool,
    fail_signals: AtomicBool,
    terminate_calls: AtomicU32,
    kill_calls: AtomicU32,
}

/// In-memory process handle; clones observe the same state
#[derive(Debug, Clone)]
pub struct MockProcess {
    pid: u32,
    state: Arc<ProcessState>,
}

impl MockProcess {
    /// A running process
    pub fn new(pid: u32) -> Self {
        let process = Self {
            pid,
            state: Arc::new(ProcessState::default()),
        };
        process.state.alive.store(true, Ordering::SeqCst);
        process
    }

    /// A process that has already exited
    pub fn exited(pid: u32) -> Self {
        let process = Self::new(pid);
        process.exit();
        process
    }

    /// A running process whose termination fails
    pub fn failing(pid: u32) -> Self {
        let process = Self::new(pid);
        process.state.fail_signals.store(true, Ordering::SeqCst);
        process
    }

    /// Simulate the process exiting by itself
    pub fn exit(&self) {
        self.state.alive.store(false, Ordering::SeqCst);
    }

    /// Whether the process is still running
    pub fn is_running(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    /// How many times termination was requested
    pub fn terminate_calls(&self) -> u32 {
        self.state.terminate_calls.load(Ordering::SeqCst)
    }

    /// How many times a forceful kill was requested
    pub fn kill_calls(&self) -> u32 {
        self.state.kill_calls.load(Ordering::SeqCst)
    }

    fn signal(&self) -> Result<()> {
        if self.state.fail_signals.load(Ordering::SeqCst) {
            return Err(CoreError::ProcessSignal(format!(
                "mock process {} refused the signal",
                self.pid
            )));
        }
        self.exit();
        Ok(())
    }
}

impl ManagedProcess for MockProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        self.is_running()
    }

    fn terminate(&mut self) -> Result<()> {
        self.state.terminate_calls.fetch_add(1, Ordering::SeqCst);
        self.signal()
    }

    fn kill(&mut self) -> Result<()> {
        self.state.kill_calls.fetch_add(1, Ordering::SeqCst);
        self.signal()
    }
}
