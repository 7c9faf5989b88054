//! Registry of processes the orchestrator launched
//!
//! The registry is owned by a sequencer run. Every launched terminal or
//! daemon handle is registered right after spawning and released exactly
//! once: explicitly through [`ProcessRegistry::release`], or on drop if the
//! run unwinds early (error, interrupt, cancelled future, panic).

use crate::output;
use crate::process::ManagedProcess;
use schema::Platform;
use tracing::{debug, warn};

/// A launched process and the platform rules for stopping it
#[derive(Debug)]
struct SpawnedProcess {
    label: String,
    platform: Platform,
    process: Box<dyn ManagedProcess>,
}

impl SpawnedProcess {
    fn pid(&self) -> u32 {
        self.process.pid()
    }

    fn stop(&mut self) -> crate::Result<()> {
        if self.platform.uses_forceful_kill() {
            self.process.kill()
        } else {
            self.process.terminate()
        }
    }
}

/// Summary of a release pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// PIDs that were signalled successfully
    pub terminated: Vec<u32>,
    /// Records whose process had already exited
    pub already_exited: usize,
    /// Records whose termination failed
    pub failed: usize,
}

impl CleanupReport {
    /// Number of records a termination was attempted on
    pub fn attempted(&self) -> usize {
        self.terminated.len() + self.failed
    }
}

/// Owned list of launched processes, released on every exit path
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    records: Vec<SpawnedProcess>,
}

impl ProcessRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a launched process until release
    pub fn register(
        &mut self,
        label: impl Into<String>,
        platform: Platform,
        process: Box<dyn ManagedProcess>,
    ) {
        let record = SpawnedProcess {
            label: label.into(),
            platform,
            process,
        };
        debug!("Registered '{}' (PID {})", record.label, record.pid());
        self.records.push(record);
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stop every tracked process that is still alive
    ///
    /// Failures are logged and counted; they never stop the pass. The
    /// registry is empty afterwards, so releasing twice is a no-op.
    pub fn release(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for mut record in self.records.drain(..) {
            if !record.process.is_alive() {
                debug!("'{}' (PID {}) already exited", record.label, record.pid());
                report.already_exited += 1;
                continue;
            }
            let pid = record.pid();
            match record.stop() {
                Ok(()) => {
                    output::warn(&format!("Terminated process PID {}", pid));
                    report.terminated.push(pid);
                }
                Err(e) => {
                    warn!("Failed to terminate '{}' (PID {}): {}", record.label, pid, e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl Drop for ProcessRegistry {
    fn drop(&mut self) {
        if !self.records.is_empty() {
            debug!("Releasing {} process(es) on drop", self.records.len());
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockProcess;

    fn registry_with(processes: &[&MockProcess], platform: Platform) -> ProcessRegistry {
        let mut registry = ProcessRegistry::new();
        for (i, p) in processes.iter().enumerate() {
            registry.register(format!("svc{}", i), platform, Box::new((*p).clone()));
        }
        registry
    }

    #[test]
    fn test_release_skips_exited_processes() {
        let a = MockProcess::new(101);
        let b = MockProcess::exited(102);
        let c = MockProcess::new(103);
        let d = MockProcess::exited(104);
        let mut registry = registry_with(&[&a, &b, &c, &d], Platform::Unix);

        let report = registry.release();

        assert_eq!(report.terminated, vec![101, 103]);
        assert_eq!(report.already_exited, 2);
        assert_eq!(report.attempted(), 2);
        assert_eq!(a.terminate_calls(), 1);
        assert_eq!(b.terminate_calls(), 0);
        assert_eq!(c.terminate_calls(), 1);
        assert_eq!(d.terminate_calls(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failure_does_not_block_remaining_records() {
        let a = MockProcess::failing(201);
        let b = MockProcess::new(202);
        let mut registry = registry_with(&[&a, &b], Platform::Unix);

        let report = registry.release();

        assert_eq!(report.failed, 1);
        assert_eq!(report.terminated, vec![202]);
        assert_eq!(b.terminate_calls(), 1);
        assert!(!b.is_running());
    }

    #[test]
    fn test_windows_records_are_killed() {
        let a = MockProcess::new(301);
        let mut registry = registry_with(&[&a], Platform::Windows);

        registry.release();

        assert_eq!(a.kill_calls(), 1);
        assert_eq!(a.terminate_calls(), 0);
    }

    #[test]
    fn test_drop_releases_remaining_records() {
        let a = MockProcess::new(401);
        {
            let _registry = registry_with(&[&a], Platform::MacOs);
        }
        assert_eq!(a.terminate_calls(), 1);
    }

    #[test]
    fn test_release_twice_is_noop() {
        let a = MockProcess::new(501);
        let mut registry = registry_with(&[&a], Platform::Unix);
        registry.release();
        let second = registry.release();
        assert_eq!(second, CleanupReport::default());
        assert_eq!(a.terminate_calls(), 1);
    }
}
