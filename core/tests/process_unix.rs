//! Integration tests for Unix launcher processes
//!
//! These tests verify that launched processes:
//! - run in their own process groups (via setsid)
//! - are stopped together with their children when the registry releases them
//! - are left alone by cleanup once they have exited

#![cfg(unix)]
#![allow(unused_crate_dependencies)]
#![allow(unsafe_code)] // Required for libc calls in tests

use devboot_core::process::{spawn_launcher, LaunchedProcess, ManagedProcess};
use devboot_core::{Platform, ProcessRegistry};
use std::time::Duration;

fn sleep_for(secs: u32) -> LaunchedProcess {
    spawn_launcher("sleep", &[secs.to_string()], None).expect("Failed to spawn sleep")
}

fn process_group_of(pid: u32) -> Result<u32, std::io::Error> {
    let pgid = unsafe { libc::getpgid(pid as i32) };
    if pgid == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(pgid as u32)
    }
}

/// Gone means no such process, or a zombie waiting to be reaped
fn is_gone(pid: u32) -> bool {
    if unsafe { libc::kill(pid as i32, 0) } != 0 {
        return true;
    }
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .map(|stat| {
            stat.rsplit(')')
                .next()
                .map(|rest| rest.trim_start().starts_with('Z'))
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

async fn wait_until_gone(pid: u32, what: &str) {
    let mut attempts = 0;
    while !is_gone(pid) {
        attempts += 1;
        assert!(attempts < 50, "{} {} survived cleanup", what, pid);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Launched processes lead their own group, separate from ours
#[tokio::test]
async fn test_launcher_leads_own_process_group() {
    let mut child = sleep_for(5);
    let pid = child.pid();

    let pgid = process_group_of(pid).expect("getpgid");
    assert_eq!(pgid, pid);
    let parent_pgid = unsafe { libc::getpgrp() };
    assert_ne!(pgid as i32, parent_pgid);

    let _ = child.kill();
}

/// Releasing the registry stops the launcher and everything it forked
#[tokio::test]
async fn test_release_terminates_process_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pids_file = dir.path().join("pids");
    let script = format!(
        "sleep 30 & echo $! > '{0}'; sleep 30 & echo $! >> '{0}'; wait",
        pids_file.display()
    );
    let launcher = spawn_launcher("sh", &["-c".to_string(), script], None)
        .expect("Failed to spawn script");
    let pgid = launcher.pid();

    // let the shell fork its children
    let mut children: Vec<u32> = Vec::new();
    for _ in 0..50 {
        let text = std::fs::read_to_string(&pids_file).unwrap_or_default();
        children = text.lines().filter_map(|l| l.trim().parse().ok()).collect();
        if children.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(children.len(), 2, "script did not start its children");
    for child in &children {
        assert_eq!(process_group_of(*child).unwrap(), pgid);
    }

    let mut registry = ProcessRegistry::new();
    registry.register("tree", Platform::Unix, Box::new(launcher));
    let report = registry.release();
    assert_eq!(report.terminated, vec![pgid]);

    wait_until_gone(pgid, "launcher").await;
    for child in children {
        wait_until_gone(child, "child").await;
    }
}

/// Exited launchers are skipped, live ones are stopped
#[tokio::test]
async fn test_release_skips_exited_launchers() {
    let mut finished = spawn_launcher("true", &[], None).expect("spawn true");
    finished.wait().await.expect("wait true");
    let running = sleep_for(30);
    let running_pid = running.pid();

    let mut registry = ProcessRegistry::new();
    registry.register("finished", Platform::Unix, Box::new(finished));
    registry.register("running", Platform::Unix, Box::new(running));

    let report = registry.release();
    assert_eq!(report.already_exited, 1);
    assert_eq!(report.terminated, vec![running_pid]);
    assert_eq!(report.failed, 0);
}

/// Dropping the registry releases what is left
#[tokio::test]
async fn test_drop_releases_launchers() {
    let running = sleep_for(30);
    let pgid = running.pid();
    {
        let mut registry = ProcessRegistry::new();
        registry.register("dropped", Platform::MacOs, Box::new(running));
    }

    wait_until_gone(pgid, "launcher").await;
}

/// Separate launches get separate groups
#[tokio::test]
async fn test_multiple_launchers_have_distinct_groups() {
    let mut a = sleep_for(2);
    let mut b = sleep_for(2);

    assert_ne!(a.pid(), b.pid());
    assert_eq!(process_group_of(a.pid()).unwrap(), a.pid());
    assert_eq!(process_group_of(b.pid()).unwrap(), b.pid());

    let _ = a.kill();
    let _ = b.kill();
}
