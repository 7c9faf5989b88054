#![allow(unused_crate_dependencies)]

mod common;

use cli::{load_plan, render_plan, run_with_host};
use devboot_core::config::DEFAULT_PLAN_FILE;
use devboot_core::host::mock::{HostCall, MockHost};
use devboot_core::DevPlan;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn print_plan_runs_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new(tmp.path());
    let cli = common::parse(&["--print-plan"]);

    let code = common::run_with_timeout(TIMEOUT, run_with_host(&cli, host.clone()))
        .await
        .expect("print plan");
    assert_eq!(code, 0);
    assert!(host.calls().is_empty());
}

#[test]
fn rendered_plan_reflects_plan_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    common::write_plan(
        tmp.path(),
        DEFAULT_PLAN_FILE,
        "[devServer]\nname = \"Starting Vite\"\ncommand = \"npx vite\"\n",
    );
    let text = render_plan(&common::parse(&["--print-plan"]), tmp.path()).expect("render");
    assert!(text.contains("npx vite"));
    assert!(text.contains("npx hardhat node"));
}

#[test]
fn missing_config_file_is_an_invalid_argument() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let missing = tmp.path().join("absent.toml");
    let cli = common::parse(&["--config", missing.to_str().expect("utf-8 path")]);

    let err = load_plan(&cli, tmp.path()).unwrap_err();
    assert_eq!(err.code(), "CLI002");
}

#[test]
fn invalid_plan_file_reports_field_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = common::write_plan(
        tmp.path(),
        "broken.toml",
        "[emulators]\nname = \"Emulators\"\ncommand = \"\"\n",
    );
    let cli = common::parse(&["--config", path.to_str().expect("utf-8 path")]);

    let err = load_plan(&cli, tmp.path()).unwrap_err();
    assert_eq!(err.code(), "CORE002");
    assert!(err.to_string().contains("emulators.command"));
}

#[tokio::test]
async fn builtin_plan_runs_to_completion() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new(tmp.path()).with_tools(&["node", "npm", "npx", "firebase", "ipfs"]);
    let cli = common::parse(&[]);

    let code = common::run_with_timeout(TIMEOUT, run_with_host(&cli, host.clone()))
        .await
        .expect("run");
    assert_eq!(code, 0);
    assert_eq!(host.launched().len(), 3);
    assert!(host.launched().iter().all(|p| !p.is_running()));
}

#[tokio::test]
async fn missing_node_exits_with_one() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new(tmp.path());
    let cli = common::parse(&[]);

    let code = common::run_with_timeout(TIMEOUT, run_with_host(&cli, host.clone()))
        .await
        .expect("run");
    assert_eq!(code, 1);
    assert_eq!(host.calls().len(), 1);
}

#[tokio::test]
async fn plan_file_in_root_drives_the_run() {
    let tmp = tempfile::tempdir().expect("tempdir");
    common::write_plan(
        tmp.path(),
        DEFAULT_PLAN_FILE,
        "[devServer]\nname = \"Starting Vite\"\ncommand = \"npx vite\"\nworkingDir = \"web\"\n",
    );
    let host = MockHost::new(tmp.path()).with_tools(&["node", "npm", "npx", "firebase", "ipfs"]);

    let code = common::run_with_timeout(TIMEOUT, run_with_host(&common::parse(&[]), host.clone()))
        .await
        .expect("run");
    assert_eq!(code, 0);
    assert_eq!(
        host.calls().last(),
        Some(&HostCall::RunForeground {
            command: "npx vite".to_string(),
            dir: tmp.path().join("web"),
        })
    );
    assert_ne!(DevPlan::default().dev_server.command, "npx vite");
}
