//! Wire-format tests for the plan file: field casing, tagged enums, defaults

use crate::*;

#[test]
fn default_plan_survives_toml() {
    let plan = DevPlan::default();
    let text = toml::to_string(&plan).expect("serialize");
    let back: DevPlan = toml::from_str(&text).expect("deserialize");
    assert_eq!(plan, back);
}

#[test]
fn empty_document_yields_default_plan() {
    let plan: DevPlan = toml::from_str("").expect("deserialize");
    assert_eq!(plan, DevPlan::default());
}

#[test]
fn named_section_replaces_builtin_section() {
    let input = r#"
        [chainNode]
        name = "Anvil"
        command = "anvil"

        [chainNode.liveness]
        type = "processMatch"
        pattern = "anvil"

        [chainNode.readiness]
        type = "tcpPoll"
        port = 8545
        timeoutSecs = 15
    "#;
    let plan: DevPlan = toml::from_str(input).expect("deserialize");

    assert_eq!(plan.chain_node.name, "Anvil");
    assert_eq!(plan.chain_node.working_dir, None);
    assert_eq!(
        plan.chain_node.liveness,
        Some(LivenessCheck::ProcessMatch {
            pattern: "anvil".to_string()
        })
    );
    assert_eq!(
        plan.chain_node.readiness,
        Readiness::TcpPoll {
            host: "127.0.0.1".to_string(),
            port: 8545,
            interval_ms: 250,
            timeout_secs: 15,
        }
    );
    // untouched sections keep their defaults
    assert_eq!(plan.storage_daemon, DevPlan::default().storage_daemon);
}

#[test]
fn command_probe_liveness_parses() {
    let input = r#"
        [storageDaemon]
        name = "IPFS daemon"
        command = "ipfs daemon"
        requiredTool = "ipfs"

        [storageDaemon.liveness]
        type = "commandProbe"
        command = "ipfs id"
    "#;
    let plan: DevPlan = toml::from_str(input).expect("deserialize");
    assert_eq!(
        plan.storage_daemon.liveness,
        Some(LivenessCheck::CommandProbe {
            command: "ipfs id".to_string()
        })
    );
    // readiness falls back to the service default
    assert_eq!(plan.storage_daemon.readiness, Readiness::FixedDelay { secs: 5 });
    assert!(plan.storage_daemon.missing_tool_hints.is_empty());
}

#[test]
fn service_without_command_is_rejected() {
    let input = r#"
        [emulators]
        name = "Emulators"
    "#;
    assert!(toml::from_str::<DevPlan>(input).is_err());
}
