//! Environment plan types for the devboot orchestrator
//!
//! A [`DevPlan`] carries the parameters of every stage the sequencer runs:
//! which tools must exist, which shell commands install dependencies, and how
//! each long-running service (chain node, storage daemon, backend emulators)
//! is detected, launched and waited for.
//!
//! ## Overrides
//!
//! Every top-level section has a built-in default reproducing the stock
//! environment. A TOML file only needs to name the sections it changes; a
//! named section replaces the built-in one as a whole.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete description of the development environment to bring up
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DevPlan {
    /// Title printed in the welcome banner
    pub banner: String,

    /// Tools that must be on the search path; a missing one aborts the run
    pub required_tools: Vec<ToolRequirement>,

    /// Tools installed on demand when missing
    pub installable_tools: Vec<InstallableTool>,

    /// Dependency install in the project root
    pub root_install: StepSpec,

    /// Dependency install in the nested contracts project
    pub nested_install: StepSpec,

    /// Local blockchain node
    pub chain_node: ServiceSpec,

    /// Contract deployment against the local chain node
    pub deploy: StepSpec,

    /// Content-addressed storage daemon
    pub storage_daemon: ServiceSpec,

    /// Local backend emulator suite
    pub emulators: ServiceSpec,

    /// Web dev server run in the foreground
    pub dev_server: StepSpec,
}

/// A command that must be resolvable before any setup happens
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolRequirement {
    /// Executable name looked up on the search path
    pub command: String,

    /// Name shown to the user when the tool is missing
    pub display_name: String,
}

/// A command that is installed with `install_command` when it is missing
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallableTool {
    /// Executable name looked up on the search path
    pub command: String,

    /// Name shown to the user when the tool is missing
    pub display_name: String,

    /// Shell command that installs the tool
    pub install_command: String,
}

/// A foreground shell command
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    /// Step title printed in the step header
    pub name: String,

    /// Shell command line
    pub command: String,

    /// Working directory relative to the project root (root when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Message printed when the command exits non-zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_hint: Option<String>,
}

/// A long-running process started in its own terminal window
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Human-readable name used in progress messages
    pub name: String,

    /// Shell command line run inside the new terminal
    pub command: String,

    /// Working directory relative to the project root (root when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Optional tool; when set and missing, the service is skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tool: Option<String>,

    /// Lines printed when `required_tool` is missing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_tool_hints: Vec<String>,

    /// How to detect an already running instance; always launched when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness: Option<LivenessCheck>,

    /// How to wait for the service after launching it
    #[serde(default)]
    pub readiness: Readiness,
}

/// Detection of an already running service instance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LivenessCheck {
    /// A process whose command line contains `pattern`
    ProcessMatch {
        /// Fragment matched against the process list
        pattern: String,
    },
    /// A probe command that exits 0 while the service is up
    CommandProbe {
        /// Shell command line of the probe
        command: String,
    },
}

/// Wait strategy after launching a service
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Readiness {
    /// Sleep for a fixed time without verifying anything
    FixedDelay {
        /// Delay in seconds
        secs: u64,
    },
    /// Poll a TCP port until it accepts a connection or the timeout elapses
    #[serde(rename_all = "camelCase")]
    TcpPoll {
        /// Host to connect to
        #[serde(default = "default_poll_host")]
        host: String,
        /// Port to connect to
        port: u16,
        /// Delay between attempts in milliseconds
        #[serde(default = "default_poll_interval_ms")]
        interval_ms: u64,
        /// Upper bound on the whole wait in seconds
        timeout_secs: u64,
    },
}

impl Readiness {
    /// Upper bound on how long this wait may take
    pub fn max_wait(&self) -> Duration {
        match self {
            Readiness::FixedDelay { secs } => Duration::from_secs(*secs),
            Readiness::TcpPoll { timeout_secs, .. } => Duration::from_secs(*timeout_secs),
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::FixedDelay { secs: 5 }
    }
}

fn default_poll_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for DevPlan {
    fn default() -> Self {
        Self {
            banner: "0xM Development Environment Setup".to_string(),
            required_tools: vec![
                ToolRequirement {
                    command: "node".to_string(),
                    display_name: "Node.js".to_string(),
                },
                ToolRequirement {
                    command: "npm".to_string(),
                    display_name: "npm".to_string(),
                },
                ToolRequirement {
                    command: "npx".to_string(),
                    display_name: "npx".to_string(),
                },
            ],
            installable_tools: vec![InstallableTool {
                command: "firebase".to_string(),
                display_name: "Firebase CLI".to_string(),
                install_command: "npm install -g firebase-tools".to_string(),
            }],
            root_install: StepSpec {
                name: "Installing root dependencies".to_string(),
                command: "npm install".to_string(),
                working_dir: None,
                failure_hint: None,
            },
            nested_install: StepSpec {
                name: "Installing blockchain dependencies".to_string(),
                command: "npm install".to_string(),
                working_dir: Some("blockchain".to_string()),
                failure_hint: None,
            },
            chain_node: ServiceSpec {
                name: "Hardhat node".to_string(),
                command: "npx hardhat node".to_string(),
                working_dir: Some("blockchain".to_string()),
                required_tool: None,
                missing_tool_hints: vec![],
                liveness: Some(LivenessCheck::ProcessMatch {
                    pattern: "hardhat node".to_string(),
                }),
                readiness: Readiness::FixedDelay { secs: 10 },
            },
            deploy: StepSpec {
                name: "Deploying contracts to local blockchain".to_string(),
                command: "npx hardhat run scripts/DeployContracts.js --network localhost"
                    .to_string(),
                working_dir: Some("blockchain".to_string()),
                failure_hint: Some(
                    "Contract deployment failed. Check the hardhat node and try again."
                        .to_string(),
                ),
            },
            storage_daemon: ServiceSpec {
                name: "IPFS daemon".to_string(),
                command: "ipfs daemon".to_string(),
                working_dir: None,
                required_tool: Some("ipfs".to_string()),
                missing_tool_hints: vec![
                    "IPFS is not installed. Please install it first if you need IPFS functionality."
                        .to_string(),
                    "Visit https://docs.ipfs.tech/install/command-line/ for installation instructions."
                        .to_string(),
                ],
                liveness: Some(LivenessCheck::ProcessMatch {
                    pattern: "ipfs daemon".to_string(),
                }),
                readiness: Readiness::FixedDelay { secs: 5 },
            },
            emulators: ServiceSpec {
                name: "Firebase emulators".to_string(),
                command: "firebase emulators:start".to_string(),
                working_dir: None,
                required_tool: None,
                missing_tool_hints: vec![],
                liveness: None,
                readiness: Readiness::FixedDelay { secs: 10 },
            },
            dev_server: StepSpec {
                name: "Starting Astro dev server".to_string(),
                command: "npx astro dev".to_string(),
                working_dir: None,
                failure_hint: None,
            },
        }
    }
}

/// Platform family that decides terminal and termination mechanics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// macOS: Terminal.app driven through AppleScript
    MacOs,
    /// Windows: native console windows, forceful kill on cleanup
    Windows,
    /// Linux and other Unix-likes: first available terminal emulator
    Unix,
}

impl Platform {
    /// Platform the binary was compiled for
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Whether cleanup kills forcefully instead of asking the process to exit
    pub fn uses_forceful_kill(&self) -> bool {
        matches!(self, Platform::Windows)
    }
}

/// Ordered stages of a devboot run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Verify mandatory tools and install on-demand ones
    CheckPrerequisites,
    /// Install dependencies in the project root
    InstallRootDeps,
    /// Install dependencies in the nested contracts project
    InstallNestedDeps,
    /// Start the chain node unless already running
    EnsureChainNode,
    /// Deploy contracts to the chain node
    DeployContracts,
    /// Start the storage daemon unless absent or already running
    EnsureStorageDaemon,
    /// Start the backend emulators
    StartEmulators,
    /// Run the dev server in the foreground
    RunDevServer,
    /// Release spawned processes
    Cleanup,
}

impl Stage {
    /// Kebab-case name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CheckPrerequisites => "check-prerequisites",
            Stage::InstallRootDeps => "install-root-deps",
            Stage::InstallNestedDeps => "install-nested-deps",
            Stage::EnsureChainNode => "ensure-chain-node-running",
            Stage::DeployContracts => "deploy-contracts",
            Stage::EnsureStorageDaemon => "ensure-storage-daemon-running",
            Stage::StartEmulators => "start-backend-emulators",
            Stage::RunDevServer => "run-dev-server-foreground",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
