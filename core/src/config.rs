//! Plan loading and validation
//!
//! This module parses a TOML plan file into a `schema::DevPlan`, falls back
//! to the built-in plan for every section the file leaves out, and validates
//! the result with field-path error messages.

use crate::{CoreError, Result};
use schema::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Plan file picked up from the project root when no path is given
pub const DEFAULT_PLAN_FILE: &str = "devboot.toml";

/// Longest readiness wait a plan may ask for, in seconds
pub const MAX_READINESS_SECS: u64 = 24 * 60 * 60;

/// Where the effective plan came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    /// Built-in defaults only
    BuiltIn,
    /// A TOML file layered over the defaults
    File(PathBuf),
}

/// Load a plan from a TOML file path
pub fn load_plan_from_toml_path(path: impl AsRef<Path>) -> Result<DevPlan> {
    let data = fs::read_to_string(&path).map_err(|e| {
        CoreError::ConfigurationError(format!("Failed to read config {:?}: {}", path.as_ref(), e))
    })?;
    load_plan_from_toml_str(&data)
}

/// Load a plan from a TOML string
pub fn load_plan_from_toml_str(input: &str) -> Result<DevPlan> {
    let plan: DevPlan = toml::from_str(input)?;
    validate_plan(&plan)?;
    Ok(plan)
}

/// Resolve the effective plan
///
/// An explicit path must exist. Otherwise `devboot.toml` in `root` is used
/// when present, and the built-in plan when not.
pub fn resolve_plan(explicit: Option<&Path>, root: &Path) -> Result<(DevPlan, PlanSource)> {
    if let Some(path) = explicit {
        let plan = load_plan_from_toml_path(path)?;
        return Ok((plan, PlanSource::File(path.to_path_buf())));
    }
    let candidate = root.join(DEFAULT_PLAN_FILE);
    if candidate.is_file() {
        debug!("Using plan file {}", candidate.display());
        let plan = load_plan_from_toml_path(&candidate)?;
        return Ok((plan, PlanSource::File(candidate)));
    }
    Ok((DevPlan::default(), PlanSource::BuiltIn))
}

/// Render a plan as TOML
pub fn plan_to_toml(plan: &DevPlan) -> Result<String> {
    Ok(toml::to_string_pretty(plan)?)
}

/// Validate a plan and return `Result<()>` with field-path errors
pub fn validate_plan(plan: &DevPlan) -> Result<()> {
    for (i, tool) in plan.required_tools.iter().enumerate() {
        not_blank(&format!("requiredTools[{}].command", i), &tool.command)?;
        not_blank(&format!("requiredTools[{}].displayName", i), &tool.display_name)?;
    }
    for (i, tool) in plan.installable_tools.iter().enumerate() {
        not_blank(&format!("installableTools[{}].command", i), &tool.command)?;
        not_blank(
            &format!("installableTools[{}].installCommand", i),
            &tool.install_command,
        )?;
    }

    validate_step("rootInstall", &plan.root_install)?;
    validate_step("nestedInstall", &plan.nested_install)?;
    validate_step("deploy", &plan.deploy)?;
    validate_step("devServer", &plan.dev_server)?;

    validate_service("chainNode", &plan.chain_node)?;
    validate_service("storageDaemon", &plan.storage_daemon)?;
    validate_service("emulators", &plan.emulators)?;
    Ok(())
}

fn validate_step(field: &str, step: &StepSpec) -> Result<()> {
    not_blank(&format!("{}.name", field), &step.name)?;
    not_blank(&format!("{}.command", field), &step.command)?;
    validate_working_dir(field, step.working_dir.as_deref())
}

fn validate_service(field: &str, svc: &ServiceSpec) -> Result<()> {
    not_blank(&format!("{}.name", field), &svc.name)?;
    not_blank(&format!("{}.command", field), &svc.command)?;
    validate_working_dir(field, svc.working_dir.as_deref())?;

    if let Some(tool) = &svc.required_tool {
        not_blank(&format!("{}.requiredTool", field), tool)?;
    }

    match &svc.liveness {
        Some(LivenessCheck::ProcessMatch { pattern }) => {
            not_blank(&format!("{}.liveness.pattern", field), pattern)?
        }
        Some(LivenessCheck::CommandProbe { command }) => {
            not_blank(&format!("{}.liveness.command", field), command)?
        }
        None => {}
    }

    if let Readiness::TcpPoll {
        host,
        port,
        interval_ms,
        timeout_secs,
    } = &svc.readiness
    {
        not_blank(&format!("{}.readiness.host", field), host)?;
        if *port == 0 {
            return Err(CoreError::ValidationError(format!(
                "{}.readiness.port: must be 1..=65535",
                field
            )));
        }
        if *interval_ms == 0 {
            return Err(CoreError::ValidationError(format!(
                "{}.readiness.intervalMs: must be > 0",
                field
            )));
        }
        if *timeout_secs == 0 {
            return Err(CoreError::ValidationError(format!(
                "{}.readiness.timeoutSecs: must be > 0",
                field
            )));
        }
    }

    if svc.readiness.max_wait().as_secs() > MAX_READINESS_SECS {
        let key = match svc.readiness {
            Readiness::FixedDelay { .. } => "secs",
            Readiness::TcpPoll { .. } => "timeoutSecs",
        };
        return Err(CoreError::ValidationError(format!(
            "{}.readiness.{}: must be at most {}",
            field, key, MAX_READINESS_SECS
        )));
    }
    Ok(())
}

fn validate_working_dir(field: &str, dir: Option<&str>) -> Result<()> {
    if let Some(dir) = dir {
        not_blank(&format!("{}.workingDir", field), dir)?;
        if Path::new(dir).is_absolute() {
            return Err(CoreError::ValidationError(format!(
                "{}.workingDir: must be relative to the project root",
                field
            )));
        }
    }
    Ok(())
}

fn not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!(
            "{}: cannot be empty",
            field
        )));
    }
    Ok(())
}
