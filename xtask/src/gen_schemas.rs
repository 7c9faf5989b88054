//! Writes `devplan.schema.json` so editors can validate `devboot.toml`

use anyhow::{Context, Result};
use schema::DevPlan;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the generated plan schema
pub const PLAN_SCHEMA_FILE: &str = "devplan.schema.json";

pub fn run(out_dir: &Path) -> Result<()> {
    let path = write_plan_schema(out_dir)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_plan_schema(out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let schema = schemars::schema_for!(DevPlan);
    let mut json = serde_json::to_string_pretty(&schema).context("serializing plan schema")?;
    json.push('\n');
    let path = out_dir.join(PLAN_SCHEMA_FILE);
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
