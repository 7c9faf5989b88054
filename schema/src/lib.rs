//! Schema definitions for devboot
//!
//! This crate contains the data structures shared by the orchestrator core,
//! the CLI and the schema generator. All types here implement JSON Schema
//! generation so the plan file format can be published.

pub mod plan;

#[cfg(test)]
mod toml_roundtrip_tests;

pub use plan::*;
