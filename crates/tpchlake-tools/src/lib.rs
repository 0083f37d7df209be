//! tpchlake tool library
//!
//! Building blocks for the DuckLake TPC-H demo.
//!
//! This crate provides:
//! - YAML configuration with environment overrides
//! - SQL script loading, placeholder substitution and statement splitting
//! - A script executor with strict and lenient error policies
//! - DuckLake session setup, small-file loading and snapshot discovery
//! - Generator invocation, preflight checks and cleanup

pub mod clean;
pub mod config;
pub mod error;
pub mod executor;
pub mod generator;
pub mod loader;
pub mod preflight;
pub mod render;
pub mod script;
pub mod session;
pub mod snapshots;

pub use config::{LakeConfig, TpchConfig, DEFAULT_CONFIG_PATH};
pub use error::{LakeError, Result};
pub use executor::{ErrorPolicy, ExecutionReport, ScriptExecutor};
pub use script::Variables;
pub use session::LakeSession;
pub use snapshots::{SnapshotRange, VersionOverrides};
