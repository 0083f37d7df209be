//! Demo configuration.
//!
//! Loaded from a YAML file (default `config/tpch.yaml`) and then overridden
//! from the environment:
//! - `TPCH_SCALE`: TPC-H scale factor
//! - `TPCH_PARTS`: number of output parts per table
//! - `TPCH_TABLES`: comma-separated table list

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LakeError, Result};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/tpch.yaml";

/// TPC-H generation and lakehouse settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpchConfig {
    /// Scale factor passed to the generator.
    #[serde(default = "default_scale")]
    pub scale: u32,

    /// Number of parts each table is split into.
    #[serde(default = "default_parts")]
    pub parts: u32,

    /// Tables to generate.
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// Directory the generator writes Parquet files to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub parquet: ParquetConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub lake: LakeConfig,
}

/// Parquet writer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetConfig {
    /// Target row group size in bytes.
    #[serde(default = "default_row_group_bytes")]
    pub row_group_bytes: u64,
}

/// External data generator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Program and leading arguments, e.g. `["uv", "run", "tpchgen-cli"]`.
    #[serde(default = "default_generator_command")]
    pub command: Vec<String>,
}

/// DuckLake catalog location and attach settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakeConfig {
    /// Name the catalog is attached under.
    #[serde(default = "default_alias")]
    pub alias: String,

    /// DuckLake metadata database file.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Directory DuckLake writes table data files to.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Directory holding the SQL scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
}

fn default_scale() -> u32 {
    1
}

fn default_parts() -> u32 {
    10
}

fn default_tables() -> Vec<String> {
    vec!["lineitem".to_string(), "orders".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/tpch")
}

fn default_row_group_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_generator_command() -> Vec<String> {
    vec!["uv".to_string(), "run".to_string(), "tpchgen-cli".to_string()]
}

fn default_alias() -> String {
    "lake".to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog/ducklake.ducklake")
}

fn default_data_path() -> String {
    "data/lake/".to_string()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            row_group_bytes: default_row_group_bytes(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: default_generator_command(),
        }
    }
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            catalog_path: default_catalog_path(),
            data_path: default_data_path(),
            scripts_dir: default_scripts_dir(),
        }
    }
}

impl Default for TpchConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            parts: default_parts(),
            tables: default_tables(),
            output_dir: default_output_dir(),
            parquet: ParquetConfig::default(),
            generator: GeneratorConfig::default(),
            lake: LakeConfig::default(),
        }
    }
}

impl LakeConfig {
    /// Sidecar directory DuckLake keeps next to the catalog file.
    pub fn catalog_files_path(&self) -> PathBuf {
        let mut path = self.catalog_path.clone().into_os_string();
        path.push(".files");
        PathBuf::from(path)
    }
}

impl TpchConfig {
    /// Load the YAML file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LakeError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            scale = config.scale,
            parts = config.parts,
            tables = ?config.tables,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Like [`TpchConfig::load`], but a missing file falls back to defaults
    /// (still subject to environment overrides).
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        tracing::warn!(path = %path.display(), "Configuration file not found, using defaults");
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text, expanding `~` in path settings.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: TpchConfig = serde_yaml::from_str(content)?;
        config.output_dir = expand_path(&config.output_dir);
        config.lake.catalog_path = expand_path(&config.lake.catalog_path);
        config.lake.scripts_dir = expand_path(&config.lake.scripts_dir);
        config.lake.data_path = shellexpand::tilde(&config.lake.data_path).into_owned();
        Ok(config)
    }

    /// Apply `TPCH_SCALE`, `TPCH_PARTS` and `TPCH_TABLES` using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(scale) = lookup("TPCH_SCALE") {
            self.scale = parse_number("TPCH_SCALE", &scale)?;
        }
        if let Some(parts) = lookup("TPCH_PARTS") {
            self.parts = parse_number("TPCH_PARTS", &parts)?;
        }
        if let Some(tables) = lookup("TPCH_TABLES") {
            let tables: Vec<String> = tables
                .split(',')
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
                .collect();
            if !tables.is_empty() {
                self.tables = tables;
            }
        }
        Ok(())
    }

    /// Reject settings the generator or catalog cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.scale == 0 {
            return Err(LakeError::Configuration("scale must be greater than zero".to_string()));
        }
        if self.parts == 0 {
            return Err(LakeError::Configuration("parts must be greater than zero".to_string()));
        }
        if self.tables.is_empty() {
            return Err(LakeError::Configuration("at least one table is required".to_string()));
        }
        if self.generator.command.is_empty() {
            return Err(LakeError::Configuration("generator.command must not be empty".to_string()));
        }
        if self.lake.alias.is_empty() || !self.lake.alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(LakeError::Configuration(format!(
                "lake.alias '{}' must be a plain identifier",
                self.lake.alias
            )));
        }
        Ok(())
    }

    /// Directory holding the generated Parquet files of one table.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.output_dir.join(table)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| LakeError::Configuration(format!("{} must be a positive integer, got '{}'", key, value)))
}
