//! TPC-H data generation through the external generator CLI.

use std::fs;
use std::process::{Command, Stdio};

use crate::config::TpchConfig;
use crate::error::{LakeError, Result};

/// A fully resolved generator command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl GeneratorInvocation {
    /// Build the command line for the configured tables, optionally a single part.
    pub fn from_config(config: &TpchConfig, part: Option<u32>) -> Result<Self> {
        let (program, prefix) = config
            .generator
            .command
            .split_first()
            .ok_or_else(|| LakeError::Configuration("generator.command must not be empty".to_string()))?;

        let mut args: Vec<String> = prefix.to_vec();
        args.extend([
            "-s".to_string(),
            config.scale.to_string(),
            "--tables".to_string(),
            config.tables.join(","),
            "--format".to_string(),
            "parquet".to_string(),
            "--parts".to_string(),
            config.parts.to_string(),
            "--parquet-row-group-bytes".to_string(),
            config.parquet.row_group_bytes.to_string(),
            "--output-dir".to_string(),
            config.output_dir.display().to_string(),
        ]);

        if let Some(part) = part {
            if part == 0 || part > config.parts {
                return Err(LakeError::Configuration(format!(
                    "--part must be between 1 and {}, got {}",
                    config.parts, part
                )));
            }
            args.push("--part".to_string());
            args.push(part.to_string());
        }

        Ok(Self {
            program: program.clone(),
            args,
        })
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the generator with inherited stdio, failing on a nonzero exit.
    pub fn run(&self) -> Result<()> {
        tracing::info!(command = %self.display(), "Running TPC-H generator");

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|e| {
                LakeError::Process(format!(
                    "Failed to spawn '{}': {}. Is the generator installed?",
                    self.program, e
                ))
            })?;

        if !status.success() {
            return Err(LakeError::Process(format!(
                "'{}' failed with status: {}",
                self.display(),
                status
            )));
        }
        Ok(())
    }
}

/// Create the output directory and run the generator.
pub fn generate(config: &TpchConfig, part: Option<u32>) -> Result<GeneratorInvocation> {
    let invocation = GeneratorInvocation::from_config(config, part)?;
    fs::create_dir_all(&config.output_dir)?;
    invocation.run()?;
    Ok(invocation)
}

/// Run `<command> --version` and return the first line it prints.
pub fn probe_version(command: &[String]) -> Result<String> {
    let (program, prefix) = command
        .split_first()
        .ok_or_else(|| LakeError::Configuration("command must not be empty".to_string()))?;

    let output = Command::new(program)
        .args(prefix)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| LakeError::Process(format!("'{}' not found: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LakeError::Process(format!(
            "'{} --version' failed: {}",
            command.join(" "),
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}
