//! Error types for the lakehouse demo tooling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring, generating, loading or running SQL.
#[derive(Debug, Error)]
pub enum LakeError {
    /// Configuration file or environment override problem.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// SQL script could not be located.
    #[error("SQL file not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// Statement rejected by the engine and not covered by the error policy.
    #[error("Error executing SQL: {0}")]
    Sql(String),

    /// Any other engine error (connection setup, metadata queries).
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// External process could not be spawned or exited unsuccessfully.
    #[error("Process error: {0}")]
    Process(String),

    /// Expected input data or catalog state is missing.
    #[error("{0}")]
    Missing(String),

    /// Not enough snapshots to compute a change feed.
    #[error("Need at least two snapshots to compare")]
    NotEnoughSnapshots,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, LakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LakeError::ScriptNotFound(PathBuf::from("scripts/missing.sql"));
        assert_eq!(err.to_string(), "SQL file not found: scripts/missing.sql");

        let err = LakeError::NotEnoughSnapshots;
        assert_eq!(err.to_string(), "Need at least two snapshots to compare");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LakeError = io_err.into();
        assert!(matches!(err, LakeError::Io(_)));
    }
}
