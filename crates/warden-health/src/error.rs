//! Error types for health check reporting.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting or loading health reports.
#[derive(Error, Debug)]
pub enum HealthError {
    /// Failed to create the report directory.
    #[error("failed to create directory {path}: {source}")]
    Directory {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Failed to write the report file.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Failed to read a report file.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Source path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Report (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No report path was configured.
    #[error("no report path configured")]
    NoReportPath,
}

/// Result type alias for health operations.
pub type Result<T> = std::result::Result<T, HealthError>;
