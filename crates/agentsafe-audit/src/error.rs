// error.rs — Error types for the audit subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to create the audit directory.
    #[error("failed to create audit directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open, append to, or read the ledger file.
    #[error("ledger I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize an event (should not happen for well-formed events).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Telemetry export to the collector endpoint failed.
    #[error("telemetry export failed: {0}")]
    Export(#[from] reqwest::Error),
}
