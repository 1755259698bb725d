// error.rs — Error types for the approvals subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from grant and approval-request stores.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// Failed to create the directory holding an event log.
    #[error("failed to create log directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to append to or read an event log.
    #[error("event log I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize an event.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No request with this id exists in the log.
    #[error("unknown approval request: {0}")]
    UnknownRequest(String),

    /// The request has already been approved or rejected.
    #[error("approval request {request_id} is not pending (status: {status})")]
    NotPending { request_id: String, status: String },

    /// The request expired before it was reviewed.
    #[error("approval request {0} has expired")]
    Expired(String),

    /// A scope template name the renderer does not know.
    #[error("unknown scope template: {0}")]
    UnknownTemplate(String),
}
