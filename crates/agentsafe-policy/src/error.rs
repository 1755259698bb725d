// error.rs — Error types for policy loading, backends and bundle signing.
//
// Uses `thiserror` to derive the standard Rust `Error` trait automatically.
// Note the split: a BLOCK outcome is a `Decision` value, never an error.
// Errors here mean the policy itself (or its signature) could not be
// trusted or understood.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or interpreting a policy file.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file does not exist.
    #[error("policy file not found: {0}")]
    NotFound(PathBuf),

    /// The policy file could not be read.
    #[error("failed to read policy at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid YAML.
    #[error("invalid policy YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field had the wrong shape or an unsupported value.
    #[error("invalid policy: {0}")]
    Invalid(String),

    /// A backend name that the factory does not recognize.
    #[error("unsupported policy backend: {0}")]
    UnsupportedBackend(String),
}

/// Errors raised by policy-bundle hashing and signature verification.
///
/// A well-formed bundle with a signature that simply does not verify is
/// NOT an error — `verify_bundle_signature` returns `Ok(false)` for that.
#[derive(Debug, Error)]
pub enum SigningError {
    /// File I/O on the policy, bundle or key failed.
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Bundle file writing failed.
    #[error("failed to write bundle at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The bundle document is not valid JSON.
    #[error("invalid bundle JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The bundle carries no signature to verify.
    #[error("bundle missing signature")]
    MissingSignature,

    /// The public key is not a PEM-encoded Ed25519 key.
    #[error("public key is not ed25519: {0}")]
    NotEd25519(String),

    /// The signature field is not valid base64.
    #[error("signature is not valid base64")]
    BadSignatureEncoding,
}
