// error.rs — Error types for the proxy crate.
//
// These are startup/infrastructure failures. Per-request outcomes (BLOCK
// decisions, adapter rejections, upstream 502s) are HTTP responses, not
// errors — the server keeps running.

use thiserror::Error;

use agentsafe_approvals::ApprovalError;
use agentsafe_audit::AuditError;
use agentsafe_policy::PolicyError;

use crate::adapters::AdapterError;

/// Errors that prevent the proxy from starting or serving.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A configured route pattern does not compile.
    #[error("invalid route regex {pattern}: {source}")]
    InvalidRouteRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The outbound HTTP client could not be constructed.
    #[error("http client init failed: {0}")]
    Client(reqwest::Error),

    /// Binding or serving the listen socket failed.
    #[error("proxy server I/O failed: {0}")]
    Serve(#[from] std::io::Error),
}
