//! # agentsafe-audit
//!
//! Append-only decision ledger for AgentSafe.
//!
//! Every ALLOW/BLOCK decision — inline or at the proxy — is recorded as an
//! [`AuditEvent`] in a JSONL ledger. Records are never mutated; readers
//! tolerate malformed lines so one bad record cannot hide the rest of the
//! trail. A markdown report and an OTLP-style export sit on top of the
//! same file.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use agentsafe_audit::{AuditLedger, AuditEvent, DecisionLabel};
//!
//! let ledger = AuditLedger::new("audit").unwrap();
//! let event = AuditEvent::new(
//!     ledger.new_request_id(),
//!     "openclaw-agent",
//!     "run",
//!     "ls -la",
//!     DecisionLabel::Allow,
//!     "command allowed: ls",
//!     "cmd_ls",
//! );
//! ledger.write_event(event).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod ledger;
pub mod render;
pub mod telemetry;

pub use error::AuditError;
pub use event::{AuditEvent, DecisionLabel, SandboxInfo};
pub use ledger::AuditLedger;
pub use render::render_markdown_report;
pub use telemetry::export_ledger_to_otel;
