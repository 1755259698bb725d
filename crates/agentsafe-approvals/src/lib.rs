//! # agentsafe-approvals
//!
//! Event-sourced capability grants and approval requests for AgentSafe.
//!
//! Both stores in this crate persist nothing but append-only JSONL event
//! logs: issuing, revoking, requesting, approving and rejecting are all
//! appends, and current state is a deterministic fold over the file. A
//! [`Grant`] is active iff it was issued, has not been revoked, and has
//! not expired; [`GrantStore::is_allowed`] matches calls against active
//! grants by actor, tool and scope glob.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use agentsafe_approvals::GrantStore;
//!
//! let grants = GrantStore::new("audit/grants.jsonl").unwrap();
//! grants.issue("openclaw-agent", "run", "curl *", 900, "demo").unwrap();
//! assert!(grants.is_allowed("openclaw-agent", "run", "curl https://openai.com"));
//! ```

pub mod error;
mod eventlog;
pub mod grants;
pub mod requests;
pub mod scope;

pub use error::ApprovalError;
pub use grants::{Grant, GrantStore};
pub use requests::{ApprovalRequest, ApprovalRequestStore, RequestStatus};
pub use scope::render_scope_template;
