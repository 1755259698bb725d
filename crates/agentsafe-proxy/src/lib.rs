//! # agentsafe-proxy
//!
//! Policy-enforcing reverse proxy for agent gateway tool calls.
//!
//! The proxy sits between an agent and its gateway. Incoming requests on
//! tool routes are normalized by an adapter into a [`ToolAction`], run
//! through the policy backend, gated on approval grants when privileged,
//! audited, and only then forwarded upstream. Non-tool routes pass
//! through untouched. Control flow per request:
//!
//! route match → adapt → evaluate → grant check → audit → forward
//!
//! The pipeline ([`process_tool_request`]) is independent of the HTTP
//! layer so the full decision contract is unit-testable.

pub mod action;
pub mod adapters;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;

pub use action::ToolAction;
pub use adapters::{AdapterError, AdapterKind};
pub use config::{ProxyConfig, RouteMatcher, DEFAULT_TOOL_PATH_REGEXES};
pub use error::ProxyError;
pub use pipeline::{
    build_audit_event, command_from_action, evaluate_action, grant_scope_for_action,
    is_privileged_action, process_tool_request, ProxyEvaluation,
};
pub use server::{router, run_proxy, ProxyState};
