// action.rs — Canonical tool-call model.
//
// Gateways speak several payload dialects; adapters normalize all of them
// into a ToolAction before anything touches policy. The original payload
// rides along untouched so audit records can show exactly what arrived.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized tool invocation extracted from a gateway request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAction {
    /// Caller-supplied correlation id ("" when the payload had none).
    pub request_id: String,
    /// Identity initiating the call.
    pub actor: String,
    /// Gateway session the call belongs to ("" when absent).
    pub session_id: String,
    /// Capability name (e.g., "shell.run", "http.fetch").
    pub tool: String,
    /// Tool arguments as a JSON object.
    pub args: Map<String, Value>,
    /// The HTTP route the request arrived on.
    pub route: String,
    /// Free-form gateway context (cwd, env hints, ...).
    pub context: Map<String, Value>,
    /// The payload exactly as received.
    pub raw_payload: Value,
}
