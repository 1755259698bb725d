// event.rs — Audit event data model.
//
// One event per decision: who asked for what, what the verdict was, which
// rule produced it, and — depending on the execution context — sandbox
// metadata, touched files, network attempts and output previews. Events
// are JSON lines; absent sections are skipped entirely so records stay
// compact and old readers keep working as fields are added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The verdict recorded for a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionLabel {
    Allow,
    Block,
}

/// Sandbox execution metadata attached to inline-mode events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_mount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
}

/// A single audit event — one line in `ledger.jsonl`.
///
/// The ledger stamps `timestamp` on write; callers normally leave it unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Correlates the event with the originating tool call.
    pub request_id: String,

    /// Identity that initiated the call (e.g., "openclaw-agent").
    pub actor: String,

    /// The capability involved ("run", "fetch", "proxy", ...).
    pub tool: String,

    /// Human-readable one-line summary of the arguments.
    pub args_summary: String,

    pub decision: DecisionLabel,
    pub reason: String,
    pub rule_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxInfo>,

    /// Egress observed (or attempted) while serving the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_attempts: Option<Vec<serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_touched: Option<Vec<String>>,

    /// Proxy-mode context (route, tool, upstream, adapter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_preview: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_preview: Option<String>,
}

impl AuditEvent {
    /// Create an event with the required fields; optional sections are
    /// attached with the `with_*` builders.
    pub fn new(
        request_id: impl Into<String>,
        actor: impl Into<String>,
        tool: impl Into<String>,
        args_summary: impl Into<String>,
        decision: DecisionLabel,
        reason: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: None,
            request_id: request_id.into(),
            actor: actor.into(),
            tool: tool.into(),
            args_summary: args_summary.into(),
            decision,
            reason: reason.into(),
            rule_id: rule_id.into(),
            sandbox: None,
            network_attempts: None,
            files_touched: None,
            proxy: None,
            stdout_preview: None,
            stderr_preview: None,
        }
    }

    pub fn with_sandbox(mut self, sandbox: SandboxInfo) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_network_attempts(mut self, attempts: Vec<serde_json::Value>) -> Self {
        self.network_attempts = Some(attempts);
        self
    }

    pub fn with_files_touched(mut self, files: Vec<String>) -> Self {
        self.files_touched = Some(files);
        self
    }

    pub fn with_proxy(mut self, proxy: serde_json::Value) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_output_previews(
        mut self,
        stdout_preview: impl Into<String>,
        stderr_preview: impl Into<String>,
    ) -> Self {
        self.stdout_preview = Some(stdout_preview.into());
        self.stderr_preview = Some(stderr_preview.into());
        self
    }
}
