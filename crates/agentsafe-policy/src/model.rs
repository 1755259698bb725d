// model.rs — Policy data model.
//
// A Policy is the typed form of a policy YAML file: an allowlist of
// commands, filesystem roots, network destinations, environment variables
// and rate limits. It is immutable once loaded — every mutation happens by
// loading a new file, never by editing the structure in place.

use serde::{Deserialize, Serialize};

/// A single allowlisted command.
///
/// Rules are evaluated in declaration order; the first rule whose binary
/// matches (and whose `arg_regex`, if present, matches the shell-joined
/// arguments) wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandRule {
    /// Basename of the binary (e.g., "ls", "curl").
    pub binary: String,
    /// Optional regex searched against the shell-quoted argument string.
    pub arg_regex: Option<String>,
    /// Identifier reported in ALLOW decisions (defaults to `cmd_<index>`).
    pub rule_id: String,
}

/// Filesystem allow/deny roots. Entries may contain `~` and `$HOME`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathPolicy {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

/// Whether sandboxed commands get network access, and through what.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// No network at all — every URL is blocked and sandboxes run detached.
    #[default]
    None,
    /// Egress permitted through the allowlisting proxy only.
    AllowProxy,
}

impl NetworkMode {
    /// The string form used in audit records and sandbox configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::None => "none",
            NetworkMode::AllowProxy => "allow_proxy",
        }
    }
}

/// Network egress allowlist: domains (exact or proper suffix) and ports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkPolicy {
    pub mode: NetworkMode,
    pub domains: Vec<String>,
    pub ports: Vec<u16>,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            mode: NetworkMode::None,
            domains: Vec::new(),
            ports: vec![443],
        }
    }
}

/// Token-bucket parameters for one request category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitRule {
    pub category: String,
    pub capacity: u32,
    pub refill_per_sec: f64,
}

/// The tool-facing sections of a policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolPolicy {
    pub commands: Vec<CommandRule>,
    pub paths: PathPolicy,
    pub env_allowlist: Vec<String>,
    pub network: NetworkPolicy,
    pub rate_limits: Vec<RateLimitRule>,
}

/// A loaded policy. `default_decision` is always "deny" — the loader
/// rejects anything else, so an absent rule can never allow an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub policy_id: String,
    pub default_decision: String,
    pub tools: ToolPolicy,
}
