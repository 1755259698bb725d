// config.rs — Proxy configuration and route inspection gate.
//
// Everything is environment-driven so the proxy can sit in front of an
// agent gateway without a config file. Only paths matching one of the
// configured regexes are policy-evaluated; everything else is presumed
// not to be a tool call and forwarded untouched.

use std::path::PathBuf;

use regex::Regex;

use crate::error::ProxyError;

/// Routes inspected by default: the OpenClaw execute endpoints plus the
/// generic gateway tool namespace.
pub const DEFAULT_TOOL_PATH_REGEXES: &str =
    r"^/v1/tools/execute$,^/gateway/tools/execute$,^/api/tools/.+";

/// Static configuration for one proxy process.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the upstream agent gateway.
    pub upstream: String,
    /// Path to the policy YAML file.
    pub policy_path: String,
    /// Decision backend name ("yaml" or "opa").
    pub policy_backend: String,
    /// Workspace root for path evaluation.
    pub workspace: String,
    /// Regexes selecting which routes are tool calls.
    pub path_regexes: Vec<String>,
    /// Adapter name used to normalize payloads.
    pub adapter: String,
    /// Header carrying the calling agent's identity.
    pub actor_header: String,
    /// Directory holding the ledger and grant log.
    pub audit_dir: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream: "http://openclaw:3333".to_string(),
            policy_path: "policies/demo-openclaw.yaml".to_string(),
            policy_backend: "yaml".to_string(),
            workspace: ".".to_string(),
            path_regexes: split_csv(DEFAULT_TOOL_PATH_REGEXES),
            adapter: "openclaw_generic".to_string(),
            actor_header: "X-Agent-Actor".to_string(),
            audit_dir: PathBuf::from("audit"),
        }
    }
}

impl ProxyConfig {
    /// Materialize configuration from `AGENTSAFE_*` environment variables,
    /// falling back to the documented defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upstream: env_or("AGENTSAFE_UPSTREAM_URL", defaults.upstream),
            policy_path: env_or("AGENTSAFE_POLICY", defaults.policy_path),
            policy_backend: env_or("AGENTSAFE_POLICY_BACKEND", defaults.policy_backend),
            workspace: env_or("AGENTSAFE_WORKSPACE", defaults.workspace),
            path_regexes: std::env::var("AGENTSAFE_PROXY_TOOL_PATH_REGEX")
                .map(|csv| split_csv(&csv))
                .unwrap_or(defaults.path_regexes),
            adapter: env_or("AGENTSAFE_PROXY_ADAPTER", defaults.adapter),
            actor_header: env_or("AGENTSAFE_ACTOR_HEADER", defaults.actor_header),
            audit_dir: defaults.audit_dir,
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn split_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compiled route gate.
#[derive(Debug)]
pub struct RouteMatcher {
    regexes: Vec<Regex>,
}

impl RouteMatcher {
    /// Compile the configured patterns; an invalid pattern is a startup
    /// error, not a silently-open route.
    pub fn new(patterns: &[String]) -> Result<Self, ProxyError> {
        let mut regexes = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            regexes.push(Regex::new(pattern).map_err(|source| ProxyError::InvalidRouteRegex {
                pattern: pattern.clone(),
                source,
            })?);
        }
        Ok(Self { regexes })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(path))
    }
}
