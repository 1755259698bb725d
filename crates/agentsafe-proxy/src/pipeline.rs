// pipeline.rs — The proxy decision pipeline.
//
// Given a normalized ToolAction: classify the tool, run policy over the
// command or URL, check path-like arguments, then gate privileged actions
// on a held approval grant. Every outcome becomes one audit event. The
// pipeline is deliberately separable from the HTTP server so the whole
// contract is testable without sockets.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};

use agentsafe_audit::{AuditEvent, DecisionLabel};
use agentsafe_approvals::GrantStore;
use agentsafe_policy::PolicyBackend;

use crate::action::ToolAction;
use crate::adapters::{AdapterError, AdapterKind};
use crate::config::ProxyConfig;

/// Binaries that escalate a policy-allowed shell action to "privileged":
/// they can exfiltrate data or mutate the system, so they additionally
/// need an approval grant.
const PRIVILEGED_BINARIES: &[&str] = &["curl", "wget", "apt", "apt-get"];

const SHELL_TOOLS: &[&str] = &["shell.run", "run", "command"];
const FETCH_TOOLS: &[&str] = &["http.fetch", "fetch", "browser.fetch"];

/// The pipeline's verdict for one action.
#[derive(Debug, Clone)]
pub struct ProxyEvaluation {
    pub allowed: bool,
    pub reason: String,
    pub rule_id: String,
    pub action: ToolAction,
}

impl ProxyEvaluation {
    fn block(reason: impl Into<String>, rule_id: impl Into<String>, action: ToolAction) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            rule_id: rule_id.into(),
            action,
        }
    }
}

/// Extract the command vector from a shell action's arguments.
///
/// Lists pass through; strings are split with shell quoting rules. An
/// unparseable string yields an empty command, which the pipeline blocks.
pub fn command_from_action(action: &ToolAction) -> Vec<String> {
    let raw = action
        .args
        .get("command")
        .or_else(|| action.args.get("cmd"));
    match raw {
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => shell_words::split(s).unwrap_or_default(),
        Some(other) => shell_words::split(&other.to_string()).unwrap_or_default(),
        None => Vec::new(),
    }
}

/// The canonical description a grant scope is matched against.
pub fn grant_scope_for_action(action: &ToolAction) -> String {
    let lowered = action.tool.to_lowercase();
    if SHELL_TOOLS.contains(&lowered.as_str()) {
        let cmd = command_from_action(action);
        return format!(
            "{} {}",
            action.tool,
            shell_words::join(cmd.iter().map(String::as_str))
        )
        .trim()
        .to_string();
    }
    if FETCH_TOOLS.contains(&lowered.as_str()) {
        let url = action
            .args
            .get("url")
            .map(value_as_display)
            .unwrap_or_default();
        return format!("{} {url}", action.tool).trim().to_string();
    }
    // Deterministic canonical JSON: keys sorted, no whitespace.
    let sorted: BTreeMap<&String, &Value> = action.args.iter().collect();
    format!(
        "{} {}",
        action.tool,
        serde_json::to_string(&sorted).unwrap_or_default()
    )
}

/// Whether the action needs an approval grant on top of policy.
///
/// Fetches always do; shell actions do when the binary can reach the
/// network or install software.
pub fn is_privileged_action(action: &ToolAction) -> bool {
    let lowered = action.tool.to_lowercase();
    if SHELL_TOOLS.contains(&lowered.as_str()) {
        let cmd = command_from_action(action);
        return cmd
            .first()
            .is_some_and(|first| PRIVILEGED_BINARIES.contains(&first.as_str()));
    }
    FETCH_TOOLS.contains(&lowered.as_str())
}

/// Run policy over one action: command allowlist plus path checks for
/// shell, URL allowlist for fetch, BLOCK for any other tool.
pub async fn evaluate_action(
    action: ToolAction,
    backend: &dyn PolicyBackend,
    workspace_root: &Path,
) -> ProxyEvaluation {
    let lowered = action.tool.to_lowercase();

    if SHELL_TOOLS.contains(&lowered.as_str()) {
        let cmd = command_from_action(&action);
        if cmd.is_empty() {
            return ProxyEvaluation::block("empty command", "proxy_empty_cmd", action);
        }

        let decision = backend.evaluate_run(&cmd, workspace_root).await;
        if !decision.allowed {
            return ProxyEvaluation::block(decision.reason, decision.rule_id, action);
        }

        for candidate in cmd[1..]
            .iter()
            .filter(|arg| arg.contains('/') || arg.starts_with('.'))
        {
            let path_decision = backend.evaluate_path(candidate, workspace_root).await;
            if !path_decision.allowed {
                return ProxyEvaluation::block(
                    path_decision.reason,
                    path_decision.rule_id,
                    action,
                );
            }
        }

        return ProxyEvaluation {
            allowed: true,
            reason: decision.reason,
            rule_id: decision.rule_id,
            action,
        };
    }

    if FETCH_TOOLS.contains(&lowered.as_str()) {
        let url = action
            .args
            .get("url")
            .map(value_as_display)
            .unwrap_or_default();
        let decision = backend.evaluate_fetch(&url).await;
        return ProxyEvaluation {
            allowed: decision.allowed,
            reason: decision.reason,
            rule_id: decision.rule_id,
            action,
        };
    }

    ProxyEvaluation::block(
        format!("tool not allowlisted at proxy boundary: {}", action.tool),
        "proxy_tool_block",
        action,
    )
}

/// Full pipeline for one request: adapt, evaluate, grant-gate.
pub async fn process_tool_request(
    path: &str,
    payload: &Value,
    fallback_actor: &str,
    adapter: AdapterKind,
    backend: &dyn PolicyBackend,
    grants: &GrantStore,
    workspace_root: &Path,
) -> Result<ProxyEvaluation, AdapterError> {
    let action = adapter.adapt(path, payload, fallback_actor)?;
    let evaluation = evaluate_action(action, backend, workspace_root).await;

    if evaluation.allowed && is_privileged_action(&evaluation.action) {
        let scope = grant_scope_for_action(&evaluation.action);
        if !grants.is_allowed(&evaluation.action.actor, &evaluation.action.tool, &scope) {
            return Ok(ProxyEvaluation::block(
                "proxy approval grant required",
                "proxy_approval_required",
                evaluation.action,
            ));
        }
    }

    Ok(evaluation)
}

/// The audit record for one proxy decision.
pub fn build_audit_event(
    evaluation: &ProxyEvaluation,
    config: &ProxyConfig,
    request_id: &str,
) -> AuditEvent {
    let action = &evaluation.action;
    AuditEvent::new(
        request_id,
        &action.actor,
        "proxy",
        format!("route={} tool={}", action.route, action.tool),
        if evaluation.allowed {
            DecisionLabel::Allow
        } else {
            DecisionLabel::Block
        },
        &evaluation.reason,
        &evaluation.rule_id,
    )
    .with_proxy(json!({
        "route": action.route,
        "tool": action.tool,
        "args": action.args,
        "session_id": action.session_id,
        "upstream": config.upstream,
        "policy_backend": config.policy_backend,
        "adapter": config.adapter,
    }))
}

fn value_as_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
