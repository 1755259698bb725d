// remote.rs — OPA-style remote decision backend.
//
// POSTs {"input": {"action": ..., "policy": ...}} to
// <base>/v1/data/<decision_path> and maps the result document onto a
// Decision. Every failure mode — unconfigured base URL, network error,
// malformed response — collapses to a BLOCK with its own rule id, never to
// an implicit allow.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::backend::PolicyBackend;
use crate::error::PolicyError;
use crate::evaluate::{normalize_path, Decision};
use crate::load::load_policy;
use crate::model::{NetworkMode, Policy};

/// Remote decision calls are short-fused: a slow policy service must not
/// stall the enforcement point for longer than this.
const REMOTE_TIMEOUT: Duration = Duration::from_secs(8);

const DEFAULT_DECISION_PATH: &str = "agentsafe/evaluate";

/// Backend that defers decisions to a remote OPA-compatible service.
///
/// The local policy is still loaded and shipped with every query so the
/// service evaluates against the same document the operator deployed.
pub struct RemotePolicyBackend {
    policy: Policy,
    base_url: Option<String>,
    decision_path: String,
    client: reqwest::Client,
}

impl RemotePolicyBackend {
    pub fn new(
        policy_path: impl AsRef<Path>,
        base_url: Option<String>,
        decision_path: Option<String>,
    ) -> Result<Self, PolicyError> {
        let policy = load_policy(policy_path)?;
        let client = reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(|e| PolicyError::Invalid(format!("http client init failed: {e}")))?;
        let decision_path = decision_path
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_DECISION_PATH.to_string());
        Ok(Self {
            policy,
            base_url: base_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            decision_path,
            client,
        })
    }

    /// Construct from `AGENTSAFE_OPA_URL` / `AGENTSAFE_OPA_DECISION_PATH`.
    pub fn from_env(policy_path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        Self::new(
            policy_path,
            std::env::var("AGENTSAFE_OPA_URL").ok(),
            std::env::var("AGENTSAFE_OPA_DECISION_PATH").ok(),
        )
    }

    async fn query(&self, action: serde_json::Value) -> Decision {
        let Some(base) = &self.base_url else {
            return Decision::block(
                "remote backend configured but AGENTSAFE_OPA_URL is not set",
                "remote_not_configured",
            );
        };
        let endpoint = format!("{}/v1/data/{}", base.trim_end_matches('/'), self.decision_path);
        let input = json!({"input": {"action": action, "policy": self.policy}});

        let response = match self.client.post(&endpoint).json(&input).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "remote decision query failed");
                return Decision::block(format!("remote query failed: {e}"), "remote_query_failed");
            }
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                return Decision::block(format!("remote query failed: {e}"), "remote_query_failed")
            }
        };
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(_) => {
                return Decision::block("remote response was not valid JSON", "remote_bad_result")
            }
        };

        match body.get("result") {
            Some(serde_json::Value::Bool(allowed)) => Decision {
                allowed: *allowed,
                reason: "boolean decision".to_string(),
                rule_id: "remote_boolean".to_string(),
            },
            Some(serde_json::Value::Object(result)) => {
                let allowed = result
                    .get("allow")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                let reason = result
                    .get("reason")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        if allowed {
                            "remote allow".to_string()
                        } else {
                            "remote deny".to_string()
                        }
                    });
                let rule_id = result
                    .get("rule_id")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| "remote_decision".to_string());
                Decision {
                    allowed,
                    reason,
                    rule_id,
                }
            }
            _ => Decision::block("remote result missing decision object", "remote_bad_result"),
        }
    }
}

#[async_trait]
impl PolicyBackend for RemotePolicyBackend {
    async fn evaluate_run(&self, cmd: &[String], workspace_root: &Path) -> Decision {
        self.query(json!({
            "type": "run",
            "cmd": cmd,
            "workspace_root": workspace_root,
        }))
        .await
    }

    async fn evaluate_path(&self, candidate: &str, workspace_root: &Path) -> Decision {
        self.query(json!({
            "type": "path",
            "candidate": candidate,
            "normalized": normalize_path(candidate, workspace_root),
            "workspace_root": workspace_root,
        }))
        .await
    }

    async fn evaluate_fetch(&self, url: &str) -> Decision {
        let components = match url::Url::parse(url) {
            Ok(parsed) => json!({
                "type": "fetch",
                "scheme": parsed.scheme(),
                "host": parsed.host_str().unwrap_or(""),
                "port": parsed.port_or_known_default().unwrap_or(443),
                "url": url,
            }),
            Err(_) => json!({"type": "fetch", "scheme": "", "host": "", "port": 0, "url": url}),
        };
        self.query(components).await
    }

    fn env_allowlist(&self) -> &[String] {
        &self.policy.tools.env_allowlist
    }

    fn network_mode(&self) -> NetworkMode {
        self.policy.tools.network.mode
    }
}
