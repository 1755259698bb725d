// backend.rs — Pluggable decision backends.
//
// Two backends satisfy one contract: the local backend runs the pure
// evaluator over a loaded policy file; the remote backend defers the
// decision to an OPA-style HTTP service. The trait is async because the
// remote variant performs network I/O; the local one just never awaits.

use std::path::Path;

use async_trait::async_trait;

use crate::error::PolicyError;
use crate::evaluate::{evaluate_command, evaluate_path, evaluate_url, Decision};
use crate::load::load_policy;
use crate::model::{NetworkMode, Policy};
use crate::remote::RemotePolicyBackend;

/// The fixed operation set every decision source implements.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Decide whether a command may run.
    async fn evaluate_run(&self, cmd: &[String], workspace_root: &Path) -> Decision;

    /// Decide whether a filesystem path may be touched.
    async fn evaluate_path(&self, candidate: &str, workspace_root: &Path) -> Decision;

    /// Decide whether a URL may be fetched.
    async fn evaluate_fetch(&self, url: &str) -> Decision;

    /// Environment variables that may pass into the sandbox.
    fn env_allowlist(&self) -> &[String];

    /// Network posture for sandboxed execution.
    fn network_mode(&self) -> NetworkMode;
}

/// Local backend: delegates to the pure evaluator over a YAML policy.
pub struct YamlPolicyBackend {
    policy: Policy,
}

impl YamlPolicyBackend {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        Ok(Self::new(load_policy(path)?))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}

#[async_trait]
impl PolicyBackend for YamlPolicyBackend {
    async fn evaluate_run(&self, cmd: &[String], workspace_root: &Path) -> Decision {
        evaluate_command(&self.policy, cmd, workspace_root)
    }

    async fn evaluate_path(&self, candidate: &str, workspace_root: &Path) -> Decision {
        evaluate_path(&self.policy, candidate, workspace_root)
    }

    async fn evaluate_fetch(&self, url: &str) -> Decision {
        evaluate_url(&self.policy, url)
    }

    fn env_allowlist(&self) -> &[String] {
        &self.policy.tools.env_allowlist
    }

    fn network_mode(&self) -> NetworkMode {
        self.policy.tools.network.mode
    }
}

/// Resolve a backend by its configured name ("yaml" or "opa").
pub fn load_backend(
    kind: &str,
    policy_path: impl AsRef<Path>,
) -> Result<Box<dyn PolicyBackend>, PolicyError> {
    match kind {
        "yaml" => Ok(Box::new(YamlPolicyBackend::from_path(policy_path)?)),
        "opa" => Ok(Box::new(RemotePolicyBackend::from_env(policy_path)?)),
        other => Err(PolicyError::UnsupportedBackend(other.to_string())),
    }
}
