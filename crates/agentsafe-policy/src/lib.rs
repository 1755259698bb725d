//! # agentsafe-policy
//!
//! Policy model, evaluator and pluggable decision backends for AgentSafe.
//!
//! A [`Policy`] is a flat allowlist loaded from YAML: commands, filesystem
//! roots, network destinations, environment variables and rate limits,
//! always with `default_decision: deny`. The evaluator is a set of pure,
//! total functions returning [`Decision`] values — a BLOCK is an outcome,
//! not an error. Backends wrap the evaluator behind one async contract so
//! the decision source can be the local YAML policy or a remote
//! OPA-compatible service.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use agentsafe_policy::{load_policy, evaluate_command};
//!
//! let policy = load_policy("policies/demo.yaml").unwrap();
//! let cmd = vec!["ls".to_string(), "-la".to_string()];
//! let decision = evaluate_command(&policy, &cmd, std::path::Path::new("/workspace"));
//! assert!(decision.rule_id.starts_with("cmd_"));
//! ```

pub mod backend;
pub mod error;
pub mod evaluate;
pub mod limiter;
pub mod load;
pub mod model;
pub mod remote;
pub mod signing;

pub use backend::{load_backend, PolicyBackend, YamlPolicyBackend};
pub use error::{PolicyError, SigningError};
pub use evaluate::{
    evaluate_command, evaluate_path, evaluate_url, normalize_path, Decision, DENY_SYSTEM_PATHS,
};
pub use limiter::RateLimiter;
pub use load::load_policy;
pub use model::{
    CommandRule, NetworkMode, NetworkPolicy, PathPolicy, Policy, RateLimitRule, ToolPolicy,
};
pub use remote::RemotePolicyBackend;
pub use signing::{
    build_policy_bundle, verify_bundle_hash, verify_bundle_signature, write_bundle, BundleSignature,
    PolicyBundle,
};
