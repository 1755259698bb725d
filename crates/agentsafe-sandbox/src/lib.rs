//! # agentsafe-sandbox
//!
//! Ephemeral Docker execution for AgentSafe inline mode.
//!
//! The enforcement core treats the sandbox as an opaque runner: it hands
//! over an allowlisted command, a workspace mount and a filtered
//! environment, and gets back stdout/stderr and an exit code. Containers
//! are single-shot (`--rm`), read-only, capability-dropped, and detached
//! from the network unless the policy's allow-proxy mode is active.

pub mod runner;

pub use runner::{DockerSandboxRunner, SandboxError, SandboxResult};
