// adapters/mod.rs — Request adapters and the adapter registry.
//
// Each adapter is a pure function (path, payload, fallback_actor) →
// ToolAction. The strict adapters reject anything that deviates from
// their contract; the generic adapter is lossy best-effort for legacy
// payloads; the auto adapter routes strict-first and falls back. The set
// is a closed sum type — adapters are selected by configuration, never
// registered dynamically.

mod generic;
mod light_gateway;
mod strict_v1;
mod strict_v2;

use serde_json::Value;
use thiserror::Error;

use crate::action::ToolAction;

pub use generic::parse_generic_request;
pub use light_gateway::parse_execute_request;
pub use strict_v1::parse_strict_v1_request;
pub use strict_v2::parse_strict_v2_request;

/// Structural problems with an incoming payload. The proxy maps these to
/// HTTP 400; the inline CLI never sees them.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("missing required fields: {0}")]
    MissingFields(String),

    #[error("{field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unsupported {adapter} route: {route}")]
    UnsupportedRoute {
        adapter: &'static str,
        route: String,
    },

    #[error("unsupported openclaw_version: {0}")]
    UnsupportedVersion(String),

    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),
}

/// The configured adapter variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    LightGateway,
    OpenclawStrictV1,
    OpenclawStrictV2,
    OpenclawGeneric,
    OpenclawAuto,
}

impl AdapterKind {
    /// Resolve a configured adapter name.
    pub fn parse(name: &str) -> Result<Self, AdapterError> {
        match name {
            "light_gateway" => Ok(Self::LightGateway),
            "openclaw_strict_v1" => Ok(Self::OpenclawStrictV1),
            "openclaw_strict_v2" => Ok(Self::OpenclawStrictV2),
            "openclaw_generic" => Ok(Self::OpenclawGeneric),
            "openclaw_auto" => Ok(Self::OpenclawAuto),
            other => Err(AdapterError::UnknownAdapter(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LightGateway => "light_gateway",
            Self::OpenclawStrictV1 => "openclaw_strict_v1",
            Self::OpenclawStrictV2 => "openclaw_strict_v2",
            Self::OpenclawGeneric => "openclaw_generic",
            Self::OpenclawAuto => "openclaw_auto",
        }
    }

    /// Normalize a payload with this adapter.
    pub fn adapt(
        &self,
        path: &str,
        payload: &Value,
        fallback_actor: &str,
    ) -> Result<ToolAction, AdapterError> {
        match self {
            Self::LightGateway => parse_execute_request(path, payload, fallback_actor),
            Self::OpenclawStrictV1 => parse_strict_v1_request(path, payload, fallback_actor),
            Self::OpenclawStrictV2 => parse_strict_v2_request(path, payload, fallback_actor),
            Self::OpenclawGeneric => Ok(parse_generic_request(path, payload, fallback_actor)),
            Self::OpenclawAuto => Ok(parse_auto_request(path, payload, fallback_actor)),
        }
    }
}

/// Strict-first adapter routing.
///
/// Tries strict v2 for v2 routes/payloads, then strict v1, and falls back
/// to generic extraction so the proxy stays usable across mixed gateway
/// payloads. The generic adapter cannot fail, so neither can this.
pub fn parse_auto_request(path: &str, payload: &Value, fallback_actor: &str) -> ToolAction {
    let version = payload.get("openclaw_version").and_then(Value::as_str);

    if path == "/v2/tools/execute" || version == Some("v2") {
        if let Ok(action) = parse_strict_v2_request(path, payload, fallback_actor) {
            return action;
        }
    }
    if path == "/v1/tools/execute" || version == Some("v1") {
        if let Ok(action) = parse_strict_v1_request(path, payload, fallback_actor) {
            return action;
        }
    }
    parse_generic_request(path, payload, fallback_actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_resolves_known_names() {
        for name in [
            "light_gateway",
            "openclaw_strict_v1",
            "openclaw_strict_v2",
            "openclaw_generic",
            "openclaw_auto",
        ] {
            assert_eq!(AdapterKind::parse(name).unwrap().name(), name);
        }
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let err = AdapterKind::parse("grpc_gateway").unwrap_err();
        assert!(matches!(err, AdapterError::UnknownAdapter(_)));
    }

    #[test]
    fn auto_prefers_strict_v2_on_v2_route() {
        let payload = json!({
            "request_id": "r-1",
            "action": {"name": "shell.run", "args": {"command": "ls"}},
        });
        let action = parse_auto_request("/v2/tools/execute", &payload, "fallback");
        assert_eq!(action.tool, "shell.run");
        assert_eq!(action.request_id, "r-1");
    }

    #[test]
    fn auto_prefers_strict_v1_on_v1_route() {
        let payload = json!({
            "request_id": "r-2",
            "tool": "http.fetch",
            "args": {"url": "https://example.com"},
        });
        let action = parse_auto_request("/v1/tools/execute", &payload, "fallback");
        assert_eq!(action.tool, "http.fetch");
    }

    #[test]
    fn auto_falls_back_to_generic_on_strict_error() {
        // v1 route but missing required fields — strict fails, generic copes.
        let payload = json!({"name": "shell.run", "input": {"command": "ls"}});
        let action = parse_auto_request("/v1/tools/execute", &payload, "fallback");
        assert_eq!(action.tool, "shell.run");
        assert_eq!(action.request_id, "proxy-generated");
        assert_eq!(action.actor, "fallback");
    }

    #[test]
    fn auto_on_marked_payload_with_wrong_route_degrades_to_generic() {
        let payload = json!({
            "openclaw_version": "v1",
            "request_id": "r-3",
            "tool": "shell.run",
            "args": {"command": "ls"},
        });
        // The payload claims v1 but the route is not the strict v1 route,
        // so the strict adapter refuses and generic extraction takes over.
        let action = parse_auto_request("/gateway/tools/execute", &payload, "fallback");
        assert_eq!(action.tool, "shell.run");
        assert_eq!(action.request_id, "r-3");
        assert_eq!(action.route, "/gateway/tools/execute");
    }
}
