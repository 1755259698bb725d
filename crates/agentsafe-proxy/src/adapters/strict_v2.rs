// adapters/strict_v2.rs — Strict adapter for the OpenClaw v2 dialect.
//
// v2 nests the invocation under an `action` object: the tool name is
// `action.name` and the arguments are `action.args`. Bound to the
// /v2/tools/execute route and the "v2" version marker.

use serde_json::{Map, Value};

use super::AdapterError;
use crate::action::ToolAction;

pub fn parse_strict_v2_request(
    path: &str,
    payload: &Value,
    fallback_actor: &str,
) -> Result<ToolAction, AdapterError> {
    if path != "/v2/tools/execute" {
        return Err(AdapterError::UnsupportedRoute {
            adapter: "strict v2",
            route: path.to_string(),
        });
    }

    let request_id = match payload.get("request_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "request_id",
                expected: "a non-empty string",
            })
        }
    };

    let Some(Value::Object(action)) = payload.get("action") else {
        return Err(AdapterError::InvalidField {
            field: "action",
            expected: "an object",
        });
    };
    let tool = match action.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "action.name",
                expected: "a non-empty string",
            })
        }
    };
    let args = match action.get("args") {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "action.args",
                expected: "an object",
            })
        }
    };

    let actor = match payload.get("actor") {
        None | Some(Value::Null) => fallback_actor.to_string(),
        Some(Value::String(s)) if s.is_empty() => fallback_actor.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "actor",
                expected: "a non-empty string",
            })
        }
    };

    let session_id = match payload.get("session_id") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "session_id",
                expected: "a string",
            })
        }
    };

    let context = match payload.get("context") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "context",
                expected: "an object",
            })
        }
    };

    match payload.get("openclaw_version").and_then(Value::as_str) {
        None | Some("v2") => {}
        Some(other) => return Err(AdapterError::UnsupportedVersion(other.to_string())),
    }

    Ok(ToolAction {
        request_id,
        actor,
        session_id,
        tool,
        args,
        route: path.to_string(),
        context,
        raw_payload: payload.clone(),
    })
}
