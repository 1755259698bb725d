// adapters/strict_v1.rs — Strict adapter for the OpenClaw v1 dialect.
//
// Same flat shape as light-gateway, but bound to the /v1/tools/execute
// route and the "v1" version marker. An absent or empty actor falls back;
// everything else is validated strictly.

use serde_json::{Map, Value};

use super::AdapterError;
use crate::action::ToolAction;

pub fn parse_strict_v1_request(
    path: &str,
    payload: &Value,
    fallback_actor: &str,
) -> Result<ToolAction, AdapterError> {
    if path != "/v1/tools/execute" {
        return Err(AdapterError::UnsupportedRoute {
            adapter: "strict v1",
            route: path.to_string(),
        });
    }

    let missing: Vec<&str> = ["request_id", "tool", "args"]
        .into_iter()
        .filter(|name| payload.get(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(AdapterError::MissingFields(missing.join(", ")));
    }

    let request_id = require_str(payload.get("request_id"), "request_id")?;
    let tool = require_str(payload.get("tool"), "tool")?;
    let args = match payload.get("args") {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            return Err(AdapterError::InvalidField {
                field: "args",
                expected: "an object",
            })
        }
    };

    // An absent or empty actor falls back; anything else must be a real
    // non-blank string.
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
        None | Some("v1") => {}
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

fn require_str(value: Option<&Value>, field: &'static str) -> Result<String, AdapterError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(AdapterError::InvalidField {
            field,
            expected: "a non-empty string",
        }),
    }
}
