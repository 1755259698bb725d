// adapters/light_gateway.rs — Strict adapter for the light-gateway dialect.
//
// Flat payload: request_id / tool / args at the top level, with optional
// actor, session_id and context. Anything missing or ill-typed is a hard
// error — this adapter is for gateways that own their contract.

use serde_json::{Map, Value};

use super::AdapterError;
use crate::action::ToolAction;

pub fn parse_execute_request(
    path: &str,
    payload: &Value,
    fallback_actor: &str,
) -> Result<ToolAction, AdapterError> {
    let missing: Vec<&str> = ["request_id", "tool", "args"]
        .into_iter()
        .filter(|name| payload.get(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(AdapterError::MissingFields(missing.join(", ")));
    }

    let request_id = non_empty_str(payload.get("request_id"), "request_id")?;
    let tool = non_empty_str(payload.get("tool"), "tool")?;
    let args = object(payload.get("args"), "args")?;

    let actor = match payload.get("actor") {
        None | Some(Value::Null) => fallback_actor.to_string(),
        other => non_empty_str(other, "actor")?,
    };

    Ok(ToolAction {
        request_id,
        actor,
        session_id: optional_str(payload.get("session_id"), "session_id")?,
        tool,
        args,
        route: path.to_string(),
        context: optional_object(payload.get("context"), "context")?,
        raw_payload: payload.clone(),
    })
}

fn non_empty_str(value: Option<&Value>, field: &'static str) -> Result<String, AdapterError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(AdapterError::InvalidField {
            field,
            expected: "a non-empty string",
        }),
    }
}

fn optional_str(value: Option<&Value>, field: &'static str) -> Result<String, AdapterError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(AdapterError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

fn object(value: Option<&Value>, field: &'static str) -> Result<Map<String, Value>, AdapterError> {
    match value {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(AdapterError::InvalidField {
            field,
            expected: "an object",
        }),
    }
}

fn optional_object(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Map<String, Value>, AdapterError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        other => object(other, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "request_id": "req-1",
            "actor": "openclaw-agent",
            "session_id": "s1",
            "tool": "shell.run",
            "args": {"command": "ls"},
            "context": {"cwd": "/workspace"},
        })
    }

    #[test]
    fn parses_a_complete_payload() {
        let action =
            parse_execute_request("/v1/tools/execute", &valid_payload(), "fallback").unwrap();
        assert_eq!(action.request_id, "req-1");
        assert_eq!(action.actor, "openclaw-agent");
        assert_eq!(action.tool, "shell.run");
        assert_eq!(action.args["command"], "ls");
        assert_eq!(action.route, "/v1/tools/execute");
        assert_eq!(action.raw_payload, valid_payload());
    }

    #[test]
    fn missing_fields_are_named() {
        let err = parse_execute_request("/v1/tools/execute", &json!({"tool": "x"}), "f")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("request_id"));
        assert!(msg.contains("args"));
    }

    #[test]
    fn actor_defaults_to_fallback() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("actor");
        let action = parse_execute_request("/v1/tools/execute", &payload, "proxy-actor").unwrap();
        assert_eq!(action.actor, "proxy-actor");
    }

    #[test]
    fn empty_actor_string_is_rejected() {
        let mut payload = valid_payload();
        payload["actor"] = json!("   ");
        assert!(parse_execute_request("/v1/tools/execute", &payload, "f").is_err());
    }

    #[test]
    fn non_object_args_are_rejected() {
        let mut payload = valid_payload();
        payload["args"] = json!("ls -la");
        let err = parse_execute_request("/v1/tools/execute", &payload, "f").unwrap_err();
        assert!(err.to_string().contains("args"));
    }

    #[test]
    fn session_and_context_default_to_empty() {
        let payload = json!({
            "request_id": "req-2",
            "tool": "http.fetch",
            "args": {"url": "https://example.com"},
        });
        let action = parse_execute_request("/v1/tools/execute", &payload, "f").unwrap();
        assert_eq!(action.session_id, "");
        assert!(action.context.is_empty());
    }
}
