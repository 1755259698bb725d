// adapters/generic.rs — Lossy best-effort adapter for legacy payloads.
//
// Accepts whatever field names older gateways used and never fails:
// a missing request id becomes "proxy-generated", a non-object args value
// is wrapped as {"raw": ...}, and an unrecognizable tool name becomes ""
// (which the pipeline then blocks as a non-allowlisted tool).

use serde_json::{Map, Value};

use crate::action::ToolAction;

pub fn parse_generic_request(path: &str, payload: &Value, fallback_actor: &str) -> ToolAction {
    let request_id = ["request_id", "id"]
        .into_iter()
        .find_map(|key| scalar_string(payload.get(key)))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "proxy-generated".to_string());

    let actor = payload
        .get("actor")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback_actor)
        .to_string();

    let session_id = ["session_id", "session"]
        .into_iter()
        .find_map(|key| match payload.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default();

    // First non-empty candidate wins; a non-string candidate (e.g. a v2
    // `action` object) yields "" rather than falling through, matching
    // the lossy contract: we do not guess past the first hit.
    let tool = ["tool", "tool_name", "name", "action"]
        .into_iter()
        .find_map(|key| non_empty(payload.get(key)))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            _ => String::new(),
        })
        .unwrap_or_default();

    let args = ["args", "input", "payload"]
        .into_iter()
        .find_map(|key| non_empty(payload.get(key)))
        .map(|value| match value {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("raw".to_string(), other.clone());
                map
            }
        })
        .unwrap_or_default();

    let context = match payload.get("context") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    ToolAction {
        request_id,
        actor,
        session_id,
        tool,
        args,
        route: path.to_string(),
        context,
        raw_payload: payload.clone(),
    }
}

/// Stringify a scalar the way a lossy reader would; None for the rest.
fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Treat null, "" and {} as absent for fallback chaining.
fn non_empty(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(other) => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_fields_pass_through() {
        let payload = json!({
            "request_id": "r-1",
            "actor": "agent",
            "tool": "shell.run",
            "args": {"command": "ls"},
        });
        let action = parse_generic_request("/api/tools/run", &payload, "fallback");
        assert_eq!(action.request_id, "r-1");
        assert_eq!(action.tool, "shell.run");
        assert_eq!(action.args["command"], "ls");
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let payload = json!({
            "id": 42,
            "name": "http.fetch",
            "input": {"url": "https://example.com"},
        });
        let action = parse_generic_request("/api/tools/run", &payload, "fallback");
        assert_eq!(action.request_id, "42");
        assert_eq!(action.tool, "http.fetch");
        assert_eq!(action.args["url"], "https://example.com");
    }

    #[test]
    fn missing_request_id_is_synthesized() {
        let action = parse_generic_request("/x", &json!({"tool": "t", "args": {}}), "f");
        assert_eq!(action.request_id, "proxy-generated");
    }

    #[test]
    fn non_object_args_are_wrapped() {
        let payload = json!({"tool": "shell.run", "args": "ls -la"});
        let action = parse_generic_request("/x", &payload, "f");
        assert_eq!(action.args["raw"], "ls -la");
    }

    #[test]
    fn unrecognizable_tool_becomes_empty() {
        // A v2-style nested action object is not a tool name.
        let payload = json!({"action": {"name": "shell.run"}});
        let action = parse_generic_request("/x", &payload, "f");
        assert_eq!(action.tool, "");
    }

    #[test]
    fn never_fails_on_junk() {
        let action = parse_generic_request("/x", &json!({"weird": [1, 2, 3]}), "f");
        assert_eq!(action.tool, "");
        assert!(action.args.is_empty());
        assert_eq!(action.actor, "f");
    }
}
