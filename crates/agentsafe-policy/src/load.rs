// load.rs — Policy file loader.
//
// Parses policy YAML by walking the document rather than deriving straight
// into the model, so the loader can apply defaults (rule ids, ports),
// tolerate unknown top-level keys, and reject ill-typed nested fields with
// a message naming the offending field. Decisions never degrade silently:
// anything the loader does not understand is a PolicyError.

use std::path::Path;

use serde_yaml::Value;

use crate::error::PolicyError;
use crate::model::{
    CommandRule, NetworkMode, NetworkPolicy, PathPolicy, Policy, RateLimitRule, ToolPolicy,
};

/// Load and validate a policy from a YAML file.
pub fn load_policy(path: impl AsRef<Path>) -> Result<Policy, PolicyError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PolicyError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| PolicyError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let data: Value = serde_yaml::from_str(&text)?;
    let data = match data {
        Value::Null => Value::Mapping(Default::default()),
        other => other,
    };
    if !data.is_mapping() {
        return Err(PolicyError::Invalid("policy must be a mapping".to_string()));
    }

    let policy_id = match data.get("policy_id") {
        Some(v) => str_field(v, "policy_id")?,
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "policy".to_string()),
    };

    let default_decision = match data.get("default_decision") {
        Some(v) => str_field(v, "default_decision")?,
        None => "deny".to_string(),
    };
    if default_decision != "deny" {
        return Err(PolicyError::Invalid(
            "only default_decision: deny is supported".to_string(),
        ));
    }

    let empty = Value::Mapping(Default::default());
    let tools_data = data.get("tools").unwrap_or(&empty);
    if !tools_data.is_mapping() {
        return Err(PolicyError::Invalid("tools must be a mapping".to_string()));
    }

    Ok(Policy {
        policy_id,
        default_decision,
        tools: ToolPolicy {
            commands: parse_commands(tools_data.get("commands"))?,
            paths: parse_paths(tools_data.get("paths"))?,
            env_allowlist: str_list(tools_data.get("env_allowlist"), "tools.env_allowlist")?,
            network: parse_network(tools_data.get("network"))?,
            rate_limits: parse_rate_limits(tools_data.get("rate_limits"))?,
        },
    })
}

fn parse_commands(value: Option<&Value>) -> Result<Vec<CommandRule>, PolicyError> {
    let items = seq(value, "tools.commands")?;
    let mut rules = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let binary = item.get("binary").and_then(Value::as_str);
        let Some(binary) = binary else {
            return Err(PolicyError::Invalid(format!(
                "invalid command rule at index {idx}: missing binary"
            )));
        };
        let arg_regex = match item.get("arg_regex") {
            Some(Value::Null) | None => None,
            Some(v) => Some(str_field(v, "tools.commands.arg_regex")?),
        };
        let rule_id = match item.get("rule_id") {
            Some(v) => str_field(v, "tools.commands.rule_id")?,
            None => format!("cmd_{idx}"),
        };
        rules.push(CommandRule {
            binary: binary.to_string(),
            arg_regex,
            rule_id,
        });
    }
    Ok(rules)
}

fn parse_paths(value: Option<&Value>) -> Result<PathPolicy, PolicyError> {
    let Some(value) = value else {
        return Ok(PathPolicy::default());
    };
    if !value.is_mapping() {
        return Err(PolicyError::Invalid(
            "tools.paths must be a mapping".to_string(),
        ));
    }
    Ok(PathPolicy {
        allow: str_list(value.get("allow"), "tools.paths.allow")?,
        deny: str_list(value.get("deny"), "tools.paths.deny")?,
    })
}

fn parse_network(value: Option<&Value>) -> Result<NetworkPolicy, PolicyError> {
    let Some(value) = value else {
        return Ok(NetworkPolicy::default());
    };
    if !value.is_mapping() {
        return Err(PolicyError::Invalid(
            "tools.network must be a mapping".to_string(),
        ));
    }
    let mode = match value.get("mode") {
        Some(v) => match str_field(v, "tools.network.mode")?.as_str() {
            "none" => NetworkMode::None,
            "allow_proxy" => NetworkMode::AllowProxy,
            other => {
                return Err(PolicyError::Invalid(format!(
                    "unsupported network mode: {other}"
                )))
            }
        },
        None => NetworkMode::None,
    };

    let mut ports = Vec::new();
    for (idx, item) in seq(value.get("ports"), "tools.network.ports")?.iter().enumerate() {
        let port = item
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| {
                PolicyError::Invalid(format!("invalid port at tools.network.ports[{idx}]"))
            })?;
        ports.push(port);
    }
    if ports.is_empty() {
        ports.push(443);
    }

    Ok(NetworkPolicy {
        mode,
        domains: str_list(value.get("domains"), "tools.network.domains")?,
        ports,
    })
}

fn parse_rate_limits(value: Option<&Value>) -> Result<Vec<RateLimitRule>, PolicyError> {
    let items = seq(value, "tools.rate_limits")?;
    let mut rules = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let category = item.get("category").and_then(Value::as_str);
        let Some(category) = category else {
            return Err(PolicyError::Invalid(format!(
                "invalid rate limit at index {idx}: missing category"
            )));
        };
        let capacity = match item.get("capacity") {
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    PolicyError::Invalid(format!("invalid capacity at tools.rate_limits[{idx}]"))
                })?,
            None => 10,
        };
        let refill_per_sec = match item.get("refill_per_sec") {
            Some(v) => v.as_f64().ok_or_else(|| {
                PolicyError::Invalid(format!(
                    "invalid refill_per_sec at tools.rate_limits[{idx}]"
                ))
            })?,
            None => 1.0,
        };
        rules.push(RateLimitRule {
            category: category.to_string(),
            capacity,
            refill_per_sec,
        });
    }
    Ok(rules)
}

/// Interpret an optional value as a sequence; absent and null mean empty.
fn seq<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a [Value], PolicyError> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Sequence(items)) => Ok(items),
        Some(_) => Err(PolicyError::Invalid(format!("{field} must be a list"))),
    }
}

fn str_list(value: Option<&Value>, field: &str) -> Result<Vec<String>, PolicyError> {
    seq(value, field)?
        .iter()
        .map(|v| str_field(v, field))
        .collect()
}

fn str_field(value: &Value, field: &str) -> Result<String, PolicyError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PolicyError::Invalid(format!("{field} must be a string")))
}
