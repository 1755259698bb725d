// scope.rs — Scope-template rendering for the approval UX.
//
// Reviewers pick a template + value instead of hand-writing glob scopes;
// rendering keeps the resulting grants consistent across the fleet.

use crate::error::ApprovalError;

/// Render a named scope template.
///
/// - `run-binary`, value `B` → `"B *"` (any invocation of that binary)
/// - `run-command`, value `C` → `"C"` (one exact command line)
/// - `tool-prefix`, value `V` → `"<tool> V*"` (tool calls with a prefix)
/// - `http-domain`, value `D` → `"http.fetch https://<d>*"` (lowercased)
pub fn render_scope_template(
    template: &str,
    value: &str,
    tool: &str,
) -> Result<String, ApprovalError> {
    match template {
        "run-binary" => Ok(format!("{value} *")),
        "run-command" => Ok(value.to_string()),
        "tool-prefix" => Ok(format!("{tool} {value}*").trim().to_string()),
        "http-domain" => Ok(format!("http.fetch https://{}*", value.to_lowercase())),
        other => Err(ApprovalError::UnknownTemplate(other.to_string())),
    }
}
