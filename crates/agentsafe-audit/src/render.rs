// render.rs — Markdown report over the ledger tail.

use std::collections::HashMap;

use crate::error::AuditError;
use crate::event::DecisionLabel;
use crate::ledger::AuditLedger;

/// Render a markdown summary of recent ledger activity: decision counts,
/// per-tool usage and the last 20 events.
pub fn render_markdown_report(ledger: &AuditLedger, limit: usize) -> Result<String, AuditError> {
    let events = ledger.tail(limit)?;
    if events.is_empty() {
        return Ok("# AgentSafe Audit Report\n\nNo events found.".to_string());
    }

    let allow_count = events
        .iter()
        .filter(|e| e.decision == DecisionLabel::Allow)
        .count();
    let block_count = events.len() - allow_count;

    let mut tools: HashMap<&str, usize> = HashMap::new();
    for event in &events {
        *tools.entry(event.tool.as_str()).or_default() += 1;
    }
    let mut tool_counts: Vec<(&str, usize)> = tools.into_iter().collect();
    tool_counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let mut lines = vec![
        "# AgentSafe Audit Report".to_string(),
        String::new(),
        "## Summary".to_string(),
        format!("- Events: {}", events.len()),
        format!("- ALLOW: {allow_count}"),
        format!("- BLOCK: {block_count}"),
        String::new(),
        "## Tool Usage".to_string(),
    ];
    for (tool, count) in tool_counts {
        lines.push(format!("- {tool}: {count}"));
    }

    lines.push(String::new());
    lines.push("## Recent Events".to_string());
    let skip = events.len().saturating_sub(20);
    for event in events.iter().skip(skip) {
        let decision = match event.decision {
            DecisionLabel::Allow => "ALLOW",
            DecisionLabel::Block => "BLOCK",
        };
        lines.push(format!(
            "- `{}` `{}` `{}` `{}`: {}",
            event.request_id, event.actor, event.tool, decision, event.reason
        ));
    }

    Ok(lines.join("\n"))
}
