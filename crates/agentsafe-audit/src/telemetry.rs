// telemetry.rs — Ledger export to an OTLP-style collector.
//
// Thin wrapper: each ledger line is POSTed as {"event": ...} to the
// configured endpoint. Export stops at the first failure so the operator
// sees exactly how many events landed.

use std::path::Path;
use std::time::Duration;

use serde_json::json;

use crate::error::AuditError;

/// POST every ledger record to `endpoint`; returns the number exported.
pub async fn export_ledger_to_otel(
    ledger_path: impl AsRef<Path>,
    endpoint: &str,
    timeout: Duration,
) -> Result<usize, AuditError> {
    let ledger_path = ledger_path.as_ref();
    if !ledger_path.exists() {
        return Ok(0);
    }
    let text = std::fs::read_to_string(ledger_path).map_err(|source| AuditError::Io {
        path: ledger_path.to_path_buf(),
        source,
    })?;

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let mut count = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let event: serde_json::Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(_) => continue,
        };
        client
            .post(endpoint)
            .json(&json!({"event": event}))
            .send()
            .await?
            .error_for_status()?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_ledger_exports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let count = export_ledger_to_otel(
            dir.path().join("absent.jsonl"),
            "http://127.0.0.1:1/v1/logs",
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn unreachable_collector_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "{\"decision\":\"ALLOW\"}\n").unwrap();
        let result = export_ledger_to_otel(
            &path,
            "http://127.0.0.1:1/v1/logs",
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(AuditError::Export(_))));
    }
}
