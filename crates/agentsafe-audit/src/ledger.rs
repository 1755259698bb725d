// ledger.rs — Append-only JSONL decision ledger.
//
// One JSON object per line, never mutated after writing. Appends go
// through a short-lived exclusive lock and an O_APPEND file handle so
// records from concurrent writers cannot interleave within a line, and
// each write is flushed before returning. Readers open a fresh snapshot
// per call; malformed lines are skipped so a corrupted record cannot take
// the whole trail down.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AuditError;
use crate::event::AuditEvent;

/// The append-only audit ledger, backed by `<audit_dir>/ledger.jsonl`.
#[derive(Debug)]
pub struct AuditLedger {
    ledger_path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLedger {
    /// Open (or create) a ledger under the given audit directory.
    pub fn new(audit_dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        let audit_dir = audit_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&audit_dir).map_err(|source| AuditError::CreateDirFailed {
            path: audit_dir.clone(),
            source,
        })?;
        Ok(Self {
            ledger_path: audit_dir.join("ledger.jsonl"),
            write_lock: Mutex::new(()),
        })
    }

    /// A fresh request id — UUIDv4, globally unique for all practical purposes.
    pub fn new_request_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Stamp the event with the current UTC time and append it.
    pub fn write_event(&self, mut event: AuditEvent) -> Result<(), AuditError> {
        event.timestamp = Some(Utc::now());
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|source| AuditError::Io {
                path: self.ledger_path.clone(),
                source,
            })?;
        // One write_all per record: with O_APPEND, concurrent writers
        // cannot interleave within a line.
        file.write_all(line.as_bytes())
            .map_err(|source| AuditError::Io {
                path: self.ledger_path.clone(),
                source,
            })?;
        file.flush().map_err(|source| AuditError::Io {
            path: self.ledger_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// The last `n` parseable records, oldest first.
    pub fn tail(&self, n: usize) -> Result<Vec<AuditEvent>, AuditError> {
        if !self.ledger_path.exists() {
            return Ok(Vec::new());
        }
        let text =
            std::fs::read_to_string(&self.ledger_path).map_err(|source| AuditError::Io {
                path: self.ledger_path.clone(),
                source,
            })?;
        let events: Vec<AuditEvent> = text
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = events.len().saturating_sub(n);
        Ok(events.into_iter().skip(skip).collect())
    }

    /// Path to the underlying JSONL file.
    pub fn path(&self) -> &Path {
        &self.ledger_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DecisionLabel;

    fn event(request_id: &str, decision: DecisionLabel) -> AuditEvent {
        AuditEvent::new(
            request_id,
            "test-agent",
            "run",
            "ls",
            decision,
            "test",
            "cmd_ls",
        )
    }

    #[test]
    fn write_then_tail_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path()).unwrap();

        ledger.write_event(event("r1", DecisionLabel::Allow)).unwrap();
        ledger.write_event(event("r2", DecisionLabel::Block)).unwrap();

        let events = ledger.tail(10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].request_id, "r1");
        assert_eq!(events[1].request_id, "r2");
        // The ledger stamps timestamps on write.
        assert!(events.iter().all(|e| e.timestamp.is_some()));
    }

    #[test]
    fn tail_returns_only_the_last_n() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path()).unwrap();
        for i in 0..5 {
            ledger
                .write_event(event(&format!("r{i}"), DecisionLabel::Allow))
                .unwrap();
        }
        let events = ledger.tail(2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].request_id, "r3");
        assert_eq!(events[1].request_id, "r4");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path()).unwrap();
        ledger.write_event(event("good", DecisionLabel::Allow)).unwrap();
        std::fs::write(
            ledger.path(),
            format!(
                "{}\nnot json at all\n{{\"half\": true}}\n",
                std::fs::read_to_string(ledger.path()).unwrap().trim_end()
            ),
        )
        .unwrap();
        ledger.write_event(event("after", DecisionLabel::Block)).unwrap();

        let events = ledger.tail(10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].request_id, "good");
        assert_eq!(events[1].request_id, "after");
    }

    #[test]
    fn tail_on_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path()).unwrap();
        assert!(ledger.tail(5).unwrap().is_empty());
    }

    #[test]
    fn request_ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path()).unwrap();
        assert_ne!(ledger.new_request_id(), ledger.new_request_id());
    }

    #[test]
    fn timestamps_sort_lexicographically_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::new(dir.path()).unwrap();
        for i in 0..3 {
            ledger
                .write_event(event(&format!("r{i}"), DecisionLabel::Allow))
                .unwrap();
        }
        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        let stamps: Vec<String> = raw
            .lines()
            .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
            .filter_map(|v| v.get("timestamp").and_then(|t| t.as_str()).map(str::to_string))
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }
}
