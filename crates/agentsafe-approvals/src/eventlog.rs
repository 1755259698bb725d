// eventlog.rs — Shared append-only JSONL event log.
//
// Both stores in this crate persist state as one JSON event per line and
// rebuild it by replaying the file. Appends hold a short exclusive lock
// over an O_APPEND handle and flush before returning; replays open a
// fresh snapshot and skip lines they cannot parse (forward compatibility
// — an old binary keeps working when a newer one has added event kinds).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApprovalError;

#[derive(Debug)]
pub(crate) struct EventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ApprovalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    ApprovalError::CreateDirFailed {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn append<T: Serialize>(&self, event: &T) -> Result<(), ApprovalError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ApprovalError::Io {
                path: self.path.clone(),
                source,
            })?;
        // One write_all per record: with O_APPEND, concurrent writers
        // cannot interleave within a line.
        file.write_all(line.as_bytes())
            .map_err(|source| ApprovalError::Io {
                path: self.path.clone(),
                source,
            })?;
        file.flush().map_err(|source| ApprovalError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Replay every parseable event, in file order.
    pub fn replay<T: DeserializeOwned>(&self) -> Result<Vec<T>, ApprovalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|source| ApprovalError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(text
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
