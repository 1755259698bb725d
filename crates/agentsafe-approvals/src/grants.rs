// grants.rs — Event-sourced capability grants.
//
// A grant is a time-limited capability binding (actor, tool, scope). The
// store never edits records: issuing appends an `issue` event, revoking
// appends a `revoke` event, and the set of currently-valid grants is the
// replay of the log minus revocations and expirations. This makes the
// grant state crash-safe and shareable across processes through one file.

use chrono::{DateTime, Duration, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApprovalError;
use crate::eventlog::EventLog;

/// A time-limited capability: `actor` may use `tool` for calls whose
/// canonical description matches the `scope` glob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grant {
    pub grant_id: String,
    pub actor: String,
    pub tool: String,
    pub scope: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One line in `grants.jsonl`, discriminated by `action`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum GrantEvent {
    Issue {
        grant_id: String,
        actor: String,
        tool: String,
        scope: String,
        reason: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
    Revoke {
        grant_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl GrantEvent {
    fn issue(grant: &Grant) -> Self {
        GrantEvent::Issue {
            grant_id: grant.grant_id.clone(),
            actor: grant.actor.clone(),
            tool: grant.tool.clone(),
            scope: grant.scope.clone(),
            reason: grant.reason.clone(),
            created_at: grant.created_at,
            expires_at: grant.expires_at,
        }
    }
}

/// Append-only store of grant events.
#[derive(Debug)]
pub struct GrantStore {
    log: EventLog,
}

impl GrantStore {
    /// Open (or create) the store at the given JSONL path.
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self, ApprovalError> {
        Ok(Self {
            log: EventLog::new(path)?,
        })
    }

    /// Issue a new grant valid for `ttl_seconds` from now.
    pub fn issue(
        &self,
        actor: &str,
        tool: &str,
        scope: &str,
        ttl_seconds: u32,
        reason: &str,
    ) -> Result<Grant, ApprovalError> {
        let now = Utc::now();
        let grant = Grant {
            grant_id: Uuid::new_v4().to_string(),
            actor: actor.to_string(),
            tool: tool.to_string(),
            scope: scope.to_string(),
            reason: reason.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(i64::from(ttl_seconds)),
        };
        self.log.append(&GrantEvent::issue(&grant))?;
        Ok(grant)
    }

    /// Record a revocation. Revoking an unknown id is harmless — the
    /// replay simply never pairs it with an issue event.
    pub fn revoke(&self, grant_id: &str, reason: &str) -> Result<(), ApprovalError> {
        self.log.append(&GrantEvent::Revoke {
            grant_id: grant_id.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Replay the log: issued, not revoked, not expired.
    pub fn active_grants(&self) -> Result<Vec<Grant>, ApprovalError> {
        let events: Vec<GrantEvent> = self.log.replay()?;
        let revoked: std::collections::HashSet<&str> = events
            .iter()
            .filter_map(|event| match event {
                GrantEvent::Revoke { grant_id, .. } => Some(grant_id.as_str()),
                GrantEvent::Issue { .. } => None,
            })
            .collect();

        let now = Utc::now();
        Ok(events
            .iter()
            .filter_map(|event| match event {
                GrantEvent::Issue {
                    grant_id,
                    actor,
                    tool,
                    scope,
                    reason,
                    created_at,
                    expires_at,
                } => Some(Grant {
                    grant_id: grant_id.clone(),
                    actor: actor.clone(),
                    tool: tool.clone(),
                    scope: scope.clone(),
                    reason: reason.clone(),
                    created_at: *created_at,
                    expires_at: *expires_at,
                }),
                GrantEvent::Revoke { .. } => None,
            })
            .filter(|grant| !revoked.contains(grant.grant_id.as_str()))
            .filter(|grant| grant.expires_at > now)
            .collect())
    }

    /// Whether some active grant covers this (actor, tool, scope) call.
    ///
    /// `"*"` in a grant's actor or tool matches anything; the scope is a
    /// glob matched against the call's canonical description. Fail-closed:
    /// invalid patterns never match, and an unreadable log denies.
    pub fn is_allowed(&self, actor: &str, tool: &str, scope: &str) -> bool {
        let grants = match self.active_grants() {
            Ok(grants) => grants,
            Err(e) => {
                tracing::warn!(error = %e, "grant replay failed; denying");
                return false;
            }
        };
        grants.iter().any(|grant| {
            let actor_ok = grant.actor == actor || grant.actor == "*";
            let tool_ok = grant.tool == tool || grant.tool == "*";
            let scope_ok = Pattern::new(&grant.scope)
                .map(|pattern| pattern.matches(scope))
                .unwrap_or(false);
            actor_ok && tool_ok && scope_ok
        })
    }

    /// Path to the underlying JSONL file.
    pub fn path(&self) -> &std::path::Path {
        self.log.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> GrantStore {
        GrantStore::new(dir.path().join("grants.jsonl")).unwrap()
    }

    #[test]
    fn issue_then_match() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        let grant = grants
            .issue("openclaw-agent", "run", "curl *", 60, "demo")
            .unwrap();
        assert!(!grant.grant_id.is_empty());
        assert!(grants.is_allowed("openclaw-agent", "run", "curl https://openai.com"));
    }

    #[test]
    fn revoke_removes_from_active_set() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        let grant = grants
            .issue("openclaw-agent", "run", "curl *", 60, "demo")
            .unwrap();
        grants.revoke(&grant.grant_id, "manual revoke").unwrap();
        assert!(!grants.is_allowed("openclaw-agent", "run", "curl https://openai.com"));
        assert!(grants.active_grants().unwrap().is_empty());
    }

    #[test]
    fn expired_grants_are_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        grants.issue("a", "run", "ls *", 0, "instant expiry").unwrap();
        assert!(!grants.is_allowed("a", "run", "ls -la"));
    }

    #[test]
    fn wildcard_actor_and_tool() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        grants.issue("*", "*", "shell.run git *", 60, "any").unwrap();
        assert!(grants.is_allowed("someone-else", "shell.run", "shell.run git status"));
        assert!(!grants.is_allowed("someone-else", "shell.run", "shell.run rm -rf /"));
    }

    #[test]
    fn actor_and_tool_must_both_match() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        grants.issue("agent-a", "run", "curl *", 60, "scoped").unwrap();
        assert!(!grants.is_allowed("agent-b", "run", "curl https://x"));
        assert!(!grants.is_allowed("agent-a", "fetch", "curl https://x"));
    }

    #[test]
    fn glob_classes_and_single_char() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        grants.issue("a", "run", "make target-?", 60, "").unwrap();
        assert!(grants.is_allowed("a", "run", "make target-1"));
        assert!(!grants.is_allowed("a", "run", "make target-10"));
    }

    #[test]
    fn malformed_lines_are_skipped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        grants.issue("a", "run", "ls *", 60, "keep").unwrap();
        let mut raw = std::fs::read_to_string(grants.path()).unwrap();
        raw.push_str("{\"action\":\"future_event\",\"x\":1}\nnot even json\n");
        std::fs::write(grants.path(), raw).unwrap();
        assert_eq!(grants.active_grants().unwrap().len(), 1);
        assert!(grants.is_allowed("a", "run", "ls -la"));
    }

    #[test]
    fn replay_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let grants = store(&dir);
        grants.issue("a", "run", "ls *", 3600, "one").unwrap();
        grants.issue("b", "fetch", "https://*", 3600, "two").unwrap();
        let first = grants.active_grants().unwrap();
        let second = grants.active_grants().unwrap();
        assert_eq!(first, second);
    }
}
