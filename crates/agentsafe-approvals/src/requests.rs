// requests.rs — Event-sourced approval-request lifecycle.
//
// A request is a pending proposal for a capability. Reviewers approve or
// reject it; approving issues a grant through the grant store and then
// records the approval event. The grant is written first on purpose: if
// the process dies between the two appends, the surviving grant is the
// authoritative capability and the approval record is only bookkeeping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApprovalError;
use crate::eventlog::EventLog;
use crate::grants::{Grant, GrantStore};

/// Lifecycle state of an approval request.
///
/// `Expired` is never written to the log — it is projected at query time
/// from `expires_at`, so the stored history stays append-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Expired => "expired",
        }
    }
}

/// Materialized view of one approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: String,
    pub actor: String,
    pub tool: String,
    pub scope: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_id: Option<String>,
}

/// One line in `approval_requests.jsonl`, discriminated by `action`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ApprovalEvent {
    Request {
        request_id: String,
        actor: String,
        tool: String,
        scope: String,
        reason: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
    Approve {
        request_id: String,
        grant_id: String,
        reviewer: String,
        reason: String,
        reviewed_at: DateTime<Utc>,
    },
    Reject {
        request_id: String,
        reviewer: String,
        reason: String,
        reviewed_at: DateTime<Utc>,
    },
}

/// Append-only store of approval-request events.
#[derive(Debug)]
pub struct ApprovalRequestStore {
    log: EventLog,
}

impl ApprovalRequestStore {
    pub fn new(path: impl AsRef<std::path::Path>) -> Result<Self, ApprovalError> {
        Ok(Self {
            log: EventLog::new(path)?,
        })
    }

    /// File a new pending request, valid for `ttl_seconds`.
    pub fn create(
        &self,
        actor: &str,
        tool: &str,
        scope: &str,
        reason: &str,
        ttl_seconds: u32,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let now = Utc::now();
        let request = ApprovalRequest {
            request_id: Uuid::new_v4().to_string(),
            actor: actor.to_string(),
            tool: tool.to_string(),
            scope: scope.to_string(),
            reason: reason.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(i64::from(ttl_seconds)),
            status: RequestStatus::Pending,
            reviewer: None,
            reviewed_at: None,
            review_note: None,
            grant_id: None,
        };
        self.log.append(&ApprovalEvent::Request {
            request_id: request.request_id.clone(),
            actor: request.actor.clone(),
            tool: request.tool.clone(),
            scope: request.scope.clone(),
            reason: request.reason.clone(),
            created_at: request.created_at,
            expires_at: request.expires_at,
        })?;
        Ok(request)
    }

    /// Fold the event log into request state, in file order.
    ///
    /// Review events for unknown ids or non-pending requests are ignored
    /// rather than erroring: replays must accept whatever history exists.
    fn materialize(&self) -> Result<Vec<ApprovalRequest>, ApprovalError> {
        let events: Vec<ApprovalEvent> = self.log.replay()?;
        let mut requests: Vec<ApprovalRequest> = Vec::new();

        for event in events {
            match event {
                ApprovalEvent::Request {
                    request_id,
                    actor,
                    tool,
                    scope,
                    reason,
                    created_at,
                    expires_at,
                } => requests.push(ApprovalRequest {
                    request_id,
                    actor,
                    tool,
                    scope,
                    reason,
                    created_at,
                    expires_at,
                    status: RequestStatus::Pending,
                    reviewer: None,
                    reviewed_at: None,
                    review_note: None,
                    grant_id: None,
                }),
                ApprovalEvent::Approve {
                    request_id,
                    grant_id,
                    reviewer,
                    reason,
                    reviewed_at,
                } => {
                    if let Some(request) = find_pending(&mut requests, &request_id) {
                        request.status = RequestStatus::Approved;
                        request.reviewer = Some(reviewer);
                        request.reviewed_at = Some(reviewed_at);
                        request.review_note = Some(reason);
                        request.grant_id = Some(grant_id);
                    }
                }
                ApprovalEvent::Reject {
                    request_id,
                    reviewer,
                    reason,
                    reviewed_at,
                } => {
                    if let Some(request) = find_pending(&mut requests, &request_id) {
                        request.status = RequestStatus::Rejected;
                        request.reviewer = Some(reviewer);
                        request.reviewed_at = Some(reviewed_at);
                        request.review_note = Some(reason);
                    }
                }
            }
        }
        Ok(requests)
    }

    /// Requests filtered by status (`None` = all), newest first.
    ///
    /// Pending requests past their expiry are reported as `Expired`.
    pub fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ApprovalRequest>, ApprovalError> {
        let now = Utc::now();
        let mut requests = self.materialize()?;
        for request in &mut requests {
            project_expiry(request, now);
        }
        if let Some(status) = status {
            requests.retain(|r| r.status == status);
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Approve a pending request: issue a grant with the reviewer-chosen
    /// TTL, then record the approval referencing the new grant.
    pub fn approve(
        &self,
        request_id: &str,
        reviewer: &str,
        ttl_seconds: u32,
        reason: &str,
        grants: &GrantStore,
    ) -> Result<Grant, ApprovalError> {
        let request = self.lookup(request_id)?;
        if request.status != RequestStatus::Pending {
            return Err(ApprovalError::NotPending {
                request_id: request_id.to_string(),
                status: request.status.as_str().to_string(),
            });
        }
        if request.expires_at <= Utc::now() {
            return Err(ApprovalError::Expired(request_id.to_string()));
        }

        let grant = grants.issue(
            &request.actor,
            &request.tool,
            &request.scope,
            ttl_seconds,
            reason,
        )?;
        self.log.append(&ApprovalEvent::Approve {
            request_id: request_id.to_string(),
            grant_id: grant.grant_id.clone(),
            reviewer: reviewer.to_string(),
            reason: reason.to_string(),
            reviewed_at: Utc::now(),
        })?;
        Ok(grant)
    }

    /// Reject a pending request. A rejection of an expired-but-still-
    /// pending request is accepted — it closes the book either way.
    pub fn reject(
        &self,
        request_id: &str,
        reviewer: &str,
        reason: &str,
    ) -> Result<(), ApprovalError> {
        let request = self.lookup(request_id)?;
        if request.status != RequestStatus::Pending {
            return Err(ApprovalError::NotPending {
                request_id: request_id.to_string(),
                status: request.status.as_str().to_string(),
            });
        }
        self.log.append(&ApprovalEvent::Reject {
            request_id: request_id.to_string(),
            reviewer: reviewer.to_string(),
            reason: reason.to_string(),
            reviewed_at: Utc::now(),
        })
    }

    fn lookup(&self, request_id: &str) -> Result<ApprovalRequest, ApprovalError> {
        self.materialize()?
            .into_iter()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| ApprovalError::UnknownRequest(request_id.to_string()))
    }

    /// Path to the underlying JSONL file.
    pub fn path(&self) -> &std::path::Path {
        self.log.path()
    }
}

fn find_pending<'a>(
    requests: &'a mut [ApprovalRequest],
    request_id: &str,
) -> Option<&'a mut ApprovalRequest> {
    requests
        .iter_mut()
        .find(|r| r.request_id == request_id && r.status == RequestStatus::Pending)
}

fn project_expiry(request: &mut ApprovalRequest, now: DateTime<Utc>) {
    if request.status == RequestStatus::Pending && request.expires_at <= now {
        request.status = RequestStatus::Expired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores(dir: &tempfile::TempDir) -> (ApprovalRequestStore, GrantStore) {
        (
            ApprovalRequestStore::new(dir.path().join("approval_requests.jsonl")).unwrap(),
            GrantStore::new(dir.path().join("grants.jsonl")).unwrap(),
        )
    }

    #[test]
    fn create_then_list_pending() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, _) = stores(&dir);
        let request = requests
            .create("a", "run", "curl https://x", "needs egress", 600)
            .unwrap();

        let pending = requests.list(Some(RequestStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, request.request_id);
        assert_eq!(pending[0].status, RequestStatus::Pending);
    }

    #[test]
    fn approve_issues_a_matching_grant() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, grants) = stores(&dir);
        let request = requests
            .create("a", "run", "curl https://x", "needs egress", 600)
            .unwrap();

        let grant = requests
            .approve(&request.request_id, "sec", 600, "ok", &grants)
            .unwrap();
        assert!(grants.is_allowed("a", "run", "curl https://x"));

        let approved = requests.list(Some(RequestStatus::Approved)).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].grant_id.as_deref(), Some(grant.grant_id.as_str()));
        assert_eq!(approved[0].reviewer.as_deref(), Some("sec"));
    }

    #[test]
    fn approve_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, grants) = stores(&dir);
        let request = requests.create("a", "run", "ls", "r", 600).unwrap();
        requests
            .approve(&request.request_id, "sec", 60, "ok", &grants)
            .unwrap();
        let err = requests
            .approve(&request.request_id, "sec", 60, "again", &grants)
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotPending { .. }));
    }

    #[test]
    fn approve_unknown_request_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, grants) = stores(&dir);
        let err = requests
            .approve("no-such-id", "sec", 60, "ok", &grants)
            .unwrap_err();
        assert!(matches!(err, ApprovalError::UnknownRequest(_)));
    }

    #[test]
    fn expired_request_cannot_be_approved() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, grants) = stores(&dir);
        let request = requests.create("a", "run", "ls", "r", 0).unwrap();
        let err = requests
            .approve(&request.request_id, "sec", 60, "late", &grants)
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Expired(_)));
        // No grant leaks out of the failed approval.
        assert!(!grants.is_allowed("a", "run", "ls"));
    }

    #[test]
    fn expired_request_projects_as_expired_in_lists() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, _) = stores(&dir);
        requests.create("a", "run", "ls", "r", 0).unwrap();
        let all = requests.list(None).unwrap();
        assert_eq!(all[0].status, RequestStatus::Expired);
        assert!(requests.list(Some(RequestStatus::Pending)).unwrap().is_empty());
    }

    #[test]
    fn reject_accepts_expired_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, _) = stores(&dir);
        let request = requests.create("a", "run", "ls", "r", 0).unwrap();
        requests
            .reject(&request.request_id, "sec", "stale")
            .unwrap();
        let rejected = requests.list(Some(RequestStatus::Rejected)).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].review_note.as_deref(), Some("stale"));
    }

    #[test]
    fn reject_after_approve_is_refused_and_ignored_by_replay() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, grants) = stores(&dir);
        let request = requests.create("a", "run", "ls", "r", 600).unwrap();
        requests
            .approve(&request.request_id, "sec", 60, "ok", &grants)
            .unwrap();

        let err = requests
            .reject(&request.request_id, "sec2", "no")
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotPending { .. }));

        // Even a stray reject line written behind the store's back must
        // not rewrite history: the fold only transitions pending requests.
        let stray = format!(
            "{{\"action\":\"reject\",\"request_id\":\"{}\",\"reviewer\":\"ghost\",\"reason\":\"no\",\"reviewed_at\":\"2026-01-01T00:00:00Z\"}}\n",
            request.request_id
        );
        let mut raw = std::fs::read_to_string(requests.path()).unwrap();
        raw.push_str(&stray);
        std::fs::write(requests.path(), raw).unwrap();

        let all = requests.list(None).unwrap();
        assert_eq!(all[0].status, RequestStatus::Approved);
    }

    #[test]
    fn list_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let (requests, _) = stores(&dir);
        let first = requests.create("a", "run", "one", "r", 600).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = requests.create("a", "run", "two", "r", 600).unwrap();
        let all = requests.list(None).unwrap();
        assert_eq!(all[0].request_id, second.request_id);
        assert_eq!(all[1].request_id, first.request_id);
    }
}
