// commands/mod.rs — CLI command modules and shared store locations.

pub mod approval;
pub mod audit;
pub mod fetch;
pub mod grant;
pub mod policy;
pub mod proxy;
pub mod run;
pub mod telemetry;

use agentsafe_approvals::{ApprovalRequestStore, GrantStore};
use agentsafe_audit::AuditLedger;

/// All event logs live under one audit directory in the current working
/// directory, shared with a proxy running alongside.
pub(crate) const AUDIT_DIR: &str = "audit";

pub(crate) fn open_ledger() -> anyhow::Result<AuditLedger> {
    Ok(AuditLedger::new(AUDIT_DIR)?)
}

pub(crate) fn open_grants() -> anyhow::Result<GrantStore> {
    Ok(GrantStore::new(format!("{AUDIT_DIR}/grants.jsonl"))?)
}

pub(crate) fn open_approvals() -> anyhow::Result<ApprovalRequestStore> {
    Ok(ApprovalRequestStore::new(format!(
        "{AUDIT_DIR}/approval_requests.jsonl"
    ))?)
}

/// Last `n` characters of a string, for stdout/stderr previews.
pub(crate) fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}
