// approval.rs — Approval-request subcommands: create, list, approve, reject.

use std::process::ExitCode;

use clap::Subcommand;

use agentsafe_approvals::{render_scope_template, RequestStatus};

use super::{open_approvals, open_grants};

#[derive(Subcommand)]
pub enum ApprovalCommands {
    /// File a new approval request.
    Create {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        tool: String,
        /// Explicit glob scope. Mutually exclusive with --template.
        #[arg(long, conflicts_with = "template")]
        scope: Option<String>,
        /// Scope template: run-binary, run-command, tool-prefix, http-domain.
        #[arg(long, requires = "value")]
        template: Option<String>,
        /// Value rendered into the template.
        #[arg(long)]
        value: Option<String>,
        #[arg(long, default_value = "requested by agent")]
        reason: String,
        /// How long the request stays reviewable, in seconds.
        #[arg(long, default_value = "3600")]
        ttl: u32,
    },
    /// List approval requests.
    List {
        /// pending, approved, rejected, expired, or all.
        #[arg(long, default_value = "pending")]
        status: String,
    },
    /// Approve a pending request; issues the grant.
    Approve {
        request_id: String,
        #[arg(long)]
        reviewer: String,
        /// Lifetime of the issued grant, in seconds.
        #[arg(long, default_value = "900")]
        ttl: u32,
        #[arg(long, default_value = "approved")]
        reason: String,
    },
    /// Reject a pending request.
    Reject {
        request_id: String,
        #[arg(long)]
        reviewer: String,
        #[arg(long, default_value = "rejected")]
        reason: String,
    },
}

pub fn execute(cmd: &ApprovalCommands) -> anyhow::Result<ExitCode> {
    let requests = open_approvals()?;
    match cmd {
        ApprovalCommands::Create {
            actor,
            tool,
            scope,
            template,
            value,
            reason,
            ttl,
        } => {
            let scope = match (scope, template) {
                (Some(scope), _) => scope.clone(),
                (None, Some(template)) => {
                    let value = value.as_deref().unwrap_or_default();
                    render_scope_template(template, value, tool)?
                }
                (None, None) => anyhow::bail!("provide --scope or --template with --value"),
            };
            let request = requests.create(actor, tool, &scope, reason, *ttl)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        ApprovalCommands::List { status } => {
            let filter = parse_status_filter(status)?;
            let listed = requests.list(filter)?;
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
        ApprovalCommands::Approve {
            request_id,
            reviewer,
            ttl,
            reason,
        } => {
            let grants = open_grants()?;
            let grant = requests.approve(request_id, reviewer, *ttl, reason, &grants)?;
            println!("{}", serde_json::to_string_pretty(&grant)?);
        }
        ApprovalCommands::Reject {
            request_id,
            reviewer,
            reason,
        } => {
            requests.reject(request_id, reviewer, reason)?;
            println!("rejected {request_id}");
        }
    }
    Ok(ExitCode::from(0))
}

fn parse_status_filter(status: &str) -> anyhow::Result<Option<RequestStatus>> {
    match status {
        "all" => Ok(None),
        "pending" => Ok(Some(RequestStatus::Pending)),
        "approved" => Ok(Some(RequestStatus::Approved)),
        "rejected" => Ok(Some(RequestStatus::Rejected)),
        "expired" => Ok(Some(RequestStatus::Expired)),
        other => anyhow::bail!("unknown status filter: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filters_parse() {
        assert!(parse_status_filter("all").unwrap().is_none());
        assert_eq!(
            parse_status_filter("pending").unwrap(),
            Some(RequestStatus::Pending)
        );
        assert!(parse_status_filter("everything").is_err());
    }
}
