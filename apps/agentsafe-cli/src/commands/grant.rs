// grant.rs — Grant subcommands: issue, list, revoke.

use std::process::ExitCode;

use clap::Subcommand;
use serde_json::json;

use super::open_grants;

#[derive(Subcommand)]
pub enum GrantCommands {
    /// Issue a time-limited capability grant.
    Issue {
        /// Actor the grant binds to ("*" for any).
        #[arg(long)]
        actor: String,
        /// Tool the grant binds to ("*" for any).
        #[arg(long)]
        tool: String,
        /// Glob scope, e.g. "curl *".
        #[arg(long)]
        scope: String,
        /// Lifetime in seconds.
        #[arg(long, default_value = "900")]
        ttl: u32,
        /// Why the grant was issued.
        #[arg(long, default_value = "manual approval")]
        reason: String,
    },
    /// List currently-active grants.
    List,
    /// Revoke a grant by id.
    Revoke {
        grant_id: String,
        #[arg(long, default_value = "manual revoke")]
        reason: String,
    },
}

pub fn execute(cmd: &GrantCommands) -> anyhow::Result<ExitCode> {
    let grants = open_grants()?;
    match cmd {
        GrantCommands::Issue {
            actor,
            tool,
            scope,
            ttl,
            reason,
        } => {
            let grant = grants.issue(actor, tool, scope, *ttl, reason)?;
            println!("{}", serde_json::to_string_pretty(&grant)?);
        }
        GrantCommands::List => {
            let active = grants.active_grants()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"active_grants": active}))?
            );
        }
        GrantCommands::Revoke { grant_id, reason } => {
            grants.revoke(grant_id, reason)?;
            println!("revoked {grant_id}");
        }
    }
    Ok(ExitCode::from(0))
}
