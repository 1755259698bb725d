//! # agentsafe-cli
//!
//! Command-line interface for AgentSafe.
//!
//! Inline mode wraps individual tool invocations in policy + sandbox:
//! - `agentsafe run -- <cmd>` — evaluate and execute a command
//! - `agentsafe fetch <url>` — evaluate and download a URL
//!
//! Operations:
//! - `agentsafe proxy` — start the reverse proxy in front of a gateway
//! - `agentsafe audit tail/report` — inspect the decision ledger
//! - `agentsafe grant issue/list/revoke` — manage capability grants
//! - `agentsafe approval create/list/approve/reject` — approval workflow
//! - `agentsafe policy bundle/verify` — policy bundle integrity
//! - `agentsafe telemetry export` — ship the ledger to a collector
//!
//! Exit codes in inline mode: 0 allow + success, 2 policy/limit/fetch
//! block or I/O error, 3 approval required, otherwise the child's code.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// AgentSafe — policy enforcement for autonomous-agent tool calls.
#[derive(Parser)]
#[command(name = "agentsafe", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a command against policy and run it in the sandbox.
    Run(commands::run::RunArgs),
    /// Evaluate a URL against policy and download it into the workspace.
    Fetch(commands::fetch::FetchArgs),
    /// Start the reverse proxy in front of an agent gateway.
    Proxy {
        /// Listen address.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Listen port.
        #[arg(long, default_value = "8090")]
        port: u16,
    },
    /// Inspect the audit ledger.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
    /// Manage capability grants.
    Grant {
        #[command(subcommand)]
        command: commands::grant::GrantCommands,
    },
    /// Approval-request workflow.
    Approval {
        #[command(subcommand)]
        command: commands::approval::ApprovalCommands,
    },
    /// Policy bundle integrity commands.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
    /// Telemetry export commands.
    Telemetry {
        #[command(subcommand)]
        command: commands::telemetry::TelemetryCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Fetch(args) => commands::fetch::execute(args).await,
        Commands::Proxy { host, port } => commands::proxy::execute(&host, port).await,
        Commands::Audit { command } => commands::audit::execute(&command),
        Commands::Grant { command } => commands::grant::execute(&command),
        Commands::Approval { command } => commands::approval::execute(&command),
        Commands::Policy { command } => commands::policy::execute(&command),
        Commands::Telemetry { command } => commands::telemetry::execute(&command).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
