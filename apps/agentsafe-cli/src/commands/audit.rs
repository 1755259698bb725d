// audit.rs — Audit subcommands: tail, report.

use std::process::ExitCode;

use clap::Subcommand;

use agentsafe_audit::render_markdown_report;

use super::open_ledger;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Show recent ledger records as JSON.
    Tail {
        /// Number of records to show.
        #[arg(long, default_value = "20")]
        lines: usize,
    },
    /// Render a markdown summary of recent activity.
    Report {
        /// Output format (only "md" is supported).
        #[arg(long, default_value = "md")]
        format: String,
        /// Where to write the report.
        #[arg(long, default_value = "audit/report.md")]
        output: String,
    },
}

pub fn execute(cmd: &AuditCommands) -> anyhow::Result<ExitCode> {
    match cmd {
        AuditCommands::Tail { lines } => {
            let ledger = open_ledger()?;
            for event in ledger.tail(*lines)? {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
        AuditCommands::Report { format, output } => {
            if format != "md" {
                anyhow::bail!("only md format is supported");
            }
            let ledger = open_ledger()?;
            let report = render_markdown_report(&ledger, 500)?;
            let output_path = std::path::Path::new(output);
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output_path, report)?;
            println!("wrote {output}");
        }
    }
    Ok(ExitCode::from(0))
}
