// telemetry.rs — Telemetry subcommands: export.

use std::process::ExitCode;
use std::time::Duration;

use clap::Subcommand;

use agentsafe_audit::export_ledger_to_otel;

#[derive(Subcommand)]
pub enum TelemetryCommands {
    /// Ship ledger records to a collector endpoint.
    Export {
        /// Export mode (only "otel" is supported).
        #[arg(long, default_value = "otel")]
        mode: String,
        /// Collector endpoint URL.
        #[arg(long)]
        endpoint: String,
        /// Ledger file to export.
        #[arg(long, default_value = "audit/ledger.jsonl")]
        ledger: String,
    },
}

pub async fn execute(cmd: &TelemetryCommands) -> anyhow::Result<ExitCode> {
    match cmd {
        TelemetryCommands::Export {
            mode,
            endpoint,
            ledger,
        } => {
            if mode != "otel" {
                anyhow::bail!("only otel export mode is supported");
            }
            let count =
                export_ledger_to_otel(ledger, endpoint, Duration::from_secs(5)).await?;
            println!("exported {count} events to {endpoint}");
        }
    }
    Ok(ExitCode::from(0))
}
