// fetch.rs — Inline mode: evaluate a URL and download it.
//
// Rate limit → URL allowlist → output-path check → download. The output
// path is evaluated like any other path so a fetch cannot write outside
// the allowed roots even via --output tricks.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use serde_json::json;

use agentsafe_audit::{AuditEvent, DecisionLabel, SandboxInfo};
use agentsafe_policy::{load_backend, load_policy, RateLimiter};

use super::open_ledger;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Args)]
pub struct FetchArgs {
    /// Path to policy YAML.
    #[arg(long)]
    pub policy: String,

    /// Acting identity recorded in the ledger.
    #[arg(long, default_value = "unknown-agent")]
    pub actor: String,

    /// Workspace directory downloads land in.
    #[arg(long, default_value = ".")]
    pub workspace: String,

    /// Relative output file path in the workspace.
    #[arg(long, default_value = "")]
    pub output: String,

    /// Decision backend: yaml or opa.
    #[arg(long, default_value = "yaml")]
    pub policy_backend: String,

    /// URL to fetch.
    pub url: String,
}

pub async fn execute(args: FetchArgs) -> anyhow::Result<ExitCode> {
    let ledger = open_ledger()?;
    let request_id = ledger.new_request_id();
    let workspace_path = {
        let path = PathBuf::from(&args.workspace);
        path.canonicalize().unwrap_or(path)
    };

    let (backend, loaded) = match (
        load_backend(&args.policy_backend, &args.policy),
        load_policy(&args.policy),
    ) {
        (Ok(backend), Ok(loaded)) => (backend, loaded),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("BLOCK invalid policy/backend: {e}");
            return Ok(ExitCode::from(2));
        }
    };

    let block = |reason: &str, rule_id: &str, attempts: Option<serde_json::Value>, files: Vec<String>| {
        let mut event = AuditEvent::new(
            &request_id,
            &args.actor,
            "fetch",
            &args.url,
            DecisionLabel::Block,
            reason,
            rule_id,
        )
        .with_sandbox(SandboxInfo::default())
        .with_files_touched(files);
        if let Some(attempt) = attempts {
            event = event.with_network_attempts(vec![attempt]);
        }
        event
    };

    let limiter = RateLimiter::new(&loaded.tools.rate_limits);
    let rate_decision = limiter.check("fetch");
    if !rate_decision.allowed {
        ledger.write_event(block(&rate_decision.reason, &rate_decision.rule_id, None, vec![]))?;
        eprintln!("BLOCK {}", rate_decision.reason);
        return Ok(ExitCode::from(2));
    }

    let decision = backend.evaluate_fetch(&args.url).await;
    if !decision.allowed {
        ledger.write_event(block(
            &decision.reason,
            &decision.rule_id,
            Some(json!({"url": args.url})),
            vec![],
        ))?;
        eprintln!("BLOCK {}", decision.reason);
        return Ok(ExitCode::from(2));
    }

    let out_name = if args.output.is_empty() {
        url_file_name(&args.url).unwrap_or_else(|| "download.bin".to_string())
    } else {
        args.output.clone()
    };
    let out_path = workspace_path.join(&out_name);
    let out_display = out_path.to_string_lossy().into_owned();

    let path_decision = backend.evaluate_path(&out_display, &workspace_path).await;
    if !path_decision.allowed {
        ledger.write_event(block(
            &path_decision.reason,
            &path_decision.rule_id,
            None,
            vec![out_display.clone()],
        ))?;
        eprintln!("BLOCK {}", path_decision.reason);
        return Ok(ExitCode::from(2));
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = match client.get(&args.url).send().await {
        Ok(response) => response,
        Err(e) => {
            let reason = format!("fetch failed: {e}");
            ledger.write_event(block(
                &reason,
                "fetch_http_error",
                Some(json!({"url": args.url})),
                vec![],
            ))?;
            eprintln!("BLOCK {reason}");
            return Ok(ExitCode::from(2));
        }
    };

    let status = response.status();
    if status.as_u16() >= 400 {
        let reason = format!("HTTP error: {}", status.as_u16());
        ledger.write_event(block(
            &reason,
            "fetch_http_error",
            Some(json!({"url": args.url, "status_code": status.as_u16()})),
            vec![],
        ))?;
        eprintln!("BLOCK {reason}");
        return Ok(ExitCode::from(2));
    }

    let bytes = response.bytes().await?;
    std::fs::write(&out_path, &bytes)?;

    ledger.write_event(
        AuditEvent::new(
            &request_id,
            &args.actor,
            "fetch",
            &args.url,
            DecisionLabel::Allow,
            &decision.reason,
            &decision.rule_id,
        )
        .with_sandbox(SandboxInfo {
            container_id: None,
            workspace_mount: Some(workspace_path.to_string_lossy().into_owned()),
            network_mode: Some(backend.network_mode().as_str().to_string()),
        })
        .with_network_attempts(vec![
            json!({"url": args.url, "status_code": status.as_u16()}),
        ])
        .with_files_touched(vec![out_display.clone()]),
    )?;

    println!("ALLOW saved to {out_display}");
    Ok(ExitCode::from(0))
}

/// The last path segment of the URL, if it has one ("a/b.txt" → "b.txt").
fn url_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_comes_from_the_url_path() {
        assert_eq!(
            url_file_name("https://example.com/files/data.tar.gz").as_deref(),
            Some("data.tar.gz")
        );
        assert_eq!(url_file_name("https://example.com/"), None);
        assert_eq!(url_file_name("not a url"), None);
    }
}
