// run.rs — Inline mode: evaluate a command and run it in the sandbox.
//
// The gauntlet, in order: rate limit → command allowlist → path checks on
// path-like arguments → approval gate for privileged binaries → sandboxed
// execution. Every stop on the way out is audited; exit codes follow the
// documented contract (2 = blocked, 3 = approval required, else the
// child's exit code).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;

use agentsafe_approvals::GrantStore;
use agentsafe_audit::{AuditEvent, DecisionLabel, SandboxInfo};
use agentsafe_policy::{load_backend, load_policy, NetworkMode, RateLimiter};
use agentsafe_sandbox::DockerSandboxRunner;

use super::{open_grants, open_ledger, tail_chars};

/// Binaries gated on an operator approval even when the policy allows them.
const APPROVAL_REQUIRED_BINARIES: &[&str] = &["curl", "wget", "apt", "apt-get"];

/// How much of the sandbox output lands in the audit record.
const PREVIEW_CHARS: usize = 800;

#[derive(Args)]
pub struct RunArgs {
    /// Path to policy YAML.
    #[arg(long)]
    pub policy: String,

    /// Acting identity recorded in the ledger.
    #[arg(long, default_value = "unknown-agent")]
    pub actor: String,

    /// Workspace directory mounted into the sandbox.
    #[arg(long, default_value = ".")]
    pub workspace: String,

    /// Docker --cpus limit (e.g., "1.5").
    #[arg(long, default_value = "")]
    pub cpu_limit: String,

    /// Docker --memory limit (e.g., "256m").
    #[arg(long, default_value = "")]
    pub mem_limit: String,

    /// Decision backend: yaml or opa.
    #[arg(long, default_value = "yaml")]
    pub policy_backend: String,

    /// Command to execute; use a `--` separator before it.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub cmd: Vec<String>,
}

pub async fn execute(args: RunArgs) -> anyhow::Result<ExitCode> {
    let ledger = open_ledger()?;
    let request_id = ledger.new_request_id();
    let workspace_path = resolve_workspace(&args.workspace);
    let args_summary = shell_words::join(args.cmd.iter().map(String::as_str));

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

    let block = |reason: &str, rule_id: &str, files: Vec<String>| -> AuditEvent {
        AuditEvent::new(
            &request_id,
            &args.actor,
            "run",
            &args_summary,
            DecisionLabel::Block,
            reason,
            rule_id,
        )
        .with_sandbox(SandboxInfo::default())
        .with_files_touched(files)
    };

    let limiter = RateLimiter::new(&loaded.tools.rate_limits);
    let rate_decision = limiter.check("run");
    if !rate_decision.allowed {
        ledger.write_event(block(&rate_decision.reason, &rate_decision.rule_id, vec![]))?;
        eprintln!("BLOCK {}", rate_decision.reason);
        return Ok(ExitCode::from(2));
    }

    let decision = backend.evaluate_run(&args.cmd, &workspace_path).await;
    if !decision.allowed {
        ledger.write_event(block(&decision.reason, &decision.rule_id, vec![]))?;
        eprintln!("BLOCK {}", decision.reason);
        return Ok(ExitCode::from(2));
    }

    let file_args: Vec<String> = args.cmd[1..]
        .iter()
        .filter(|arg| arg.contains('/') || arg.starts_with('.'))
        .cloned()
        .collect();
    for candidate in &file_args {
        let path_decision = backend.evaluate_path(candidate, &workspace_path).await;
        if !path_decision.allowed {
            ledger.write_event(block(
                &path_decision.reason,
                &path_decision.rule_id,
                vec![candidate.clone()],
            ))?;
            eprintln!("BLOCK {}", path_decision.reason);
            return Ok(ExitCode::from(2));
        }
    }

    let grants = open_grants()?;
    if requires_approval(&args.cmd)
        && !approval_exists(&workspace_path, &args.cmd, &args.actor, &grants)?
    {
        let reason = "command requires approval token in .agentsafe_approvals";
        ledger.write_event(block(reason, "approval_required", vec![]))?;
        eprintln!("BLOCK {reason}");
        return Ok(ExitCode::from(3));
    }

    // Sandbox wiring: env allowlist always, proxy egress only when the
    // policy opted into allow_proxy mode.
    let mut network_mode = "none";
    let mut run_env = collect_env(backend.env_allowlist());
    if backend.network_mode() == NetworkMode::AllowProxy {
        network_mode = "bridge";
        let proxy_url = std::env::var("AGENTSAFE_PROXY_URL")
            .unwrap_or_else(|_| "http://host.docker.internal:8080".to_string());
        run_env.insert("HTTP_PROXY".to_string(), proxy_url.clone());
        run_env.insert("HTTPS_PROXY".to_string(), proxy_url);
    }

    let mut runner = DockerSandboxRunner::local();
    if !args.cpu_limit.is_empty() {
        runner = runner.with_cpu_limit(&args.cpu_limit);
    }
    if !args.mem_limit.is_empty() {
        runner = runner.with_mem_limit(&args.mem_limit);
    }

    let result = match runner
        .run(&args.cmd, &workspace_path, network_mode, &run_env)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            ledger.write_event(block(&format!("sandbox failed: {e}"), "sandbox_error", vec![]))?;
            eprintln!("BLOCK sandbox failed: {e}");
            return Ok(ExitCode::from(2));
        }
    };

    let succeeded = result.exit_code == 0;
    let reason = if succeeded {
        decision.reason.clone()
    } else {
        format!("command exited non-zero ({})", result.exit_code)
    };
    let network_attempts = if backend.network_mode() == NetworkMode::AllowProxy {
        parse_proxy_logs(Path::new(super::AUDIT_DIR).join("proxy.log.jsonl"))
    } else {
        Vec::new()
    };

    ledger.write_event(
        AuditEvent::new(
            &request_id,
            &args.actor,
            "run",
            &args_summary,
            if succeeded {
                DecisionLabel::Allow
            } else {
                DecisionLabel::Block
            },
            &reason,
            &decision.rule_id,
        )
        .with_sandbox(SandboxInfo {
            container_id: Some(result.container_id.clone()),
            workspace_mount: Some(workspace_path.to_string_lossy().into_owned()),
            network_mode: Some(network_mode.to_string()),
        })
        .with_network_attempts(network_attempts)
        .with_files_touched(file_args)
        .with_output_previews(
            tail_chars(&result.stdout, PREVIEW_CHARS),
            tail_chars(&result.stderr, PREVIEW_CHARS),
        ),
    )?;

    print!("{}", result.stdout);
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }

    Ok(exit_code_from(result.exit_code))
}

/// Privileged binaries need an operator approval on top of policy.
fn requires_approval(cmd: &[String]) -> bool {
    cmd.first().is_some_and(|first| {
        let binary = Path::new(first)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| first.clone());
        APPROVAL_REQUIRED_BINARIES.contains(&binary.as_str())
    })
}

/// An approval exists when the exact command line is listed in the
/// workspace override file, or an active grant covers it.
fn approval_exists(
    workspace: &Path,
    cmd: &[String],
    actor: &str,
    grants: &GrantStore,
) -> anyhow::Result<bool> {
    let command_string = shell_words::join(cmd.iter().map(String::as_str));
    let approval_file = workspace.join(".agentsafe_approvals");
    if approval_file.exists() {
        let listed = std::fs::read_to_string(&approval_file)?
            .lines()
            .any(|line| line == command_string);
        if listed {
            return Ok(true);
        }
    }

    if grants.is_allowed(actor, "run", &command_string) {
        return Ok(true);
    }
    let binary = Path::new(&cmd[0])
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cmd[0].clone());
    Ok(grants.is_allowed(actor, "run", &format!("{binary} *")))
}

/// Pass through only the environment variables the policy allows.
fn collect_env(allowlist: &[String]) -> HashMap<String, String> {
    allowlist
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.clone(), value)))
        .collect()
}

/// Tail of the egress proxy's log, attached to the audit record so the
/// operator sees what the sandboxed command tried to reach.
fn parse_proxy_logs(proxy_log_path: PathBuf) -> Vec<serde_json::Value> {
    let Ok(text) = std::fs::read_to_string(proxy_log_path) else {
        return Vec::new();
    };
    let entries: Vec<serde_json::Value> = text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    let skip = entries.len().saturating_sub(50);
    entries.into_iter().skip(skip).collect()
}

fn resolve_workspace(workspace: &str) -> PathBuf {
    let path = PathBuf::from(workspace);
    path.canonicalize().unwrap_or(path)
}

fn exit_byte(code: i32) -> u8 {
    code.rem_euclid(256) as u8
}

fn exit_code_from(code: i32) -> ExitCode {
    ExitCode::from(exit_byte(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn approval_binaries_are_flagged() {
        assert!(requires_approval(&cmd(&["curl", "https://x"])));
        assert!(requires_approval(&cmd(&["/usr/bin/wget", "https://x"])));
        assert!(requires_approval(&cmd(&["apt-get", "install", "jq"])));
        assert!(!requires_approval(&cmd(&["ls", "-la"])));
        assert!(!requires_approval(&[]));
    }

    #[test]
    fn approval_file_matches_exact_command_line() {
        let ws = tempfile::tempdir().unwrap();
        let grants = GrantStore::new(ws.path().join("grants.jsonl")).unwrap();
        std::fs::write(
            ws.path().join(".agentsafe_approvals"),
            "curl https://openai.com\n",
        )
        .unwrap();
        assert!(approval_exists(
            ws.path(),
            &cmd(&["curl", "https://openai.com"]),
            "a",
            &grants
        )
        .unwrap());
        assert!(!approval_exists(
            ws.path(),
            &cmd(&["curl", "https://evil.com"]),
            "a",
            &grants
        )
        .unwrap());
    }

    #[test]
    fn binary_wildcard_grant_satisfies_the_gate() {
        let ws = tempfile::tempdir().unwrap();
        let grants = GrantStore::new(ws.path().join("grants.jsonl")).unwrap();
        grants.issue("a", "run", "curl *", 60, "demo").unwrap();
        assert!(approval_exists(
            ws.path(),
            &cmd(&["curl", "https://anything.example"]),
            "a",
            &grants
        )
        .unwrap());
    }

    #[test]
    fn exit_codes_map_into_u8_range() {
        assert_eq!(exit_byte(0), 0);
        assert_eq!(exit_byte(7), 7);
        assert_eq!(exit_byte(-1), 255);
    }
}
