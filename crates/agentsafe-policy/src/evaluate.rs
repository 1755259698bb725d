// evaluate.rs — Pure decision functions over a loaded policy.
//
// The evaluator is total: for any input it returns a Decision, never an
// error. A BLOCK is an ordinary outcome carrying a rule id from a fixed
// vocabulary (cmd_*, path_*, net_*), so callers can audit and test against
// exact identifiers rather than message strings.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{NetworkMode, Policy};

/// System roots that are always denied, on top of the policy's own deny
/// list. The literal "~" and "$HOME" entries are deliberately redundant
/// with the expanded home directory.
pub const DENY_SYSTEM_PATHS: &[&str] = &["/etc", "/proc", "/sys", "/root", "~", "$HOME"];

/// Outcome of a policy check. Purely value-typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
    pub rule_id: String,
}

impl Decision {
    pub fn allow(reason: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            rule_id: rule_id.into(),
        }
    }

    pub fn block(reason: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            rule_id: rule_id.into(),
        }
    }
}

/// Evaluate a command against the ordered allowlist.
///
/// Matching is by binary basename; a rule with an `arg_regex` additionally
/// requires the regex to match the shell-quoted argument string. Invalid
/// regexes never match (fail-closed).
pub fn evaluate_command(policy: &Policy, cmd: &[String], _workspace_root: &Path) -> Decision {
    let Some(first) = cmd.first() else {
        return Decision::block("empty command", "cmd_empty");
    };
    let binary = basename(first);

    for rule in &policy.tools.commands {
        if binary != rule.binary {
            continue;
        }
        if let Some(pattern) = &rule.arg_regex {
            let rendered = shell_words::join(cmd[1..].iter().map(String::as_str));
            match regex::Regex::new(pattern) {
                Ok(re) if re.is_match(&rendered) => {}
                _ => continue,
            }
        }
        return Decision::allow(format!("command allowed: {binary}"), rule.rule_id.clone());
    }
    Decision::block(
        format!("command blocked: {binary} not allowlisted"),
        "cmd_not_allowlisted",
    )
}

/// Evaluate a filesystem path. Deny beats allow when both would match.
///
/// The candidate is normalized (home expansion, joined under the workspace
/// root when relative, symlinks and `..` resolved) before comparison, and
/// so is every configured root, so `~/x` and the expanded home form compare
/// equal.
pub fn evaluate_path(policy: &Policy, candidate: &str, workspace_root: &Path) -> Decision {
    let normalized = normalize_path(candidate, workspace_root);

    for denied in DENY_SYSTEM_PATHS
        .iter()
        .map(|s| s.to_string())
        .chain(policy.tools.paths.deny.iter().cloned())
    {
        let denied_path = normalize_path(&denied, workspace_root);
        if normalized == denied_path || normalized.starts_with(&denied_path) {
            return Decision::block(format!("path denied: {candidate}"), "path_deny");
        }
    }

    let workspace_fallback = [workspace_root.to_string_lossy().into_owned()];
    let allow_roots: &[String] = if policy.tools.paths.allow.is_empty() {
        &workspace_fallback
    } else {
        &policy.tools.paths.allow
    };
    for allowed in allow_roots {
        let allowed_path = normalize_path(allowed, workspace_root);
        if normalized == allowed_path || normalized.starts_with(&allowed_path) {
            return Decision::allow(format!("path allowed: {candidate}"), "path_allow");
        }
    }

    Decision::block(
        format!("path outside allowlist: {candidate}"),
        "path_outside_allowlist",
    )
}

/// Evaluate an outbound URL against the network allowlist.
///
/// Domains match exactly or as a proper suffix after a dot, so
/// "github.com" covers "api.github.com" but not "evilgithub.com".
pub fn evaluate_url(policy: &Policy, url: &str) -> Decision {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return Decision::block("unsupported URL scheme", "net_bad_scheme"),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return Decision::block("unsupported URL scheme", "net_bad_scheme");
    }
    let Some(host) = parsed.host_str() else {
        return Decision::block("URL missing host", "net_no_host");
    };

    if policy.tools.network.mode == NetworkMode::None {
        return Decision::block("network disabled by policy", "net_disabled");
    }

    for allowed in &policy.tools.network.domains {
        if host == allowed || host.ends_with(&format!(".{allowed}")) {
            let port = parsed.port_or_known_default().unwrap_or(443);
            if policy.tools.network.ports.contains(&port) {
                return Decision::allow(
                    format!("domain allowed: {host}:{port}"),
                    "net_domain_allow",
                );
            }
            return Decision::block(
                format!("port not allowed for domain: {host}:{port}"),
                "net_port_block",
            );
        }
    }

    Decision::block(format!("domain not allowlisted: {host}"), "net_domain_block")
}

/// Basename of a command path ("/usr/bin/ls" → "ls").
fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Expand `~`/`$HOME`, absolutize under the workspace root, and resolve.
///
/// Canonicalization needs the path to exist; for candidates that do not
/// (yet) exist we fall back to lexical resolution of `.` and `..` so the
/// deny floor still applies to paths an agent is about to create.
pub fn normalize_path(path: &str, workspace_root: &Path) -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    let home_str = home.to_string_lossy();
    let expanded = path.replace("$HOME", &home_str).replace('~', &home_str);

    let joined = {
        let p = PathBuf::from(expanded);
        if p.is_absolute() {
            p
        } else {
            workspace_root.join(p)
        }
    };
    joined
        .canonicalize()
        .unwrap_or_else(|_| resolve_best_effort(&lexical_resolve(&joined)))
}

/// Canonicalize the deepest existing ancestor and re-append the rest, so a
/// file an agent is about to create still normalizes under its real parent.
fn resolve_best_effort(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut base) => {
                for part in tail.iter().rev() {
                    base.push(part);
                }
                return base;
            }
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    tail.push(name.to_os_string());
                    existing = parent;
                }
                _ => return path.to_path_buf(),
            },
        }
    }
}

fn lexical_resolve(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
