// runner.rs — Single-shot Docker container execution.
//
// Every run spawns `docker run --rm` with a hardened flag set: read-only
// rootfs, tmpfs /tmp, all capabilities dropped, no privilege escalation,
// the invoking user's uid/gid, and the workspace bind-mounted at
// /workspace. The container is the unit of cleanup — `--rm` means there
// is nothing to reap even when the command fails or times out.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Errors from sandboxed execution.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The docker client could not be spawned at all.
    #[error("failed to spawn docker: {0}")]
    Spawn(std::io::Error),

    /// The command exceeded its wall-clock budget.
    #[error("sandboxed command timed out after {0:?}")]
    Timeout(Duration),
}

/// Outcome of one sandboxed command.
#[derive(Debug, Clone)]
pub struct SandboxResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub container_id: String,
    pub command: Vec<String>,
}

/// Runs commands in ephemeral, hardened Docker containers.
#[derive(Debug, Clone)]
pub struct DockerSandboxRunner {
    image: String,
    cpu_limit: Option<String>,
    mem_limit: Option<String>,
    timeout: Duration,
}

impl DockerSandboxRunner {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            cpu_limit: None,
            mem_limit: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// The default local sandbox image.
    pub fn local() -> Self {
        Self::new("agentsafe-sandbox:local")
    }

    pub fn with_cpu_limit(mut self, cpus: impl Into<String>) -> Self {
        self.cpu_limit = Some(cpus.into());
        self
    }

    pub fn with_mem_limit(mut self, memory: impl Into<String>) -> Self {
        self.mem_limit = Some(memory.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the docker invocation for a command.
    fn docker_args(
        &self,
        command: &[String],
        workspace: &Path,
        network_mode: &str,
        env: &HashMap<String, String>,
    ) -> Vec<String> {
        // SAFETY: getuid/getgid read process credentials and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };

        let mut args: Vec<String> = [
            "run",
            "--rm",
            "-i",
            "--read-only",
            "--tmpfs",
            "/tmp:rw,noexec,nosuid,size=64m",
            "--cap-drop",
            "ALL",
            "--security-opt",
            "no-new-privileges",
            "--add-host",
            "host.docker.internal:host-gateway",
        ]
        .map(str::to_string)
        .to_vec();
        args.push("-u".to_string());
        args.push(format!("{uid}:{gid}"));
        args.push("-v".to_string());
        args.push(format!("{}:/workspace:rw", workspace.display()));
        args.push("-w".to_string());
        args.push("/workspace".to_string());
        args.push("--network".to_string());
        args.push(network_mode.to_string());

        if let Some(cpus) = &self.cpu_limit {
            args.push("--cpus".to_string());
            args.push(cpus.clone());
        }
        if let Some(memory) = &self.mem_limit {
            args.push("--memory".to_string());
            args.push(memory.clone());
        }
        for (key, value) in env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(self.image.clone());
        // The image entrypoint takes one shell-quoted command string.
        args.push(shell_words::join(command.iter().map(String::as_str)));
        args
    }

    /// Run a command to completion inside a fresh container.
    pub async fn run(
        &self,
        command: &[String],
        workspace: &Path,
        network_mode: &str,
        env: &HashMap<String, String>,
    ) -> Result<SandboxResult, SandboxError> {
        let args = self.docker_args(command, workspace, network_mode, env);
        tracing::debug!(image = %self.image, network = network_mode, "spawning sandbox");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new("docker").args(&args).output(),
        )
        .await
        .map_err(|_| SandboxError::Timeout(self.timeout))?
        .map_err(SandboxError::Spawn)?;

        Ok(SandboxResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            container_id: "ephemeral".to_string(),
            command: command.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(runner: &DockerSandboxRunner, cmd: &[&str], network: &str) -> Vec<String> {
        let ws = tempfile::tempdir().unwrap();
        let env = HashMap::from([("HTTP_PROXY".to_string(), "http://proxy:8080".to_string())]);
        runner.docker_args(
            &cmd.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            ws.path(),
            network,
            &env,
        )
    }

    #[test]
    fn hardened_flags_are_always_present() {
        let args = args_for(&DockerSandboxRunner::local(), &["ls", "-la"], "none");
        for flag in ["--rm", "--read-only", "--cap-drop", "no-new-privileges"] {
            assert!(args.iter().any(|a| a == flag), "missing {flag}");
        }
        assert!(args.contains(&"none".to_string()));
    }

    #[test]
    fn env_and_limits_are_forwarded() {
        let runner = DockerSandboxRunner::local()
            .with_cpu_limit("1.5")
            .with_mem_limit("256m");
        let args = args_for(&runner, &["ls"], "bridge");
        assert!(args.contains(&"--cpus".to_string()));
        assert!(args.contains(&"1.5".to_string()));
        assert!(args.contains(&"--memory".to_string()));
        assert!(args.contains(&"HTTP_PROXY=http://proxy:8080".to_string()));
    }

    #[test]
    fn command_is_shell_quoted_as_one_arg() {
        let args = args_for(
            &DockerSandboxRunner::local(),
            &["echo", "hello world"],
            "none",
        );
        assert_eq!(args.last().unwrap(), "echo 'hello world'");
    }
}
