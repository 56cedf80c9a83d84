//! Command execution.
//!
//! [`CommandRunner`] is the transport seam: the builders only produce
//! commands, a runner decides how bytes reach a process. [`ProcessRunner`]
//! is the real implementation, spawning `sh -c` locally or on a host through
//! the ssh client.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::commands::{Command, Pipeline};
use crate::config::SshConfig;
use crate::error::ExecutionError;
use crate::routing::remote_shell_command;

/// Result of running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
    /// Captured standard output (empty for interactive sessions).
    pub stdout: String,
    /// Captured standard error (empty for interactive sessions).
    pub stderr: String,
    /// How long the command ran.
    pub duration: Duration,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes built commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run through the regular (non-interactive) transport.
    async fn execute(&self, command: &Pipeline) -> Result<ExecOutput, ExecutionError>;

    /// Run on `host` through an interactive remote shell.
    async fn execute_over_remote_shell(
        &self,
        command: &Pipeline,
        host: &str,
    ) -> Result<ExecOutput, ExecutionError>;

    /// Compose two commands into a pipeline.
    fn pipe(&self, first: Command, second: Command) -> Pipeline {
        first.piped(second)
    }
}

/// Where [`ProcessRunner::execute`] sends commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// This machine.
    Local,
    /// A deployment host, reached over ssh without a terminal.
    Host(String),
}

/// Spawns real processes via `sh -c`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    target: Target,
    ssh: SshConfig,
}

impl ProcessRunner {
    pub fn local(ssh: SshConfig) -> Self {
        Self {
            target: Target::Local,
            ssh,
        }
    }

    pub fn on_host(host: impl Into<String>, ssh: SshConfig) -> Self {
        Self {
            target: Target::Host(host.into()),
            ssh,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Shell line [`execute`](CommandRunner::execute) hands to `sh -c`.
    pub fn command_line(&self, command: &Pipeline) -> String {
        match &self.target {
            Target::Local => command.to_string(),
            Target::Host(host) => remote_shell_command(&self.ssh, host, command, false).to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute(&self, command: &Pipeline) -> Result<ExecOutput, ExecutionError> {
        run_shell(self.command_line(command), false).await
    }

    async fn execute_over_remote_shell(
        &self,
        command: &Pipeline,
        host: &str,
    ) -> Result<ExecOutput, ExecutionError> {
        let line = remote_shell_command(&self.ssh, host, command, true).to_string();
        run_shell(line, true).await
    }
}

async fn run_shell(line: String, interactive: bool) -> Result<ExecOutput, ExecutionError> {
    tracing::info!(command = %line, interactive, "running");

    let mut process = tokio::process::Command::new("sh");
    process.arg("-c").arg(&line);

    let start = Instant::now();
    let spawn_error = |source| ExecutionError::Spawn {
        command: line.clone(),
        source,
    };

    let output = if interactive {
        let status = process
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(spawn_error)?;
        ExecOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::new(),
            stderr: String::new(),
            duration: start.elapsed(),
        }
    } else {
        let output = process
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error)?;
        ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        }
    };

    if output.success() {
        tracing::debug!(duration = ?output.duration, "command finished");
    } else {
        tracing::warn!(
            command = %line,
            exit_code = output.exit_code,
            "command exited with non-zero status"
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_for_local_target() {
        let runner = ProcessRunner::local(SshConfig::default());
        let pipeline = Command::docker().arg("ps").into();
        assert_eq!(runner.command_line(&pipeline), "docker ps");
    }

    #[test]
    fn command_line_for_host_target_has_no_tty() {
        let runner = ProcessRunner::on_host("10.0.0.5", SshConfig::default());
        let pipeline = Command::docker().args(["container", "stop", "redis"]).into();
        assert_eq!(
            runner.command_line(&pipeline),
            "ssh root@10.0.0.5 -p 22 'docker container stop redis'"
        );
        assert_eq!(runner.target(), &Target::Host("10.0.0.5".into()));
    }

    #[test]
    fn default_pipe_composes() {
        let runner = ProcessRunner::local(SshConfig::default());
        let pipeline = runner.pipe(Command::new("echo").arg("hi"), Command::new("cat"));
        assert_eq!(pipeline.to_string(), "echo hi | cat");
    }

    #[tokio::test]
    async fn local_execution_captures_output() {
        let runner = ProcessRunner::local(SshConfig::default());
        let pipeline = Command::new("echo")
            .arg("hello")
            .piped(Command::new("tr").args(["a-z", "A-Z"]));
        let output = runner.execute(&pipeline).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "HELLO");
    }

    #[tokio::test]
    async fn non_zero_exit_is_returned_not_raised() {
        let runner = ProcessRunner::local(SshConfig::default());
        let output = runner
            .execute(&Command::new("exit").arg("3").into())
            .await
            .unwrap();
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }
}
