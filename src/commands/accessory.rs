//! Command builders for one accessory's lifecycle.
//!
//! Every builder is a pure function of the accessory and deployment config.
//! Conditional flags are left out entirely when their input is absent or
//! false; nothing is emitted as an empty or `false` token.

use crate::commands::{Command, Pipeline, ProxyCommands, shell_quote};
use crate::config::{AccessoryConfig, DeployConfig, FileSource};
use crate::error::{ExecutionError, MissingFileError};
use crate::routing::Dispatch;

/// Lines replayed before `follow_logs` starts streaming.
pub const FOLLOW_TAIL_LINES: u32 = 10;

/// Bounds and filter for a one-shot log fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsOptions {
    pub timestamps: bool,
    /// Passed to `--since` (e.g. `1h`, `2024-01-01T00:00:00`).
    pub since: Option<String>,
    /// Passed to `--tail`.
    pub lines: Option<u32>,
    /// Literal filter term, quoted as a single shell word.
    pub grep: Option<String>,
    /// Extra grep flags, split on whitespace.
    pub grep_options: Option<String>,
}

impl Default for LogsOptions {
    fn default() -> Self {
        Self {
            timestamps: true,
            since: None,
            lines: None,
            grep: None,
            grep_options: None,
        }
    }
}

/// Builds runtime, proxy and cleanup commands for one accessory.
#[derive(Debug, Clone, Copy)]
pub struct AccessoryCommands<'a> {
    config: &'a DeployConfig,
    accessory: &'a AccessoryConfig,
}

impl<'a> AccessoryCommands<'a> {
    pub fn new(config: &'a DeployConfig, accessory: &'a AccessoryConfig) -> Self {
        Self { config, accessory }
    }

    pub fn accessory(&self) -> &'a AccessoryConfig {
        self.accessory
    }

    fn service_name(&self) -> &'a str {
        &self.accessory.service_name
    }

    /// Long-running container: detached, restarted unless stopped.
    pub fn run(&self) -> Command {
        let a = self.accessory;
        Command::docker()
            .arg("run")
            .args(["--name", self.service_name()])
            .arg("--detach")
            .args(["--restart", "unless-stopped"])
            .args(a.network_args.iter().cloned())
            .args(self.config.logging_args())
            .args(a.publish_args.iter().cloned())
            .args(a.env_args.iter().cloned())
            .args(a.volume_args.iter().cloned())
            .args(a.label_args.iter().cloned())
            .args(a.option_args.iter().cloned())
            .arg(a.image.as_str())
            .args(a.cmd.iter().cloned())
    }

    pub fn start(&self) -> Command {
        Command::docker().args(["container", "start", self.service_name()])
    }

    pub fn stop(&self) -> Command {
        Command::docker().args(["container", "stop", self.service_name()])
    }

    pub fn info(&self) -> Command {
        Command::docker().arg("ps").args(self.service_filter())
    }

    /// Register `target` for this accessory with the reverse proxy.
    pub fn deploy(&self, target: &str) -> Command {
        self.proxy()
            .deploy(self.service_name(), self.accessory.proxy.deploy_command_args(target))
    }

    /// Deregister `target` from the reverse proxy.
    pub fn remove(&self, target: &str) -> Command {
        self.proxy()
            .remove(self.service_name(), self.accessory.proxy.remove_command_args(target))
    }

    /// Bounded log fetch, optionally piped into a grep stage.
    pub fn logs(&self, options: &LogsOptions) -> Pipeline {
        Command::docker()
            .args(["logs", self.service_name()])
            .flag_value("--since", options.since.as_deref())
            .flag_value("--tail", options.lines)
            .arg_if(options.timestamps, "--timestamps")
            .arg("2>&1")
            .pipe_opt(grep_filter(
                options.grep.as_deref(),
                options.grep_options.as_deref(),
            ))
    }

    /// Streaming log tail on the first host.
    pub fn follow_logs(
        &self,
        timestamps: bool,
        grep: Option<&str>,
        grep_options: Option<&str>,
    ) -> Result<Dispatch, ExecutionError> {
        let pipeline = Command::docker()
            .args(["logs", self.service_name()])
            .arg_if(timestamps, "--timestamps")
            .args(["--tail".to_string(), FOLLOW_TAIL_LINES.to_string()])
            .arg("--follow")
            .arg("2>&1")
            .pipe_opt(grep_filter(grep, grep_options));
        self.run_over_ssh(pipeline)
    }

    /// `docker exec` into the running accessory container.
    pub fn execute_in_existing_container<S: AsRef<str>>(
        &self,
        command: &[S],
        interactive: bool,
    ) -> Command {
        Command::docker()
            .arg("exec")
            .arg_if(interactive, "-it")
            .arg(self.service_name())
            .args(command.iter().map(|s| s.as_ref().to_string()))
    }

    /// One-shot container from the accessory image, removed on exit.
    pub fn execute_in_new_container<S: AsRef<str>>(
        &self,
        command: &[S],
        interactive: bool,
    ) -> Command {
        let a = self.accessory;
        Command::docker()
            .arg("run")
            .arg_if(interactive, "-it")
            .arg("--rm")
            .args(a.network_args.iter().cloned())
            .args(a.env_args.iter().cloned())
            .args(a.volume_args.iter().cloned())
            .arg(a.image.as_str())
            .args(command.iter().map(|s| s.as_ref().to_string()))
    }

    pub fn execute_in_existing_container_over_ssh<S: AsRef<str>>(
        &self,
        command: &[S],
    ) -> Result<Dispatch, ExecutionError> {
        self.run_over_ssh(self.execute_in_existing_container(command, true))
    }

    pub fn execute_in_new_container_over_ssh<S: AsRef<str>>(
        &self,
        command: &[S],
    ) -> Result<Dispatch, ExecutionError> {
        self.run_over_ssh(self.execute_in_new_container(command, true))
    }

    /// Bind `command` to the first host for remote-shell dispatch.
    pub fn run_over_ssh(&self, command: impl Into<Pipeline>) -> Result<Dispatch, ExecutionError> {
        let host = self
            .accessory
            .primary_host()
            .ok_or_else(|| ExecutionError::NoHosts {
                accessory: self.accessory.name.clone(),
            })?;
        Ok(Dispatch::remote_shell(host, command))
    }

    /// Fail when a local file to upload is missing. Buffers always pass.
    pub fn ensure_local_file_present(&self, local_file: &FileSource) -> Result<(), MissingFileError> {
        match local_file {
            FileSource::Buffer(_) => Ok(()),
            FileSource::Path(path) if path.exists() => Ok(()),
            FileSource::Path(path) => Err(MissingFileError { path: path.clone() }),
        }
    }

    pub fn remove_service_directory(&self) -> Command {
        Command::new("rm").args(["-rf", self.service_name()])
    }

    pub fn remove_container(&self) -> Command {
        Command::docker()
            .args(["container", "prune", "--force"])
            .args(self.service_filter())
    }

    pub fn remove_image(&self) -> Command {
        Command::docker().args(["image", "rm", "--force", self.accessory.image.as_str()])
    }

    pub fn ensure_env_directory(&self) -> Command {
        make_directory(&self.accessory.env_directory)
    }

    /// One `mkdir -p` per configured host directory.
    pub fn create_directories(&self) -> Vec<Command> {
        self.accessory
            .directories
            .iter()
            .map(|d| make_directory(&self.accessory.directory_host_path(d)))
            .collect()
    }

    /// `mkdir -p` for the host-side parent of a file mounted at `remote`.
    pub fn make_directory_for(&self, remote: &str) -> Command {
        let path = self.accessory.file_host_path(remote);
        let parent = path.rsplit_once('/').map_or(path.as_str(), |(dir, _)| dir);
        make_directory(parent)
    }

    fn service_filter(&self) -> [String; 2] {
        [
            "--filter".to_string(),
            format!("label=service={}", self.service_name()),
        ]
    }

    fn proxy(&self) -> ProxyCommands<'a> {
        ProxyCommands::new(&self.config.proxy_container_name, &self.config.proxy_binary)
    }
}

fn make_directory(path: &str) -> Command {
    Command::new("mkdir").args(["-p", path])
}

fn grep_filter(grep: Option<&str>, grep_options: Option<&str>) -> Option<Command> {
    grep.map(|term| {
        Command::new("grep")
            .arg(shell_quote(term))
            .args(grep_options.into_iter().flat_map(str::split_ascii_whitespace))
    })
}
