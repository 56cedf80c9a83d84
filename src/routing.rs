//! Execution routing for accessory commands.
//!
//! Administrative and runtime operations are dispatched directly through the
//! runner. Operations that stream without end (`follow_logs`) or need a
//! terminal (interactive exec) are bound to the accessory's first host and
//! dispatched through a remote shell. Wrapping never touches the inner
//! command; only the transport differs.

use crate::commands::{AccessoryCommands, Command, LogsOptions, Pipeline, shell_quote};
use crate::config::SshConfig;
use crate::error::ExecutionError;
use crate::runner::{CommandRunner, ExecOutput};

/// Transport a built command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the runner's regular client.
    Direct,
    /// Through an ssh session on a specific host.
    RemoteShell,
}

/// A built command paired with its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Direct(Pipeline),
    RemoteShell { host: String, command: Pipeline },
}

impl Dispatch {
    pub fn direct(command: impl Into<Pipeline>) -> Self {
        Self::Direct(command.into())
    }

    pub fn remote_shell(host: impl Into<String>, command: impl Into<Pipeline>) -> Self {
        Self::RemoteShell {
            host: host.into(),
            command: command.into(),
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Self::Direct(_) => Route::Direct,
            Self::RemoteShell { .. } => Route::RemoteShell,
        }
    }

    /// The inner command, identical for both transports.
    pub fn command(&self) -> &Pipeline {
        match self {
            Self::Direct(command) | Self::RemoteShell { command, .. } => command,
        }
    }

    /// Host bound to a remote-shell dispatch.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Direct(_) => None,
            Self::RemoteShell { host, .. } => Some(host.as_str()),
        }
    }

    /// Hand the command to `runner` over the matching transport.
    pub async fn execute(&self, runner: &dyn CommandRunner) -> Result<ExecOutput, ExecutionError> {
        match self {
            Self::Direct(command) => {
                tracing::debug!(command = %command, "dispatching directly");
                runner.execute(command).await
            }
            Self::RemoteShell { host, command } => {
                tracing::debug!(host = %host, command = %command, "dispatching over remote shell");
                runner.execute_over_remote_shell(command, host).await
            }
        }
    }

    /// Command line as it would be typed, for dry runs.
    pub fn render(&self, ssh: &SshConfig) -> String {
        match self {
            Self::Direct(command) => command.to_string(),
            Self::RemoteShell { host, command } => {
                remote_shell_command(ssh, host, command, true).to_string()
            }
        }
    }
}

/// `ssh [-J jump] [-t] user@host -p port '<command>'`.
///
/// The whole pipeline travels as one quoted word so the remote shell sees it
/// exactly as rendered locally.
pub fn remote_shell_command(
    ssh: &SshConfig,
    host: &str,
    command: &Pipeline,
    interactive: bool,
) -> Command {
    let jump = ssh.proxy.as_deref();
    Command::new("ssh")
        .flag_value("-J", jump)
        .arg_if(interactive, "-t")
        .arg(format!("{}@{host}", ssh.user))
        .arg("-p")
        .arg(ssh.port.to_string())
        .arg(shell_quote(&command.to_string()))
}

/// A lifecycle operation on one accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Run,
    Start,
    Stop,
    Info,
    Logs(LogsOptions),
    FollowLogs {
        timestamps: bool,
        grep: Option<String>,
        grep_options: Option<String>,
    },
    ExecInExistingContainer {
        command: Vec<String>,
        interactive: bool,
    },
    ExecInNewContainer {
        command: Vec<String>,
        interactive: bool,
    },
    ExecInExistingContainerOverSsh {
        command: Vec<String>,
    },
    ExecInNewContainerOverSsh {
        command: Vec<String>,
    },
    ProxyDeploy {
        target: String,
    },
    ProxyRemove {
        target: String,
    },
    RemoveServiceDirectory,
    RemoveContainer,
    RemoveImage,
    EnsureEnvDirectory,
}

impl Intent {
    /// Transport this operation always takes.
    pub fn route(&self) -> Route {
        match self {
            Self::FollowLogs { .. }
            | Self::ExecInExistingContainerOverSsh { .. }
            | Self::ExecInNewContainerOverSsh { .. } => Route::RemoteShell,
            _ => Route::Direct,
        }
    }
}

/// Build the command for `intent` and attach its transport.
pub fn route(commands: &AccessoryCommands<'_>, intent: &Intent) -> Result<Dispatch, ExecutionError> {
    let dispatch = match intent {
        Intent::Run => Dispatch::direct(commands.run()),
        Intent::Start => Dispatch::direct(commands.start()),
        Intent::Stop => Dispatch::direct(commands.stop()),
        Intent::Info => Dispatch::direct(commands.info()),
        Intent::Logs(options) => Dispatch::direct(commands.logs(options)),
        Intent::FollowLogs {
            timestamps,
            grep,
            grep_options,
        } => commands.follow_logs(*timestamps, grep.as_deref(), grep_options.as_deref())?,
        Intent::ExecInExistingContainer {
            command,
            interactive,
        } => Dispatch::direct(commands.execute_in_existing_container(command.as_slice(), *interactive)),
        Intent::ExecInNewContainer {
            command,
            interactive,
        } => Dispatch::direct(commands.execute_in_new_container(command.as_slice(), *interactive)),
        Intent::ExecInExistingContainerOverSsh { command } => {
            commands.execute_in_existing_container_over_ssh(command.as_slice())?
        }
        Intent::ExecInNewContainerOverSsh { command } => {
            commands.execute_in_new_container_over_ssh(command.as_slice())?
        }
        Intent::ProxyDeploy { target } => Dispatch::direct(commands.deploy(target)),
        Intent::ProxyRemove { target } => Dispatch::direct(commands.remove(target)),
        Intent::RemoveServiceDirectory => Dispatch::direct(commands.remove_service_directory()),
        Intent::RemoveContainer => Dispatch::direct(commands.remove_container()),
        Intent::RemoveImage => Dispatch::direct(commands.remove_image()),
        Intent::EnsureEnvDirectory => Dispatch::direct(commands.ensure_env_directory()),
    };
    debug_assert_eq!(dispatch.route(), intent.route());
    Ok(dispatch)
}
