//! `berth accessory <name> <action>` commands.
//!
//! Each action is planned as an ordered list of [`Dispatch`]es and then
//! executed. Direct dispatches run on every accessory host in turn;
//! remote-shell dispatches are already bound to the first host.

use std::sync::Arc;

use anyhow::bail;
use clap::Subcommand;

use crate::commands::{AccessoryCommands, LogsOptions};
use crate::config::DeployConfig;
use crate::error::ExecutionError;
use crate::routing::{Dispatch, Intent, Route, route};
use crate::runner::{CommandRunner, ProcessRunner};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AccessoryAction {
    /// Create directories, run the container and register it with the proxy
    Boot,

    /// Remove the container and boot it again
    Reboot,

    /// Start the existing container
    Start,

    /// Stop the container
    Stop,

    /// Stop, then start the container
    Restart,

    /// Show the container's status
    Details,

    /// Show log lines, or follow them on the first host
    Logs {
        /// Only lines newer than this (e.g. 1h, 2024-01-01T00:00:00)
        #[arg(short, long)]
        since: Option<String>,

        /// Number of lines from the end
        #[arg(short = 'n', long)]
        lines: Option<u32>,

        /// Only lines containing this text
        #[arg(short, long)]
        grep: Option<String>,

        /// Extra grep flags (e.g. "-i -C 2")
        #[arg(long, allow_hyphen_values = true)]
        grep_options: Option<String>,

        /// Keep streaming new lines, starting from the last 10
        #[arg(short, long, conflicts_with_all = ["since", "lines"])]
        follow: bool,

        /// Omit timestamps
        #[arg(long)]
        no_timestamps: bool,
    },

    /// Run a command in a fresh or the running container
    Exec {
        /// Use the running container instead of a new one
        #[arg(long)]
        reuse: bool,

        /// Attach a terminal on the first host
        #[arg(short, long)]
        interactive: bool,

        /// Command to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Stop and delete the container, image and service directory
    Remove,

    /// Register the accessory with the reverse proxy
    ProxyDeploy,

    /// Deregister the accessory from the reverse proxy
    ProxyRemove,
}

/// Ordered dispatches for `action`.
pub fn plan(commands: &AccessoryCommands<'_>, action: &AccessoryAction) -> anyhow::Result<Vec<Dispatch>> {
    let accessory = commands.accessory();
    let target = accessory.service_name.clone();

    let intents = match action {
        AccessoryAction::Boot => return boot(commands),
        AccessoryAction::Reboot => {
            let mut steps = build(commands, [Intent::Stop, Intent::RemoveContainer])?;
            steps.extend(boot(commands)?);
            return Ok(steps);
        }
        AccessoryAction::Start => vec![Intent::Start],
        AccessoryAction::Stop => vec![Intent::Stop],
        AccessoryAction::Restart => vec![Intent::Stop, Intent::Start],
        AccessoryAction::Details => vec![Intent::Info],
        AccessoryAction::Logs {
            since,
            lines,
            grep,
            grep_options,
            follow,
            no_timestamps,
        } => {
            if *follow {
                vec![Intent::FollowLogs {
                    timestamps: !no_timestamps,
                    grep: grep.clone(),
                    grep_options: grep_options.clone(),
                }]
            } else {
                vec![Intent::Logs(LogsOptions {
                    timestamps: !no_timestamps,
                    since: since.clone(),
                    lines: *lines,
                    grep: grep.clone(),
                    grep_options: grep_options.clone(),
                })]
            }
        }
        AccessoryAction::Exec {
            reuse,
            interactive,
            command,
        } => {
            let command = command.clone();
            vec![match (*interactive, *reuse) {
                (true, true) => Intent::ExecInExistingContainerOverSsh { command },
                (true, false) => Intent::ExecInNewContainerOverSsh { command },
                (false, true) => Intent::ExecInExistingContainer {
                    command,
                    interactive: false,
                },
                (false, false) => Intent::ExecInNewContainer {
                    command,
                    interactive: false,
                },
            }]
        }
        AccessoryAction::Remove => {
            let mut intents = Vec::new();
            if accessory.running_proxy {
                intents.push(Intent::ProxyRemove {
                    target: target.clone(),
                });
            }
            intents.extend([
                Intent::Stop,
                Intent::RemoveContainer,
                Intent::RemoveImage,
                Intent::RemoveServiceDirectory,
            ]);
            intents
        }
        AccessoryAction::ProxyDeploy | AccessoryAction::ProxyRemove => {
            if !accessory.running_proxy {
                bail!(
                    "accessory '{}' has no [proxy] section",
                    accessory.name
                );
            }
            if *action == AccessoryAction::ProxyDeploy {
                vec![Intent::ProxyDeploy { target }]
            } else {
                vec![Intent::ProxyRemove { target }]
            }
        }
    };

    Ok(build(commands, intents)?)
}

fn boot(commands: &AccessoryCommands<'_>) -> anyhow::Result<Vec<Dispatch>> {
    let accessory = commands.accessory();

    for file in &accessory.files {
        commands.ensure_local_file_present(&file.source)?;
    }

    let mut steps = build(commands, [Intent::EnsureEnvDirectory])?;
    steps.extend(commands.create_directories().into_iter().map(Dispatch::direct));
    steps.extend(
        accessory
            .files
            .iter()
            .map(|f| Dispatch::direct(commands.make_directory_for(&f.remote))),
    );
    steps.extend(build(commands, [Intent::Run])?);
    if accessory.running_proxy {
        steps.extend(build(
            commands,
            [Intent::ProxyDeploy {
                target: accessory.service_name.clone(),
            }],
        )?);
    }
    Ok(steps)
}

fn build(
    commands: &AccessoryCommands<'_>,
    intents: impl IntoIterator<Item = Intent>,
) -> Result<Vec<Dispatch>, ExecutionError> {
    intents
        .into_iter()
        .map(|intent| route(commands, &intent))
        .collect()
}

/// Run `steps` in order, stopping at the first non-zero exit.
///
/// `runner_for(Some(host))` supplies the runner for direct dispatches on
/// each host, `runner_for(None)` the one for remote-shell dispatches.
/// Returns the exit code to leave the process with.
pub async fn execute_plan(
    steps: &[Dispatch],
    hosts: &[String],
    runner_for: &dyn Fn(Option<&str>) -> Arc<dyn CommandRunner>,
) -> Result<i32, ExecutionError> {
    for step in steps {
        match step.route() {
            Route::Direct => {
                for host in hosts {
                    if hosts.len() > 1 {
                        println!("{host}:");
                    }
                    let output = step.execute(runner_for(Some(host.as_str())).as_ref()).await?;
                    print!("{}", output.stdout);
                    eprint!("{}", output.stderr);
                    if !output.success() {
                        return Ok(output.exit_code);
                    }
                }
            }
            Route::RemoteShell => {
                let output = step.execute(runner_for(None).as_ref()).await?;
                if !output.success() {
                    return Ok(output.exit_code);
                }
            }
        }
    }
    Ok(0)
}

/// Plan and run (or print) an accessory action. Returns the exit code.
pub async fn run_accessory_command(
    config: &DeployConfig,
    name: &str,
    action: AccessoryAction,
    dry_run: bool,
) -> anyhow::Result<i32> {
    let commands = config.accessory_commands(name)?;
    let accessory = commands.accessory();
    let steps = plan(&commands, &action)?;

    if dry_run {
        for line in render_plan(config, &steps, &accessory.hosts) {
            println!("{line}");
        }
        if !accessory.secrets.is_empty() {
            println!(
                "# {} secret(s) expected in {}",
                accessory.secrets.len(),
                accessory.secrets_path
            );
        }
        return Ok(0);
    }

    tracing::info!(accessory = %accessory.name, ?action, steps = steps.len(), "executing");

    let ssh = config.ssh.clone();
    let runner_for = move |host: Option<&str>| -> Arc<dyn CommandRunner> {
        match host {
            Some(host) => Arc::new(ProcessRunner::on_host(host, ssh.clone())),
            None => Arc::new(ProcessRunner::local(ssh.clone())),
        }
    };
    Ok(execute_plan(&steps, &accessory.hosts, &runner_for).await?)
}

/// Dry-run lines: `[host] command` for direct steps, the ssh line otherwise.
pub fn render_plan(config: &DeployConfig, steps: &[Dispatch], hosts: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for step in steps {
        match step.route() {
            Route::Direct => {
                for host in hosts {
                    lines.push(format!("[{host}] {}", step.render(&config.ssh)));
                }
            }
            Route::RemoteShell => lines.push(step.render(&config.ssh)),
        }
    }
    lines
}
