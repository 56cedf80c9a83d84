//! CLI command handling.
//!
//! Provides subcommands for:
//! - Managing an accessory's lifecycle (`accessory <name> boot|start|stop|...`)
//! - Reading its logs and running commands in it (`accessory <name> logs|exec`)
//! - Registering it with the reverse proxy (`accessory <name> proxy-deploy`)

mod accessory;

pub use accessory::{
    AccessoryAction, execute_plan, plan, render_plan, run_accessory_command,
};

use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

use crate::config::DeployConfig;

#[derive(Parser, Debug)]
#[command(name = "berth")]
#[command(about = "Manage accessory containers alongside a host-based deployment")]
#[command(
    long_about = "berth builds and runs the docker and ssh commands for accessories (databases, caches, ...).\nExamples:\n  berth accessory redis boot\n  berth accessory redis logs --since 1h --grep ERROR"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path (default: config/berth.toml)
    #[arg(short, long, global = true, env = "BERTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage an accessory
    #[command(
        about = "Manage an accessory",
        long_about = "Boot, stop, inspect or remove one accessory.\nExample: berth accessory redis details"
    )]
    Accessory {
        /// Accessory name from the config file
        name: String,

        #[command(subcommand)]
        action: AccessoryAction,
    },
}

/// Load the config named by `--config`, else `BERTH_CONFIG`, else the default path.
pub fn load_config(path: Option<PathBuf>) -> crate::Result<DeployConfig> {
    let path = match path {
        Some(path) => path,
        None => DeployConfig::default_path()?,
    };
    let config = DeployConfig::load(&path)?;
    tracing::debug!(
        path = %path.display(),
        accessories = config.accessories.len(),
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_version() {
        let cmd = Cli::command();
        assert_eq!(
            cmd.get_version().unwrap_or("unknown"),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_logs_flags() {
        let cli = Cli::try_parse_from([
            "berth",
            "accessory",
            "redis",
            "logs",
            "--since",
            "1h",
            "-n",
            "50",
            "--grep",
            "ERROR",
            "--grep-options",
            "-i",
        ])
        .unwrap();

        let Command::Accessory { name, action } = cli.command;
        assert_eq!(name, "redis");
        assert_eq!(
            action,
            AccessoryAction::Logs {
                since: Some("1h".into()),
                lines: Some(50),
                grep: Some("ERROR".into()),
                grep_options: Some("-i".into()),
                follow: false,
                no_timestamps: false,
            }
        );
    }

    #[test]
    fn follow_rejects_log_bounds() {
        for bound in [["--since", "1h"], ["-n", "50"]] {
            let err = Cli::try_parse_from(
                ["berth", "accessory", "redis", "logs", "--follow"]
                    .into_iter()
                    .chain(bound),
            )
            .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }

        let cli = Cli::try_parse_from([
            "berth", "accessory", "redis", "logs", "--follow", "--grep", "ERROR",
        ])
        .unwrap();
        let Command::Accessory { action, .. } = cli.command;
        assert!(matches!(action, AccessoryAction::Logs { follow: true, .. }));
    }

    #[test]
    fn load_config_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth.toml");
        std::fs::write(
            &path,
            "service = \"app\"\n\n[accessories.redis]\nimage = \"redis:7\"\nhost = \"10.0.0.1\"\n",
        )
        .unwrap();

        let config = load_config(Some(path)).unwrap();
        assert!(config.accessory("redis").is_ok());
    }

    #[test]
    fn load_config_wraps_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(crate::ConfigError::Io { .. })
        ));
    }

    #[test]
    fn parses_exec_trailing_command() {
        let cli = Cli::try_parse_from([
            "berth", "--dry-run", "accessory", "mysql", "exec", "--reuse", "mysql", "-u", "root",
        ])
        .unwrap();
        assert!(cli.dry_run);

        let Command::Accessory { action, .. } = cli.command;
        assert_eq!(
            action,
            AccessoryAction::Exec {
                reuse: true,
                interactive: false,
                command: vec!["mysql".into(), "-u".into(), "root".into()],
            }
        );
    }
}
