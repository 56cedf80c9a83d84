//! berth - Main entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use berth::cli::{Cli, Command, load_config, run_accessory_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap so BERTH_CONFIG and secrets can come from it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("berth=info"));
    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    let config = load_config(cli.config)?;

    let code = match cli.command {
        Command::Accessory { name, action } => {
            run_accessory_command(&config, &name, action, cli.dry_run).await?
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
