//! ClipDeck - clipboard history and quick links
//!
//! This is the main entry point for the `clipdeck` command.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipdeck::cli::{Cli, CliHandler};
use clipdeck::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clipdeck={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("ClipDeck v{}", clipdeck::VERSION);

    let mut handler = CliHandler::new(config, cli.config);
    handler.handle_command(cli.command).await?;

    Ok(())
}
