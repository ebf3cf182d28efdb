//! Mewa CLI entry point

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mewa_cli::{cli::Cli, commands::CommandDispatcher, config::CliAppConfig, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let config = match CliAppConfig::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            setup_logging(cli.verbose);
            error!("{}", e);
            std::process::exit(1);
        }
    };

    setup_logging(config.cli.verbose);

    if let Err(e) = CommandDispatcher::execute(cli.command, config).await {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }

    info!("Mewa CLI exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level; `RUST_LOG` takes precedence
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
