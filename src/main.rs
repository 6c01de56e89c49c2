use clap::Parser;
use tracing::{error, info};

use sweep_console::bootstrap::{self, tracing::init_tracing_subscriber};
use sweep_console::cli::Cli;
use sweep_console::commands::{self, Printer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries command output only.
    if let Err(e) = init_tracing_subscriber(cli.verbose) {
        eprintln!("Failed to initialize tracing: {e}");
    }

    let config = bootstrap::load_config(cli.config.as_deref())?;
    info!(environment = %config.environment, "starting sweep-console");

    let console = bootstrap::wire_console(config)?;
    let printer = Printer::new(cli.output);

    if let Err(e) = commands::run(&console, cli.command, &printer).await {
        error!(error = %e, "command failed");
        return Err(e);
    }
    Ok(())
}
