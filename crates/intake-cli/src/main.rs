//! Intake CLI - console for the ingestion service.
//!
//! The main entry point for the `intake` CLI binary.

use anyhow::Result;
use clap::Parser;

use intake_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    let config = cli.config();

    // Logs go to stderr; RUST_LOG overrides the default level
    intake_core::init_logging(config.log_format, "warn");

    // Create runtime and execute
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Datasets(args) => intake_cli::commands::datasets::execute(args, &config).await,
            Commands::Tables(args) => intake_cli::commands::tables::execute(args, &config).await,
            Commands::Schema(args) => intake_cli::commands::schema::execute(args, &config).await,
            Commands::Upload(args) => intake_cli::commands::upload::execute(args, &config).await,
            Commands::Match(args) => intake_cli::commands::find_match::execute(args, &config).await,
        }
    })
}
