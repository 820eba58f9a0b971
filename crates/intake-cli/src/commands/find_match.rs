//! Match command - ask which dataset a file name routes to.

use anyhow::{Context, Result};
use clap::Args;
use intake_core::api::IngestApi;
use owo_colors::OwoColorize;

use crate::client::HttpIngestClient;
use crate::output::{describe_dataset, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the match command.
#[derive(Debug, Args)]
pub struct MatchArgs {
    /// File name to look up.
    pub filename: String,
}

/// Execute the match command.
///
/// Finding no match is not an error.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn execute(args: MatchArgs, config: &Config) -> Result<()> {
    let client = HttpIngestClient::new(config)?;
    let matched = client
        .find_match(&args.filename)
        .await
        .with_context(|| format!("Failed to match {}", args.filename))?;

    match config.format {
        OutputFormat::Json => print_json(&matched)?,
        OutputFormat::Text | OutputFormat::Table => match &matched {
            Some(dataset) => println!("{} -> {}", args.filename, describe_dataset(dataset)),
            None => println!("{} {}", args.filename, "matches no dataset".yellow()),
        },
    }

    Ok(())
}
