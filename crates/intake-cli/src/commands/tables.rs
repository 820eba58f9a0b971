//! Tables command - list the tables of a dataset.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use intake_core::api::IngestApi;
use intake_core::model::TableCollection;
use serde_json::Value;

use crate::client::HttpIngestClient;
use crate::output::print_json;
use crate::{Config, OutputFormat};

/// Arguments for the tables command.
#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Tables subcommand.
    #[command(subcommand)]
    pub command: TablesCommand,
}

/// Tables subcommands.
#[derive(Debug, Subcommand)]
pub enum TablesCommand {
    /// List the tables of a dataset.
    List {
        /// Dataset name.
        dataset: String,
    },
}

/// Execute the tables command.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn execute(args: TablesArgs, config: &Config) -> Result<()> {
    let client = HttpIngestClient::new(config)?;

    match args.command {
        TablesCommand::List { dataset } => {
            let tables = client
                .list_tables(&dataset)
                .await
                .context("Failed to fetch tables")?;
            print_tables(&dataset, &tables, config)
        }
    }
}

fn summary_field(summary: &Value, key: &str) -> String {
    match summary.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn print_tables(dataset: &str, tables: &TableCollection, config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => print_json(tables)?,
        OutputFormat::Text => {
            if tables.is_empty() {
                println!("No tables found in {dataset}");
                return Ok(());
            }
            println!("Tables in {dataset}:");
            println!();
            for (name, summary) in tables {
                let description = summary_field(summary, "description");
                if description.is_empty() {
                    println!("  {name}");
                } else {
                    println!("  {name} - {description}");
                }
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct TableRow {
                #[tabled(rename = "Table")]
                name: String,
                #[tabled(rename = "Status")]
                status: String,
                #[tabled(rename = "Description")]
                description: String,
            }

            let rows: Vec<_> = tables
                .iter()
                .map(|(name, summary)| TableRow {
                    name: name.clone(),
                    status: summary_field(summary, "status"),
                    description: summary_field(summary, "description"),
                })
                .collect();

            if rows.is_empty() {
                println!("No tables found in {dataset}");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_field_reads_strings_and_skips_nulls() {
        let summary = json!({ "description": "Orders", "status": null, "num_rows": 12 });
        assert_eq!(summary_field(&summary, "description"), "Orders");
        assert_eq!(summary_field(&summary, "status"), "");
        assert_eq!(summary_field(&summary, "num_rows"), "12");
        assert_eq!(summary_field(&json!("orders"), "description"), "");
    }
}
