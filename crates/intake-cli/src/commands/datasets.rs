//! Datasets command - list and register datasets.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use intake_core::registry::{DatasetForm, DatasetRegistryView};
use owo_colors::OwoColorize;

use crate::client::HttpIngestClient;
use crate::output::{DatasetRow, describe_dataset, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the datasets command.
#[derive(Debug, Args)]
pub struct DatasetsArgs {
    /// Datasets subcommand.
    #[command(subcommand)]
    pub command: DatasetsCommand,
}

/// Datasets subcommands.
#[derive(Debug, Subcommand)]
pub enum DatasetsCommand {
    /// List every registered dataset.
    List,
    /// Register a new dataset.
    Create(CreateArgs),
}

/// Arguments for `datasets create`.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Dataset name.
    pub name: String,

    /// Default table for files routed to this dataset.
    #[arg(long)]
    pub table_name: Option<String>,

    /// File-name prefix that routes files to this dataset.
    #[arg(long)]
    pub file_prefix: Option<String>,

    /// File-name suffix that routes files to this dataset.
    #[arg(long)]
    pub file_suffix: Option<String>,
}

impl CreateArgs {
    fn form(&self) -> DatasetForm {
        DatasetForm {
            dataset_name: self.name.clone(),
            table_name: self.table_name.clone().unwrap_or_default(),
            file_prefix: self.file_prefix.clone().unwrap_or_default(),
            file_suffix: self.file_suffix.clone().unwrap_or_default(),
        }
    }
}

/// Execute the datasets command.
///
/// # Errors
///
/// Returns an error if the form is invalid or the API request fails.
pub async fn execute(args: DatasetsArgs, config: &Config) -> Result<()> {
    let client = HttpIngestClient::new(config)?;
    let mut registry = DatasetRegistryView::new(Arc::new(client));

    match args.command {
        DatasetsCommand::List => {
            registry.load().await.context("Failed to fetch datasets")?;
            print_datasets(&registry, config)
        }
        DatasetsCommand::Create(create) => {
            *registry.form_mut() = create.form();
            let created = registry
                .submit()
                .await
                .context("Failed to create dataset")?;

            match config.format {
                OutputFormat::Json => print_json(&created),
                OutputFormat::Text | OutputFormat::Table => {
                    println!("{} {}", "Created dataset".green(), describe_dataset(&created));
                    if let Some(error) = registry.error() {
                        println!("{}", error.yellow());
                    }
                    Ok(())
                }
            }
        }
    }
}

fn print_datasets(registry: &DatasetRegistryView, config: &Config) -> Result<()> {
    let datasets = registry.datasets();

    match config.format {
        OutputFormat::Json => print_json(datasets)?,
        OutputFormat::Text => {
            if datasets.is_empty() {
                println!("No datasets found");
                return Ok(());
            }
            println!("Datasets:");
            println!();
            for dataset in datasets {
                println!("  {}", describe_dataset(dataset));
            }
        }
        OutputFormat::Table => {
            if datasets.is_empty() {
                println!("No datasets found");
            } else {
                let rows: Vec<DatasetRow> = datasets.iter().map(DatasetRow::from).collect();
                println!("{}", tabled::Table::new(rows));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(subcommand)]
            command: DatasetsCommand,
        }

        let cli = TestCli::parse_from([
            "test",
            "create",
            "new_ds",
            "--file-prefix",
            "ds_",
            "--table-name",
            "events",
        ]);
        let DatasetsCommand::Create(create) = cli.command else {
            panic!("expected create");
        };
        let form = create.form();
        assert_eq!(form.dataset_name, "new_ds");
        assert_eq!(form.file_prefix, "ds_");
        assert_eq!(form.table_name, "events");
        assert_eq!(form.file_suffix, "");
    }
}
