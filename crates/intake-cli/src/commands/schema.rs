//! Schema command - show or edit a table's columns.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use intake_core::schema::{ColumnUpdate, SchemaEditor};
use owo_colors::OwoColorize;

use crate::client::HttpIngestClient;
use crate::output::{ColumnRow, TerminalNotifier, describe_column, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the schema command.
#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Schema subcommand.
    #[command(subcommand)]
    pub command: SchemaCommand,
}

/// Schema subcommands.
#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    /// Print a table's columns.
    Show(TableRef),
    /// Apply column edits and save the table.
    Edit(EditArgs),
}

/// A dataset and one of its tables.
#[derive(Debug, Args)]
pub struct TableRef {
    /// Dataset name.
    pub dataset: String,
    /// Table name.
    pub table: String,
}

/// Arguments for `schema edit`.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Table to edit.
    #[command(flatten)]
    pub target: TableRef,

    /// Edit to apply: `add`, `set:<index>:<field>=<value>` or `remove:<index>`.
    /// Repeat to apply several edits in order.
    #[arg(long = "op", required = true)]
    pub ops: Vec<SchemaOp>,

    /// Print the edited schema without saving it.
    #[arg(long)]
    pub dry_run: bool,
}

/// One column edit given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOp {
    /// Append a default column.
    Add,
    /// Change one field of the column at `index`.
    Set {
        /// Column position.
        index: usize,
        /// The change.
        update: ColumnUpdate,
    },
    /// Remove the column at `index`.
    Remove {
        /// Column position.
        index: usize,
    },
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid column index '{raw}'"))
}

impl FromStr for SchemaOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "add" {
            return Ok(Self::Add);
        }
        if let Some(index) = s.strip_prefix("remove:") {
            return Ok(Self::Remove {
                index: parse_index(index)?,
            });
        }
        if let Some(rest) = s.strip_prefix("set:") {
            let (index, assignment) = rest
                .split_once(':')
                .ok_or_else(|| format!("expected set:<index>:<field>=<value>, got '{s}'"))?;
            let (field, value) = assignment
                .split_once('=')
                .ok_or_else(|| format!("expected <field>=<value>, got '{assignment}'"))?;
            let update = ColumnUpdate::parse(field, value).map_err(|e| e.to_string())?;
            return Ok(Self::Set {
                index: parse_index(index)?,
                update,
            });
        }
        Err(format!(
            "unknown edit '{s}', expected add, set:<index>:<field>=<value> or remove:<index>"
        ))
    }
}

impl SchemaOp {
    fn apply(self, editor: &mut SchemaEditor) -> intake_core::Result<()> {
        match self {
            Self::Add => editor.add_column().map(|_| ()),
            Self::Set { index, update } => editor.update_column(index, update),
            Self::Remove { index } => editor.remove_column(index).map(|_| ()),
        }
    }
}

/// Execute the schema command.
///
/// # Errors
///
/// Returns an error if an edit is invalid or an API request fails.
pub async fn execute(args: SchemaArgs, config: &Config) -> Result<()> {
    let client = HttpIngestClient::new(config)?;
    let mut editor = SchemaEditor::new(Arc::new(client), Arc::new(TerminalNotifier));

    match args.command {
        SchemaCommand::Show(target) => {
            open(&mut editor, &target).await?;
            print_schema(&editor, config)
        }
        SchemaCommand::Edit(edit) => {
            open(&mut editor, &edit.target).await?;
            for (position, op) in edit.ops.into_iter().enumerate() {
                op.apply(&mut editor)
                    .with_context(|| format!("Edit #{} could not be applied", position + 1))?;
            }

            let duplicates = editor.duplicate_column_names();
            if !duplicates.is_empty() {
                eprintln!(
                    "{} duplicate column names: {}",
                    "warning:".yellow(),
                    duplicates.join(", ")
                );
            }

            if edit.dry_run {
                print_schema(&editor, config)?;
                if editor.has_unsaved_changes() {
                    eprintln!("{}", "Dry run: schema not saved".dimmed());
                }
                return Ok(());
            }

            if !editor.has_unsaved_changes() {
                eprintln!("No changes to save");
                return Ok(());
            }
            editor.save().await.context("Schema was not saved")?;
            print_schema(&editor, config)
        }
    }
}

async fn open(editor: &mut SchemaEditor, target: &TableRef) -> Result<()> {
    editor
        .select_dataset(&target.dataset)
        .await
        .with_context(|| format!("Cannot open dataset {}", target.dataset))?;
    editor
        .select_table(&target.table)
        .await
        .with_context(|| format!("Cannot open table {}.{}", target.dataset, target.table))
}

fn print_schema(editor: &SchemaEditor, config: &Config) -> Result<()> {
    let Some(table) = editor.draft() else {
        anyhow::bail!("No table schema loaded");
    };

    match config.format {
        OutputFormat::Json => print_json(table)?,
        OutputFormat::Text => {
            println!(
                "{}.{} ({} columns)",
                table.dataset_name,
                table.table_name.bold(),
                table.columns.len()
            );
            if let Some(description) = &table.description {
                println!("{}", description.dimmed());
            }
            if let Some(status) = table.status {
                println!("Status: {status}");
            }
            println!();
            for (index, column) in table.columns.iter().enumerate() {
                println!("{}", describe_column(index, column));
            }
        }
        OutputFormat::Table => {
            let rows: Vec<ColumnRow> = table
                .columns
                .iter()
                .enumerate()
                .map(|(index, column)| ColumnRow::new(index, column))
                .collect();
            println!("{}", tabled::Table::new(rows));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::model::ColumnType;

    #[test]
    fn test_op_parsing() {
        assert_eq!("add".parse::<SchemaOp>(), Ok(SchemaOp::Add));
        assert_eq!(
            "remove:2".parse::<SchemaOp>(),
            Ok(SchemaOp::Remove { index: 2 })
        );
        assert_eq!(
            "set:1:type=Long".parse::<SchemaOp>(),
            Ok(SchemaOp::Set {
                index: 1,
                update: ColumnUpdate::Type(ColumnType::Long),
            })
        );
        assert_eq!(
            "set:0:description=ratio a:b = c".parse::<SchemaOp>(),
            Ok(SchemaOp::Set {
                index: 0,
                update: ColumnUpdate::Description(Some("ratio a:b = c".to_string())),
            })
        );
    }

    #[test]
    fn test_op_parsing_rejects_garbage() {
        assert!("rename:1".parse::<SchemaOp>().is_err());
        assert!("remove:x".parse::<SchemaOp>().is_err());
        assert!("set:1:type".parse::<SchemaOp>().is_err());
        assert!("set:1:colour=red".parse::<SchemaOp>().is_err());
    }

    #[test]
    fn test_edit_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: EditArgs,
        }

        let cli = TestCli::parse_from([
            "test",
            "sales",
            "orders",
            "--op",
            "add",
            "--op",
            "set:2:name=customer_id",
            "--dry-run",
        ]);
        assert_eq!(cli.args.target.dataset, "sales");
        assert_eq!(cli.args.ops.len(), 2);
        assert!(cli.args.dry_run);
    }
}
