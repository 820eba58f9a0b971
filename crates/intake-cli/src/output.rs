//! Terminal rendering shared by the commands.

use anyhow::Result;
use intake_core::model::{Column, Dataset};
use intake_core::notify::{Notification, NotificationLevel, Notifier};
use intake_core::upload::UploadStatus;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;

/// Prints notifications to stderr so stdout stays machine-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => eprintln!("{} {}", "✓".green(), notification.message),
            NotificationLevel::Error => eprintln!("{} {}", "✗".red(), notification.message.red()),
        }
    }
}

/// Pretty-prints a value as JSON on stdout.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Colors an upload status for text output.
#[must_use]
pub fn format_status_colored(status: UploadStatus) -> String {
    let label = status.to_string();
    match status {
        UploadStatus::Success => label.green().to_string(),
        UploadStatus::Error => label.red().to_string(),
        UploadStatus::Uploading => label.blue().to_string(),
        UploadStatus::Pending => label.yellow().to_string(),
    }
}

/// One dataset as a table row.
#[derive(Tabled)]
pub struct DatasetRow {
    #[tabled(rename = "Dataset")]
    name: String,
    #[tabled(rename = "Default table")]
    table: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Suffix")]
    suffix: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Dataset> for DatasetRow {
    fn from(dataset: &Dataset) -> Self {
        Self {
            name: dataset.dataset_name.clone(),
            table: dataset.table_name.clone().unwrap_or_default(),
            prefix: dataset.file_prefix.clone().unwrap_or_default(),
            suffix: dataset.file_suffix.clone().unwrap_or_default(),
            description: dataset.description().unwrap_or_default().to_string(),
        }
    }
}

/// One-line description of a dataset's routing rules.
#[must_use]
pub fn describe_dataset(dataset: &Dataset) -> String {
    let mut parts = Vec::new();
    if let Some(table) = &dataset.table_name {
        parts.push(format!("table: {table}"));
    }
    if let Some(prefix) = &dataset.file_prefix {
        parts.push(format!("prefix: {prefix}"));
    }
    if let Some(suffix) = &dataset.file_suffix {
        parts.push(format!("suffix: {suffix}"));
    }
    if parts.is_empty() {
        dataset.dataset_name.bold().to_string()
    } else {
        format!("{} ({})", dataset.dataset_name.bold(), parts.join(", "))
    }
}

/// One column as a table row.
#[derive(Tabled)]
pub struct ColumnRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    column_type: String,
    #[tabled(rename = "Nullable")]
    nullable: bool,
    #[tabled(rename = "PK")]
    primary_key: bool,
    #[tabled(rename = "Sort")]
    sort_key: bool,
    #[tabled(rename = "Sensitivity")]
    sensitivity: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl ColumnRow {
    /// Builds the row for the column at `index`.
    #[must_use]
    pub fn new(index: usize, column: &Column) -> Self {
        Self {
            index,
            name: column.column_name.clone(),
            column_type: column.column_type.to_string(),
            nullable: column.is_nullable,
            primary_key: column.is_primary_key,
            sort_key: column.is_sort_key,
            sensitivity: column.sensitivity.to_string(),
            action: column
                .extra_action
                .map(|a| a.to_string())
                .unwrap_or_default(),
            description: column.description.clone().unwrap_or_default(),
        }
    }
}

/// One-line description of a column for text output.
#[must_use]
pub fn describe_column(index: usize, column: &Column) -> String {
    let mut flags = Vec::new();
    if column.is_primary_key {
        flags.push("PK");
    }
    if column.is_sort_key {
        flags.push("SORT");
    }
    if !column.is_nullable {
        flags.push("NOT NULL");
    }
    let name = if column.column_name.is_empty() {
        "<unnamed>".dimmed().to_string()
    } else {
        column.column_name.clone()
    };
    let mut line = format!(
        "{index:>3}  {name}  {}  {}",
        column.column_type.cyan(),
        column.sensitivity
    );
    if !flags.is_empty() {
        line.push_str(&format!("  [{}]", flags.join(", ")));
    }
    if let Some(action) = column.extra_action {
        line.push_str(&format!("  action={action}"));
    }
    if let Some(description) = &column.description {
        line.push_str(&format!("  {}", description.dimmed()));
    }
    line
}
