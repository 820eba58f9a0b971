//! Upload command - send files to the ingestion service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use intake_core::api::UploadFile;
use intake_core::upload::{BatchAdmission, MAX_CONCURRENCY, UploadItem, UploadTracker};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::client::HttpIngestClient;
use crate::output::{TerminalNotifier, format_status_colored, print_json};
use crate::{Config, OutputFormat};

/// Arguments for the upload command.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Files to upload (at most 10, each at most 300 MiB).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Free-text metadata sent with every file.
    #[arg(long)]
    pub metadata: Option<String>,

    /// Number of files uploaded at once.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub concurrency: u8,
}

#[derive(Serialize)]
struct UploadReport {
    id: String,
    file: String,
    size_bytes: u64,
    status: String,
    matched_dataset: Option<String>,
    error: Option<String>,
}

impl From<&UploadItem> for UploadReport {
    fn from(item: &UploadItem) -> Self {
        Self {
            id: item.id().to_string(),
            file: item.file().name().to_string(),
            size_bytes: item.file().size(),
            status: item.status().to_string(),
            matched_dataset: item.matched().map(|d| d.dataset_name.clone()),
            error: item.error().map(str::to_string),
        }
    }
}

/// Execute the upload command.
///
/// # Errors
///
/// Returns an error if a file cannot be read, a file is refused, or any
/// upload fails.
pub async fn execute(args: UploadArgs, config: &Config) -> Result<()> {
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = UploadFile::from_path(path)
            .await
            .with_context(|| format!("Cannot upload {}", path.display()))?;
        files.push(file);
    }

    let client = HttpIngestClient::new(config)?;
    let tracker = UploadTracker::new(Arc::new(client), Arc::new(TerminalNotifier))
        .with_concurrency(usize::from(args.concurrency).min(MAX_CONCURRENCY))
        .with_metadata(args.metadata);

    let admission = tracker.enqueue(files);
    report_rejections(&admission);
    let summary = tracker.process(&admission.accepted).await;
    let items = tracker.snapshot();

    match config.format {
        OutputFormat::Json => {
            let reports: Vec<UploadReport> = items.iter().map(UploadReport::from).collect();
            print_json(&reports)?;
        }
        OutputFormat::Text => {
            for item in &items {
                print_item(item);
            }
            if !items.is_empty() {
                println!();
                println!(
                    "{} uploaded, {} failed",
                    summary.succeeded.to_string().green(),
                    summary.failed.to_string().red()
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct UploadRow {
                #[tabled(rename = "File")]
                file: String,
                #[tabled(rename = "Size (MB)")]
                size: String,
                #[tabled(rename = "Status")]
                status: String,
                #[tabled(rename = "Dataset")]
                dataset: String,
                #[tabled(rename = "Error")]
                error: String,
            }

            let rows: Vec<_> = items
                .iter()
                .map(|item| UploadRow {
                    file: item.file().name().to_string(),
                    size: format!("{:.2}", item.file().size_mb()),
                    status: item.status().to_string(),
                    dataset: item
                        .matched()
                        .map(|d| d.dataset_name.clone())
                        .unwrap_or_default(),
                    error: item.error().unwrap_or_default().to_string(),
                })
                .collect();
            if !rows.is_empty() {
                println!("{}", Table::new(rows));
            }
        }
    }

    let refused = admission.rejected.len();
    if summary.failed > 0 || refused > 0 {
        anyhow::bail!(
            "{} of {} files were not uploaded",
            summary.failed + refused,
            summary.total + refused
        );
    }
    Ok(())
}

fn report_rejections(admission: &BatchAdmission) {
    for rejection in &admission.rejected {
        eprintln!(
            "{} {}: {}",
            "✗".red(),
            rejection.file_name,
            rejection.reason
        );
    }
}

fn print_item(item: &UploadItem) {
    let mut line = format!(
        "  {} ({:.2} MB) {}",
        item.file().name(),
        item.file().size_mb(),
        format_status_colored(item.status())
    );
    if let Some(label) = item.match_label() {
        line.push_str(&format!(" - {label}"));
    }
    println!("{line}");
    if let Some(error) = item.error() {
        println!("    Error: {}", error.red());
    }
}
