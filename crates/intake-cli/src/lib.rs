//! # intake-cli
//!
//! Command-line console for the Intake ingestion service.
//!
//! ## Commands
//!
//! - `intake datasets list|create` - Browse and register datasets
//! - `intake tables list` - List the tables of a dataset
//! - `intake schema show|edit` - Inspect and edit a table's columns
//! - `intake upload` - Upload files and report where each one landed
//! - `intake match` - Ask which dataset a file name routes to
//!
//! ## Configuration
//!
//! The CLI uses environment variables or command-line flags for settings:
//!
//! - `INTAKE_API_URL` - API endpoint (default: `http://localhost:8000/api`)
//! - `INTAKE_API_TOKEN` - Bearer token sent with every request
//! - `INTAKE_TIMEOUT_SECS` - Per-request timeout
//! - `INTAKE_LOG_FORMAT` - `pretty` or `json`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod client;
pub mod commands;
pub mod output;

use std::time::Duration;

use clap::{Parser, Subcommand};
use intake_core::{LogFormat, Redacted};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Intake CLI - ingestion service console.
#[derive(Parser)]
#[command(name = "intake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API base URL, ending in `/api`.
    #[arg(long, env = "INTAKE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// API bearer token.
    #[arg(long, env = "INTAKE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "INTAKE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Log output format (`pretty` or `json`).
    #[arg(long, env = "INTAKE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.trim_end_matches('/').to_string(),
            api_token: self
                .api_token
                .clone()
                .filter(|t| !t.is_empty())
                .map(Redacted),
            timeout: self.timeout_secs.map(Duration::from_secs),
            format: self.format.clone(),
            log_format: self.log_format,
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List or create datasets.
    Datasets(commands::datasets::DatasetsArgs),
    /// List the tables of a dataset.
    Tables(commands::tables::TablesArgs),
    /// Show or edit a table schema.
    Schema(commands::schema::SchemaArgs),
    /// Upload files.
    Upload(commands::upload::UploadArgs),
    /// Find the dataset a file name matches.
    Match(commands::find_match::MatchArgs),
}

/// Output format.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API base URL without a trailing slash.
    pub api_url: String,
    /// API bearer token.
    pub api_token: Option<Redacted<String>>,
    /// Per-request timeout; the transport default applies when unset.
    pub timeout: Option<Duration>,
    /// Output format.
    pub format: OutputFormat,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            timeout: None,
            format: OutputFormat::default(),
            log_format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "intake",
            "--api-url",
            "https://ingest.example.com/api/",
            "--api-token",
            "token-abc",
            "--timeout-secs",
            "15",
            "--format",
            "json",
            "--log-format",
            "json",
            "match",
            "orders_2024.csv",
        ]);

        let config = cli.config();
        assert_eq!(config.api_url, "https://ingest.example.com/api");
        assert_eq!(
            config.api_token.as_ref().map(|t| t.expose().as_str()),
            Some("token-abc")
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Match(_)));
    }

    #[test]
    fn test_config_debug_hides_token() {
        let config = Config {
            api_token: Some(Redacted("token-abc".to_string())),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("token-abc"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["intake", "datasets", "list"]);
        let config = cli.config();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.timeout, None);
    }
}
