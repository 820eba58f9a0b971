//! Logging setup and span helpers.
//!
//! Every request to the ingestion service runs inside an `ingest_api` span so
//! log lines from the registry, schema editor and upload tracker can be
//! correlated by operation.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::Error;
use crate::id::UploadId;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs.
    Json,
    /// Human-readable logs.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(Error::InvalidInput(format!(
                "unknown log format '{other}', expected json or pretty"
            ))),
        }
    }
}

/// Initializes the global subscriber.
///
/// `RUST_LOG` wins over `default_directive` when set. Only the first call
/// installs a subscriber; later calls are no-ops.
pub fn init_logging(format: LogFormat, default_directive: &str) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        // try_init: a test harness may already own the global subscriber.
        let _ = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_fmt::layer().with_writer(std::io::stderr))
                .try_init(),
        };
    });
}

/// Span for a single ingestion API operation.
#[must_use]
pub fn api_span(operation: &str) -> Span {
    tracing::info_span!("ingest_api", op = operation)
}

/// Span for an API operation scoped to one dataset table.
///
/// Empty names are recorded as-is.
#[must_use]
pub fn table_span(operation: &str, dataset: &str, table: &str) -> Span {
    tracing::info_span!("ingest_api", op = operation, dataset = dataset, table = table)
}

/// Span covering one upload from match lookup to completion.
#[must_use]
pub fn upload_span(id: UploadId, file_name: &str) -> Span {
    tracing::info_span!("upload", upload_id = %id, file = file_name)
}

/// Wraps a secret so `Debug` and `Display` never print it.
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Returns the wrapped value.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
