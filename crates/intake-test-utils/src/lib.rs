//! Shared test utilities for Intake crates.
//!
//! This crate provides:
//! - [`MemoryIngestApi`]: In-memory ingestion service with call recording
//! - [`MockIngestServer`]: The same service behind real HTTP
//! - [`RecordingNotifier`]: Captures notifications for assertions
//! - [`TestContext`]: Pre-configured service, notifier and views
//! - Factory functions for creating test data
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use intake_test_utils::{TestContext, sample_upload, assert_all_uploads_terminal};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     let tracker = ctx.tracker();
//!     tracker.submit(vec![sample_upload("orders_2024.csv")]).await;
//!     assert_all_uploads_terminal(&tracker.snapshot());
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod memory;
pub mod notifier;
pub mod server;

pub use assertions::*;
pub use fixtures::*;
pub use memory::*;
pub use notifier::*;
pub use server::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("intake=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
