//! # intake-core
//!
//! Client-side state for administering a file-ingestion service.
//!
//! The service owns datasets (logical destinations for files), their tables
//! and column schemas, and the filename rules that route an uploaded file to
//! a dataset. This crate holds everything an operator console needs on top of
//! that service, independent of how it is rendered:
//!
//! - **API contract**: [`IngestApi`], the seven operations the service exposes
//! - **Data model**: [`Dataset`], [`Table`], [`Column`] and their enums
//! - **Upload tracking**: a queue of files moving through
//!   `pending → uploading → success | error`, driven by [`UploadTracker`]
//! - **Dataset registry**: list and create datasets
//! - **Schema editor**: select a table, edit its columns, save them back
//!
//! Outcomes of operator actions are reported through a [`Notifier`].
//!
//! ## Example
//!
//! ```rust
//! use intake_core::prelude::*;
//!
//! let table = Table::new("sales", "orders")
//!     .with_columns(vec![Column::new("order_id", ColumnType::Long)]);
//! assert_eq!(table.columns.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod error;
pub mod id;
pub mod model;
pub mod notify;
pub mod observability;
pub mod registry;
pub mod schema;
pub mod upload;
pub mod view;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::api::{IngestApi, UploadFile, UploadSource};
    pub use crate::error::{Error, Result};
    pub use crate::id::UploadId;
    pub use crate::model::{
        Column, ColumnType, Dataset, ExtraAction, Sensitivity, Table, TableStatus, WriteMode,
    };
    pub use crate::notify::{Notification, NotificationLevel, Notifier};
    pub use crate::registry::{DatasetForm, DatasetRegistryView};
    pub use crate::schema::{ColumnUpdate, SchemaEditor};
    pub use crate::upload::{UploadItem, UploadStatus, UploadTracker};
    pub use crate::view::LoadState;
}

pub use api::{IngestApi, UploadFile, UploadSource};
pub use error::{Error, Result};
pub use id::UploadId;
pub use model::{
    Column, ColumnType, Dataset, DatasetCollection, ExtraAction, Sensitivity, Table,
    TableCollection, TableStatus, WriteMode, datasets_from_collection,
};
pub use notify::{Notification, NotificationLevel, Notifier, TracingNotifier};
pub use observability::{LogFormat, Redacted, init_logging};
pub use registry::{DatasetForm, DatasetRegistryView};
pub use schema::{ColumnUpdate, SchemaEditor};
pub use upload::{
    BatchAdmission, MAX_CONCURRENCY, MAX_FILE_SIZE_BYTES, MAX_FILES_PER_BATCH, QueueSummary,
    Rejection, RejectionReason, UploadItem, UploadQueue, UploadStatus, UploadTracker,
};
pub use view::LoadState;
