//! The seam between view state and the ingestion service.
//!
//! Views only ever talk to the service through [`IngestApi`]. The CLI
//! provides an HTTP implementation; tests provide an in-memory one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Dataset, DatasetCollection, Table, TableCollection};

/// Where the bytes of a selected file live.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A file on local disk, read when the upload starts.
    Path(PathBuf),
    /// Bytes already in memory.
    Memory(Bytes),
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    size: u64,
    source: UploadSource,
}

impl UploadFile {
    /// Wraps in-memory bytes under the given file name.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: UploadSource::Memory(data),
        }
    }

    /// Describes a file on disk. Only metadata is read here.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no file name or cannot be stat'ed.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("no file name in path {}", path.display())))?
            .to_string();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        Ok(Self {
            name,
            size: metadata.len(),
            source: UploadSource::Path(path.to_path_buf()),
        })
    }

    /// File name sent to the service.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Size in mebibytes, for display.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / 1024.0 / 1024.0
    }

    /// Where the bytes come from.
    #[must_use]
    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    /// Loads the full contents.
    ///
    /// # Errors
    ///
    /// Returns an error if a disk-backed file can no longer be read.
    pub async fn read(&self) -> Result<Bytes> {
        match &self.source {
            UploadSource::Memory(data) => Ok(data.clone()),
            UploadSource::Path(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| Error::InvalidInput(format!("cannot read {}: {e}", path.display()))),
        }
    }
}

/// Typed calls against the ingestion service.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Fetches every registered dataset, keyed by name.
    async fn list_datasets(&self) -> Result<DatasetCollection>;

    /// Registers a new dataset.
    async fn create_dataset(&self, dataset: &Dataset) -> Result<Dataset>;

    /// Fetches the tables of one dataset, keyed by table name.
    async fn list_tables(&self, dataset: &str) -> Result<TableCollection>;

    /// Fetches one table's full schema.
    async fn get_table(&self, dataset: &str, table: &str) -> Result<Table>;

    /// Replaces one table's schema with `schema`, in full.
    async fn update_table(&self, dataset: &str, table: &str, schema: &Table) -> Result<Table>;

    /// Uploads a file's bytes with optional free-text metadata.
    async fn upload_file(
        &self,
        filename: &str,
        file: &UploadFile,
        metadata: Option<&str>,
    ) -> Result<Value>;

    /// Asks which dataset a file name belongs to.
    async fn find_match(&self, filename: &str) -> Result<Option<Dataset>>;
}

#[async_trait]
impl<T: IngestApi + ?Sized> IngestApi for Arc<T> {
    async fn list_datasets(&self) -> Result<DatasetCollection> {
        (**self).list_datasets().await
    }

    async fn create_dataset(&self, dataset: &Dataset) -> Result<Dataset> {
        (**self).create_dataset(dataset).await
    }

    async fn list_tables(&self, dataset: &str) -> Result<TableCollection> {
        (**self).list_tables(dataset).await
    }

    async fn get_table(&self, dataset: &str, table: &str) -> Result<Table> {
        (**self).get_table(dataset, table).await
    }

    async fn update_table(&self, dataset: &str, table: &str, schema: &Table) -> Result<Table> {
        (**self).update_table(dataset, table, schema).await
    }

    async fn upload_file(
        &self,
        filename: &str,
        file: &UploadFile,
        metadata: Option<&str>,
    ) -> Result<Value> {
        (**self).upload_file(filename, file, metadata).await
    }

    async fn find_match(&self, filename: &str) -> Result<Option<Dataset>> {
        (**self).find_match(filename).await
    }
}
