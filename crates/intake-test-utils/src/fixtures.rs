//! Pre-built test fixtures for common test scenarios.
//!
//! The default scenario is a `sales` dataset that routes `orders_*.csv`
//! files to its `orders` table, which has two columns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use intake_core::api::UploadFile;
use intake_core::model::{Column, ColumnType, Dataset, Sensitivity, Table, TableStatus, WriteMode};
use intake_core::registry::DatasetRegistryView;
use intake_core::schema::SchemaEditor;
use intake_core::upload::UploadTracker;
use tempfile::TempDir;

use crate::memory::MemoryIngestApi;
use crate::notifier::RecordingNotifier;

/// Name of the seeded dataset.
pub const SALES: &str = "sales";
/// Name of the seeded table.
pub const ORDERS: &str = "orders";

/// The `sales` dataset, routing `orders_*.csv` files.
#[must_use]
pub fn sales_dataset() -> Dataset {
    Dataset {
        table_name: Some(ORDERS.to_string()),
        file_prefix: Some("orders_".to_string()),
        file_suffix: Some(".csv".to_string()),
        ..Dataset::named(SALES)
    }
}

/// The `orders` table with `order_id` and `amount` columns.
#[must_use]
pub fn orders_table() -> Table {
    let order_id = Column {
        is_nullable: false,
        is_primary_key: true,
        is_sort_key: true,
        description: Some("Order identifier".to_string()),
        ..Column::new("order_id", ColumnType::Long)
    };
    let amount = Column {
        sensitivity: Sensitivity::Internal,
        ..Column::new("amount", ColumnType::Decimal)
    };

    Table {
        description: Some("Customer orders".to_string()),
        write_mode: Some(WriteMode::Append),
        status: Some(TableStatus::Active),
        owner: Some("data-eng".to_string()),
        ..Table::new(SALES, ORDERS)
    }
    .with_columns(vec![order_id, amount])
}

/// A small in-memory CSV upload.
#[must_use]
pub fn sample_upload(name: &str) -> UploadFile {
    UploadFile::from_bytes(name.to_string(), "order_id,amount\n1,9.99\n2,12.50\n")
}

/// Test context with a seeded in-memory service and a recording notifier.
pub struct TestContext {
    /// Shared in-memory service.
    pub api: Arc<MemoryIngestApi>,
    /// Shared notification recorder.
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    /// Creates a context seeded with `sales`/`orders`.
    #[must_use]
    pub fn new() -> Self {
        let api = MemoryIngestApi::new();
        api.insert_dataset(sales_dataset());
        api.insert_table(orders_table());
        Self::with_api(api)
    }

    /// Creates a context around an existing service.
    #[must_use]
    pub fn with_api(api: MemoryIngestApi) -> Self {
        Self {
            api: Arc::new(api),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    /// An upload tracker wired to this context.
    #[must_use]
    pub fn tracker(&self) -> UploadTracker {
        UploadTracker::new(self.api.clone(), self.notifier.clone())
    }

    /// A dataset registry view wired to this context.
    #[must_use]
    pub fn registry(&self) -> DatasetRegistryView {
        DatasetRegistryView::new(self.api.clone())
    }

    /// A schema editor wired to this context.
    #[must_use]
    pub fn editor(&self) -> SchemaEditor {
        SchemaEditor::new(self.api.clone(), self.notifier.clone())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Scratch directory for files selected from disk.
pub struct UploadDir {
    dir: TempDir,
}

impl UploadDir {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file with the given contents and returns its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write upload file");
        path
    }

    /// Creates a sparse file of `size` bytes without writing its contents.
    pub fn sparse(&self, name: &str, size: u64) -> PathBuf {
        let path = self.dir.path().join(name);
        let file = std::fs::File::create(&path).expect("create upload file");
        file.set_len(size).expect("set file length");
        path
    }
}

impl Default for UploadDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_table_has_two_columns() {
        let table = orders_table();
        assert_eq!(table.dataset_name, SALES);
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[0].is_primary_key);
    }

    #[test]
    fn context_is_seeded() {
        let ctx = TestContext::new();
        assert_eq!(ctx.api.dataset_names(), vec![SALES.to_string()]);
        assert_eq!(ctx.api.table(SALES, ORDERS), Some(orders_table()));
    }

    #[test]
    fn upload_dir_sparse_file_reports_size() {
        let dir = UploadDir::new();
        let path = dir.sparse("big.csv", 4096);
        assert_eq!(std::fs::metadata(path).expect("metadata").len(), 4096);
    }
}
