//! Custom assertion helpers for integration tests.

use intake_core::model::{Column, ColumnType, Sensitivity, Table};
use intake_core::upload::{UploadItem, UploadStatus};

use crate::memory::{ApiCall, MemoryIngestApi};

/// Asserts that every item reached `success` or `error`.
///
/// # Panics
///
/// Panics if any item is still `pending` or `uploading`.
pub fn assert_all_uploads_terminal(items: &[UploadItem]) {
    for item in items {
        assert!(
            item.status().is_terminal(),
            "Upload {} is not terminal (status: {})",
            item.file().name(),
            item.status()
        );
    }
}

/// Asserts the status of the item for `file_name`.
///
/// # Panics
///
/// Panics if no item has that name or its status differs.
pub fn assert_upload_status(items: &[UploadItem], file_name: &str, expected: UploadStatus) {
    let item = items
        .iter()
        .find(|i| i.file().name() == file_name)
        .unwrap_or_else(|| panic!("no upload item for {file_name}"));
    assert_eq!(
        item.status(),
        expected,
        "Expected {file_name} to be {expected}, but it was {}",
        item.status()
    );
}

/// Asserts that a column carries the values a freshly added column gets.
///
/// # Panics
///
/// Panics if any field differs from the add-column defaults.
pub fn assert_default_column(column: &Column) {
    assert_eq!(column.column_type, ColumnType::String, "column type");
    assert_eq!(column.sensitivity, Sensitivity::Public, "sensitivity");
    assert!(column.is_nullable, "new columns are nullable");
    assert!(!column.is_primary_key, "new columns are not primary keys");
    assert!(!column.is_sort_key, "new columns are not sort keys");
    assert_eq!(column.extra_action, None, "extra action");
}

/// Returns the body of the last `update_table` call.
///
/// # Panics
///
/// Panics if the service never received one.
pub fn last_schema_update(api: &MemoryIngestApi) -> Table {
    api.calls()
        .into_iter()
        .rev()
        .find_map(|call| match call {
            ApiCall::UpdateTable { schema, .. } => Some(schema),
            _ => None,
        })
        .expect("expected an update_table call")
}

/// Asserts how many times `operation` was called.
///
/// # Panics
///
/// Panics if the count differs.
pub fn assert_call_count(api: &MemoryIngestApi, operation: &str, expected: usize) {
    let actual = api.calls_to(operation).len();
    assert_eq!(
        actual, expected,
        "Expected {expected} {operation} calls, got {actual}"
    );
}
