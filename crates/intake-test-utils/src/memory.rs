//! In-memory ingestion service with call recording.
//!
//! [`MemoryIngestApi`] keeps datasets and tables in memory, records every
//! call for later assertions, and can be told to fail, slow down, or hold
//! uploads open until the test releases them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use intake_core::api::{IngestApi, UploadFile};
use intake_core::error::{Error, Result};
use intake_core::model::{Dataset, DatasetCollection, Table, TableCollection};
use serde_json::{Value, json};
use tokio::sync::watch;

/// Record of one call made against the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// `list_datasets`.
    ListDatasets,
    /// `create_dataset`.
    CreateDataset {
        /// Request body.
        dataset: Dataset,
    },
    /// `list_tables`.
    ListTables {
        /// Dataset path segment.
        dataset: String,
    },
    /// `get_table`.
    GetTable {
        /// Dataset path segment.
        dataset: String,
        /// Table path segment.
        table: String,
    },
    /// `update_table`.
    UpdateTable {
        /// Dataset path segment.
        dataset: String,
        /// Table path segment.
        table: String,
        /// Full request body.
        schema: Table,
    },
    /// `upload_file`.
    UploadFile {
        /// File name path segment.
        file_name: String,
        /// Bytes received.
        size: usize,
        /// Optional metadata part.
        metadata: Option<String>,
    },
    /// `find_match`.
    FindMatch {
        /// File name path segment.
        file_name: String,
    },
}

impl ApiCall {
    /// Operation name, as used by [`MemoryIngestApi::inject_failure`].
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ListDatasets => "list_datasets",
            Self::CreateDataset { .. } => "create_dataset",
            Self::ListTables { .. } => "list_tables",
            Self::GetTable { .. } => "get_table",
            Self::UpdateTable { .. } => "update_table",
            Self::UploadFile { .. } => "upload_file",
            Self::FindMatch { .. } => "find_match",
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    status: u16,
    message: String,
    /// When set, only calls whose target contains this text fail.
    target: Option<String>,
}

/// In-memory [`IngestApi`] with operation tracing.
#[derive(Debug, Clone)]
pub struct MemoryIngestApi {
    datasets: Arc<Mutex<BTreeMap<String, Dataset>>>,
    tables: Arc<Mutex<BTreeMap<(String, String), Table>>>,
    calls: Arc<Mutex<Vec<ApiCall>>>,
    failures: Arc<Mutex<HashMap<&'static str, Vec<InjectedFailure>>>>,
    latency: Option<Duration>,
    upload_gate: Arc<watch::Sender<bool>>,
}

impl Default for MemoryIngestApi {
    fn default() -> Self {
        let (upload_gate, _) = watch::channel(true);
        Self {
            datasets: Arc::default(),
            tables: Arc::default(),
            calls: Arc::default(),
            failures: Arc::default(),
            latency: None,
            upload_gate: Arc::new(upload_gate),
        }
    }
}

impl MemoryIngestApi {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service that sleeps before answering every call.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Registers a dataset.
    pub fn insert_dataset(&self, dataset: Dataset) {
        self.datasets
            .lock()
            .expect("lock")
            .insert(dataset.dataset_name.clone(), dataset);
    }

    /// Registers a table; its dataset and table names are taken from the value.
    pub fn insert_table(&self, table: Table) {
        self.tables.lock().expect("lock").insert(
            (table.dataset_name.clone(), table.table_name.clone()),
            table,
        );
    }

    /// Current stored schema of a table.
    #[must_use]
    pub fn table(&self, dataset: &str, table: &str) -> Option<Table> {
        self.tables
            .lock()
            .expect("lock")
            .get(&(dataset.to_string(), table.to_string()))
            .cloned()
    }

    /// Registered dataset names, sorted.
    #[must_use]
    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.lock().expect("lock").keys().cloned().collect()
    }

    /// Returns all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("lock").clone()
    }

    /// Returns recorded calls of one operation.
    #[must_use]
    pub fn calls_to(&self, operation: &str) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation() == operation)
            .collect()
    }

    /// Clears recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().expect("lock").clear();
    }

    /// Makes every call to `operation` fail with a 500 rejection.
    pub fn inject_failure(&self, operation: &'static str) {
        self.inject_rejection(operation, 500, format!("Injected failure for {operation}"));
    }

    /// Makes every call to `operation` fail with the given status and message.
    pub fn inject_rejection(&self, operation: &'static str, status: u16, message: impl Into<String>) {
        self.push_failure(
            operation,
            InjectedFailure {
                status,
                message: message.into(),
                target: None,
            },
        );
    }

    /// Makes calls to `operation` fail only when their target (dataset,
    /// table or file name) contains `target`.
    pub fn inject_failure_for(&self, operation: &'static str, target: impl Into<String>) {
        let target = target.into();
        self.push_failure(
            operation,
            InjectedFailure {
                status: 500,
                message: format!("Injected failure for {target}"),
                target: Some(target),
            },
        );
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock").clear();
    }

    /// Holds every upload open until [`release_uploads`](Self::release_uploads).
    pub fn hold_uploads(&self) {
        self.upload_gate.send_replace(false);
    }

    /// Lets held and future uploads complete.
    pub fn release_uploads(&self) {
        self.upload_gate.send_replace(true);
    }

    fn push_failure(&self, operation: &'static str, failure: InjectedFailure) {
        self.failures
            .lock()
            .expect("lock")
            .entry(operation)
            .or_default()
            .push(failure);
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().expect("lock").push(call);
    }

    fn check_failure(&self, operation: &'static str, target: &str) -> Result<()> {
        let failures = self.failures.lock().expect("lock");
        let hit = failures.get(operation).and_then(|list| {
            list.iter().find(|f| {
                f.target
                    .as_deref()
                    .is_none_or(|wanted| target.contains(wanted))
            })
        });
        match hit {
            Some(failure) => Err(Error::Rejected {
                status: failure.status,
                message: failure.message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn maybe_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn wait_for_upload_gate(&self) {
        let mut gate = self.upload_gate.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = gate.wait_for(|open| *open).await;
    }

    fn not_found(what: &str) -> Error {
        Error::Rejected {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::malformed(e.to_string()))
}

fn matches_rules(dataset: &Dataset, file_name: &str) -> bool {
    let prefix = dataset.file_prefix.as_deref().filter(|p| !p.is_empty());
    let suffix = dataset.file_suffix.as_deref().filter(|s| !s.is_empty());
    if prefix.is_none() && suffix.is_none() {
        return false;
    }
    prefix.is_none_or(|p| file_name.starts_with(p)) && suffix.is_none_or(|s| file_name.ends_with(s))
}

#[async_trait]
impl IngestApi for MemoryIngestApi {
    async fn list_datasets(&self) -> Result<DatasetCollection> {
        self.maybe_delay().await;
        self.record(ApiCall::ListDatasets);
        self.check_failure("list_datasets", "")?;

        let datasets = self.datasets.lock().expect("lock").clone();
        datasets
            .iter()
            .map(|(name, dataset)| Ok((name.clone(), to_value(dataset)?)))
            .collect()
    }

    async fn create_dataset(&self, dataset: &Dataset) -> Result<Dataset> {
        self.maybe_delay().await;
        self.record(ApiCall::CreateDataset {
            dataset: dataset.clone(),
        });
        self.check_failure("create_dataset", &dataset.dataset_name)?;

        let mut datasets = self.datasets.lock().expect("lock");
        if datasets.contains_key(&dataset.dataset_name) {
            return Err(Error::Rejected {
                status: 409,
                message: format!("Dataset {} already exists", dataset.dataset_name),
            });
        }
        datasets.insert(dataset.dataset_name.clone(), dataset.clone());
        drop(datasets);

        if let Some(table_name) = &dataset.table_name {
            self.insert_table(Table::new(dataset.dataset_name.clone(), table_name.clone()));
        }
        Ok(dataset.clone())
    }

    async fn list_tables(&self, dataset: &str) -> Result<TableCollection> {
        self.maybe_delay().await;
        self.record(ApiCall::ListTables {
            dataset: dataset.to_string(),
        });
        self.check_failure("list_tables", dataset)?;

        if !self.datasets.lock().expect("lock").contains_key(dataset) {
            return Err(Self::not_found("Dataset"));
        }
        let tables = self.tables.lock().expect("lock").clone();
        tables
            .iter()
            .filter(|((ds, _), _)| ds == dataset)
            .map(|((_, name), table)| {
                let summary = json!({
                    "table_name": name,
                    "description": table.description,
                    "status": table.status,
                });
                Ok((name.clone(), summary))
            })
            .collect()
    }

    async fn get_table(&self, dataset: &str, table: &str) -> Result<Table> {
        self.maybe_delay().await;
        self.record(ApiCall::GetTable {
            dataset: dataset.to_string(),
            table: table.to_string(),
        });
        self.check_failure("get_table", &format!("{dataset}/{table}"))?;

        self.table(dataset, table)
            .ok_or_else(|| Self::not_found("Table"))
    }

    async fn update_table(&self, dataset: &str, table: &str, schema: &Table) -> Result<Table> {
        self.maybe_delay().await;
        self.record(ApiCall::UpdateTable {
            dataset: dataset.to_string(),
            table: table.to_string(),
            schema: schema.clone(),
        });
        self.check_failure("update_table", &format!("{dataset}/{table}"))?;

        let mut tables = self.tables.lock().expect("lock");
        let key = (dataset.to_string(), table.to_string());
        if !tables.contains_key(&key) {
            return Err(Self::not_found("Table"));
        }
        let mut stored = schema.clone();
        stored.dataset_name = dataset.to_string();
        stored.table_name = table.to_string();
        tables.insert(key, stored.clone());
        Ok(stored)
    }

    async fn upload_file(
        &self,
        filename: &str,
        file: &UploadFile,
        metadata: Option<&str>,
    ) -> Result<Value> {
        let data = file.read().await?;
        self.wait_for_upload_gate().await;
        self.maybe_delay().await;
        self.record(ApiCall::UploadFile {
            file_name: filename.to_string(),
            size: data.len(),
            metadata: metadata.map(str::to_string),
        });
        self.check_failure("upload_file", filename)?;

        Ok(json!({
            "status": "uploaded",
            "file_name": filename,
            "size": data.len(),
        }))
    }

    async fn find_match(&self, filename: &str) -> Result<Option<Dataset>> {
        self.maybe_delay().await;
        self.record(ApiCall::FindMatch {
            file_name: filename.to_string(),
        });
        self.check_failure("find_match", filename)?;

        let datasets = self.datasets.lock().expect("lock");
        Ok(datasets
            .values()
            .find(|d| matches_rules(d, filename))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Dataset {
        Dataset {
            file_prefix: Some("orders_".to_string()),
            file_suffix: Some(".csv".to_string()),
            ..Dataset::named("sales")
        }
    }

    #[tokio::test]
    async fn memory_api_records_calls() {
        let api = MemoryIngestApi::new();
        api.insert_dataset(sales());

        api.list_datasets().await.expect("list");
        let _ = api.find_match("orders_2024.csv").await;

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ApiCall::ListDatasets);
        assert!(matches!(calls[1], ApiCall::FindMatch { ref file_name } if file_name == "orders_2024.csv"));
    }

    #[tokio::test]
    async fn memory_api_failure_injection() {
        let api = MemoryIngestApi::new();
        api.inject_failure_for("upload_file", "bad");

        let good = UploadFile::from_bytes("good.csv", "a\n");
        let bad = UploadFile::from_bytes("bad.csv", "a\n");
        assert!(api.upload_file("good.csv", &good, None).await.is_ok());
        let err = api.upload_file("bad.csv", &bad, None).await.unwrap_err();
        assert!(err.is_rejection());

        api.clear_failures();
        assert!(api.upload_file("bad.csv", &bad, None).await.is_ok());
    }

    #[tokio::test]
    async fn memory_api_matches_by_prefix_and_suffix() {
        let api = MemoryIngestApi::new();
        api.insert_dataset(sales());
        api.insert_dataset(Dataset::named("unrouted"));

        let hit = api.find_match("orders_2024.csv").await.expect("match");
        assert_eq!(hit.map(|d| d.dataset_name).as_deref(), Some("sales"));
        assert!(api.find_match("orders_2024.json").await.expect("match").is_none());
        assert!(api.find_match("invoice.csv").await.expect("match").is_none());
    }

    #[tokio::test]
    async fn memory_api_refuses_duplicate_dataset() {
        let api = MemoryIngestApi::new();
        api.create_dataset(&sales()).await.expect("create");
        let err = api.create_dataset(&sales()).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { status: 409, .. }));
    }
}
