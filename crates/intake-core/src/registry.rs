//! Dataset registry view: list datasets, create new ones.

use std::fmt;
use std::sync::Arc;

use tracing::{Instrument, info, warn};

use crate::api::IngestApi;
use crate::error::{Error, Result};
use crate::model::{Dataset, datasets_from_collection};
use crate::observability::api_span;
use crate::view::{LoadState, failure_message};

/// Input fields of the create-dataset form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetForm {
    /// Required dataset name.
    pub dataset_name: String,
    /// Optional default table.
    pub table_name: String,
    /// Optional file-name prefix rule.
    pub file_prefix: String,
    /// Optional file-name suffix rule.
    pub file_suffix: String,
}

impl DatasetForm {
    /// Creates a form with only the name filled in.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            dataset_name: name.into(),
            ..Self::default()
        }
    }

    /// Validates the form and builds the dataset to create.
    ///
    /// The name is trimmed and must not be empty; blank optional fields
    /// become absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset name is blank.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let name = self.dataset_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "dataset name cannot be empty".to_string(),
            ));
        }
        Ok(Dataset {
            table_name: optional(&self.table_name),
            file_prefix: optional(&self.file_prefix),
            file_suffix: optional(&self.file_suffix),
            ..Dataset::named(name)
        })
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// View state for the dataset list and its creation form.
pub struct DatasetRegistryView {
    api: Arc<dyn IngestApi>,
    datasets: Vec<Dataset>,
    state: LoadState,
    error: Option<String>,
    form: DatasetForm,
}

impl fmt::Debug for DatasetRegistryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetRegistryView")
            .field("datasets", &self.datasets.len())
            .field("state", &self.state)
            .field("error", &self.error)
            .field("form", &self.form)
            .finish_non_exhaustive()
    }
}

impl DatasetRegistryView {
    /// Creates an empty view; nothing is fetched until [`load`](Self::load).
    #[must_use]
    pub fn new(api: Arc<dyn IngestApi>) -> Self {
        Self {
            api,
            datasets: Vec::new(),
            state: LoadState::Idle,
            error: None,
            form: DatasetForm::default(),
        }
    }

    /// Fetches the full dataset collection.
    ///
    /// On failure the previous list is kept and an inline error is recorded.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the fetch or decoding fails.
    pub async fn load(&mut self) -> Result<()> {
        self.state = LoadState::Loading;
        let fetched = async {
            let collection = self.api.list_datasets().await?;
            datasets_from_collection(&collection)
        }
        .instrument(api_span("list_datasets"))
        .await;

        match fetched {
            Ok(datasets) => {
                info!(count = datasets.len(), "datasets loaded");
                self.datasets = datasets;
                self.state = LoadState::Loaded;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch datasets");
                self.state = LoadState::Failed;
                self.error = Some(failure_message("fetch datasets", &err));
                Err(err)
            }
        }
    }

    /// Re-issues the dataset fetch after a failure.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the fetch fails again.
    pub async fn retry(&mut self) -> Result<()> {
        self.load().await
    }

    /// Submits the creation form and refreshes the list.
    ///
    /// The form is cleared once the service accepts the dataset. A failed
    /// refresh afterwards is recorded as the view's error but does not undo
    /// the creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid or the service refuses it;
    /// the form keeps its contents in that case.
    pub async fn submit(&mut self) -> Result<Dataset> {
        let dataset = self.form.to_dataset()?;
        let created = self
            .api
            .create_dataset(&dataset)
            .instrument(api_span("create_dataset"))
            .await;

        match created {
            Ok(created) => {
                info!(dataset = %created.dataset_name, "dataset created");
                self.form.reset();
                let _ = self.load().await;
                Ok(created)
            }
            Err(err) => {
                warn!(dataset = %dataset.dataset_name, error = %err, "failed to create dataset");
                self.state = LoadState::Failed;
                self.error = Some(failure_message("create dataset", &err));
                Err(err)
            }
        }
    }

    /// Datasets from the last successful fetch, ordered by name.
    #[must_use]
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Looks up a dataset by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.dataset_name == name)
    }

    /// State of the last request.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Inline error from the last failed request.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The creation form.
    #[must_use]
    pub fn form(&self) -> &DatasetForm {
        &self.form
    }

    /// The creation form, for editing.
    pub fn form_mut(&mut self) -> &mut DatasetForm {
        &mut self.form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_requires_a_name() {
        let err = DatasetForm::named("   ").to_dataset().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn form_trims_and_drops_blank_fields() {
        let form = DatasetForm {
            dataset_name: "  sales ".to_string(),
            table_name: "orders".to_string(),
            file_prefix: "  ".to_string(),
            file_suffix: ".csv".to_string(),
        };
        let dataset = form.to_dataset().unwrap();
        assert_eq!(dataset.dataset_name, "sales");
        assert_eq!(dataset.table_name.as_deref(), Some("orders"));
        assert_eq!(dataset.file_prefix, None);
        assert_eq!(dataset.file_suffix.as_deref(), Some(".csv"));
    }

    #[test]
    fn reset_clears_form() {
        let mut form = DatasetForm::named("sales");
        form.file_prefix = "orders_".to_string();
        form.reset();
        assert_eq!(form, DatasetForm::default());
    }
}
