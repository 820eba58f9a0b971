//! Schema editor: select a dataset and table, edit its columns, save.
//!
//! Edits touch an in-memory draft only. Columns are addressed by position;
//! names are not required to be unique. Saving sends the whole draft table,
//! then re-fetches it so the editor shows what the service accepted.
//! Selecting another dataset or table drops unsaved edits without asking;
//! callers that want to warn first can check
//! [`SchemaEditor::has_unsaved_changes`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{Instrument, info, warn};

use crate::api::IngestApi;
use crate::error::{Error, Result};
use crate::model::{Column, ColumnType, Dataset, ExtraAction, Sensitivity, Table, datasets_from_collection};
use crate::notify::{Notification, Notifier};
use crate::observability::{api_span, table_span};
use crate::view::{LoadState, failure_message};

/// A change to exactly one field of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnUpdate {
    /// Rename the column.
    Name(String),
    /// Change the declared type.
    Type(ColumnType),
    /// Replace the description; `None` clears it.
    Description(Option<String>),
    /// Toggle nullability.
    Nullable(bool),
    /// Toggle primary-key membership.
    PrimaryKey(bool),
    /// Toggle sort-key membership.
    SortKey(bool),
    /// Change the sensitivity classification.
    Sensitivity(Sensitivity),
    /// Change the extra action; `None` removes it.
    ExtraAction(Option<ExtraAction>),
}

impl ColumnUpdate {
    /// Field names accepted by [`ColumnUpdate::parse`].
    pub const FIELDS: &'static [&'static str] = &[
        "name",
        "type",
        "description",
        "nullable",
        "primary_key",
        "sort_key",
        "sensitivity",
        "extra_action",
    ];

    /// Parses an operator-supplied `field` and `value`.
    ///
    /// Booleans accept `true/false`, `yes/no` and `1/0`. An empty
    /// description or extra action clears the field.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown field or an unparseable value.
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        let update = match field.trim().to_ascii_lowercase().as_str() {
            "name" | "column_name" => Self::Name(value.to_string()),
            "type" | "column_type" => Self::Type(value.parse()?),
            "description" => {
                Self::Description((!value.is_empty()).then(|| value.to_string()))
            }
            "nullable" | "is_nullable" => Self::Nullable(parse_bool(value)?),
            "primary_key" | "is_primary_key" | "pk" => Self::PrimaryKey(parse_bool(value)?),
            "sort_key" | "is_sort_key" => Self::SortKey(parse_bool(value)?),
            "sensitivity" => Self::Sensitivity(value.parse()?),
            "extra_action" | "action" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Self::ExtraAction(None)
                } else {
                    Self::ExtraAction(Some(trimmed.parse()?))
                }
            }
            other => {
                return Err(Error::InvalidInput(format!(
                    "unknown column field '{other}', expected one of: {}",
                    Self::FIELDS.join(", ")
                )));
            }
        };
        Ok(update)
    }

    /// Name of the field this update touches.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Type(_) => "type",
            Self::Description(_) => "description",
            Self::Nullable(_) => "nullable",
            Self::PrimaryKey(_) => "primary_key",
            Self::SortKey(_) => "sort_key",
            Self::Sensitivity(_) => "sensitivity",
            Self::ExtraAction(_) => "extra_action",
        }
    }

    fn apply(self, column: &mut Column) {
        match self {
            Self::Name(name) => column.column_name = name,
            Self::Type(column_type) => column.column_type = column_type,
            Self::Description(description) => column.description = description,
            Self::Nullable(flag) => column.is_nullable = flag,
            Self::PrimaryKey(flag) => column.is_primary_key = flag,
            Self::SortKey(flag) => column.is_sort_key = flag,
            Self::Sensitivity(sensitivity) => column.sensitivity = sensitivity,
            Self::ExtraAction(action) => column.extra_action = action,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(Error::InvalidInput(format!(
            "expected a boolean, got '{other}'"
        ))),
    }
}

/// View state for editing one table's schema.
pub struct SchemaEditor {
    api: Arc<dyn IngestApi>,
    notifier: Arc<dyn Notifier>,
    datasets: Vec<Dataset>,
    tables: Vec<String>,
    selected_dataset: Option<String>,
    selected_table: Option<String>,
    loaded: Option<Table>,
    draft: Option<Table>,
    state: LoadState,
    error: Option<String>,
}

impl fmt::Debug for SchemaEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEditor")
            .field("selected_dataset", &self.selected_dataset)
            .field("selected_table", &self.selected_table)
            .field("columns", &self.columns().len())
            .field("state", &self.state)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl SchemaEditor {
    /// Creates an editor with nothing selected.
    #[must_use]
    pub fn new(api: Arc<dyn IngestApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            datasets: Vec::new(),
            tables: Vec::new(),
            selected_dataset: None,
            selected_table: None,
            loaded: None,
            draft: None,
            state: LoadState::Idle,
            error: None,
        }
    }

    /// Fills the dataset selector.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the fetch fails.
    pub async fn load_datasets(&mut self) -> Result<()> {
        self.state = LoadState::Loading;
        let fetched = async {
            let collection = self.api.list_datasets().await?;
            datasets_from_collection(&collection)
        }
        .instrument(api_span("list_datasets"))
        .await;

        match fetched {
            Ok(datasets) => {
                self.datasets = datasets;
                self.state = LoadState::Loaded;
                self.error = None;
                Ok(())
            }
            Err(err) => Err(self.record_failure("fetch datasets", err)),
        }
    }

    /// Selects a dataset and fetches its table list.
    ///
    /// Clears the table selection, the loaded schema and any unsaved edits.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the table list cannot be fetched.
    pub async fn select_dataset(&mut self, dataset: &str) -> Result<()> {
        let dataset = dataset.trim();
        if dataset.is_empty() {
            return Err(Error::InvalidInput("dataset name cannot be empty".to_string()));
        }
        self.discard_selection_state();
        self.selected_dataset = Some(dataset.to_string());
        self.tables.clear();

        self.state = LoadState::Loading;
        let fetched = self
            .api
            .list_tables(dataset)
            .instrument(table_span("list_tables", dataset, ""))
            .await;

        match fetched {
            Ok(tables) => {
                self.tables = tables.into_keys().collect();
                self.state = LoadState::Loaded;
                self.error = None;
                Ok(())
            }
            Err(err) => Err(self.record_failure("fetch tables", err)),
        }
    }

    /// Selects a table of the current dataset and loads its schema.
    ///
    /// Unsaved edits to the previous table are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if no dataset is selected, the name is blank, or the
    /// schema cannot be fetched.
    pub async fn select_table(&mut self, table: &str) -> Result<()> {
        let table = table.trim();
        if table.is_empty() {
            return Err(Error::InvalidInput("table name cannot be empty".to_string()));
        }
        let Some(dataset) = self.selected_dataset.clone() else {
            return Err(Error::InvalidInput(
                "select a dataset before selecting a table".to_string(),
            ));
        };
        if self.has_unsaved_changes() {
            info!(dataset = %dataset, "discarding unsaved schema edits");
        }
        self.discard_selection_state();
        self.selected_table = Some(table.to_string());
        self.fetch_schema(&dataset, table).await.map(|_| ())
    }

    /// Re-fetches the selected table, dropping unsaved edits.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is selected or the fetch fails.
    pub async fn reload(&mut self) -> Result<()> {
        let (dataset, table) = self.selection()?;
        self.fetch_schema(&dataset, &table).await.map(|_| ())
    }

    /// Appends a default column and returns its position.
    ///
    /// # Errors
    ///
    /// Returns an error if no schema is loaded.
    pub fn add_column(&mut self) -> Result<usize> {
        let draft = self.draft_mut()?;
        draft.columns.push(Column::default());
        Ok(draft.columns.len() - 1)
    }

    /// Sets one field of the column at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if no schema is loaded or `index` is out of range;
    /// the draft is unchanged in that case.
    pub fn update_column(&mut self, index: usize, update: ColumnUpdate) -> Result<()> {
        let column = self.column_mut(index)?;
        update.apply(column);
        Ok(())
    }

    /// Removes the column at `index`; later columns shift down by one.
    ///
    /// # Errors
    ///
    /// Returns an error if no schema is loaded or `index` is out of range.
    pub fn remove_column(&mut self, index: usize) -> Result<Column> {
        let draft = self.draft_mut()?;
        if index >= draft.columns.len() {
            return Err(out_of_range(index, draft.columns.len()));
        }
        Ok(draft.columns.remove(index))
    }

    /// Restores the draft to the last loaded schema.
    pub fn discard_changes(&mut self) {
        self.draft.clone_from(&self.loaded);
    }

    /// Returns true if the draft differs from the last loaded schema.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.draft != self.loaded
    }

    /// Column names that occur more than once in the draft, sorted.
    #[must_use]
    pub fn duplicate_column_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for column in self.columns() {
            if !seen.insert(column.column_name.as_str()) {
                duplicates.insert(column.column_name.clone());
            }
        }
        duplicates.into_iter().collect()
    }

    /// Sends the whole draft to the service, then re-fetches it.
    ///
    /// On failure the local edits stay in place and an error notification is
    /// emitted. Duplicate column names are logged but not refused.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is loaded or the service refuses the update.
    pub async fn save(&mut self) -> Result<Table> {
        let (dataset, table) = self.selection()?;
        let draft = self
            .draft
            .clone()
            .ok_or_else(|| Error::InvalidInput("no table schema loaded".to_string()))?;

        let duplicates = self.duplicate_column_names();
        if !duplicates.is_empty() {
            warn!(dataset = %dataset, table = %table, ?duplicates, "saving schema with duplicate column names");
        }

        self.state = LoadState::Loading;
        let saved = self
            .api
            .update_table(&dataset, &table, &draft)
            .instrument(table_span("update_table", &dataset, &table))
            .await;

        match saved {
            Ok(_) => {
                info!(dataset = %dataset, table = %table, columns = draft.columns.len(), "schema saved");
                self.notifier
                    .notify(Notification::success("Schema updated successfully"));
                let confirmed = match self.request_schema(&dataset, &table).await {
                    Ok(confirmed) => confirmed,
                    Err(err) => {
                        warn!(dataset = %dataset, table = %table, error = %err, "saved schema could not be re-fetched; keeping the sent draft");
                        draft
                    }
                };
                self.adopt(confirmed.clone());
                Ok(confirmed)
            }
            Err(err) => {
                let err = self.record_failure("update schema", err);
                Err(err)
            }
        }
    }

    /// Datasets offered by the selector.
    #[must_use]
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Tables of the selected dataset, ordered by name.
    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Selected dataset name.
    #[must_use]
    pub fn selected_dataset(&self) -> Option<&str> {
        self.selected_dataset.as_deref()
    }

    /// Selected table name.
    #[must_use]
    pub fn selected_table(&self) -> Option<&str> {
        self.selected_table.as_deref()
    }

    /// The draft being edited.
    #[must_use]
    pub fn draft(&self) -> Option<&Table> {
        self.draft.as_ref()
    }

    /// The schema as last loaded from the service.
    #[must_use]
    pub fn loaded(&self) -> Option<&Table> {
        self.loaded.as_ref()
    }

    /// Draft columns in order; empty when nothing is loaded.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.draft.as_ref().map_or(&[], |t| t.columns.as_slice())
    }

    /// State of the last request.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Error from the last failed request.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    async fn fetch_schema(&mut self, dataset: &str, table: &str) -> Result<Table> {
        self.state = LoadState::Loading;
        match self.request_schema(dataset, table).await {
            Ok(schema) => {
                info!(dataset, table, columns = schema.columns.len(), "table schema loaded");
                self.adopt(schema.clone());
                Ok(schema)
            }
            Err(err) => Err(self.record_failure("load table schema", err)),
        }
    }

    async fn request_schema(&self, dataset: &str, table: &str) -> Result<Table> {
        self.api
            .get_table(dataset, table)
            .instrument(table_span("get_table", dataset, table))
            .await
    }

    /// Makes `schema` both the loaded and the draft state.
    fn adopt(&mut self, schema: Table) {
        self.loaded = Some(schema.clone());
        self.draft = Some(schema);
        self.state = LoadState::Loaded;
        self.error = None;
    }

    fn selection(&self) -> Result<(String, String)> {
        match (&self.selected_dataset, &self.selected_table) {
            (Some(dataset), Some(table)) => Ok((dataset.clone(), table.clone())),
            _ => Err(Error::InvalidInput(
                "select a dataset and a table first".to_string(),
            )),
        }
    }

    fn discard_selection_state(&mut self) {
        self.selected_table = None;
        self.loaded = None;
        self.draft = None;
    }

    fn draft_mut(&mut self) -> Result<&mut Table> {
        self.draft
            .as_mut()
            .ok_or_else(|| Error::InvalidInput("no table schema loaded".to_string()))
    }

    fn column_mut(&mut self, index: usize) -> Result<&mut Column> {
        let draft = self.draft_mut()?;
        let len = draft.columns.len();
        draft
            .columns
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))
    }

    fn record_failure(&mut self, action: &str, err: Error) -> Error {
        warn!(error = %err, "failed to {action}");
        let message = failure_message(action, &err);
        self.state = LoadState::Failed;
        self.error = Some(message.clone());
        self.notifier.notify(Notification::error(message));
        err
    }
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::InvalidInput(format!(
        "column index {index} out of range (table has {len} columns)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_every_field() {
        assert_eq!(
            ColumnUpdate::parse("name", "order_id").unwrap(),
            ColumnUpdate::Name("order_id".to_string())
        );
        assert_eq!(
            ColumnUpdate::parse("type", "long").unwrap(),
            ColumnUpdate::Type(ColumnType::Long)
        );
        assert_eq!(
            ColumnUpdate::parse("description", "").unwrap(),
            ColumnUpdate::Description(None)
        );
        assert_eq!(
            ColumnUpdate::parse("nullable", "no").unwrap(),
            ColumnUpdate::Nullable(false)
        );
        assert_eq!(
            ColumnUpdate::parse("pk", "1").unwrap(),
            ColumnUpdate::PrimaryKey(true)
        );
        assert_eq!(
            ColumnUpdate::parse("SORT_KEY", "true").unwrap(),
            ColumnUpdate::SortKey(true)
        );
        assert_eq!(
            ColumnUpdate::parse("sensitivity", "pii").unwrap(),
            ColumnUpdate::Sensitivity(Sensitivity::Pii)
        );
        assert_eq!(
            ColumnUpdate::parse("extra_action", "mask").unwrap(),
            ColumnUpdate::ExtraAction(Some(ExtraAction::Mask))
        );
        assert_eq!(
            ColumnUpdate::parse("extra_action", "").unwrap(),
            ColumnUpdate::ExtraAction(None)
        );
    }

    #[test]
    fn parse_rejects_unknown_field_and_bad_values() {
        assert!(ColumnUpdate::parse("colour", "red").is_err());
        assert!(ColumnUpdate::parse("nullable", "maybe").is_err());
        assert!(ColumnUpdate::parse("type", "Varchar").is_err());
    }

    #[test]
    fn apply_touches_only_one_field() {
        let mut column = Column::new("id", ColumnType::Integer);
        let before = column.clone();
        ColumnUpdate::SortKey(true).apply(&mut column);

        assert!(column.is_sort_key);
        column.is_sort_key = before.is_sort_key;
        assert_eq!(column, before);
    }

    #[test]
    fn field_names_round_trip_through_parse() {
        for field in ColumnUpdate::FIELDS {
            let value = match *field {
                "type" => "String",
                "sensitivity" => "PUBLIC",
                "extra_action" => "HASH",
                "nullable" | "primary_key" | "sort_key" => "true",
                _ => "x",
            };
            assert_eq!(ColumnUpdate::parse(field, value).unwrap().field(), *field);
        }
    }
}
