//! Wire model shared with the ingestion service.
//!
//! Field names and enumeration values are exchanged verbatim, including the
//! service's `column_Name` spelling. Attributes this crate does not model are
//! captured in `extra` maps and written back untouched, so a table fetched,
//! edited and saved keeps everything the service sent.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Mapping of dataset name to dataset attributes, as returned by the list call.
pub type DatasetCollection = BTreeMap<String, Value>;

/// Mapping of table name to table summary, as returned by the table list call.
pub type TableCollection = BTreeMap<String, Value>;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in the order the service documents them.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the wire spelling of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Parses operator input; matching ignores ASCII case.
            fn from_str(s: &str) -> Result<Self> {
                let trimmed = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        Error::InvalidInput(format!(
                            "unknown {} '{}', expected one of: {}",
                            stringify!($name),
                            trimmed,
                            allowed.join(", ")
                        ))
                    })
            }
        }
    };
}

wire_enum! {
    /// Declared type of a column.
    pub enum ColumnType {
        /// Fixed-point decimal.
        Decimal => "Decimal",
        /// 32-bit integer.
        Integer => "Integer",
        /// UTF-8 text.
        String => "String",
        /// Calendar date.
        Date => "Date",
        /// Date with time of day.
        DateTime => "DateTime",
        /// True/false.
        Boolean => "Boolean",
        /// Single-precision float.
        Float => "Float",
        /// Double-precision float.
        Double => "Double",
        /// 64-bit integer.
        Long => "Long",
        /// Raw bytes.
        Binary => "Binary",
        /// Ordered collection.
        Array => "Array",
        /// Key/value collection.
        Map => "Map",
        /// Nested record.
        Struct => "Struct",
    }
}

wire_enum! {
    /// Privacy classification of a column's values.
    #[derive(Default)]
    pub enum Sensitivity {
        /// Personally identifiable information.
        Pii => "PII",
        /// Sensitive business data.
        Sensitive => "SENSITIVE",
        /// Internal-only data.
        Internal => "INTERNAL",
        /// Publicly shareable data.
        #[default]
        Public => "PUBLIC",
    }
}

wire_enum! {
    /// Transformation applied downstream to a column's sensitive values.
    pub enum ExtraAction {
        /// One-way hash.
        Hash => "HASH",
        /// Partial masking.
        Mask => "MASK",
        /// Reversible encryption.
        Encrypt => "ENCRYPT",
        /// Full removal.
        Redact => "REDACT",
        /// Explicitly no transformation.
        None => "NONE",
    }
}

wire_enum! {
    /// How loads write into a table.
    pub enum WriteMode {
        /// Add rows.
        Append => "APPEND",
        /// Replace contents.
        Overwrite => "OVERWRITE",
        /// Upsert by key.
        Merge => "MERGE",
    }
}

wire_enum! {
    /// Operational status of a table.
    pub enum TableStatus {
        /// Accepting loads.
        Active => "ACTIVE",
        /// Not accepting loads.
        Inactive => "INACTIVE",
        /// Last load failed.
        Failed => "FAILED",
        /// Stopped by an operator.
        Stopped => "STOPPED",
    }
}

/// A registered dataset and its file-name matching rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique dataset name.
    pub dataset_name: String,
    /// Default table that matched files load into.
    #[serde(default)]
    pub table_name: Option<String>,
    /// File names starting with this prefix match the dataset.
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// File names ending with this suffix match the dataset.
    #[serde(default)]
    pub file_suffix: Option<String>,
    /// Attributes the service returns that are not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dataset {
    /// Creates a dataset with only a name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            dataset_name: name.into(),
            table_name: None,
            file_prefix: None,
            file_suffix: None,
            extra: Map::new(),
        }
    }

    /// Builds a dataset from one entry of a [`DatasetCollection`].
    ///
    /// The map key is authoritative for the name. Non-object attribute values
    /// yield a dataset with only the name set.
    ///
    /// # Errors
    ///
    /// Returns an error if an attribute object has fields of the wrong type.
    pub fn from_entry(name: &str, attributes: &Value) -> Result<Self> {
        let Value::Object(fields) = attributes else {
            return Ok(Self::named(name));
        };
        let mut fields = fields.clone();
        fields.insert(
            "dataset_name".to_string(),
            Value::String(name.to_string()),
        );
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::malformed(format!("dataset '{name}': {e}")))
    }

    /// Returns the free-text description, if the service supplied one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.extra.get("description").and_then(Value::as_str)
    }
}

/// Converts a dataset collection into datasets ordered by name.
///
/// # Errors
///
/// Returns an error if any entry is malformed.
pub fn datasets_from_collection(collection: &DatasetCollection) -> Result<Vec<Dataset>> {
    collection
        .iter()
        .map(|(name, attributes)| Dataset::from_entry(name, attributes))
        .collect()
}

/// One field definition within a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name; uniqueness is not enforced.
    #[serde(rename = "column_Name", alias = "column_name")]
    pub column_name: String,
    /// Declared type.
    pub column_type: ColumnType,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the column accepts nulls.
    pub is_nullable: bool,
    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
    /// Whether the column is part of the sort key.
    pub is_sort_key: bool,
    /// Privacy classification.
    #[serde(default)]
    pub sensitivity: Sensitivity,
    /// Downstream transformation for sensitive values.
    #[serde(default)]
    pub extra_action: Option<ExtraAction>,
    /// Attributes the service returns that are not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Column {
    /// The definition appended by "add column": an unnamed nullable
    /// `String` column classified `PUBLIC`.
    fn default() -> Self {
        Self {
            column_name: String::new(),
            column_type: ColumnType::String,
            description: None,
            is_nullable: true,
            is_primary_key: false,
            is_sort_key: false,
            sensitivity: Sensitivity::Public,
            extra_action: None,
            extra: Map::new(),
        }
    }
}

impl Column {
    /// Creates a default column with the given name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            column_name: name.into(),
            column_type,
            ..Self::default()
        }
    }
}

/// A table schema and its operational metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Owning dataset.
    #[serde(default)]
    pub dataset_name: String,
    /// Table name, unique within the dataset.
    #[serde(default)]
    pub table_name: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// File prefix override for this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
    /// File suffix override for this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_suffix: Option<String>,
    /// Owning team or person.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Ordered column definitions.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Load write mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_mode: Option<WriteMode>,
    /// Last modification time, as sent by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Who last modified the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<String>,
    /// Row count at last refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<i64>,
    /// Last data refresh time, as sent by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed: Option<String>,
    /// Operational status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TableStatus>,
    /// Attributes the service returns that are not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Table {
    /// Creates an empty table with no columns.
    #[must_use]
    pub fn new(dataset_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            table_name: table_name.into(),
            description: None,
            file_prefix: None,
            file_suffix: None,
            owner: None,
            columns: Vec::new(),
            write_mode: None,
            last_updated: None,
            last_updated_by: None,
            num_rows: None,
            last_refreshed: None,
            status: None,
            extra: Map::new(),
        }
    }

    /// Sets the column list.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }
}
