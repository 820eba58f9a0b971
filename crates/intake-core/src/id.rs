//! Strongly-typed identifiers for Intake entities.
//!
//! Datasets and tables are keyed by their names on the service side, so the
//! only identifier minted locally belongs to queued uploads. Upload IDs are
//! ULIDs: unique without coordination and sortable by creation time, which
//! keeps queue order and ID order aligned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// A unique identifier for an item in the upload queue.
///
/// Two selections of the same file produce two items with distinct IDs,
/// so removal always targets exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(Ulid);

impl UploadId {
    /// Generates a new unique upload ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates an upload ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidInput(format!("invalid upload ID '{s}': {e}")))
    }
}
