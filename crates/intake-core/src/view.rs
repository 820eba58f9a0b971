//! State shared by every fetch-backed view.

use std::fmt;

/// Lifecycle of a view's most recent fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request succeeded.
    Loaded,
    /// The last request failed; the view carries an error message.
    Failed,
}

impl LoadState {
    /// Returns true while a request is in flight.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Formats the single operator-facing message for a failed action.
pub(crate) fn failure_message(action: &str, err: &crate::Error) -> String {
    format!("Failed to {action}: {err}")
}
