//! Operator-facing notifications.
//!
//! Views report the outcome of user actions ("Successfully uploaded x",
//! "Failed to update schema") through a [`Notifier`] instead of printing, so
//! the same state machines can drive a terminal, a log, or a test recorder.

use std::fmt;

/// Whether a notification reports success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// The action completed.
    Success,
    /// The action failed.
    Error,
}

/// A single operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Outcome of the action.
    pub level: NotificationLevel,
    /// Human-readable text.
    pub message: String,
}

impl Notification {
    /// Creates a success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    /// Creates a failure notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// Returns true for failure notifications.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives notifications emitted by views.
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => tracing::info!(text = %notification.message, "notification"),
            NotificationLevel::Error => tracing::warn!(text = %notification.message, "notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_level() {
        assert!(Notification::error("Failed to upload a.csv").is_error());
        assert!(!Notification::success("Successfully uploaded a.csv").is_error());
        assert_eq!(
            Notification::success("Schema updated successfully").to_string(),
            "Schema updated successfully"
        );
    }

    #[test]
    fn tracing_notifier_accepts_both_levels() {
        TracingNotifier.notify(Notification::success("ok"));
        TracingNotifier.notify(Notification::error("nope"));
    }
}
