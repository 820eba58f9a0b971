//! Notifier that keeps everything it is told.

use std::sync::{Arc, Mutex};

use intake_core::notify::{Notification, Notifier};

/// Records notifications in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    received: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().expect("lock").clone()
    }

    /// Message texts, in order.
    pub fn messages(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }

    /// Messages of error notifications.
    pub fn errors(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(Notification::is_error)
            .map(|n| n.message)
            .collect()
    }

    /// Messages of success notifications.
    pub fn successes(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| !n.is_error())
            .map(|n| n.message)
            .collect()
    }

    /// Forgets everything received.
    pub fn clear(&self) {
        self.received.lock().expect("lock").clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.received.lock().expect("lock").push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_by_level() {
        let recorder = RecordingNotifier::new();
        recorder.notify(Notification::success("Successfully uploaded a.csv"));
        recorder.notify(Notification::error("Failed to upload b.csv"));

        assert_eq!(recorder.successes(), vec!["Successfully uploaded a.csv"]);
        assert_eq!(recorder.errors(), vec!["Failed to upload b.csv"]);
        assert_eq!(recorder.messages().len(), 2);

        recorder.clear();
        assert!(recorder.notifications().is_empty());
    }
}
