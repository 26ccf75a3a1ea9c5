//! User-facing notifications
//!
//! The widget reports every outcome (success, validation error, encoder
//! failure, download) through a [`Notifier`]; it has no other channel to the
//! user.

use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// How prominently a notification should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational or success message
    Default,
    /// Error message
    Destructive,
}

/// A toast-style message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Short heading, e.g. "Success"
    pub title: String,
    /// One-line explanation
    pub description: String,
    /// Presentation hint
    pub severity: Severity,
}

impl Notification {
    /// Informational notification
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Default,
        }
    }

    /// Error notification
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }

    /// Whether this is an error notification
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Destructive
    }
}

/// Surface that shows notifications to the user
pub trait Notifier: Send + Sync {
    /// Show a notification.
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Sends notifications to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Default => tracing::info!(
                target: "qrwidget::notify",
                title = %notification.title,
                "{}",
                notification.description
            ),
            Severity::Destructive => tracing::warn!(
                target: "qrwidget::notify",
                title = %notification.title,
                "{}",
                notification.description
            ),
        }
    }
}

/// Prints notifications for a terminal user: errors to stderr, the rest to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    /// Print every notification
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Print only error notifications (used when stdout carries JSON)
    pub fn errors_only() -> Self {
        Self { quiet: true }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let line = format!("{}: {}", notification.title, notification.description);
        // Write errors (e.g. a closed pipe) are ignored.
        let _ = match notification.severity {
            Severity::Destructive => writeln!(std::io::stderr(), "✗ {line}"),
            Severity::Default if !self.quiet => writeln!(std::io::stdout(), "✓ {line}"),
            Severity::Default => Ok(()),
        };
    }
}

/// Keeps every notification in memory, in order
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything notified so far
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recent notification
    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingNotifier::new();
        recorder.notify(Notification::info("Success", "one"));
        recorder.notify(Notification::error("two"));

        let seen = recorder.notifications();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].is_error());
        assert_eq!(seen[1].title, "Error");
        assert_eq!(recorder.last().unwrap().description, "two");
    }

    #[test]
    fn arc_forwards_to_inner() {
        let recorder = Arc::new(RecordingNotifier::new());
        let shared: Arc<dyn Notifier> = recorder.clone();
        shared.notify(Notification::info("Downloaded", "saved"));
        assert_eq!(recorder.notifications().len(), 1);
    }
}
