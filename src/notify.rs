//! Transient user notifications.
//!
//! Controllers report mutation results as [`Toast`]s through a [`Notifier`];
//! whatever front end is attached subscribes and shows them.

use std::time::Instant;

use tokio::sync::broadcast;

const TOAST_CAPACITY: usize = 32;

/// A toast notification message
#[derive(Debug, Clone)]
pub struct Toast {
    /// The message to display
    pub message: String,
    /// The severity level of the toast
    pub level: ToastLevel,
    /// When the toast was created
    pub timestamp: Instant,
}

/// Severity level for toast notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
    Success,
}

crate::wire_enum!(ToastLevel, "toast level", {
    Info => "info",
    Warning => "warning",
    Error => "error",
    Success => "success",
});

impl Toast {
    pub fn new(message: String, level: ToastLevel) -> Self {
        Self {
            message,
            level,
            timestamp: Instant::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Error)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message.into(), ToastLevel::Success)
    }
}

/// Fan-out of toasts to any number of subscribers.
///
/// Sending never fails: with no subscriber the toast is dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Toast>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TOAST_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, toast: Toast) {
        tracing::debug!(level = %toast.level, message = %toast.message, "toast");
        let _ = self.tx.send(toast);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_level() {
        assert_eq!(Toast::info("x").level, ToastLevel::Info);
        assert_eq!(Toast::warning("x").level, ToastLevel::Warning);
        assert_eq!(Toast::error("x").level, ToastLevel::Error);
        assert_eq!(Toast::success("x").level, ToastLevel::Success);
    }

    #[tokio::test]
    async fn test_subscribers_receive_toasts() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.notify(Toast::success("Saved"));
        let toast = rx.recv().await.unwrap();
        assert_eq!(toast.message, "Saved");
        assert_eq!(toast.level, ToastLevel::Success);
    }

    #[test]
    fn test_notify_without_subscribers_is_fine() {
        Notifier::new().notify(Toast::info("nobody listening"));
    }
}
