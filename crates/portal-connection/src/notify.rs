//! User-facing connection notifications
//!
//! The monitor only decides *which* message to surface; rendering belongs to
//! whatever implements [`Notifier`] (a toast layer, a CLI, the log).

use serde::Serialize;
use tokio::sync::mpsc;

use crate::health::ErrorKind;

/// How prominently a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// One of the fixed set of connection messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Connectivity came back after a reconnection sequence started
    Restored,
    /// A user-visible check failed; the user is pointed at Dev Mode
    ConnectionIssue {
        error_kind: ErrorKind,
        detail: String,
        dev_mode_active: bool,
    },
    /// Repeated failures that usually mean a recursive row-level security
    /// policy on the backend
    PolicyRecursionSuspected { consecutive_errors: u32 },
    /// The reconnection sequence ran out of attempts
    ReconnectFailed { attempts: u32 },
}

impl Notification {
    pub fn severity(&self) -> Severity {
        match self {
            Notification::Restored => Severity::Success,
            Notification::ConnectionIssue { .. } => Severity::Warning,
            Notification::PolicyRecursionSuspected { .. } => Severity::Warning,
            Notification::ReconnectFailed { .. } => Severity::Error,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Notification::Restored => "Connection restored",
            Notification::ConnectionIssue { .. } => "Connection issue",
            Notification::PolicyRecursionSuspected { .. } => "Possible permission policy issue",
            Notification::ReconnectFailed { .. } => "Reconnection failed",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::Restored => "The connection to the server has been restored.".into(),
            Notification::ConnectionIssue {
                error_kind,
                dev_mode_active,
                ..
            } => {
                let hint = if *dev_mode_active {
                    "Dev Mode is active, so strict checks are relaxed."
                } else {
                    "Enable Dev Mode to keep working while the connection is down."
                };
                format!("{} {}", error_kind.user_message(), hint)
            }
            Notification::PolicyRecursionSuspected { consecutive_errors } => format!(
                "{consecutive_errors} consecutive connection failures. This usually means a \
                 row-level security policy on the backend is recursing."
            ),
            Notification::ReconnectFailed { attempts } => format!(
                "Could not reconnect after {attempts} attempts. Enable Dev Mode or try again later."
            ),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title(), self.body())
    }
}

/// Presentation layer for connection notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to a channel, typically drained by the UI
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.sender.send(notification) {
            tracing::debug!(notification = %err.0, "notification receiver dropped");
        }
    }
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity() {
            Severity::Success => {
                tracing::info!(title = notification.title(), "{}", notification.body())
            }
            Severity::Warning => {
                tracing::warn!(title = notification.title(), "{}", notification.body())
            }
            Severity::Error => {
                tracing::error!(title = notification.title(), "{}", notification.body())
            }
        }
    }
}
