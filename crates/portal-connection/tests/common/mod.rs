//! Common test utilities and mocks

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_connection::{Notification, Notifier};
use portal_core::{DataStore, PortalError, ProbeQuery, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Mock backing store whose availability can be flipped during a test.
///
/// Each probe takes `latency` and then succeeds or fails depending on the
/// current `up` flag. Every probed query is logged for assertions.
pub struct MockStore {
    pub up: Arc<Mutex<bool>>,
    pub latency: Duration,
    /// Blocks every probe until it is cancelled
    pub hang: Arc<Mutex<bool>>,
    pub probe_log: Arc<Mutex<Vec<ProbeQuery>>>,
}

impl MockStore {
    pub fn up() -> Self {
        Self {
            up: Arc::new(Mutex::new(true)),
            latency: Duration::from_millis(120),
            hang: Arc::new(Mutex::new(false)),
            probe_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn down() -> Self {
        let store = Self::up();
        store.set_up(false);
        store
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_up(&self, up: bool) {
        *self.up.lock() = up;
    }

    pub fn set_hang(&self, hang: bool) {
        *self.hang.lock() = hang;
    }

    pub fn probes(&self) -> usize {
        self.probe_log.lock().len()
    }
}

#[async_trait]
impl DataStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn select_single(&self, query: &ProbeQuery, cancel: &CancellationToken) -> Result<()> {
        self.probe_log.lock().push(query.clone());

        if *self.hang.lock() {
            cancel.cancelled().await;
            return Err(PortalError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(PortalError::Cancelled),
            _ = tokio::time::sleep(self.latency) => {}
        }

        if *self.up.lock() {
            Ok(())
        } else {
            Err(PortalError::Network("connection refused".into()))
        }
    }
}

/// Collects every notification the monitor raises.
#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.seen.lock().iter().filter(|n| predicate(n)).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}
