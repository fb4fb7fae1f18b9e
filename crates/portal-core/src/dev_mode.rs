//! Dev Mode toggle
//!
//! Dev Mode is the degraded-mode escape hatch offered to users when the
//! backend stays unreachable. The connection layer only reads it to raise
//! logging verbosity; probes still perform a real round trip.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, cloneable handle to the process-wide Dev Mode flag
#[derive(Debug, Clone, Default)]
pub struct DevMode {
    enabled: Arc<AtomicBool>,
}

impl DevMode {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::info!(enabled, "dev mode toggled");
        }
    }
}
