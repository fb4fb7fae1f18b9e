//! Single-slot probe cache
//!
//! Remembers the last probe outcome for a fixed TTL so that callers arriving
//! within that window reuse it instead of probing again. The slot is
//! overwritten by every probe, successful or not.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::probe::ProbeReport;

/// A remembered probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedProbe {
    pub is_connected: bool,
    /// When the probe completed
    pub timestamp: Instant,
    pub response_time: Option<Duration>,
}

impl CachedProbe {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Probe result cache with a fixed TTL
#[derive(Debug)]
pub struct ConnectionCache {
    ttl: Duration,
    slot: Mutex<Option<CachedProbe>>,
}

impl ConnectionCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached outcome, if it is younger than the TTL.
    pub fn fresh(&self) -> Option<CachedProbe> {
        self.fresh_at(Instant::now())
    }

    pub fn fresh_at(&self, now: Instant) -> Option<CachedProbe> {
        self.slot
            .lock()
            .filter(|cached| cached.is_fresh(now, self.ttl))
    }

    /// The cached outcome regardless of age.
    pub fn last(&self) -> Option<CachedProbe> {
        *self.slot.lock()
    }

    pub fn record(&self, is_connected: bool, response_time: Option<Duration>) -> CachedProbe {
        let cached = CachedProbe {
            is_connected,
            timestamp: Instant::now(),
            response_time,
        };
        *self.slot.lock() = Some(cached);
        cached
    }

    pub fn record_report(&self, report: &ProbeReport) -> CachedProbe {
        self.record(report.is_connected, report.response_time)
    }

    pub fn invalidate(&self) {
        self.slot.lock().take();
    }
}

impl Default for ConnectionCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
