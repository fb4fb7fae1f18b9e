//! Capped exponential backoff between reconnection attempts

use std::time::Duration;

/// Exponential backoff with a ceiling.
///
/// The delay before attempt `n` (zero-based) is
/// `min(initial * multiplier^n, max)`, so the sequence never decreases.
///
/// # Example
///
/// ```
/// use portal_connection::reconnect::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::default();
///
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(2_000));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(4_000));
/// assert_eq!(backoff.calculate_delay(4), Duration::from_millis(30_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffStrategy {
    /// Delay before the first attempt, in milliseconds
    initial_ms: u64,
    /// Ceiling for the exponential growth, in milliseconds
    max_ms: u64,
    /// Growth factor per attempt (default: 2)
    multiplier: u64,
}

impl BackoffStrategy {
    /// Create a backoff with the given initial and maximum delays.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2,
        }
    }

    /// Set the growth factor (at least 1).
    pub fn with_multiplier(mut self, multiplier: u64) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    /// Delay to wait before the given zero-based attempt.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = self.initial_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(delay_ms)
    }

    /// Delays for the first `attempts` attempts.
    pub fn schedule(&self, attempts: u32) -> Vec<Duration> {
        (0..attempts).map(|n| self.calculate_delay(n)).collect()
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }
}

impl Default for BackoffStrategy {
    /// 2 seconds initial, 30 seconds max, doubling
    fn default() -> Self {
        Self::new(2_000, 30_000)
    }
}
