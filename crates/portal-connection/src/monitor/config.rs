//! Connection monitor configuration

use std::time::Duration;

use portal_core::{MonitorSettings, PortalConfig, ProbeQuery};

use crate::health::{ConnectionCache, PROBE_TIMEOUT};
use crate::reconnect::{BackoffStrategy, ReconnectConfig};
use crate::timeout::TimeoutOptions;

/// Shortest background interval the monitor will tick at
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for a [`ConnectionMonitor`](super::ConnectionMonitor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between background checks
    pub check_interval: Duration,
    /// How long a probe outcome is reused
    pub cache_ttl: Duration,
    /// Deadline for each probe attempt
    pub probe_timeout: Duration,
    /// Extra probe attempts within one check
    pub probe_retries: u32,
    /// Base delay between probe attempts
    pub probe_retry_delay: Duration,
    /// Consecutive failures before the policy warning is raised
    pub policy_warning_threshold: u32,
    /// Read issued by every probe
    pub probe_query: ProbeQuery,
    pub reconnect: ReconnectConfig,
}

impl MonitorConfig {
    /// Create a configuration with the given background interval.
    ///
    /// The interval is raised to [`MIN_CHECK_INTERVAL`] when shorter.
    pub fn new(check_interval: Duration) -> Self {
        Self {
            check_interval: check_interval.max(MIN_CHECK_INTERVAL),
            cache_ttl: ConnectionCache::DEFAULT_TTL,
            probe_timeout: PROBE_TIMEOUT,
            probe_retries: 1,
            probe_retry_delay: Duration::from_secs(1),
            policy_warning_threshold: 3,
            probe_query: ProbeQuery::default(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Build from the `[monitor]` and `[backend]` sections of a config file.
    pub fn from_config(config: &PortalConfig) -> Self {
        Self::from(&config.monitor).with_probe_query(config.backend.probe_query())
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval.max(MIN_CHECK_INTERVAL);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_probe_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.probe_retries = retries;
        self.probe_retry_delay = retry_delay;
        self
    }

    pub fn with_policy_warning_threshold(mut self, threshold: u32) -> Self {
        self.policy_warning_threshold = threshold.max(1);
        self
    }

    pub fn with_probe_query(mut self, query: ProbeQuery) -> Self {
        self.probe_query = query;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Executor options for one check.
    ///
    /// Silent checks log their internal retries at debug level.
    pub fn probe_options(&self, silent: bool) -> TimeoutOptions {
        TimeoutOptions::new(self.probe_timeout)
            .with_retries(self.probe_retries)
            .with_retry_delay(self.probe_retry_delay)
            .with_silent_retry(silent)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl From<&MonitorSettings> for MonitorConfig {
    fn from(settings: &MonitorSettings) -> Self {
        let backoff = BackoffStrategy::new(
            settings.reconnect_initial_delay_ms,
            settings.reconnect_max_delay_ms,
        );

        Self::new(Duration::from_millis(settings.check_interval_ms))
            .with_cache_ttl(Duration::from_millis(settings.cache_ttl_ms))
            .with_probe_timeout(Duration::from_millis(settings.probe_timeout_ms))
            .with_probe_retries(
                settings.probe_retries,
                Duration::from_millis(settings.probe_retry_delay_ms),
            )
            .with_policy_warning_threshold(settings.policy_warning_threshold)
            .with_reconnect(ReconnectConfig::new(
                settings.reconnect_max_attempts,
                backoff,
            ))
    }
}
