//! Portal Connection - Backend health monitoring and reconnection
//!
//! This crate keeps the application's view of backend reachability current:
//! it probes the backing store under a deadline, caches the outcome briefly,
//! tracks consecutive failures, and drives a bounded reconnection sequence
//! when the background check finds the backend gone.

pub mod health;
pub mod monitor;
pub mod notify;
pub mod reconnect;
pub mod timeout;

#[cfg(test)]
mod test_support;

pub use health::{CachedProbe, ConnectionCache, ErrorKind, ProbeReport, classify, run_probe};
pub use monitor::{
    ConnectionMonitor, ConnectionMonitorBuilder, ConnectionState, MonitorConfig, MonitorHandle,
};
pub use notify::{ChannelNotifier, Notification, Notifier, Severity, TracingNotifier};
pub use reconnect::{
    BackoffStrategy, ReconnectConfig, ReconnectEvent, ReconnectOutcome, ReconnectPhase,
    ReconnectScheduler, ReconnectTarget,
};
pub use timeout::{RetryContext, TimeoutOptions, with_timeout};
