//! Process-wide connection monitor
//!
//! Owns the observable [`ConnectionState`], the probe cache and the
//! reconnection scheduler, and decides which notification each outcome
//! deserves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use portal_core::{DataStore, DevMode, PortalError, Result};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ConnectionState, MIN_CHECK_INTERVAL, MonitorConfig};
use crate::health::{ConnectionCache, ErrorKind, ProbeReport, classify, run_probe};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::reconnect::{
    ReconnectEvent, ReconnectOutcome, ReconnectPhase, ReconnectScheduler, ReconnectTarget,
};

/// Handle on the currently running reconnection sequence
struct ActiveReconnect {
    sequence: u64,
    cancel: CancellationToken,
}

/// Tracks backend reachability for the whole application.
///
/// Cheap to share: build it once with [`ConnectionMonitor::builder`] and pass
/// the `Arc` around.
pub struct ConnectionMonitor {
    store: Arc<dyn DataStore>,
    config: MonitorConfig,
    cache: ConnectionCache,
    state: Mutex<ConnectionState>,
    notifier: Arc<dyn Notifier>,
    dev_mode: DevMode,
    scheduler: ReconnectScheduler,
    /// Set while a non-silent probe is running
    check_in_flight: AtomicBool,
    /// The policy warning was already shown for the current failure streak
    policy_warned: AtomicBool,
    reconnect: Mutex<Option<ActiveReconnect>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    next_sequence: AtomicU64,
}

/// Builder for [`ConnectionMonitor`]
pub struct ConnectionMonitorBuilder {
    store: Arc<dyn DataStore>,
    config: MonitorConfig,
    notifier: Option<Arc<dyn Notifier>>,
    dev_mode: DevMode,
}

impl ConnectionMonitorBuilder {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            config: MonitorConfig::default(),
            notifier: None,
            dev_mode: DevMode::default(),
        }
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn dev_mode(mut self, dev_mode: DevMode) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn build(self) -> Arc<ConnectionMonitor> {
        let scheduler = ReconnectScheduler::new(self.config.reconnect.clone());
        Arc::new(ConnectionMonitor {
            store: self.store,
            cache: ConnectionCache::new(self.config.cache_ttl),
            config: self.config,
            state: Mutex::new(ConnectionState::default()),
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier)),
            dev_mode: self.dev_mode,
            scheduler,
            check_in_flight: AtomicBool::new(false),
            policy_warned: AtomicBool::new(false),
            reconnect: Mutex::new(None),
            reconnect_task: Mutex::new(None),
            next_sequence: AtomicU64::new(0),
        })
    }
}

impl ConnectionMonitor {
    pub fn builder(store: Arc<dyn DataStore>) -> ConnectionMonitorBuilder {
        ConnectionMonitorBuilder::new(store)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn dev_mode(&self) -> &DevMode {
        &self.dev_mode
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().is_connected
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnect.lock().is_some()
    }

    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.scheduler.phase()
    }

    /// Subscribe to events of reconnection sequences started after this call.
    pub fn reconnect_events(&self) -> tokio::sync::broadcast::Receiver<ReconnectEvent> {
        self.scheduler.subscribe()
    }

    /// Check whether the backend is reachable.
    ///
    /// Answers from the cache while it is fresh. A non-silent call made while
    /// another non-silent check is still probing returns the last known value
    /// instead of probing again. Silent checks never raise the connection
    /// issue notification and never mark the state as checking.
    #[tracing::instrument(skip(self), fields(store = self.store.name()))]
    pub async fn check_connection(&self, silent: bool) -> bool {
        if let Some(cached) = self.cache.fresh() {
            if !silent {
                self.state.lock().apply_cached(&cached);
            }
            tracing::trace!(is_connected = cached.is_connected, "using cached probe");
            return cached.is_connected;
        }

        if silent {
            return self.probe_and_record(true).await;
        }
        if self.check_in_flight.swap(true, Ordering::SeqCst) {
            tracing::trace!("check already in flight");
            return self.last_known();
        }
        self.visible_check(true).await
    }

    /// Forget everything and check again with a user-visible probe.
    pub async fn reset_connection(&self) -> bool {
        tracing::info!("resetting connection state");
        self.stop_reconnecting();
        self.cache.invalidate();
        self.policy_warned.store(false, Ordering::SeqCst);
        *self.state.lock() = ConnectionState::default();

        // Probe even when another visible check is running; its answer
        // predates the reset.
        let overridden = self.check_in_flight.swap(true, Ordering::SeqCst);
        if overridden {
            tracing::debug!("reset overrides the check in flight");
        }
        self.visible_check(!overridden).await
    }

    /// Start a reconnection sequence unless one is already active or the
    /// connection is up.
    ///
    /// Returns whether a new sequence was started.
    pub fn schedule_reconnect(self: &Arc<Self>) -> bool {
        let mut slot = self.reconnect.lock();
        if slot.is_some() {
            tracing::debug!("reconnection already scheduled");
            return false;
        }
        {
            let mut state = self.state.lock();
            if state.is_connected || state.reconnecting {
                return false;
            }
            state.reconnecting = true;
        }

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        *slot = Some(ActiveReconnect {
            sequence,
            cancel: cancel.clone(),
        });
        drop(slot);

        let previous = self.reconnect_task.lock().take();
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move {
            // A cancelled sequence may still be unwinding on the scheduler.
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let target = ForcedProbe { monitor: &monitor };
            let outcome = monitor.scheduler.run(&target, &cancel).await;
            monitor.finish_reconnect(sequence, outcome);
        });
        *self.reconnect_task.lock() = Some(task);

        tracing::info!(sequence, "reconnection sequence started");
        true
    }

    /// Cancel the active reconnection sequence, if any.
    pub fn stop_reconnecting(&self) -> bool {
        let active = self.reconnect.lock().take();
        match active {
            Some(active) => {
                active.cancel.cancel();
                self.state.lock().reconnecting = false;
                tracing::debug!(sequence = active.sequence, "reconnection sequence stopped");
                true
            }
            None => false,
        }
    }

    /// Run the periodic background check until the returned handle is shut
    /// down.
    pub fn spawn_background(self: &Arc<Self>) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let monitor = Arc::clone(self);
        let token = cancel.clone();
        let join = tokio::spawn(async move { monitor.run_background(token).await });
        MonitorHandle { cancel, join }
    }

    async fn run_background(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.config.check_interval.max(MIN_CHECK_INTERVAL);
        tracing::info!(
            interval_ms = period.as_millis() as u64,
            "connection monitor started"
        );

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = self.check_connection(false) => {}
        }

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                connected = self.check_connection(true) => connected,
            };

            if !connected && !self.is_reconnecting() {
                self.schedule_reconnect();
            }
        }

        self.stop_reconnecting();
        tracing::info!("connection monitor stopped");
    }

    /// Probe on behalf of a user-visible check, marking the state as
    /// checking until the probe settles or the check is dropped.
    async fn visible_check(&self, owns_flag: bool) -> bool {
        self.state.lock().is_checking = true;
        let mut guard = CheckingGuard {
            monitor: self,
            owns_flag,
            settled: false,
        };
        let connected = self.probe_and_record(false).await;
        guard.settled = true;
        connected
    }

    async fn probe_and_record(&self, silent: bool) -> bool {
        let report = run_probe(
            self.store.as_ref(),
            &self.config.probe_query,
            &self.config.probe_options(silent),
        )
        .await;
        self.cache.record_report(&report);
        self.log_probe(&report, silent);

        match report.error {
            None => {
                self.handle_success(report.response_time.unwrap_or_default());
                true
            }
            Some(err) => {
                self.handle_failure(&err, silent);
                false
            }
        }
    }

    fn last_known(&self) -> bool {
        match self.cache.last() {
            Some(cached) => cached.is_connected,
            None => self.state.lock().is_connected,
        }
    }

    fn handle_success(&self, response_time: Duration) {
        let (active, was_reconnecting) = {
            let mut slot = self.reconnect.lock();
            let active = slot.take();
            let was_reconnecting = self.state.lock().record_success(response_time, Utc::now());
            (active, was_reconnecting)
        };
        self.policy_warned.store(false, Ordering::SeqCst);

        if let Some(active) = active {
            active.cancel.cancel();
            tracing::info!(
                sequence = active.sequence,
                was_reconnecting,
                "connection restored by check"
            );
            self.notifier.notify(Notification::Restored);
        }
    }

    fn handle_failure(&self, error: &PortalError, silent: bool) {
        let kind = classify(error);
        let detail = error.to_string();
        let consecutive_errors = self.state.lock().record_failure(detail.clone(), Utc::now());

        tracing::warn!(
            error_kind = %kind,
            consecutive_errors,
            silent,
            error = %detail,
            "connection check failed"
        );

        if !silent {
            self.notifier.notify(Notification::ConnectionIssue {
                error_kind: kind,
                detail,
                dev_mode_active: self.dev_mode.is_enabled(),
            });
        }

        let escalate = kind == ErrorKind::Recursion
            || consecutive_errors >= self.config.policy_warning_threshold;
        if escalate && !self.policy_warned.swap(true, Ordering::SeqCst) {
            self.notifier
                .notify(Notification::PolicyRecursionSuspected { consecutive_errors });
        }
    }

    fn finish_reconnect(&self, sequence: u64, outcome: ReconnectOutcome) {
        let mut slot = self.reconnect.lock();
        if !matches!(slot.as_ref(), Some(active) if active.sequence == sequence) {
            tracing::debug!(sequence, ?outcome, "ignoring stale reconnection outcome");
            return;
        }
        slot.take();

        let notification = {
            let mut state = self.state.lock();
            match outcome {
                ReconnectOutcome::Restored { latency, .. } => {
                    state.record_success(latency, Utc::now());
                    Some(Notification::Restored)
                }
                ReconnectOutcome::GaveUp { attempts } => {
                    state.reconnecting = false;
                    Some(Notification::ReconnectFailed { attempts })
                }
                ReconnectOutcome::Cancelled { .. } | ReconnectOutcome::AlreadyActive => {
                    state.reconnecting = false;
                    None
                }
            }
        };
        drop(slot);

        if matches!(notification, Some(Notification::Restored)) {
            self.policy_warned.store(false, Ordering::SeqCst);
        }
        if let Some(notification) = notification {
            self.notifier.notify(notification);
        }
    }

    fn log_probe(&self, report: &ProbeReport, silent: bool) {
        let latency_ms = report.response_time.map(|latency| latency.as_millis() as u64);
        let error_kind = report.error_kind().map(|kind| kind.label());
        if self.dev_mode.is_enabled() {
            tracing::info!(
                is_connected = report.is_connected,
                ?latency_ms,
                ?error_kind,
                silent,
                "connection probe completed"
            );
        } else {
            tracing::debug!(
                is_connected = report.is_connected,
                ?latency_ms,
                ?error_kind,
                silent,
                "connection probe completed"
            );
        }
    }
}

/// Reconnection attempts probe directly, skipping the cache and the failure
/// counters.
struct ForcedProbe<'a> {
    monitor: &'a ConnectionMonitor,
}

#[async_trait]
impl ReconnectTarget for ForcedProbe<'_> {
    async fn try_reconnect(&self, attempt: u32) -> Result<Duration> {
        let monitor = self.monitor;
        let report = run_probe(
            monitor.store.as_ref(),
            &monitor.config.probe_query,
            &monitor.config.probe_options(true),
        )
        .await;
        monitor.cache.record_report(&report);
        monitor.log_probe(&report, true);

        if let Some(err) = &report.error {
            let mut state = monitor.state.lock();
            state.is_connected = false;
            state.connection_error = Some(err.to_string());
            tracing::trace!(attempt, "reconnection probe failed");
        }
        report.into_result()
    }
}

/// Releases the in-flight flag when a visible check finishes or is dropped.
///
/// A check dropped before its probe settled leaves nothing in flight, so the
/// checking mark is cleared as well.
struct CheckingGuard<'a> {
    monitor: &'a ConnectionMonitor,
    owns_flag: bool,
    settled: bool,
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.monitor.state.lock().is_checking = false;
            tracing::debug!("connection check dropped before completing");
        }
        if self.owns_flag {
            self.monitor.check_in_flight.store(false, Ordering::SeqCst);
        }
    }
}

/// Owner of the background check task
pub struct MonitorHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the background loop and any reconnection it started.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "connection monitor task failed");
        }
    }
}
