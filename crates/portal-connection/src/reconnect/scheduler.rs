//! Reconnection scheduler
//!
//! Drives `Idle -> Scheduled -> Probing -> {Restored | Scheduled | GaveUp}`
//! with capped exponential delays between forced probes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_core::Result;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::BackoffStrategy;

/// Configuration for a reconnection sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Total probe attempts before giving up
    max_attempts: u32,
    /// Delay policy between attempts
    backoff: BackoffStrategy,
}

impl ReconnectConfig {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }
}

impl Default for ReconnectConfig {
    /// 5 attempts, 2s doubling up to 30s
    fn default() -> Self {
        Self::new(5, BackoffStrategy::default())
    }
}

/// Something that can be probed directly, bypassing any cache.
#[async_trait]
pub trait ReconnectTarget: Send + Sync {
    /// Perform a real round trip and return its latency.
    async fn try_reconnect(&self, attempt: u32) -> Result<Duration>;
}

/// Where the scheduler currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    Idle,
    /// Waiting `delay` before the one-based `attempt`
    Scheduled { attempt: u32, delay: Duration },
    Probing { attempt: u32 },
    Restored,
    GaveUp,
}

impl ReconnectPhase {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ReconnectPhase::Scheduled { .. } | ReconnectPhase::Probing { .. }
        )
    }
}

/// Reconnection event for monitoring
#[derive(Debug, Clone)]
pub enum ReconnectEvent {
    /// An attempt was scheduled after `delay`
    Scheduled { attempt: u32, delay: Duration },
    /// A reconnection attempt is starting
    Attempting { attempt: u32, max_attempts: u32 },
    /// A reconnection attempt succeeded
    Succeeded { attempts_taken: u32, latency: Duration },
    /// A reconnection attempt failed
    Failed { attempt: u32, error: String },
    /// All reconnection attempts exhausted
    Exhausted { total_attempts: u32 },
}

/// How a sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    Restored { attempts: u32, latency: Duration },
    GaveUp { attempts: u32 },
    /// Stopped from outside, typically because another check already restored
    /// the connection
    Cancelled { attempts: u32 },
    /// A sequence was already running on this scheduler
    AlreadyActive,
}

/// Runs at most one reconnection sequence at a time.
pub struct ReconnectScheduler {
    config: ReconnectConfig,
    phase: Mutex<ReconnectPhase>,
    running: AtomicBool,
    events: broadcast::Sender<ReconnectEvent>,
}

impl ReconnectScheduler {
    pub fn new(config: ReconnectConfig) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            config,
            phase: Mutex::new(ReconnectPhase::Idle),
            running: AtomicBool::new(false),
            events,
        }
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    pub fn phase(&self) -> ReconnectPhase {
        *self.phase.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribe to events of subsequent sequences.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconnectEvent> {
        self.events.subscribe()
    }

    /// Run one reconnection sequence to completion.
    ///
    /// Waits `backoff(n)` before each attempt `n` and stops at the first
    /// success, after `max_attempts` failures, or when `cancel` fires.
    pub async fn run(
        &self,
        target: &dyn ReconnectTarget,
        cancel: &CancellationToken,
    ) -> ReconnectOutcome {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("reconnection already in progress");
            return ReconnectOutcome::AlreadyActive;
        }

        let _running = RunningGuard(&self.running);
        self.run_sequence(target, cancel).await
    }

    async fn run_sequence(
        &self,
        target: &dyn ReconnectTarget,
        cancel: &CancellationToken,
    ) -> ReconnectOutcome {
        let max_attempts = self.config.max_attempts();

        for retry in 0..max_attempts {
            let attempt = retry + 1;
            let delay = self.config.backoff().calculate_delay(retry);
            self.set_phase(ReconnectPhase::Scheduled { attempt, delay });
            self.emit(ReconnectEvent::Scheduled { attempt, delay });

            tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(retry),
                _ = tokio::time::sleep(delay) => {}
            }

            self.set_phase(ReconnectPhase::Probing { attempt });
            self.emit(ReconnectEvent::Attempting {
                attempt,
                max_attempts,
            });

            let result = tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(attempt),
                result = target.try_reconnect(attempt) => result,
            };

            match result {
                Ok(latency) => {
                    self.set_phase(ReconnectPhase::Restored);
                    self.emit(ReconnectEvent::Succeeded {
                        attempts_taken: attempt,
                        latency,
                    });
                    return ReconnectOutcome::Restored {
                        attempts: attempt,
                        latency,
                    };
                }
                Err(err) => {
                    self.emit(ReconnectEvent::Failed {
                        attempt,
                        error: err.to_string(),
                    });
                }
            }
        }

        self.set_phase(ReconnectPhase::GaveUp);
        self.emit(ReconnectEvent::Exhausted {
            total_attempts: max_attempts,
        });
        ReconnectOutcome::GaveUp {
            attempts: max_attempts,
        }
    }

    fn cancelled(&self, attempts: u32) -> ReconnectOutcome {
        self.set_phase(ReconnectPhase::Idle);
        tracing::debug!(attempts, "reconnection cancelled");
        ReconnectOutcome::Cancelled { attempts }
    }

    fn set_phase(&self, phase: ReconnectPhase) {
        *self.phase.lock() = phase;
    }

    fn emit(&self, event: ReconnectEvent) {
        match &event {
            ReconnectEvent::Scheduled { attempt, delay } => tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnection attempt scheduled"
            ),
            ReconnectEvent::Attempting {
                attempt,
                max_attempts,
            } => tracing::debug!(attempt, max_attempts, "attempting reconnection"),
            ReconnectEvent::Succeeded {
                attempts_taken,
                latency,
            } => tracing::info!(
                attempts_taken,
                latency_ms = latency.as_millis() as u64,
                "reconnection succeeded"
            ),
            ReconnectEvent::Failed { attempt, error } => {
                tracing::warn!(attempt, error = %error, "reconnection attempt failed")
            }
            ReconnectEvent::Exhausted { total_attempts } => {
                tracing::error!(total_attempts, "reconnection attempts exhausted")
            }
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Clears the running flag even if the sequence future is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for ReconnectScheduler {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}
