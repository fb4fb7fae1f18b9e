//! Timeout and retry executor
//!
//! Runs an async operation under a per-attempt deadline. A timed-out attempt
//! has its cancellation token fired and is either retried after an
//! exponentially growing delay or reported as [`PortalError::Timeout`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use portal_core::{PortalError, Result};
use tokio_util::sync::CancellationToken;

/// Callback invoked with the zero-based attempt number that timed out
pub type TimeoutCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Callback invoked with a non-timeout failure and its attempt number
pub type ErrorCallback = Arc<dyn Fn(&PortalError, u32) + Send + Sync>;

/// Options for [`with_timeout`]
#[derive(Clone)]
pub struct TimeoutOptions {
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
    silent_retry: bool,
    on_timeout: Option<TimeoutCallback>,
    on_error: Option<ErrorCallback>,
}

impl TimeoutOptions {
    /// Create options with the given per-attempt deadline and no retries.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            retries: 0,
            retry_delay: Duration::from_millis(1000),
            silent_retry: false,
            on_timeout: None,
            on_error: None,
        }
    }

    /// Number of retries after the first attempt (total attempts = retries + 1).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Base delay; retry `k` waits `retry_delay * 2^k`.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Log retries at debug level instead of warn.
    pub fn with_silent_retry(mut self, silent: bool) -> Self {
        self.silent_retry = silent;
        self
    }

    pub fn on_timeout(mut self, callback: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Arc::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl Fn(&PortalError, u32) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn silent_retry(&self) -> bool {
        self.silent_retry
    }

    fn notify_timeout(&self, attempt: u32) {
        if let Some(callback) = &self.on_timeout {
            callback(attempt);
        }
    }

    fn notify_error(&self, error: &PortalError, attempt: u32) {
        if let Some(callback) = &self.on_error {
            callback(error, attempt);
        }
    }
}

impl Default for TimeoutOptions {
    /// 10 second deadline, no retries, 1 second base retry delay
    fn default() -> Self {
        Self::new(Duration::from_millis(10_000))
    }
}

impl fmt::Debug for TimeoutOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutOptions")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("silent_retry", &self.silent_retry)
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Retry bookkeeping for a single [`with_timeout`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
    attempt: u32,
    max_retries: u32,
    retry_delay_base: Duration,
}

impl RetryContext {
    pub fn new(max_retries: u32, retry_delay_base: Duration) -> Self {
        Self {
            attempt: 0,
            max_retries,
            retry_delay_base,
        }
    }

    /// Zero-based number of the attempt currently running.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_retries
    }

    /// Delay waited after `attempt` fails: `retry_delay_base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.retry_delay_base.saturating_mul(factor)
    }

    /// Move to the next attempt, returning the delay to wait first, or `None`
    /// when every attempt has been used.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.has_remaining() {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

/// Run `operation` with a deadline per attempt and bounded retries.
///
/// Each attempt receives a fresh [`CancellationToken`]. When an attempt
/// overruns the deadline its token is cancelled; sibling attempts get their
/// own tokens and are unaffected. An operation that itself fails with
/// [`PortalError::Cancelled`] is counted as a timeout.
///
/// Exactly one of value or error comes back: the last error is returned once
/// all `retries + 1` attempts have failed.
pub async fn with_timeout<T, F, Fut>(mut operation: F, options: &TimeoutOptions) -> Result<T>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut context = RetryContext::new(options.retries, options.retry_delay);

    loop {
        let attempt = context.attempt();
        let cancel = CancellationToken::new();
        let outcome = tokio::time::timeout(options.timeout, operation(cancel.clone())).await;

        let error = match outcome {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(err)) if err.is_cancellation() => {
                options.notify_timeout(attempt);
                timeout_error(options.timeout)
            }
            Ok(Err(err)) => {
                options.notify_error(&err, attempt);
                err
            }
            Err(_elapsed) => {
                cancel.cancel();
                options.notify_timeout(attempt);
                timeout_error(options.timeout)
            }
        };

        match context.next_delay() {
            Some(delay) => {
                if options.silent_retry {
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying operation"
                    );
                } else {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "operation failed, retrying"
                    );
                }
                tokio::time::sleep(delay).await;
            }
            None => {
                if !options.silent_retry {
                    tracing::warn!(
                        attempts = context.total_attempts(),
                        error = %error,
                        "operation failed"
                    );
                }
                return Err(error);
            }
        }
    }
}

fn timeout_error(timeout: Duration) -> PortalError {
    PortalError::Timeout(format!(
        "operation did not complete within {}ms",
        timeout.as_millis()
    ))
}
