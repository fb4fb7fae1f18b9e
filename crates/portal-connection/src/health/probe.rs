//! Backend probe implementation
//!
//! Issues a single one-row, one-column read against the backing store and
//! measures how long it took.

use std::time::Duration;

use portal_core::{DataStore, PortalError, ProbeQuery, Result};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::classify::{ErrorKind, classify};
use crate::timeout::{TimeoutOptions, with_timeout};

/// Default deadline for a probe attempt.
///
/// Probes mostly run in the background, so they are slow to declare failure.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Outcome of a single probe
#[derive(Debug)]
pub struct ProbeReport {
    pub is_connected: bool,
    /// Round-trip time of the successful attempt
    pub response_time: Option<Duration>,
    pub error: Option<PortalError>,
}

impl ProbeReport {
    pub fn success(response_time: Duration) -> Self {
        Self {
            is_connected: true,
            response_time: Some(response_time),
            error: None,
        }
    }

    pub fn failure(error: PortalError) -> Self {
        Self {
            is_connected: false,
            response_time: None,
            error: Some(error),
        }
    }

    /// Category of the failure, if the probe failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(classify)
    }

    pub fn into_result(self) -> Result<Duration> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.response_time.unwrap_or_default()),
        }
    }
}

/// Default executor options for probes: 20s deadline, no retries.
pub fn probe_options() -> TimeoutOptions {
    TimeoutOptions::new(PROBE_TIMEOUT)
}

/// Perform one probe read and return its round-trip time.
pub async fn probe_store(
    store: &dyn DataStore,
    query: &ProbeQuery,
    cancel: &CancellationToken,
) -> Result<Duration> {
    let start = Instant::now();
    store.select_single(query, cancel).await?;
    Ok(start.elapsed())
}

/// Probe the store under the timeout executor.
///
/// Never fails: errors are reported inside the [`ProbeReport`].
#[tracing::instrument(skip_all, fields(store = store.name(), table = %query.table))]
pub async fn run_probe(
    store: &dyn DataStore,
    query: &ProbeQuery,
    options: &TimeoutOptions,
) -> ProbeReport {
    let outcome = with_timeout(
        move |cancel| async move { probe_store(store, query, &cancel).await },
        options,
    )
    .await;

    match outcome {
        Ok(latency) => {
            tracing::trace!(latency_ms = latency.as_millis() as u64, "probe succeeded");
            ProbeReport::success(latency)
        }
        Err(err) => {
            tracing::trace!(error = %err, "probe failed");
            ProbeReport::failure(err)
        }
    }
}
