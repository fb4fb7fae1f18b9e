//! Scripted backing store for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_core::{DataStore, PortalError, ProbeQuery, Result};
use tokio_util::sync::CancellationToken;

/// What the next probe read does
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Succeed after the given latency
    Succeed(Duration),
    /// Fail with a network error
    Fail(String),
    /// Fail with a structured backend rejection
    Reject {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// Never settle until cancelled
    Hang,
}

impl Step {
    pub(crate) fn ok_ms(ms: u64) -> Self {
        Step::Succeed(Duration::from_millis(ms))
    }

    pub(crate) fn fail() -> Self {
        Step::Fail("connection refused".into())
    }
}

pub(crate) struct ScriptedStore {
    steps: Mutex<VecDeque<Step>>,
    fallback: Mutex<Step>,
    calls: AtomicU32,
}

impl ScriptedStore {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback: Mutex::new(fallback),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn always(step: Step) -> Self {
        Self::new([], step)
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_fallback(&self, step: Step) {
        *self.fallback.lock() = step;
    }
}

#[async_trait]
impl DataStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn select_single(&self, _query: &ProbeQuery, cancel: &CancellationToken) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let next = self.steps.lock().pop_front();
            next.unwrap_or_else(|| self.fallback.lock().clone())
        };

        match step {
            Step::Succeed(latency) => {
                tokio::time::sleep(latency).await;
                Ok(())
            }
            Step::Fail(message) => Err(PortalError::Network(message)),
            Step::Reject {
                status,
                code,
                message,
            } => Err(PortalError::Backend {
                status: Some(status),
                code,
                message,
            }),
            Step::Hang => {
                cancel.cancelled().await;
                Err(PortalError::Cancelled)
            }
        }
    }
}
