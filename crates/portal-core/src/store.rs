//! Backing store trait used for liveness probing

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shape of the minimal read used to prove the backing store is reachable.
///
/// Always a one-row, one-column select; nothing else is issued through this
/// seam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeQuery {
    /// Table (or view) to read from
    pub table: String,
    /// Single column to select
    pub column: String,
}

impl ProbeQuery {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl Default for ProbeQuery {
    fn default() -> Self {
        Self::new("settings", "id")
    }
}

/// A hosted backing store that can answer a probe read
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Human-readable name of the store, used in logs
    fn name(&self) -> &str;

    /// Select a single column of at most one row.
    ///
    /// Implementations must return [`crate::PortalError::Cancelled`] when
    /// `cancel` fires before the read settles.
    async fn select_single(&self, query: &ProbeQuery, cancel: &CancellationToken) -> Result<()>;
}

#[async_trait]
impl<T: DataStore + ?Sized> DataStore for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn select_single(&self, query: &ProbeQuery, cancel: &CancellationToken) -> Result<()> {
        (**self).select_single(query, cancel).await
    }
}
