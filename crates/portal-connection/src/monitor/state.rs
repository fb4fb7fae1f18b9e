//! Observable connection state

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::health::CachedProbe;

/// Connection status as seen by the rest of the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    /// A user-visible check is running (or none has completed yet)
    pub is_checking: bool,
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(rename = "response_time_ms", with = "duration_ms", default)]
    pub response_time: Option<Duration>,
    /// A reconnection sequence is active
    pub reconnecting: bool,
    pub connection_error: Option<String>,
    pub consecutive_errors: u32,
}

impl Default for ConnectionState {
    /// Disconnected and checking until the first probe completes.
    fn default() -> Self {
        Self {
            is_connected: false,
            is_checking: true,
            last_checked: None,
            response_time: None,
            reconnecting: false,
            connection_error: None,
            consecutive_errors: 0,
        }
    }
}

impl ConnectionState {
    /// Apply a successful probe.
    ///
    /// Returns whether a reconnection sequence was active.
    pub fn record_success(&mut self, response_time: Duration, at: DateTime<Utc>) -> bool {
        let was_reconnecting = self.reconnecting;
        self.is_connected = true;
        self.is_checking = false;
        self.last_checked = Some(at);
        self.response_time = Some(response_time);
        self.reconnecting = false;
        self.connection_error = None;
        self.consecutive_errors = 0;
        was_reconnecting
    }

    /// Apply a failed probe and return the new failure streak length.
    pub fn record_failure(&mut self, message: impl Into<String>, at: DateTime<Utc>) -> u32 {
        self.is_connected = false;
        self.is_checking = false;
        self.last_checked = Some(at);
        self.connection_error = Some(message.into());
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_errors
    }

    /// Copy a cached outcome into the visible state without touching counters.
    pub fn apply_cached(&mut self, cached: &CachedProbe) {
        self.is_connected = cached.is_connected;
        self.is_checking = false;
        if cached.response_time.is_some() {
            self.response_time = cached.response_time;
        }
    }

    /// Short human-readable status line
    pub fn summary(&self) -> String {
        match (self.is_connected, self.reconnecting, &self.connection_error) {
            (true, _, _) => match self.response_time {
                Some(latency) => format!("connected ({} ms)", latency.as_millis()),
                None => "connected".to_string(),
            },
            (false, true, _) => "reconnecting".to_string(),
            (false, false, _) if self.is_checking => "checking".to_string(),
            (false, false, Some(error)) => format!(
                "disconnected after {} failed check(s): {error}",
                self.consecutive_errors
            ),
            (false, false, None) => "disconnected".to_string(),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
