//! Configuration for the backend connection and the connection monitor
//!
//! Loaded from `connection.toml` in the portal config directory. Every key is
//! optional; a missing file yields the defaults.
//!
//! ```toml
//! [backend]
//! url = "https://project.example.co"
//! anon_key = "public-anon-key"
//! probe_table = "settings"
//! probe_column = "id"
//!
//! [monitor]
//! check_interval_ms = 60000
//! cache_ttl_ms = 5000
//! dev_mode = false
//! ```

use crate::{PortalError, ProbeQuery, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

#[cfg(test)]
mod tests;

pub const CONFIG_FILE_NAME: &str = "connection.toml";

pub const ENV_BACKEND_URL: &str = "PORTAL_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "PORTAL_ANON_KEY";
pub const ENV_DEV_MODE: &str = "PORTAL_DEV_MODE";

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub backend: BackendSettings,
    pub monitor: MonitorSettings,
}

/// Where the hosted backend lives and what to read when probing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Project base URL, without the `/rest/v1` suffix
    pub url: String,
    /// Public (anonymous) API key sent with every request
    pub anon_key: String,
    pub probe_table: String,
    pub probe_column: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        let query = ProbeQuery::default();
        Self {
            url: String::new(),
            anon_key: String::new(),
            probe_table: query.table,
            probe_column: query.column,
        }
    }
}

impl BackendSettings {
    pub fn probe_query(&self) -> ProbeQuery {
        ProbeQuery::new(&self.probe_table, &self.probe_column)
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

/// Timing and escalation policy of the connection monitor, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub check_interval_ms: u64,
    pub cache_ttl_ms: u64,
    pub probe_timeout_ms: u64,
    pub probe_retries: u32,
    pub probe_retry_delay_ms: u64,
    pub policy_warning_threshold: u32,
    pub reconnect_initial_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub reconnect_max_attempts: u32,
    pub dev_mode: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval_ms: 60_000,
            cache_ttl_ms: 5_000,
            probe_timeout_ms: 20_000,
            probe_retries: 1,
            probe_retry_delay_ms: 1_000,
            policy_warning_threshold: 3,
            reconnect_initial_delay_ms: 2_000,
            reconnect_max_delay_ms: 30_000,
            reconnect_max_attempts: 5,
            dev_mode: false,
        }
    }
}

impl PortalConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("portal").join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                PortalError::Configuration("Could not determine config directory".into())
            })
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PortalError::Configuration(e.to_string()))
    }

    /// Load a configuration file, falling back to defaults when it does not exist.
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("config file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            backend_configured = config.backend.is_configured(),
            "loaded config file"
        );
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text =
            toml::to_string_pretty(self).map_err(|e| PortalError::Configuration(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Apply `PORTAL_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = lookup(ENV_ANON_KEY) {
            self.backend.anon_key = key;
        }
        if let Some(flag) = lookup(ENV_DEV_MODE) {
            self.monitor.dev_mode = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Reject configurations the connection layer cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if url.is_empty() {
            return Err(PortalError::Configuration("backend.url is not set".into()));
        }
        let parsed = Url::parse(url).map_err(|e| {
            PortalError::Configuration(format!("backend.url {url:?} is not a valid URL: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PortalError::Configuration(format!(
                "backend.url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(PortalError::Configuration(
                "backend.anon_key is not set".into(),
            ));
        }
        if self.backend.probe_table.is_empty() || self.backend.probe_column.is_empty() {
            return Err(PortalError::Configuration(
                "probe table and column must not be empty".into(),
            ));
        }

        let monitor = &self.monitor;
        if monitor.check_interval_ms == 0 || monitor.probe_timeout_ms == 0 {
            return Err(PortalError::Configuration(
                "monitor intervals must be greater than zero".into(),
            ));
        }
        if monitor.reconnect_max_attempts == 0 {
            return Err(PortalError::Configuration(
                "monitor.reconnect_max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
