//! PostgREST-backed data store

use async_trait::async_trait;
use portal_core::{BackendSettings, DataStore, PortalError, ProbeQuery, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

#[cfg(test)]
mod tests;

/// Path of the REST interface below the project URL
const REST_PATH: &str = "rest/v1/";

/// Backing store reached over the hosted backend's REST interface.
///
/// Requests carry no client-side deadline of their own; callers bound them
/// through the cancellation token.
pub struct RestStore {
    client: Client,
    base_url: Url,
    anon_key: String,
}

impl RestStore {
    /// Create a store for the project at `base_url`.
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(PortalError::Configuration("anon key is empty".into()));
        }

        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .user_agent(concat!("portal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PortalError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            anon_key,
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> Result<Self> {
        Self::new(&settings.url, settings.anon_key.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the one-row read issued for `query`.
    pub fn probe_url(&self, query: &ProbeQuery) -> Result<Url> {
        validate_identifier("table", &query.table)?;
        validate_identifier("column", &query.column)?;

        let mut url = self
            .base_url
            .join(REST_PATH)
            .and_then(|rest| rest.join(&query.table))
            .map_err(|e| PortalError::Configuration(format!("Invalid probe URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("select", &query.column)
            .append_pair("limit", "1");
        Ok(url)
    }
}

#[async_trait]
impl DataStore for RestStore {
    fn name(&self) -> &str {
        self.base_url.host_str().unwrap_or("rest")
    }

    async fn select_single(&self, query: &ProbeQuery, cancel: &CancellationToken) -> Result<()> {
        let url = self.probe_url(query)?;
        tracing::trace!(url = %url, "sending probe request");

        let request = self
            .client
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Accept", "application/json")
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PortalError::Cancelled),
            response = request => response.map_err(transport_error)?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PortalError::Cancelled),
            body = response.text() => body.unwrap_or_default(),
        };
        Err(backend_error(status, &body))
    }
}

/// Error body returned by PostgREST
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Map a non-success response into a backend error.
///
/// Structured PostgREST bodies keep their `code`; anything else is reported
/// by its raw text or the status reason.
pub fn backend_error(status: StatusCode, body: &str) -> PortalError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let mut message = match parsed.message {
        Some(message) if !message.is_empty() => message,
        _ if !body.trim().is_empty() && parsed.code.is_none() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    };
    if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
        message = format!("{} ({})", message, details);
    }
    if let Some(hint) = parsed.hint.filter(|h| !h.is_empty()) {
        tracing::debug!(hint = %hint, "backend error hint");
    }

    PortalError::Backend {
        status: Some(status.as_u16()),
        code: parsed.code,
        message,
    }
}

/// Map a failed request (no response) into a portal error.
pub fn transport_error(err: reqwest::Error) -> PortalError {
    if err.is_timeout() {
        PortalError::Timeout(err.to_string())
    } else if err.is_builder() {
        PortalError::Configuration(err.to_string())
    } else {
        PortalError::Network(err.to_string())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PortalError::Configuration("backend URL is empty".into()));
    }

    let mut url = Url::parse(raw)
        .map_err(|e| PortalError::Configuration(format!("Invalid backend URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PortalError::Configuration(format!(
            "Unsupported backend URL scheme '{}'",
            url.scheme()
        )));
    }

    // Relative joins need a trailing slash to keep the last path segment
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn validate_identifier(what: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(PortalError::Configuration(format!(
            "Invalid probe {} '{}'",
            what, value
        )))
    }
}
