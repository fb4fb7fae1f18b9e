//! Error types for the portal connection layer

use thiserror::Error;

/// Core error type for portal backend operations
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The in-flight request observed its cancellation token.
    #[error("Cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(String),

    /// The backing store answered, but rejected the request.
    #[error("Backend error: {message}")]
    Backend {
        /// HTTP status, when the request reached the backend
        status: Option<u16>,
        /// Structured error code reported by the backend (e.g. `42501`)
        code: Option<String>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PortalError {
    /// Create a backend error carrying only a message.
    pub fn backend(message: impl Into<String>) -> Self {
        PortalError::Backend {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Whether this error was produced by a cancelled request rather than a
    /// failed one.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PortalError::Cancelled)
    }

    /// Structured backend error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            PortalError::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a backend rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortalError::Backend { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display_uses_message() {
        let err = PortalError::Backend {
            status: Some(500),
            code: Some("42P17".into()),
            message: "infinite recursion detected in policy for relation \"users\"".into(),
        };
        assert_eq!(
            err.to_string(),
            "Backend error: infinite recursion detected in policy for relation \"users\""
        );
        assert_eq!(err.code(), Some("42P17"));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_cancellation_is_distinct() {
        assert!(PortalError::Cancelled.is_cancellation());
        assert!(!PortalError::Timeout("10000ms".into()).is_cancellation());
        assert!(!PortalError::Network("offline".into()).is_cancellation());
    }

    #[test]
    fn test_backend_helper_has_no_code() {
        let err = PortalError::backend("boom");
        assert_eq!(err.code(), None);
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Backend error: boom");
    }
}
