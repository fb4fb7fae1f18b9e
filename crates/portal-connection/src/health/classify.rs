//! Classification of probe failures
//!
//! Structured backend codes are preferred. When the backend only hands back
//! free text, the message is matched against known substrings; the pattern
//! lists are backend-specific and need revisiting if the backend changes its
//! wording.

use portal_core::PortalError;
use serde::{Deserialize, Serialize};

/// User-facing category of a connection failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request did not complete before its deadline
    Timeout,
    /// DNS, offline, refused connection, CORS and similar transport failures
    Network,
    /// The backend refused the read on authorization grounds
    RlsPolicy,
    /// The backend's authorization policy itself failed by recursing
    Recursion,
    Unknown,
}

/// Postgres `infinite_recursion`
const RECURSION_CODE: &str = "42P17";
/// Postgres `insufficient_privilege`
const INSUFFICIENT_PRIVILEGE_CODE: &str = "42501";

const RECURSION_PATTERNS: &[&str] = &[
    "infinite recursion",
    "recursion detected",
    "recursive policy",
];

const RLS_PATTERNS: &[&str] = &[
    "row-level security",
    "row level security",
    "permission denied",
    "not authorized",
    "unauthorized",
    "violates",
    "jwt",
];

const TIMEOUT_PATTERNS: &[&str] = &["timed out", "timeout", "aborted", "deadline"];

const NETWORK_PATTERNS: &[&str] = &[
    "failed to fetch",
    "network",
    "connection refused",
    "connection reset",
    "connection closed",
    "error sending request",
    "dns",
    "cors",
    "offline",
    "unreachable",
];

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::RlsPolicy => "rls_policy",
            ErrorKind::Recursion => "recursion",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Short explanation suitable for a toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "The server took too long to respond.",
            ErrorKind::Network => "Unable to reach the server. Check your internet connection.",
            ErrorKind::RlsPolicy => "The server rejected the request because of its access policies.",
            ErrorKind::Recursion => {
                "The server's access policies appear to be misconfigured (policy recursion)."
            }
            ErrorKind::Unknown => "Unable to connect to the database.",
        }
    }

    /// Whether the failure points at backend authorization rather than reachability.
    pub fn is_policy_related(&self) -> bool {
        matches!(self, ErrorKind::RlsPolicy | ErrorKind::Recursion)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a probe failure.
pub fn classify(error: &PortalError) -> ErrorKind {
    match error {
        PortalError::Timeout(_) | PortalError::Cancelled => ErrorKind::Timeout,
        PortalError::Network(_) => ErrorKind::Network,
        PortalError::Backend {
            status,
            code,
            message,
        } => {
            match code.as_deref() {
                Some(RECURSION_CODE) => return ErrorKind::Recursion,
                Some(INSUFFICIENT_PRIVILEGE_CODE) => return ErrorKind::RlsPolicy,
                _ => {}
            }
            match classify_message(message) {
                ErrorKind::Unknown if matches!(status, Some(401 | 403)) => ErrorKind::RlsPolicy,
                kind => kind,
            }
        }
        other => classify_message(&other.to_string()),
    }
}

/// Classify free text by substring. Recursion is checked before the generic
/// policy patterns because recursion messages also mention the policy.
pub fn classify_message(message: &str) -> ErrorKind {
    let message = message.to_lowercase();
    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));

    if matches_any(RECURSION_PATTERNS) {
        ErrorKind::Recursion
    } else if matches_any(RLS_PATTERNS) {
        ErrorKind::RlsPolicy
    } else if matches_any(TIMEOUT_PATTERNS) {
        ErrorKind::Timeout
    } else if matches_any(NETWORK_PATTERNS) {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}
