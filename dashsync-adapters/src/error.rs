//! Error types for fetchers.

use dashsync_types::{FailureKind, FetchFailure};
use thiserror::Error;

/// Errors that can occur when fetching dashboard statistics.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Endpoint answered with a non-success status.
    #[error("API returned status {status}")]
    Status { status: u16 },

    /// HTTP request failed for a reason other than connect or timeout.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Token missing, expired or rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Source misconfigured (bad base URL, client construction).
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Classify this error for snapshot metadata.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Status { .. } => FailureKind::Status,
            FetchError::Http(_) | FetchError::Connection(_) | FetchError::Config(_) => {
                FailureKind::Network
            }
            FetchError::Parse(_) => FailureKind::Malformed,
            FetchError::Auth(_) => FailureKind::Unauthorized,
            FetchError::Timeout => FailureKind::Timeout,
        }
    }

    /// Whether the caller should re-authenticate.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }

    /// Serializable descriptor attached to degraded snapshots.
    pub fn to_failure(&self) -> FetchFailure {
        FetchFailure::new(self.kind(), self.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}
