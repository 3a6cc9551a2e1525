//! Failure descriptors attached to degraded snapshots.

use alloc::string::String;
use core::fmt;

/// Category of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureKind {
    /// The endpoint could not be reached.
    Network,
    /// The request did not complete in time.
    Timeout,
    /// The endpoint answered with a non-success status.
    Status,
    /// The response body could not be decoded.
    Malformed,
    /// The bearer token was missing, expired or rejected.
    Unauthorized,
}

impl FailureKind {
    /// Whether the failure calls for re-authentication rather than a retry.
    pub fn is_auth(&self) -> bool {
        matches!(self, FailureKind::Unauthorized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::Status => "status",
            FailureKind::Malformed => "malformed",
            FailureKind::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a snapshot is not live.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_includes_kind_and_message() {
        let failure = FetchFailure::new(FailureKind::Status, "API returned status 503");
        assert_eq!(failure.to_string(), "status: API returned status 503");
    }

    #[test]
    fn only_unauthorized_is_auth() {
        assert!(FailureKind::Unauthorized.is_auth());
        assert!(!FailureKind::Network.is_auth());
        assert!(!FailureKind::Malformed.is_auth());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::Unauthorized).unwrap();
        assert_eq!(json, "\"unauthorized\"");
    }
}
