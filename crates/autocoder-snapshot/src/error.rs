//! Error types for remote repository access

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a [`RemoteRepository`](crate::RemoteRepository) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The platform answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request did not complete within the configured timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection or protocol failure before a response was received
    #[error("transport error: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Shorthand for a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Status {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(404, message)
    }

    /// Classify this error into the reporting taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            RemoteError::Status { status: 404, .. } => ErrorClass::NotFound,
            RemoteError::Status {
                status: 403 | 429, ..
            } => ErrorClass::Forbidden,
            RemoteError::Status { status: 401, .. } => ErrorClass::Unauthorized,
            RemoteError::Status { message, .. } => ErrorClass::Other(message.clone()),
            other => ErrorClass::Other(other.to_string()),
        }
    }
}

/// Classification of a transport failure.
///
/// `Forbidden` covers both permission denials and rate limiting; the platform
/// reports both as 403 (secondary limits use 429).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", content = "message", rename_all = "snake_case")]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    Unauthorized,
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(RemoteError::not_found("Not Found").class(), ErrorClass::NotFound);
        assert_eq!(
            RemoteError::status(403, "API rate limit exceeded").class(),
            ErrorClass::Forbidden
        );
        assert_eq!(
            RemoteError::status(429, "secondary rate limit").class(),
            ErrorClass::Forbidden
        );
        assert_eq!(
            RemoteError::status(401, "Bad credentials").class(),
            ErrorClass::Unauthorized
        );
        assert_eq!(
            RemoteError::status(500, "Server Error").class(),
            ErrorClass::Other("Server Error".to_string())
        );
    }

    #[test]
    fn test_timeout_is_other() {
        let err = RemoteError::Timeout("GET /repos/a/b".to_string());
        match err.class() {
            ErrorClass::Other(msg) => assert!(msg.contains("timed out")),
            other => panic!("unexpected class {other:?}"),
        }
    }
}
