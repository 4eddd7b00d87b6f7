//! Unified error types for the Ouroboros client

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for all client operations
#[derive(Error, Debug)]
pub enum OoError {
    // Dispatch errors
    /// No HTTP response was received, even after retrying
    #[error("Network error: {message}")]
    Network { message: String, attempts: u32 },

    /// The server answered with a status code of 400 or above
    #[error("API Error [{status}]: {message}")]
    Application {
        status: u16,
        message: String,
        details: Value,
    },

    /// The server answered 2xx but the body was not JSON
    #[error("Malformed response [{status}]: {message}")]
    MalformedResponse { status: u16, message: String },

    /// The server answered 2xx with `"success": false`
    #[error("Request rejected: {message}")]
    Rejected { message: String, details: Value },

    // Polling errors
    #[error("Execution timeout after {} seconds", max_wait.as_secs())]
    Timeout {
        operation_id: String,
        max_wait: Duration,
    },

    #[error("Execution failed: {reason}")]
    OperationFailed { operation_id: String, reason: String },

    #[error("Execution was cancelled")]
    OperationCancelled { operation_id: String },

    #[error("Interrupted: {0}")]
    Interrupted(String),

    // Caller errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of an `OoError`, used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Application,
    MalformedResponse,
    Rejected,
    Timeout,
    OperationFailed,
    OperationCancelled,
    Interrupted,
    InvalidInput,
    Config,
    Io,
    Serialization,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Application => "ApplicationError",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::Rejected => "Rejected",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::OperationFailed => "OperationFailed",
            ErrorKind::OperationCancelled => "OperationCancelled",
            ErrorKind::Interrupted => "Interrupted",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
            ErrorKind::Serialization => "SerializationError",
        };
        write!(f, "{}", name)
    }
}

impl OoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OoError::Network { .. } => ErrorKind::Network,
            OoError::Application { .. } => ErrorKind::Application,
            OoError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            OoError::Rejected { .. } => ErrorKind::Rejected,
            OoError::Timeout { .. } => ErrorKind::Timeout,
            OoError::OperationFailed { .. } => ErrorKind::OperationFailed,
            OoError::OperationCancelled { .. } => ErrorKind::OperationCancelled,
            OoError::Interrupted(_) => ErrorKind::Interrupted,
            OoError::InvalidInput(_) => ErrorKind::InvalidInput,
            OoError::Config(_) => ErrorKind::Config,
            OoError::Io(_) => ErrorKind::Io,
            OoError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// HTTP status code, when the failure came with a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            OoError::Application { status, .. } | OoError::MalformedResponse { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Structured body the server returned alongside the failure
    pub fn details(&self) -> Option<&Value> {
        match self {
            OoError::Application { details, .. } | OoError::Rejected { details, .. } => {
                Some(details)
            }
            _ => None,
        }
    }

    /// True for a 404 from the server
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Result type alias using OoError
pub type Result<T> = std::result::Result<T, OoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_application_error_display() {
        let err = OoError::Application {
            status: 404,
            message: "Workflow not found".to_string(),
            details: json!({}),
        };
        assert_eq!(err.to_string(), "API Error [404]: Workflow not found");
        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(err.status_code(), Some(404));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = OoError::Network {
            message: "connection refused".to_string(),
            attempts: 4,
        };
        assert_eq!(err.status_code(), None);
        assert!(err.details().is_none());
        assert_eq!(err.kind().to_string(), "NetworkError");
    }

    #[test]
    fn test_timeout_display_uses_seconds() {
        let err = OoError::Timeout {
            operation_id: "exec-1".to_string(),
            max_wait: Duration::from_secs(3600),
        };
        assert_eq!(err.to_string(), "Execution timeout after 3600 seconds");
    }

    #[test]
    fn test_rejected_carries_details() {
        let err = OoError::Rejected {
            message: "bad".to_string(),
            details: json!({"success": false}),
        };
        assert_eq!(err.details(), Some(&json!({"success": false})));
        assert_eq!(err.status_code(), None);
    }
}
