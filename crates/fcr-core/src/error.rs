//! Common error types for telemetry backends

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur when talking to a telemetry backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport/communication error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend returned an error response
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl BackendError {
    /// Create a server error from status code and message
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::ConnectionFailed(_)
            | BackendError::Transport(_)
            | BackendError::Timeout => true,
            BackendError::Server { status, .. } => *status >= 500,
            BackendError::Parse(_) | BackendError::NotSupported(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = BackendError::server(503, "ECU busy");
        assert_eq!(err.to_string(), "Server error 503: ECU busy");
    }

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Timeout.is_transient());
        assert!(BackendError::server(502, "bad gateway").is_transient());
        assert!(!BackendError::server(404, "missing").is_transient());
        assert!(!BackendError::Parse("eof".into()).is_transient());
    }
}
