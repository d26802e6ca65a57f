//! Error types for FCR client operations

use fcr_core::BackendError;
use thiserror::Error;

/// Result type alias for FCR client operations
pub type Result<T> = std::result::Result<T, FcrClientError>;

/// Errors that can occur during FCR client operations
#[derive(Error, Debug)]
pub enum FcrClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl FcrClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }
}

impl From<FcrClientError> for BackendError {
    fn from(err: FcrClientError) -> Self {
        match err {
            FcrClientError::HttpError(e) if e.is_timeout() => BackendError::Timeout,
            FcrClientError::HttpError(e) if e.is_connect() => {
                BackendError::ConnectionFailed(e.to_string())
            }
            FcrClientError::HttpError(e) if e.is_decode() => BackendError::Parse(e.to_string()),
            FcrClientError::HttpError(e) => BackendError::Transport(e.to_string()),
            FcrClientError::InvalidUrl(e) => BackendError::Transport(e.to_string()),
            FcrClientError::IoError(e) => BackendError::Transport(e.to_string()),
            FcrClientError::ServerError { status, message } => BackendError::server(status, message),
            FcrClientError::ParseError(msg) => BackendError::Parse(msg),
            FcrClientError::Timeout => BackendError::Timeout,
            FcrClientError::ConnectionFailed(msg) => BackendError::ConnectionFailed(msg),
        }
    }
}
