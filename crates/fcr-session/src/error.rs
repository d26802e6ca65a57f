//! Session error types

use fcr_core::BackendError;
use thiserror::Error;

use crate::state::SessionMode;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the session controller
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connect request failed or the ECU did not initialise
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// A dataframe fetch or heartbeat failed; the session stays up
    #[error("Transient fetch error: {0}")]
    TransientFetch(#[source] BackendError),

    /// A command was issued without a connected session
    #[error("Command rejected: not connected")]
    CommandRejectedNotConnected,

    /// The backend rejected or failed a command
    #[error("Command failed: {0}")]
    CommandFailed(#[source] BackendError),

    /// The operation is not valid in the current mode
    #[error("Cannot {operation} while {from}")]
    InvalidTransition {
        from: SessionMode,
        operation: &'static str,
    },

    /// Poll interval at or below the floor
    #[error("Poll interval {requested_ms} ms is too short (must exceed {minimum_ms} ms)")]
    IntervalTooShort { requested_ms: u64, minimum_ms: u64 },

    /// The session ended before the response could be applied
    #[error("Session ended before the response arrived")]
    SessionEnded,
}

impl SessionError {
    pub(crate) fn invalid(from: SessionMode, operation: &'static str) -> Self {
        Self::InvalidTransition { from, operation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SessionError::invalid(SessionMode::Disconnected, "pause");
        assert_eq!(err.to_string(), "Cannot pause while disconnected");

        let err = SessionError::IntervalTooShort {
            requested_ms: 100,
            minimum_ms: 200,
        };
        assert!(err.to_string().contains("100 ms"));

        let err = SessionError::CommandFailed(BackendError::Timeout);
        assert_eq!(err.to_string(), "Command failed: Request timed out");
    }
}
