//! Session modes and the per-session state snapshot

use chrono::{DateTime, Utc};
use fcr_core::ReplayProgress;
use serde::{Deserialize, Serialize};

/// Lifecycle mode of the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Disconnected,
    Connecting,
    ConnectedLive,
    ConnectedReplay,
    PausedLive,
    PausedReplay,
}

impl SessionMode {
    /// Live, replay and paused sessions accept commands; connecting does not
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionMode::ConnectedLive
                | SessionMode::ConnectedReplay
                | SessionMode::PausedLive
                | SessionMode::PausedReplay
        )
    }

    /// Whether dataframes are being polled
    pub fn is_polling(&self) -> bool {
        matches!(self, SessionMode::ConnectedLive | SessionMode::ConnectedReplay)
    }

    /// Mode reached by `pause()`, if any
    pub fn paused(&self) -> Option<SessionMode> {
        match self {
            SessionMode::ConnectedLive => Some(SessionMode::PausedLive),
            SessionMode::ConnectedReplay => Some(SessionMode::PausedReplay),
            _ => None,
        }
    }

    /// Mode reached by `resume()`, if any
    pub fn resumed(&self) -> Option<SessionMode> {
        match self {
            SessionMode::PausedLive => Some(SessionMode::ConnectedLive),
            SessionMode::PausedReplay => Some(SessionMode::ConnectedReplay),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionMode::Disconnected => "disconnected",
            SessionMode::Connecting => "connecting",
            SessionMode::ConnectedLive => "connected",
            SessionMode::ConnectedReplay => "replaying",
            SessionMode::PausedLive => "paused",
            SessionMode::PausedReplay => "paused (replay)",
        };
        f.write_str(s)
    }
}

/// Snapshot of the active session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: SessionMode,
    /// Serial port, or scenario name when replaying
    pub port: String,
    pub is_emulated: bool,
    pub last_ecu_id: Option<String>,
    /// Last known IAC position, from a dataframe or a confirmed adjustment
    pub iac_position: Option<f64>,
    /// True only while paused
    pub heartbeat_active: bool,
    pub replay: ReplayProgress,
    /// Last heartbeat seen on the server event stream
    pub server_heartbeat_at: Option<DateTime<Utc>>,
    /// Incremented on every connect and disconnect
    pub generation: u64,
}

impl SessionState {
    /// Clear everything belonging to the ended session
    pub(crate) fn reset(&mut self) {
        let generation = self.generation;
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_modes() {
        assert!(!SessionMode::Disconnected.is_connected());
        assert!(!SessionMode::Connecting.is_connected());
        assert!(SessionMode::ConnectedLive.is_connected());
        assert!(SessionMode::PausedReplay.is_connected());
        assert!(SessionMode::ConnectedReplay.is_polling());
        assert!(!SessionMode::PausedLive.is_polling());
    }

    #[test]
    fn test_pause_resume_pairs() {
        assert_eq!(
            SessionMode::ConnectedReplay.paused(),
            Some(SessionMode::PausedReplay)
        );
        assert_eq!(
            SessionMode::PausedLive.resumed(),
            Some(SessionMode::ConnectedLive)
        );
        assert_eq!(SessionMode::Connecting.paused(), None);
        assert_eq!(SessionMode::ConnectedLive.resumed(), None);
    }

    #[test]
    fn test_reset_keeps_generation() {
        let mut state = SessionState {
            mode: SessionMode::PausedLive,
            port: "COM3".into(),
            heartbeat_active: true,
            generation: 3,
            ..Default::default()
        };
        state.reset();
        assert_eq!(state.generation, 3);
        assert_eq!(state.mode, SessionMode::Disconnected);
        assert!(!state.heartbeat_active);
        assert!(state.port.is_empty());
    }
}
