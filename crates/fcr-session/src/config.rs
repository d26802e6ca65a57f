//! Session timing configuration

use serde::{Deserialize, Serialize};

/// Poll intervals at or below this value are rejected (ms)
pub const MIN_POLL_INTERVAL_MS: u64 = 200;

/// Timing settings for one monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Dataframe poll period while connected (ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Heartbeat period while paused (ms)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// How long a momentary actuator test stays on (ms)
    #[serde(default = "default_actuator_pulse")]
    pub actuator_pulse_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            actuator_pulse_ms: default_actuator_pulse(),
        }
    }
}

impl SessionConfig {
    /// Whether `ms` is an acceptable dataframe poll period
    pub fn is_valid_poll_interval(ms: u64) -> bool {
        ms > MIN_POLL_INTERVAL_MS
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_heartbeat_interval() -> u64 {
    2000
}

fn default_actuator_pulse() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.heartbeat_interval_ms, 2000);
        assert_eq!(config.actuator_pulse_ms, 2000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"poll_interval_ms": 500}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.heartbeat_interval_ms, 2000);
    }

    #[test]
    fn test_poll_interval_floor() {
        assert!(!SessionConfig::is_valid_poll_interval(0));
        assert!(!SessionConfig::is_valid_poll_interval(200));
        assert!(SessionConfig::is_valid_poll_interval(201));
    }
}
