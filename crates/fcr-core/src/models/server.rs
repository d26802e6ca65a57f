//! Events pushed by the backend on its server event stream

use serde::{Deserialize, Serialize};

/// ECU link status announced by the backend
///
/// Every field is optional; a `status` event whose payload is not JSON is
/// kept verbatim in `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    #[serde(rename = "Connected", default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,

    #[serde(rename = "Initialised", default, skip_serializing_if = "Option::is_none")]
    pub initialised: Option<bool>,

    #[serde(rename = "ECUID", default, skip_serializing_if = "Option::is_none")]
    pub ecu_id: Option<String>,

    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerStatus {
    /// Parse a `status` payload, falling back to a plain message
    pub fn from_payload(data: &str) -> Self {
        match serde_json::from_str(data) {
            Ok(status) => status,
            Err(_) => Self {
                message: Some(data.trim().to_string()).filter(|m| !m.is_empty()),
                ..Default::default()
            },
        }
    }
}

/// One event from the server event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The server is alive and still sees this client
    Heartbeat,
    /// The ECU link changed state on the server
    Status(ServerStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_from_json() {
        let status = ServerStatus::from_payload(r#"{"Connected": true, "ECUID": "3a001402"}"#);
        assert_eq!(status.connected, Some(true));
        assert_eq!(status.ecu_id.as_deref(), Some("3a001402"));
        assert_eq!(status.initialised, None);
    }

    #[test]
    fn test_status_from_text() {
        let status = ServerStatus::from_payload("ecu disconnected\n");
        assert_eq!(
            status,
            ServerStatus {
                message: Some("ecu disconnected".into()),
                ..Default::default()
            }
        );
        assert_eq!(ServerStatus::from_payload("").message, None);
    }
}
