//! Command models (connect, adjustments, actuators, scenarios)

use serde::{Deserialize, Serialize};

/// Adjustable ECU settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Adjustment {
    #[serde(rename = "idlespeed")]
    IdleSpeed,
    #[serde(rename = "idledecay")]
    IdleDecay,
    #[serde(rename = "ignitionadvance")]
    IgnitionAdvance,
    #[serde(rename = "stft")]
    ShortTermFuelTrim,
    #[serde(rename = "ltft")]
    LongTermFuelTrim,
    #[serde(rename = "iac")]
    IacPosition,
}

impl Adjustment {
    /// Every adjustable setting, in display order
    pub const ALL: [Adjustment; 6] = [
        Adjustment::IdleSpeed,
        Adjustment::IdleDecay,
        Adjustment::IgnitionAdvance,
        Adjustment::ShortTermFuelTrim,
        Adjustment::LongTermFuelTrim,
        Adjustment::IacPosition,
    ];

    /// Identifier used in the adjustment route
    pub fn as_str(&self) -> &'static str {
        match self {
            Adjustment::IdleSpeed => "idlespeed",
            Adjustment::IdleDecay => "idledecay",
            Adjustment::IgnitionAdvance => "ignitionadvance",
            Adjustment::ShortTermFuelTrim => "stft",
            Adjustment::LongTermFuelTrim => "ltft",
            Adjustment::IacPosition => "iac",
        }
    }
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Adjustment::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let valid: Vec<&str> = Adjustment::ALL.iter().map(|a| a.as_str()).collect();
                format!("Unknown adjustment '{}'. Valid: {}", s, valid.join(", "))
            })
    }
}

/// Request body for a connect call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    /// Serial port name, or scenario name when replaying
    pub port: String,
}

/// Response to a connect call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// Whether the ECU completed its initialisation sequence
    #[serde(rename = "Initialised", default)]
    pub initialised: bool,
    /// ECU identification bytes as reported by the backend
    #[serde(rename = "ECUID", default, skip_serializing_if = "Option::is_none")]
    pub ecu_id: Option<String>,
}

/// Request body for an adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    #[serde(rename = "Steps")]
    pub steps: i32,
}

/// Backend-confirmed adjustment value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentResponse {
    pub adjustment: String,
    pub value: f64,
}

/// Request body for an actuator test
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActuatorRequest {
    #[serde(rename = "Activate")]
    pub activate: bool,
}

/// Backend-confirmed actuator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorResponse {
    pub actuator: String,
    pub activate: bool,
}

/// A recorded scenario available for replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub name: String,
}

/// Playback description returned when a scenario is loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScenarioDescription {
    /// Number of frames in the scenario
    #[serde(default)]
    pub count: u32,
    /// Current playback position (1-based)
    #[serde(default)]
    pub position: u32,
}

/// Serial ports the backend can open
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortList {
    #[serde(default)]
    pub ports: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_parse() {
        assert_eq!("iac".parse::<Adjustment>(), Ok(Adjustment::IacPosition));
        assert_eq!("STFT".parse::<Adjustment>(), Ok(Adjustment::ShortTermFuelTrim));
        assert!("boost".parse::<Adjustment>().is_err());
    }

    #[test]
    fn test_adjustment_wire_name() {
        let json = serde_json::to_string(&Adjustment::IgnitionAdvance).unwrap();
        assert_eq!(json, "\"ignitionadvance\"");
        for adjustment in Adjustment::ALL {
            assert_eq!(adjustment.to_string(), adjustment.as_str());
        }
    }

    #[test]
    fn test_connect_response() {
        let resp: ConnectResponse =
            serde_json::from_str(r#"{"Initialised": true, "ECUID": "3a001402"}"#).unwrap();
        assert!(resp.initialised);
        assert_eq!(resp.ecu_id.as_deref(), Some("3a001402"));

        let resp: ConnectResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.initialised);
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(AdjustmentRequest { steps: -1 }).unwrap();
        assert_eq!(body, serde_json::json!({"Steps": -1}));
        let body = serde_json::to_value(ActuatorRequest { activate: true }).unwrap();
        assert_eq!(body, serde_json::json!({"Activate": true}));
    }
}
