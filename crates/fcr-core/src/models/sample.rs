//! Dataframe sample models
//!
//! A [`Sample`] is one decoded dataframe as reported by the backend. Every
//! field is optional on the wire: a missing numeric stays `None` and never
//! satisfies a threshold comparison, a missing (or `null`) flag reads as
//! `false`.

use serde::{Deserialize, Deserializer, Serialize};

use super::Adjustment;

/// Treat an absent or `null` JSON boolean as `false`
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// One dataframe reading from the ECU
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sample {
    /// Wall-clock time the backend read the frame (HH:MM:SS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    // === Engine ===
    #[serde(default, rename = "EngineRPM")]
    pub engine_rpm: Option<f64>,
    /// Manifold absolute pressure (kPa)
    #[serde(default)]
    pub manifold_absolute_pressure: Option<f64>,
    /// Throttle potentiometer voltage (V)
    #[serde(default)]
    pub throttle_pot_sensor: Option<f64>,
    /// Idle air control stepper position
    #[serde(default, rename = "IACPosition")]
    pub iac_position: Option<f64>,
    /// Deviation from the idle set point (RPM)
    #[serde(default)]
    pub idle_error: Option<f64>,
    #[serde(default)]
    pub idle_hot: Option<f64>,
    #[serde(default)]
    pub idle_speed_offset: Option<f64>,
    #[serde(default)]
    pub battery_voltage: Option<f64>,
    #[serde(default)]
    pub coolant_temp: Option<f64>,
    #[serde(default)]
    pub intake_air_temp: Option<f64>,
    #[serde(default)]
    pub ignition_advance: Option<f64>,

    // === Fuelling ===
    /// Lambda sensor voltage (mV)
    #[serde(default)]
    pub lambda_voltage: Option<f64>,
    /// Lambda sensor status code (0 = O2 system fault)
    #[serde(default)]
    pub lambda_status: Option<u8>,
    #[serde(default)]
    pub short_term_fuel_trim: Option<f64>,
    #[serde(default)]
    pub long_term_fuel_trim: Option<f64>,
    #[serde(default)]
    pub fuel_trim_correction: Option<f64>,
    #[serde(default)]
    pub air_fuel_ratio: Option<f64>,

    // === Switches ===
    #[serde(default, deserialize_with = "null_as_false")]
    pub closed_loop: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub idle_switch: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub park_neutral_switch: bool,

    // === Diagnostics ===
    #[serde(default, rename = "DTC0")]
    pub dtc0: Option<u8>,
    #[serde(default, rename = "DTC1")]
    pub dtc1: Option<u8>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub coolant_temp_sensor_fault: bool,
    #[serde(
        default,
        alias = "AirIntakeTempSensorFault",
        deserialize_with = "null_as_false"
    )]
    pub intake_air_temp_sensor_fault: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub throttle_pot_circuit_fault: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub fuel_pump_circuit_fault: bool,
    /// RPM sensor anomaly flag (frame 0x7d offset 0x03)
    #[serde(default, rename = "Uk7d03")]
    pub rpm_sensor_anomaly: Option<u8>,

    /// Backend-side analytics, if the backend computes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<Analytics>,

    // === Raw frames ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataframe80: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataframe7d: Option<String>,
}

impl Sample {
    /// Whether either trouble-code byte is non-zero
    pub fn has_trouble_codes(&self) -> bool {
        self.dtc0.unwrap_or(0) != 0 || self.dtc1.unwrap_or(0) != 0
    }

    /// Whether the lambda sensor reports an O2 system fault
    pub fn o2_system_fault(&self) -> bool {
        self.lambda_status == Some(0)
    }

    /// Number of sensor/circuit fault flags currently set
    pub fn circuit_fault_count(&self) -> u32 {
        [
            self.coolant_temp_sensor_fault,
            self.intake_air_temp_sensor_fault,
            self.throttle_pot_circuit_fault,
            self.fuel_pump_circuit_fault,
        ]
        .into_iter()
        .filter(|f| *f)
        .count() as u32
    }

    /// Current value of an adjustable setting as reported in this frame
    pub fn adjustment_value(&self, adjustment: Adjustment) -> Option<f64> {
        match adjustment {
            Adjustment::IdleSpeed => self.idle_speed_offset,
            Adjustment::IdleDecay => self.idle_hot,
            Adjustment::IgnitionAdvance => self.ignition_advance,
            Adjustment::ShortTermFuelTrim => self.short_term_fuel_trim,
            Adjustment::LongTermFuelTrim => self.long_term_fuel_trim,
            Adjustment::IacPosition => self.iac_position,
        }
    }

    /// All adjustable settings present in this frame
    pub fn adjustment_values(&self) -> Vec<(Adjustment, f64)> {
        Adjustment::ALL
            .iter()
            .filter_map(|a| self.adjustment_value(*a).map(|v| (*a, v)))
            .collect()
    }
}

/// Analytics computed by the backend over recent frames
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Analytics {
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_engine_running: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub crankshaft_sensor_fault: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub map_fault: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_backend_frame() {
        let json = r#"{
            "Time": "12:01:02",
            "EngineRPM": 850,
            "IACPosition": 30,
            "LambdaVoltage": 435,
            "LambdaStatus": 1,
            "ClosedLoop": true,
            "IdleSwitch": true,
            "DTC0": 1,
            "DTC1": 0,
            "CoolantTempSensorFault": true,
            "Uk7d03": 0,
            "Dataframe80": "801c",
            "SomethingNew": 42
        }"#;

        let sample: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.time.as_deref(), Some("12:01:02"));
        assert_eq!(sample.engine_rpm, Some(850.0));
        assert_eq!(sample.iac_position, Some(30.0));
        assert_eq!(sample.lambda_voltage, Some(435.0));
        assert!(sample.closed_loop);
        assert!(sample.idle_switch);
        assert!(!sample.park_neutral_switch);
        assert_eq!(sample.dtc0, Some(1));
        assert!(sample.coolant_temp_sensor_fault);
        assert!(sample.has_trouble_codes());
        assert_eq!(sample.circuit_fault_count(), 1);
    }

    #[test]
    fn test_missing_and_null_fields() {
        let sample: Sample =
            serde_json::from_str(r#"{"ClosedLoop": null, "LambdaStatus": null}"#).unwrap();
        assert!(!sample.closed_loop);
        assert_eq!(sample.lambda_status, None);
        assert!(!sample.o2_system_fault());
        assert!(!sample.has_trouble_codes());
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_air_intake_alias() {
        let sample: Sample =
            serde_json::from_str(r#"{"AirIntakeTempSensorFault": true}"#).unwrap();
        assert!(sample.intake_air_temp_sensor_fault);
    }

    #[test]
    fn test_adjustment_values() {
        let sample = Sample {
            iac_position: Some(12.0),
            idle_hot: Some(35.0),
            ..Default::default()
        };
        assert_eq!(sample.adjustment_value(Adjustment::IacPosition), Some(12.0));
        assert_eq!(
            sample.adjustment_values(),
            vec![(Adjustment::IdleDecay, 35.0), (Adjustment::IacPosition, 12.0)]
        );
    }

    #[test]
    fn test_analytics_block() {
        let sample: Sample = serde_json::from_str(
            r#"{"Analytics": {"IsEngineRunning": true, "MapFault": true}}"#,
        )
        .unwrap();
        let analytics = sample.analytics.unwrap();
        assert!(analytics.is_engine_running);
        assert!(!analytics.crankshaft_sensor_fault);
        assert!(analytics.map_fault);
    }
}
