//! Diagnostic indicator models

use serde::{Deserialize, Serialize};

/// Severity class of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Plain status lamp (green)
    Status,
    /// Warning condition (amber)
    Warning,
    /// Fault condition (red)
    Fault,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Status => "status",
            Severity::Warning => "warning",
            Severity::Fault => "fault",
        };
        f.write_str(s)
    }
}

/// Named diagnostic indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorId {
    CoolantFault,
    AirFault,
    ThrottleFault,
    FuelFault,
    ClosedLoop,
    IdleSwitch,
    ParkSwitch,
    LambdaLowFault,
    LambdaHighFault,
    LambdaLow,
    LambdaHigh,
    RpmSensor,
    IacLow,
    /// O2 system fault
    SystemFault,
    /// Aggregate ECU fault summary
    EcuFault,
    EngineRunning,
    CrankshaftSensor,
    MapFault,
}

impl IndicatorId {
    /// Stable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorId::CoolantFault => "coolantfault",
            IndicatorId::AirFault => "airfault",
            IndicatorId::ThrottleFault => "throttlefault",
            IndicatorId::FuelFault => "fuelfault",
            IndicatorId::ClosedLoop => "closedloop",
            IndicatorId::IdleSwitch => "idleswitch",
            IndicatorId::ParkSwitch => "parkswitch",
            IndicatorId::LambdaLowFault => "lambdalowfault",
            IndicatorId::LambdaHighFault => "lambdahighfault",
            IndicatorId::LambdaLow => "lambdalow",
            IndicatorId::LambdaHigh => "lambdahigh",
            IndicatorId::RpmSensor => "rpmsensor",
            IndicatorId::IacLow => "iaclow",
            IndicatorId::SystemFault => "systemfault",
            IndicatorId::EcuFault => "ecufault",
            IndicatorId::EngineRunning => "enginerunning",
            IndicatorId::CrankshaftSensor => "crankshaftsensor",
            IndicatorId::MapFault => "mapfault",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorId::CoolantFault => "Coolant temperature sensor fault",
            IndicatorId::AirFault => "Intake air temperature sensor fault",
            IndicatorId::ThrottleFault => "Throttle potentiometer circuit fault",
            IndicatorId::FuelFault => "Fuel pump circuit fault",
            IndicatorId::ClosedLoop => "Closed loop",
            IndicatorId::IdleSwitch => "Idle switch",
            IndicatorId::ParkSwitch => "Park/neutral switch",
            IndicatorId::LambdaLowFault => "Lambda voltage persistently low",
            IndicatorId::LambdaHighFault => "Lambda voltage persistently high",
            IndicatorId::LambdaLow => "Lambda voltage low seen",
            IndicatorId::LambdaHigh => "Lambda voltage high seen",
            IndicatorId::RpmSensor => "RPM sensor anomaly",
            IndicatorId::IacLow => "IAC at minimum with high idle error",
            IndicatorId::SystemFault => "O2 system fault",
            IndicatorId::EcuFault => "ECU fault",
            IndicatorId::EngineRunning => "Engine running",
            IndicatorId::CrankshaftSensor => "Crankshaft sensor fault",
            IndicatorId::MapFault => "MAP sensor fault",
        }
    }
}

impl std::fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single indicator lamp and whether it is lit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,
    pub severity: Severity,
    pub active: bool,
}

/// Indicators produced by evaluating one sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Indicators in evaluation order
    pub indicators: Vec<Indicator>,
    /// Aggregate ECU fault count carried by the `ecufault` indicator
    pub fault_count: u32,
}

impl IndicatorSet {
    /// Record an indicator, replacing any earlier entry with the same id
    pub fn set(&mut self, id: IndicatorId, severity: Severity, active: bool) {
        let indicator = Indicator {
            id,
            severity,
            active,
        };
        match self.indicators.iter_mut().find(|i| i.id == id) {
            Some(existing) => *existing = indicator,
            None => self.indicators.push(indicator),
        }
    }

    /// Look up an indicator by id
    pub fn get(&self, id: IndicatorId) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.id == id)
    }

    /// Whether the indicator was emitted and is lit
    pub fn is_active(&self, id: IndicatorId) -> bool {
        self.get(id).is_some_and(|i| i.active)
    }

    /// Lit indicators only
    pub fn active(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.iter().filter(|i| i.active)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.iter()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_existing() {
        let mut set = IndicatorSet::default();
        set.set(IndicatorId::ClosedLoop, Severity::Status, false);
        set.set(IndicatorId::ClosedLoop, Severity::Status, true);
        assert_eq!(set.len(), 1);
        assert!(set.is_active(IndicatorId::ClosedLoop));
        assert!(!set.is_active(IndicatorId::IdleSwitch));
        assert!(set.get(IndicatorId::IdleSwitch).is_none());
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(Indicator {
            id: IndicatorId::SystemFault,
            severity: Severity::Fault,
            active: true,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "systemfault", "severity": "fault", "active": true})
        );
        assert_eq!(IndicatorId::LambdaLowFault.to_string(), "lambdalowfault");
    }
}
