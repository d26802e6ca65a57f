//! Fault derivation engine
//!
//! Turns one instantaneous [`Sample`] into an [`IndicatorSet`]. Some
//! indicators mirror the sample directly; others are latched in a
//! [`DerivedFaultState`] that lives as long as the session and only resets
//! when a new session is connected.
//!
//! Rule order matters: the persistent lambda faults check the latch *before*
//! the current sample sets it, so a fault needs at least one earlier
//! occurrence in the session.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{IndicatorId, IndicatorSet, Sample, Severity};

/// Lambda voltage at or below which the mixture reads as lean-limit (mV)
pub const LAMBDA_LOW_MV: f64 = 10.0;
/// Lambda voltage at or above which the mixture reads as rich-limit (mV)
pub const LAMBDA_HIGH_MV: f64 = 900.0;
/// Idle error at or above which a closed IAC valve is suspicious (RPM)
pub const IDLE_ERROR_LIMIT: f64 = 50.0;

/// Latched diagnostic flags for one session
///
/// Flags only ever go from `false` to `true` while a session lasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFaultState {
    pub min_lambda_seen: bool,
    pub max_lambda_seen: bool,
    pub min_iac_seen: bool,
}

impl DerivedFaultState {
    /// Clear all latches for a new session
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Evaluate one sample against the session's latched state
pub fn evaluate(sample: &Sample, state: &mut DerivedFaultState) -> IndicatorSet {
    let mut set = IndicatorSet::default();
    let mut derived = 0u32;

    if sample.has_trouble_codes() {
        set.set(
            IndicatorId::CoolantFault,
            Severity::Fault,
            sample.coolant_temp_sensor_fault,
        );
        set.set(
            IndicatorId::AirFault,
            Severity::Fault,
            sample.intake_air_temp_sensor_fault,
        );
        set.set(
            IndicatorId::ThrottleFault,
            Severity::Fault,
            sample.throttle_pot_circuit_fault,
        );
        set.set(
            IndicatorId::FuelFault,
            Severity::Fault,
            sample.fuel_pump_circuit_fault,
        );
    }

    set.set(IndicatorId::ClosedLoop, Severity::Status, sample.closed_loop);
    set.set(IndicatorId::IdleSwitch, Severity::Status, sample.idle_switch);
    set.set(
        IndicatorId::ParkSwitch,
        Severity::Status,
        sample.park_neutral_switch,
    );

    let iac_closed = sample.iac_position == Some(0.0);
    let idle_error_high = sample.idle_error.is_some_and(|e| e >= IDLE_ERROR_LIMIT);
    if iac_closed && idle_error_high && !sample.idle_switch {
        if !state.min_iac_seen {
            debug!("IAC at minimum with high idle error, latching warning");
        }
        state.min_iac_seen = true;
        derived += 1;
    }

    // Open-loop lambda readings are not meaningful
    if sample.closed_loop {
        let lambda_low = sample.lambda_voltage.is_some_and(|v| v <= LAMBDA_LOW_MV);
        let lambda_high = sample.lambda_voltage.is_some_and(|v| v >= LAMBDA_HIGH_MV);

        if state.min_lambda_seen && lambda_low {
            set.set(IndicatorId::LambdaLowFault, Severity::Warning, true);
            derived += 1;
        }
        if lambda_low {
            state.min_lambda_seen = true;
            derived += 1;
        }

        if state.max_lambda_seen && lambda_high {
            set.set(IndicatorId::LambdaHighFault, Severity::Warning, true);
            derived += 1;
        }
        if lambda_high {
            state.max_lambda_seen = true;
            derived += 1;
        }
    }

    set.set(
        IndicatorId::SystemFault,
        Severity::Fault,
        sample.o2_system_fault(),
    );
    set.set(
        IndicatorId::RpmSensor,
        Severity::Warning,
        sample.rpm_sensor_anomaly == Some(1),
    );
    set.set(IndicatorId::LambdaLow, Severity::Warning, state.min_lambda_seen);
    set.set(IndicatorId::LambdaHigh, Severity::Warning, state.max_lambda_seen);
    set.set(IndicatorId::IacLow, Severity::Warning, state.min_iac_seen);

    let instantaneous = sample.circuit_fault_count() + u32::from(sample.o2_system_fault());
    set.fault_count = instantaneous + derived;
    set.set(IndicatorId::EcuFault, Severity::Fault, set.fault_count > 0);

    if let Some(analytics) = &sample.analytics {
        set.set(
            IndicatorId::EngineRunning,
            Severity::Status,
            analytics.is_engine_running,
        );
        set.set(
            IndicatorId::CrankshaftSensor,
            Severity::Fault,
            analytics.crankshaft_sensor_fault,
        );
        set.set(IndicatorId::MapFault, Severity::Fault, analytics.map_fault);
    }

    set
}
