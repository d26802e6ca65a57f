//! Events published to the presentation layer

use chrono::{DateTime, Utc};
use fcr_core::{Adjustment, IndicatorSet, ReplayProgress, Sample, ServerStatus};
use serde::Serialize;

/// Everything the presentation layer needs for one dataframe cycle
#[derive(Debug, Clone, Serialize)]
pub struct DataframeUpdate {
    pub received_at: DateTime<Utc>,
    pub sample: Sample,
    pub indicators: IndicatorSet,
    /// Present while replaying a scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<ReplayProgress>,
    /// Adjustable settings present in the sample, in display order
    pub adjustments: Vec<(Adjustment, f64)>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Dataframe(Box<DataframeUpdate>),
    TransientError { message: String },
    AdjustmentConfirmed { adjustment: Adjustment, value: f64 },
    ActuatorConfirmed { actuator: String, active: bool },
    /// A momentary actuator test has timed out
    ActuatorDeactivated { actuator: String },
    /// The backend announced an ECU link change
    ServerStatus(ServerStatus),
}
