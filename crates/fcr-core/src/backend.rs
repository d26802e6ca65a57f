//! TelemetryBackend trait - the abstraction the session controller drives

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::{BackendError, BackendResult};
use crate::models::{
    ActuatorResponse, AdjustmentResponse, ConnectResponse, PortList, Sample, ScenarioDescription,
    ScenarioInfo, ServerEvent,
};

/// Server-pushed events; ends when the server closes the stream
pub type ServerEventStream = Pin<Box<dyn Stream<Item = BackendResult<ServerEvent>> + Send>>;

/// Request/response operations offered by a telemetry data source.
///
/// The same session controller can drive a live ECU over the REST client,
/// a recorded scenario served by the same backend, or an in-memory fake in
/// tests. Every call is fallible and reports failure as a [`BackendError`].
#[async_trait]
pub trait TelemetryBackend: Send + Sync {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Open a connection to a serial port, or to a scenario by name
    async fn connect(&self, target: &str) -> BackendResult<ConnectResponse>;

    /// Close the current connection
    async fn disconnect(&self) -> BackendResult<()>;

    /// Keep a paused session alive
    async fn heartbeat(&self) -> BackendResult<()>;

    /// Open the server event stream.
    ///
    /// The open stream is how the server knows this client is still there.
    async fn subscribe_events(&self) -> BackendResult<ServerEventStream> {
        Err(BackendError::NotSupported("subscribe_events".to_string()))
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Read the next dataframe
    async fn fetch_dataframe(&self) -> BackendResult<Sample>;

    // =========================================================================
    // Commands
    // =========================================================================

    /// Step an adjustable value by `steps` and return the confirmed value
    async fn send_adjustment(&self, id: &str, steps: i32) -> BackendResult<AdjustmentResponse>;

    /// Activate or deactivate an actuator test
    async fn send_actuator(&self, id: &str, activate: bool) -> BackendResult<ActuatorResponse>;

    // =========================================================================
    // Scenarios and ports
    // =========================================================================

    /// List recorded scenarios available for replay
    async fn list_scenarios(&self) -> BackendResult<Vec<ScenarioInfo>>;

    /// Load a scenario and report its playback size and position
    async fn load_scenario(&self, name: &str) -> BackendResult<ScenarioDescription>;

    /// List serial ports the backend can open
    async fn list_ports(&self) -> BackendResult<PortList> {
        Err(BackendError::NotSupported("list_ports".to_string()))
    }
}
