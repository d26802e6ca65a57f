//! FCR HTTP Client implementation

use std::time::Duration;

use async_trait::async_trait;
use fcr_core::models::{
    ActuatorRequest, ActuatorResponse, AdjustmentRequest, AdjustmentResponse, ConnectRequest,
    ConnectResponse, PortList, Sample, ScenarioDescription, ScenarioInfo,
};
use fcr_core::{BackendError, BackendResult, ServerEventStream, TelemetryBackend};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{FcrClientError, Result};
use crate::streaming::ServerEvents;

/// URL-encode an identifier for use in a single path segment.
///
/// Scenario names are file names and may carry a `/`; it must not split the
/// route into two segments.
fn encode_path_segment(id: &str) -> String {
    id.replace('/', "%2F")
}

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Telemetry backend REST client
///
/// Provides methods to drive the ECU connection, read dataframes and send
/// adjustment and actuator commands.
#[derive(Debug, Clone)]
pub struct FcrClient {
    client: Client,
    /// No overall timeout, for the long-lived event stream
    stream_client: Client,
    base_url: Url,
}

impl FcrClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the backend (e.g., "http://localhost:8081")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        let stream_client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self {
            client,
            stream_client,
            base_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // ECU Connection
    // =========================================================================

    /// Connect to the ECU on a serial port, or to a loaded scenario by name
    #[instrument(skip(self))]
    pub async fn connect(&self, port: &str) -> Result<ConnectResponse> {
        let url = self.base_url.join("/rosco/connect")?;
        debug!("Connecting via {}", url);

        let request = ConnectRequest {
            port: port.to_string(),
        };
        let response = self.client.post(url).json(&request).send().await?;
        self.handle_response(response).await
    }

    /// Disconnect from the ECU
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        let url = self.base_url.join("/rosco/disconnect")?;
        let response = self.client.post(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Send a keepalive so the backend keeps a paused session open
    #[instrument(skip(self))]
    pub async fn heartbeat(&self) -> Result<()> {
        let url = self.base_url.join("/rosco/heartbeat")?;
        let response = self.client.post(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Open the server event stream (`heartbeat` and `status` events)
    #[instrument(skip(self))]
    pub async fn subscribe_events(&self) -> Result<ServerEvents> {
        let url = self.base_url.join("/heartbeat")?;
        ServerEvents::connect(&self.stream_client, url).await
    }

    // =========================================================================
    // Dataframes
    // =========================================================================

    /// Read the next decoded dataframe
    #[instrument(skip(self))]
    pub async fn dataframe(&self) -> Result<Sample> {
        let url = self.base_url.join("/rosco/dataframe")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Adjustments and Actuators
    // =========================================================================

    /// Step an adjustable value; the response carries the value the ECU accepted
    #[instrument(skip(self))]
    pub async fn adjust(&self, adjustment: &str, steps: i32) -> Result<AdjustmentResponse> {
        let url = self.base_url.join(&format!(
            "/rosco/adjust/{}",
            encode_path_segment(adjustment)
        ))?;

        let request = AdjustmentRequest { steps };
        let response = self.client.post(url).json(&request).send().await?;
        self.handle_response(response).await
    }

    /// Switch an actuator test on or off
    #[instrument(skip(self))]
    pub async fn actuate(&self, actuator: &str, activate: bool) -> Result<ActuatorResponse> {
        let url = self
            .base_url
            .join(&format!("/rosco/test/{}", encode_path_segment(actuator)))?;

        let request = ActuatorRequest { activate };
        let response = self.client.post(url).json(&request).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Scenarios and Ports
    // =========================================================================

    /// List recorded scenarios
    #[instrument(skip(self))]
    pub async fn list_scenarios(&self) -> Result<Vec<ScenarioInfo>> {
        let url = self.base_url.join("/scenario")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Load a scenario for replay
    #[instrument(skip(self))]
    pub async fn load_scenario(&self, name: &str) -> Result<ScenarioDescription> {
        let url = self
            .base_url
            .join(&format!("/scenario/{}", encode_path_segment(name)))?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// List serial ports available on the backend host
    #[instrument(skip(self))]
    pub async fn list_ports(&self) -> Result<PortList> {
        let url = self.base_url.join("/config/ports")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Handle response and deserialize JSON
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| FcrClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    /// Extract error from failed response
    async fn extract_error(&self, response: reqwest::Response) -> FcrClientError {
        let status = response.status();
        self.extract_error_from_status(response, status).await
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> FcrClientError {
        // Try to parse error response body
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.error,
            Err(_) => format!("HTTP {}", status),
        };

        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => FcrClientError::Timeout,
            StatusCode::SERVICE_UNAVAILABLE => FcrClientError::ConnectionFailed(message),
            _ => FcrClientError::server_error(status.as_u16(), message),
        }
    }
}

#[async_trait]
impl TelemetryBackend for FcrClient {
    async fn connect(&self, target: &str) -> BackendResult<ConnectResponse> {
        Ok(FcrClient::connect(self, target).await?)
    }

    async fn disconnect(&self) -> BackendResult<()> {
        Ok(FcrClient::disconnect(self).await?)
    }

    async fn heartbeat(&self) -> BackendResult<()> {
        Ok(FcrClient::heartbeat(self).await?)
    }

    async fn subscribe_events(&self) -> BackendResult<ServerEventStream> {
        let events = match FcrClient::subscribe_events(self).await {
            Ok(events) => events,
            // Older backends do not serve the event stream
            Err(FcrClientError::ServerError { status: 404, .. }) => {
                return Err(BackendError::NotSupported("subscribe_events".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::pin(events.map(|event| event.map_err(BackendError::from))))
    }

    async fn fetch_dataframe(&self) -> BackendResult<Sample> {
        Ok(self.dataframe().await?)
    }

    async fn send_adjustment(&self, id: &str, steps: i32) -> BackendResult<AdjustmentResponse> {
        Ok(self.adjust(id, steps).await?)
    }

    async fn send_actuator(&self, id: &str, activate: bool) -> BackendResult<ActuatorResponse> {
        Ok(self.actuate(id, activate).await?)
    }

    async fn list_scenarios(&self) -> BackendResult<Vec<ScenarioInfo>> {
        Ok(FcrClient::list_scenarios(self).await?)
    }

    async fn load_scenario(&self, name: &str) -> BackendResult<ScenarioDescription> {
        Ok(FcrClient::load_scenario(self, name).await?)
    }

    async fn list_ports(&self) -> BackendResult<PortList> {
        Ok(FcrClient::list_ports(self).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = FcrClient::new("http://localhost:8081");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = FcrClient::new("not a url");
        assert!(client.is_err());
    }

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("iac"), "iac");
        assert_eq!(encode_path_segment("logs/idle.fcr"), "logs%2Fidle.fcr");
    }
}
