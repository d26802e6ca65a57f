//! FCR Client Library
//!
//! Provides a typed HTTP client for the telemetry backend that serves live
//! ECU dataframes and recorded scenarios.
//!
//! # Example
//!
//! ```rust,no_run
//! use fcr_client::FcrClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = FcrClient::new("http://localhost:8081")?;
//!
//!     let connected = client.connect("/dev/ttyUSB0").await?;
//!     if connected.initialised {
//!         let sample = client.dataframe().await?;
//!         println!("{:?} rpm", sample.engine_rpm);
//!     }
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! [`FcrClient`] also implements [`fcr_core::TelemetryBackend`], so it can be
//! handed straight to the session controller.
//!
//! # Testing
//!
//! The `testing` module serves an axum router on an ephemeral port:
//!
//! ```rust,ignore
//! use fcr_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let ports = server.client.list_ports().await?;
//! ```

mod client;
mod error;
pub mod streaming;
pub mod testing;

pub use client::FcrClient;
pub use error::{FcrClientError, Result};
pub use streaming::ServerEvents;

// Re-export core types for convenience
pub use fcr_core::models::{
    ActuatorResponse, AdjustmentResponse, ConnectResponse, PortList, Sample, ScenarioDescription,
    ScenarioInfo, ServerEvent, ServerStatus,
};
