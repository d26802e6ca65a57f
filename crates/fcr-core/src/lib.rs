//! fcr-core - Core traits and types for the FCR telemetry client
//!
//! This crate provides the telemetry data model, the indicator model and the
//! stateful fault derivation engine, together with the [`TelemetryBackend`]
//! abstraction the session controller talks to.

pub mod backend;
pub mod error;
pub mod faults;
pub mod models;

pub use backend::{ServerEventStream, TelemetryBackend};
pub use error::{BackendError, BackendResult};
pub use faults::{evaluate, DerivedFaultState};
pub use models::*;
