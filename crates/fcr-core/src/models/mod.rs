//! Shared data models for the telemetry backend and the session controller

mod command;
mod indicator;
mod replay;
mod sample;
mod server;

pub use command::*;
pub use indicator::*;
pub use replay::*;
pub use sample::*;
pub use server::*;
