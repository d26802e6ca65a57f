//! Command implementations for fcr

pub mod adjust;
pub mod console;
pub mod monitor;
pub mod scenarios;

pub use adjust::{actuate, adjust};
pub use monitor::{monitor, replay};
pub use scenarios::{ports, scenarios};
