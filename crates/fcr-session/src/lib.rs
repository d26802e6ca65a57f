//! fcr-session - Session controller for the FCR telemetry client
//!
//! The [`SessionController`] owns the connection lifecycle of one ECU
//! monitoring session. It drives a single [`PollingScheduler`] that alternates
//! between fetching dataframes and sending heartbeats, routes every sample
//! through the fault derivation engine, and forwards adjustment and actuator
//! commands through the [`CommandDispatcher`].
//!
//! ```text
//!                 connect(port)            initialised
//!  Disconnected ───────────────▶ Connecting ───────────▶ ConnectedLive / ConnectedReplay
//!       ▲                            │                        │        ▲
//!       │        failure             │                 pause()│        │resume()
//!       └────────────────────────────┘                        ▼        │
//!       ▲                                              PausedLive / PausedReplay
//!       │                  disconnect()                       │
//!       └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod state;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use dispatcher::CommandDispatcher;
pub use error::{SessionError, SessionResult};
pub use events::{DataframeUpdate, SessionEvent};
pub use scheduler::{PollingScheduler, ScheduleMode, TickHandler};
pub use state::{SessionMode, SessionState};
