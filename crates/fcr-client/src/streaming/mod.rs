//! Server event stream
//!
//! The backend pushes `heartbeat` and `status` events over SSE on
//! `/heartbeat`. Keeping the stream open tells the server the client is
//! still running.
//!
//! # Example
//!
//! ```no_run
//! use fcr_client::FcrClient;
//! use fcr_core::ServerEvent;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FcrClient::new("http://localhost:8081")?;
//! let mut events = client.subscribe_events().await?;
//!
//! while let Some(event) = events.next().await {
//!     if let ServerEvent::Status(status) = event? {
//!         println!("ECU connected: {:?}", status.connected);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod parser;
mod subscription;

pub use subscription::ServerEvents;
