//! Virtual LED strip simulator for NanoLux-style controllers.
//!
//! The controller streams one line per frame over a serial port, each line a
//! list of `r,g,b`-style pixel tokens. This crate reads those lines, stretches
//! the pixels across a fixed 850 x 100 strip image with exponential intensity
//! scaling, and derives HSV and RGB renderings for display.
//!
//! # Features
//!
//! - **Partial-success decoding**: a malformed token keeps its slot and its
//!   segment keeps its previous color
//! - **Connection lifecycle**: `Disconnected -> Connecting -> Connected`, with
//!   a forced disconnect on the sixth consecutive empty read
//! - **Snapshot publishing**: readers get whole `Arc` snapshots through a
//!   watch channel, never a half-written buffer
//! - **Pluggable transport**: the real serial port, or any [`PortBackend`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use nanolux_sim::{Simulator, SimulatorConfig, RefreshRate, DerivedKind};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> nanolux_sim::Result<()> {
//!     let simulator = Simulator::start(SimulatorConfig::default()).await?;
//!
//!     let ports = simulator.scan()?;
//!     if let Some(port) = ports.first() {
//!         simulator.request_connect(port)?;
//!     }
//!
//!     let mut updates = simulator.subscribe(RefreshRate::Max(20));
//!     while let Some(snapshot) = updates.next().await {
//!         let rgb = snapshot.derived(DerivedKind::Rgb);
//!         println!("{} frame {}: first column {:?}", snapshot.state, snapshot.sequence, rgb.column(0));
//!     }
//!
//!     simulator.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Frame pipeline
pub mod builder;
pub mod color;
pub mod decoder;

// Device link and lifecycle
pub mod config;
pub mod connection;
pub mod driver;
pub mod simulator;
pub mod stream;
pub mod transport;

// Core exports
pub use error::*;
pub use types::*;

pub use builder::{PixelBufferBuilder, ScalingTable};
pub use config::SimulatorConfig;
pub use connection::{ConnectionHandle, CycleOutcome, StripMachine};
pub use decoder::{DecodedFrame, decode_line};
pub use simulator::Simulator;
pub use transport::{BAUD_RATE, NO_PORT, PortBackend, PortScanner, SerialBackend, Transport};
