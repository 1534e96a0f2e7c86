//! Transport abstractions for the device link
//!
//! A [`PortBackend`] enumerates and opens ports; an opened port is a
//! [`Transport`] that yields one raw line per call. The serial implementation
//! lives in [`serial`]; tests and benches drive the state machine through an
//! in-memory backend instead.

use std::time::Duration;

use crate::Result;

pub mod scan;
pub mod serial;

pub use scan::PortScanner;
pub use serial::{SerialBackend, SerialTransport};

/// Fixed line rate of the controller's serial output.
pub const BAUD_RATE: u32 = 115_200;

/// Port identifier meaning "no port".
pub const NO_PORT: &str = "None";

/// Link parameters handed to [`PortBackend::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,

    /// Upper bound on a single blocking read
    pub read_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self { baud_rate: BAUD_RATE, read_timeout: Duration::from_millis(1000) }
    }
}

/// An open device link.
///
/// Dropping the transport closes the port.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Read one line. A trailing delimiter may be included.
    ///
    /// Returns:
    /// - `Ok(bytes)` - the line read, possibly empty when the read timed out
    /// - `Err(e)` - the link failed; callers treat this like an empty line
    ///
    /// Must return within the link's read timeout.
    async fn read_line(&mut self) -> Result<Vec<u8>>;

    /// Identifier of the port this transport is attached to.
    fn port_name(&self) -> &str;
}

/// Source of ports and transports.
#[async_trait::async_trait]
pub trait PortBackend: Send + Sync + 'static {
    /// Identifiers of the ports currently present, in any order.
    fn available_ports(&self) -> Result<Vec<String>>;

    /// Open `port` with the given settings.
    async fn open(&self, port: &str, settings: LinkSettings) -> Result<Box<dyn Transport>>;
}
