//! Device connection handle and the consecutive-failure policy

use tracing::{debug, trace};

use crate::decoder::{DecodedFrame, decode_line};
use crate::transport::{NO_PORT, Transport};

/// Consecutive empty reads tolerated before a forced disconnect.
///
/// The disconnect fires when the counter goes *above* this value, i.e. on
/// the sixth empty read in a row.
pub const FAIL_THRESHOLD: u32 = 5;

/// Result of one read-and-decode attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A frame with at least one token; the failure counter was reset
    Frame(DecodedFrame),

    /// Nothing decoded; `failures` is the counter after incrementing
    Empty { failures: u32 },

    /// Too many consecutive empty reads; the caller must disconnect
    Exhausted,
}

/// Owns the open transport, the port identifier and the failure counter.
///
/// The port is open exactly when a transport is attached.
pub struct ConnectionHandle {
    port: String,
    transport: Option<Box<dyn Transport>>,
    failures: u32,
}

impl ConnectionHandle {
    pub fn new() -> Self {
        Self { port: NO_PORT.to_string(), transport: None, failures: 0 }
    }

    /// Port identifier, [`NO_PORT`] when closed.
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Take ownership of a freshly opened transport.
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        self.port = transport.port_name().to_string();
        self.transport = Some(transport);
        self.failures = 0;
    }

    /// Drop the transport and reset port and counter.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            debug!(port = transport.port_name(), "Closing connection");
        }
        self.port = NO_PORT.to_string();
        self.failures = 0;
    }

    /// Read one line and decode it, applying the failure policy.
    ///
    /// A read error counts as an empty read. Reading with no transport
    /// attached reports `Exhausted` so the caller tears down its state.
    pub async fn read_frame(&mut self) -> ReadOutcome {
        let Some(transport) = self.transport.as_mut() else {
            return ReadOutcome::Exhausted;
        };

        let line = match transport.read_line().await {
            Ok(line) => line,
            Err(e) => {
                debug!("Read failed, counting as empty frame: {}", e);
                Vec::new()
            }
        };

        match decode_line(&line) {
            Ok(frame) => {
                self.failures = 0;
                ReadOutcome::Frame(frame)
            }
            Err(e) => {
                self.failures += 1;
                trace!(failures = self.failures, "{}", e);
                if self.failures > FAIL_THRESHOLD {
                    ReadOutcome::Exhausted
                } else {
                    ReadOutcome::Empty { failures: self.failures }
                }
            }
        }
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("port", &self.port)
            .field("open", &self.is_open())
            .field("failures", &self.failures)
            .finish()
    }
}
