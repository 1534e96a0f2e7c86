//! Serial port transport backed by the `serialport` crate

use std::io::{self, BufRead, BufReader};

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, trace};

use super::{LinkSettings, PortBackend, Transport};
use crate::{Result, SimulatorError};

/// Ports of the host machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

#[async_trait::async_trait]
impl PortBackend for SerialBackend {
    fn available_ports(&self) -> Result<Vec<String>> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            // On macOS only the cu.* (calling unit) devices open without
            // waiting for carrier detect
            .filter(|_p| {
                #[cfg(target_os = "macos")]
                {
                    !_p.port_name.starts_with("/dev/tty.")
                }
                #[cfg(not(target_os = "macos"))]
                {
                    true
                }
            })
            .map(|p| p.port_name)
            .collect())
    }

    async fn open(&self, port: &str, settings: LinkSettings) -> Result<Box<dyn Transport>> {
        let name = port.to_string();
        let opened = tokio::task::spawn_blocking(move || {
            serialport::new(&name, settings.baud_rate).timeout(settings.read_timeout).open()
        })
        .await
        .map_err(|e| SimulatorError::port_open_failed_with_source(port, Box::new(e)))?
        .map_err(|e| SimulatorError::port_open_failed_with_source(port, Box::new(e)))?;

        // Stale bytes from before the open would produce a torn first frame
        if let Err(e) = opened.clear(ClearBuffer::Input) {
            debug!("Could not clear input buffer on {}: {}", port, e);
        }

        info!(port, baud_rate = settings.baud_rate, "Serial port opened");
        Ok(Box::new(SerialTransport::new(port, opened)))
    }
}

/// Line reader over an open serial port.
///
/// Reads block on a worker thread for at most the port's timeout. A line
/// cut short by the timeout is kept and completed by the next read.
pub struct SerialTransport {
    port: String,
    reader: Option<BufReader<Box<dyn SerialPort>>>,
    pending: Vec<u8>,
}

impl SerialTransport {
    pub fn new(port: impl Into<String>, serial: Box<dyn SerialPort>) -> Self {
        Self { port: port.into(), reader: Some(BufReader::new(serial)), pending: Vec::new() }
    }

    fn read_error(&self, source: io::Error) -> SimulatorError {
        SimulatorError::Read { port: self.port.clone(), source }
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let Some(mut reader) = self.reader.take() else {
            return Err(self.read_error(io::Error::new(
                io::ErrorKind::NotConnected,
                "reader lost after a cancelled read",
            )));
        };
        let mut pending = std::mem::take(&mut self.pending);

        let (reader, pending, result) = tokio::task::spawn_blocking(move || {
            let result = reader.read_until(b'\n', &mut pending);
            (reader, pending, result)
        })
        .await
        .map_err(|e| self.read_error(io::Error::other(e)))?;

        self.reader = Some(reader);

        match result {
            Ok(_) => {
                trace!(port = %self.port, bytes = pending.len(), "Line read");
                Ok(pending)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                trace!(port = %self.port, partial = pending.len(), "Read timed out");
                self.pending = pending;
                Ok(Vec::new())
            }
            Err(e) => Err(self.read_error(e)),
        }
    }

    fn port_name(&self) -> &str {
        &self.port
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        debug!(port = %self.port, "Closing serial port");
    }
}
