//! Error types for the strip simulator.
//!
//! Nothing in this crate is fatal to the host process. Every variant maps to
//! a local recovery path: a failed port open keeps the machine in
//! `Connecting`, an empty frame feeds the failure counter, a malformed token
//! is skipped. The worst outcome is a forced disconnect, which a fresh
//! connect request always recovers from.
//!
//! ```rust
//! use nanolux_sim::SimulatorError;
//!
//! let error = SimulatorError::port_open_failed("/dev/ttyUSB0", "device busy");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T, E = SimulatorError> = std::result::Result<T, E>;

/// Main error type for simulator operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SimulatorError {
    #[error("Failed to open serial port {port}: {reason}")]
    PortOpen {
        port: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Port {port} is reserved and cannot be used as a connection target")]
    ReservedPort { port: String },

    #[error("Failed to enumerate serial ports")]
    Scan {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Read from {port} failed")]
    Read {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Frame contained no pixel tokens")]
    EmptyFrame,

    #[error("Malformed pixel token '{token}': {reason}")]
    MalformedToken { token: String, reason: String },

    #[error("Scaling exponent {value} is outside (0, 1]")]
    InvalidScaling { value: f32 },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SimulatorError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SimulatorError::PortOpen { .. } => true,
            SimulatorError::Scan { .. } => true,
            SimulatorError::Read { .. } => true,
            SimulatorError::EmptyFrame => true,
            SimulatorError::MalformedToken { .. } => true,
            SimulatorError::ReservedPort { .. } => false,
            SimulatorError::InvalidScaling { .. } => false,
            SimulatorError::Config { .. } => false,
            SimulatorError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SimulatorError::PortOpen { .. } => vec![
                "Check that the controller is plugged in",
                "Close other programs holding the serial port",
                "Rescan ports and pick the controller's port",
            ],
            SimulatorError::ReservedPort { .. } => {
                vec!["Pick a port from the scan results", "Remove the port from reserved_ports"]
            }
            SimulatorError::Scan { .. } => vec![
                "Check serial device permissions",
                "Retry the scan after reconnecting the device",
            ],
            SimulatorError::Read { .. } => vec![
                "Check the USB cable",
                "Verify the controller is streaming at 115200 baud",
            ],
            SimulatorError::EmptyFrame => vec![
                "Verify the controller firmware has serial output enabled",
                "Increase read_timeout_ms if frames arrive slowly",
            ],
            SimulatorError::MalformedToken { .. } => {
                vec!["Check for baud rate mismatch", "Verify the firmware wire format"]
            }
            SimulatorError::InvalidScaling { .. } => {
                vec!["Use a scaling exponent greater than 0 and at most 1"]
            }
            SimulatorError::Config { .. } => {
                vec!["Check the configuration values", "Remove the key to use its default"]
            }
            SimulatorError::File { .. } => {
                vec!["Check file exists and is readable", "Check file permissions"]
            }
        }
    }

    /// Helper constructor for port open failures.
    pub fn port_open_failed(port: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulatorError::PortOpen { port: port.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for port open failures with source.
    pub fn port_open_failed_with_source(
        port: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        SimulatorError::PortOpen {
            port: port.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Helper constructor for malformed pixel tokens.
    pub fn malformed_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulatorError::MalformedToken { token: token.into(), reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        SimulatorError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for config file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        SimulatorError::File { path, source }
    }
}

impl From<serialport::Error> for SimulatorError {
    fn from(err: serialport::Error) -> Self {
        SimulatorError::Scan { source: Box::new(err) }
    }
}

impl From<serde_yaml_ng::Error> for SimulatorError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SimulatorError::config("YAML", err.to_string())
    }
}
