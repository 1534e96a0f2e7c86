//! Connection lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the device connection.
///
/// `Disconnected -> Connecting -> Connected` is the only path to an open
/// port. `Exiting` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Exiting,
}

impl ConnectionState {
    /// No further cycles run once terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Exiting)
    }

    /// Whether a transport may be open in this state.
    pub fn holds_port(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Exiting => "exiting",
        };
        f.write_str(name)
    }
}
