//! Connection lifecycle state machine
//!
//! The machine owns the connection handle and the strip buffers. Each call
//! to [`StripMachine::step`] runs the handler of the current state once:
//!
//! | State          | Cycle                                              |
//! |----------------|----------------------------------------------------|
//! | `Disconnected` | make sure no port is open                          |
//! | `Connecting`   | try to open the target port, stay on failure       |
//! | `Connected`    | read, decode, rebuild buffers, apply fail policy   |
//! | `Exiting`      | nothing, terminal                                  |

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::handle::{ConnectionHandle, FAIL_THRESHOLD, ReadOutcome};
use crate::builder::PixelBufferBuilder;
use crate::color;
use crate::config::SimulatorConfig;
use crate::transport::{LinkSettings, PortBackend, PortScanner};
use crate::types::{
    ConnectionState, DerivedBuffers, DerivedKind, STRIP_HEIGHT, STRIP_WIDTH, ScalingExponent,
    StripBuffer, StripSnapshot,
};
use crate::Result;

/// Transition requests gathered since the previous cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlRequests {
    /// Port to connect to
    pub connect: Option<String>,
    pub disconnect: bool,
}

impl ControlRequests {
    pub fn is_empty(&self) -> bool {
        self.connect.is_none() && !self.disconnect
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do while disconnected
    Idle,
    /// Port open failed, will retry next cycle
    RetryPending,
    /// Port opened
    Connected,
    /// A frame was decoded and the buffers were rebuilt
    Frame,
    /// The read produced no tokens
    Empty,
    /// The failure threshold was crossed and the port was closed
    ForcedDisconnect,
    /// Terminal state reached
    Finished,
}

impl CycleOutcome {
    /// Whether the driver should pause before the next cycle.
    pub fn should_wait(self) -> bool {
        matches!(self, CycleOutcome::Idle | CycleOutcome::RetryPending)
    }
}

/// Device lifecycle plus the strip image it produces.
pub struct StripMachine {
    scanner: PortScanner,
    link: LinkSettings,
    state: ConnectionState,
    target: Option<String>,
    open_attempts: u32,
    handle: ConnectionHandle,
    builder: PixelBufferBuilder,
    primary: Arc<StripBuffer>,
    derived: DerivedBuffers,
    sequence: u64,
    changed: bool,
}

impl StripMachine {
    pub fn new(scanner: PortScanner, link: LinkSettings) -> Self {
        let primary = Arc::new(StripBuffer::blank());
        let derived = color::derive(&primary);
        Self {
            scanner,
            link,
            state: ConnectionState::Disconnected,
            target: None,
            open_attempts: 0,
            handle: ConnectionHandle::new(),
            builder: PixelBufferBuilder::new(STRIP_WIDTH, STRIP_HEIGHT),
            primary,
            derived,
            sequence: 0,
            changed: true,
        }
    }

    pub fn from_config(backend: Arc<dyn PortBackend>, config: &SimulatorConfig) -> Self {
        let scanner = PortScanner::new(backend, config.reserved_ports.clone());
        Self::new(scanner, config.link_settings())
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Port in use: the open port when connected, the target when connecting.
    pub fn port(&self) -> Option<&str> {
        match self.state {
            ConnectionState::Connected => Some(self.handle.port()),
            ConnectionState::Connecting => self.target.as_deref(),
            _ => None,
        }
    }

    pub fn failures(&self) -> u32 {
        self.handle.failures()
    }

    pub fn is_port_open(&self) -> bool {
        self.handle.is_open()
    }

    pub fn scanner(&self) -> &PortScanner {
        &self.scanner
    }

    /// Connectable ports, sentinel and reserved ids removed.
    pub fn scan(&self) -> Result<Vec<String>> {
        self.scanner.scan()
    }

    /// `Disconnected -> Connecting`, or retarget while already connecting.
    ///
    /// Ignored while connected or exiting.
    pub fn request_connect(&mut self, port: &str) -> Result<()> {
        self.scanner.check_target(port)?;

        match self.state {
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                self.target = Some(port.to_string());
                self.open_attempts = 0;
                self.set_state(ConnectionState::Connecting);
            }
            ConnectionState::Connected => {
                debug!(port, current = self.handle.port(), "Connect ignored while connected");
            }
            ConnectionState::Exiting => {
                debug!(port, "Connect ignored while exiting");
            }
        }
        Ok(())
    }

    /// Request a connection to `port` and make one open attempt.
    ///
    /// Returns whether the machine ends up connected to `port`. On failure
    /// the machine stays in `Connecting` and retries on later cycles.
    pub async fn connect(&mut self, port: &str) -> bool {
        if let Err(e) = self.request_connect(port) {
            warn!("{}", e);
            return false;
        }
        match self.state {
            ConnectionState::Connecting => self.try_open().await == CycleOutcome::Connected,
            ConnectionState::Connected => self.handle.port() == port,
            _ => false,
        }
    }

    /// Close the port and return to `Disconnected` with a blank strip.
    ///
    /// Idempotent. Does nothing once exiting.
    pub fn disconnect(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let was = self.state;
        self.handle.close();
        self.target = None;
        self.open_attempts = 0;
        if was != ConnectionState::Disconnected {
            self.reset_buffers();
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// Close everything and enter the terminal state.
    pub fn exit(&mut self) {
        self.handle.close();
        self.target = None;
        self.set_state(ConnectionState::Exiting);
    }

    /// Apply level-triggered requests: disconnect first, then connect.
    pub fn apply(&mut self, requests: ControlRequests) {
        if requests.disconnect {
            self.disconnect();
        }
        if let Some(port) = requests.connect {
            if let Err(e) = self.request_connect(&port) {
                warn!("{}", e);
            }
        }
    }

    /// Run one cycle of the current state.
    pub async fn step(&mut self, scaling: ScalingExponent) -> CycleOutcome {
        let outcome = match self.state {
            ConnectionState::Disconnected => {
                if self.handle.is_open() {
                    self.handle.close();
                }
                CycleOutcome::Idle
            }
            ConnectionState::Connecting => self.try_open().await,
            ConnectionState::Connected => self.read_cycle(scaling).await,
            ConnectionState::Exiting => CycleOutcome::Finished,
        };

        debug_assert!(
            self.state.holds_port() || !self.handle.is_open(),
            "port left open in state {}",
            self.state
        );
        outcome
    }

    /// One decode-and-rebuild cycle. Returns whether a frame was decoded.
    ///
    /// Only reads while connected. The sixth consecutive empty read closes
    /// the port and returns the machine to `Disconnected`.
    pub async fn tick(&mut self, scaling: ScalingExponent) -> bool {
        self.read_cycle(scaling).await == CycleOutcome::Frame
    }

    pub fn latest_primary_buffer(&self) -> Arc<StripBuffer> {
        Arc::clone(&self.primary)
    }

    pub fn latest_derived_buffer(&self, kind: DerivedKind) -> Arc<StripBuffer> {
        Arc::clone(self.derived.get(kind))
    }

    pub fn snapshot(&self) -> StripSnapshot {
        StripSnapshot {
            state: self.state,
            port: self.port().map(str::to_string),
            primary: Arc::clone(&self.primary),
            derived: self.derived.clone(),
            sequence: self.sequence,
            failures: self.handle.failures(),
        }
    }

    /// Whether anything visible changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    async fn try_open(&mut self) -> CycleOutcome {
        let Some(port) = self.target.clone() else {
            warn!("Connecting without a target port, returning to disconnected");
            self.set_state(ConnectionState::Disconnected);
            return CycleOutcome::Idle;
        };

        self.open_attempts += 1;
        match self.scanner.backend().open(&port, self.link).await {
            Ok(transport) => {
                self.handle.attach(transport);
                info!(port = %port, attempts = self.open_attempts, "Connected");
                self.open_attempts = 0;
                self.set_state(ConnectionState::Connected);
                CycleOutcome::Connected
            }
            Err(e) => {
                // Log the first failure loudly, then periodically
                if self.open_attempts == 1 {
                    warn!("{} - retrying", e);
                } else if self.open_attempts % 20 == 0 {
                    debug!(attempts = self.open_attempts, "Still unable to open {}", port);
                }
                CycleOutcome::RetryPending
            }
        }
    }

    async fn read_cycle(&mut self, scaling: ScalingExponent) -> CycleOutcome {
        if self.state != ConnectionState::Connected {
            return CycleOutcome::Idle;
        }

        match self.handle.read_frame().await {
            ReadOutcome::Frame(frame) => {
                let primary = Arc::make_mut(&mut self.primary);
                let layout = self.builder.apply(primary, &frame, scaling);
                self.derived = color::derive(&self.primary);
                self.sequence += 1;
                self.changed = true;

                trace!(
                    sequence = self.sequence,
                    tokens = frame.token_count(),
                    malformed = frame.malformed_count(),
                    segment_width = layout.segment_width,
                    "Strip updated"
                );
                CycleOutcome::Frame
            }
            ReadOutcome::Empty { failures } => {
                debug!(failures, threshold = FAIL_THRESHOLD, "Empty frame");
                self.changed = true;
                CycleOutcome::Empty
            }
            ReadOutcome::Exhausted => {
                warn!(
                    port = self.handle.port(),
                    "No frames after {} consecutive empty reads, disconnecting",
                    FAIL_THRESHOLD + 1
                );
                self.disconnect();
                CycleOutcome::ForcedDisconnect
            }
        }
    }

    fn reset_buffers(&mut self) {
        self.primary = Arc::new(StripBuffer::blank());
        self.derived = color::derive(&self.primary);
        self.changed = true;
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!("State {} -> {}", self.state, next);
            self.state = next;
            self.changed = true;
        }
    }
}

impl std::fmt::Debug for StripMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripMachine")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("handle", &self.handle)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
