//! Device connection layer
//!
//! [`ConnectionHandle`] owns the open port and the failure counter,
//! [`StripMachine`] drives the lifecycle and keeps the strip buffers.

mod handle;
mod machine;


pub use handle::{ConnectionHandle, FAIL_THRESHOLD, ReadOutcome};
pub use machine::{ControlRequests, CycleOutcome, StripMachine};
