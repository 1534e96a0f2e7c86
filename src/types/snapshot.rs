//! Published strip snapshots

use std::sync::Arc;

use super::state::ConnectionState;
use super::strip::StripBuffer;

/// Which derived rendering to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedKind {
    /// Hue/saturation/value, 8-bit convention (hue in degrees / 2)
    Hsv,
    /// Primary buffer with channels reordered to RGB display order
    Rgb,
}

/// Alternate color-space renderings of the primary buffer.
///
/// Always regenerated as a pair from the primary buffer, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedBuffers {
    pub hsv: Arc<StripBuffer>,
    pub rgb: Arc<StripBuffer>,
}

impl DerivedBuffers {
    pub fn get(&self, kind: DerivedKind) -> &Arc<StripBuffer> {
        match kind {
            DerivedKind::Hsv => &self.hsv,
            DerivedKind::Rgb => &self.rgb,
        }
    }
}

/// Immutable view of the simulator, published as a whole after each change.
///
/// Readers holding an `Arc<StripSnapshot>` never observe a partially
/// written buffer: the worker builds a new snapshot and swaps it in.
#[derive(Debug, Clone)]
pub struct StripSnapshot {
    /// Lifecycle state at publication time
    pub state: ConnectionState,

    /// Port the machine is connected or connecting to
    pub port: Option<String>,

    /// Primary buffer, BGR channel order
    pub primary: Arc<StripBuffer>,

    /// HSV and RGB renderings of `primary`
    pub derived: DerivedBuffers,

    /// Number of frames decoded since the simulator started
    pub sequence: u64,

    /// Consecutive empty reads on the current connection
    pub failures: u32,
}

impl StripSnapshot {
    pub fn derived(&self, kind: DerivedKind) -> &Arc<StripBuffer> {
        self.derived.get(kind)
    }
}
