//! Refresh rate control for snapshot subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants to observe snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshRate {
    /// Every published snapshot
    EveryFrame,

    /// At most this many snapshots per second, latest wins
    Max(u32),
}

impl RefreshRate {
    /// Sampling interval, `None` when every snapshot is delivered.
    ///
    /// `Max(0)` is treated as `EveryFrame`.
    pub fn interval(self) -> Option<Duration> {
        match self {
            RefreshRate::EveryFrame | RefreshRate::Max(0) => None,
            RefreshRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

impl Default for RefreshRate {
    /// 20 Hz, the front-end's 50 ms repaint timer.
    fn default() -> Self {
        RefreshRate::Max(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        assert_eq!(RefreshRate::EveryFrame.interval(), None);
        assert_eq!(RefreshRate::Max(0).interval(), None);
        assert_eq!(RefreshRate::Max(20).interval(), Some(Duration::from_millis(50)));
        assert_eq!(RefreshRate::default(), RefreshRate::Max(20));
    }
}
