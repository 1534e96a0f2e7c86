//! Snapshot stream helpers

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::types::{RefreshRate, StripSnapshot};

/// Stream of published snapshots at the requested rate.
///
/// Yields the current snapshot immediately, then each newer one.
pub fn snapshot_stream(
    snapshots: watch::Receiver<Arc<StripSnapshot>>,
    rate: RefreshRate,
) -> BoxStream<'static, Arc<StripSnapshot>> {
    let stream = WatchStream::new(snapshots);
    match rate.interval() {
        None => stream.boxed(),
        Some(period) => stream.throttle(period).boxed(),
    }
}
