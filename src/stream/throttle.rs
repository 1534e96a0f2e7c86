//! Latest-wins rate limiting for snapshot streams

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most one item per `period`.
    ///
    /// Items arriving between ticks replace each other, only the newest is
    /// emitted. A tick with nothing new waits for the next item instead of
    /// ending the stream. When the source ends, its last item is flushed.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream returned by [`ThrottleExt::throttle`]
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        latest: Option<S::Item>,
        ticked: bool,
        source_done: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, latest: None, ticked: false, source_done: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain whatever is ready, keeping only the newest
        while !*this.source_done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.source_done = true,
                Poll::Pending => break,
            }
        }

        if *this.source_done {
            return Poll::Ready(this.latest.take());
        }

        if !*this.ticked {
            ready!(this.interval.poll_tick(cx));
            *this.ticked = true;
        }

        match this.latest.take() {
            Some(item) => {
                *this.ticked = false;
                Poll::Ready(Some(item))
            }
            // The source registered our waker when it returned Pending
            None => Poll::Pending,
        }
    }
}
