//! Pixel buffer construction
//!
//! A decoded frame with `N` tokens is stretched across the strip: each token
//! owns `floor(width / N)` columns and paints them with its scaled,
//! channel-reversed color. Columns past `N * floor(width / N)` are not
//! touched and keep whatever the previous frame left there.

use std::ops::Range;

use tracing::trace;

use crate::decoder::DecodedFrame;
use crate::types::{Pixel, PixelSample, ScalingExponent, StripBuffer};

/// Column width of one token: `floor(total_width / token_count)`.
///
/// Zero when there are more tokens than columns.
pub fn column_width(total_width: usize, token_count: usize) -> usize {
    if token_count == 0 { 0 } else { total_width / token_count }
}

/// Precomputed channel mapping for one exponent.
#[derive(Debug, Clone)]
pub struct ScalingTable {
    exponent: ScalingExponent,
    lut: [u8; 256],
}

impl ScalingTable {
    pub fn new(exponent: ScalingExponent) -> Self {
        let mut lut = [0u8; 256];
        for (value, slot) in (0..=u8::MAX).zip(lut.iter_mut()) {
            *slot = exponent.apply(value);
        }
        Self { exponent, lut }
    }

    pub fn exponent(&self) -> ScalingExponent {
        self.exponent
    }

    pub fn scale(&self, value: u8) -> u8 {
        self.lut[usize::from(value)]
    }

    /// Scale a sample and reorder it into internal channel order.
    pub fn render(&self, sample: PixelSample) -> Pixel {
        sample.to_internal().map(|channel| self.scale(channel))
    }
}

/// Where a frame landed on the strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    /// Columns per token
    pub segment_width: usize,

    /// Number of segments painted (malformed tokens excluded)
    pub painted: usize,

    /// Columns that kept their previous contents because of integer division
    pub leftover: Range<usize>,
}

/// Writes decoded frames into a strip buffer.
///
/// Caches the scaling table for the last exponent used, so repeated frames
/// at the same exponent skip the `powf` work.
#[derive(Debug, Clone)]
pub struct PixelBufferBuilder {
    width: usize,
    height: usize,
    table: ScalingTable,
}

impl PixelBufferBuilder {
    /// Builder producing buffers of `width` x `height`.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, table: ScalingTable::new(ScalingExponent::IDENTITY) }
    }

    /// Paint `frame` into `buffer`, then normalize it to the builder's size.
    pub fn apply(
        &mut self,
        buffer: &mut StripBuffer,
        frame: &DecodedFrame,
        scaling: ScalingExponent,
    ) -> FrameLayout {
        if self.table.exponent() != scaling {
            self.table = ScalingTable::new(scaling);
        }

        let tokens = frame.token_count();
        let segment_width = column_width(self.width, tokens);
        let mut painted = 0;

        if segment_width > 0 {
            for (index, sample) in frame.samples() {
                let start = index * segment_width;
                buffer.fill_columns(start..start + segment_width, self.table.render(sample));
                painted += 1;
            }
        }

        buffer.normalize(self.width, self.height);

        let covered = (tokens * segment_width).min(self.width);
        let layout = FrameLayout { segment_width, painted, leftover: covered..self.width };

        trace!(
            tokens,
            segment_width,
            painted,
            leftover = layout.leftover.len(),
            "Frame applied to strip"
        );

        layout
    }
}
