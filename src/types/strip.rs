//! Fixed-size strip image buffer

use std::ops::Range;

/// Logical width of the simulated strip in columns.
pub const STRIP_WIDTH: usize = 850;

/// Height of the rendered strip in rows.
pub const STRIP_HEIGHT: usize = 100;

/// Bytes per pixel (three 8-bit channels).
pub const CHANNELS: usize = 3;

/// One 3-channel pixel. Channel order depends on the buffer it lives in.
pub type Pixel = [u8; CHANNELS];

/// Row-major grid of 3-channel 8-bit pixels.
///
/// The primary buffer stores pixels in BGR order (the reverse of the wire
/// order). Derived buffers reuse this type with their own channel meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl StripBuffer {
    /// Create an all-zero buffer of the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height * CHANNELS] }
    }

    /// Create an all-zero buffer with the standard strip dimensions.
    pub fn blank() -> Self {
        Self::new(STRIP_WIDTH, STRIP_HEIGHT)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major bytes, `CHANNELS` per pixel.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * CHANNELS;
        let mut px = [0u8; CHANNELS];
        px.copy_from_slice(&self.data[start..start + CHANNELS]);
        Some(px)
    }

    /// Pixel of column `x` on the first row.
    ///
    /// Every row of a strip image carries the same colors, so the first row
    /// is representative of the whole column.
    pub fn column(&self, x: usize) -> Option<Pixel> {
        self.pixel(x, 0)
    }

    /// Paint `columns` on every row with `pixel`.
    ///
    /// The range is clamped to the buffer width.
    pub fn fill_columns(&mut self, columns: Range<usize>, pixel: Pixel) {
        let start = columns.start.min(self.width);
        let end = columns.end.min(self.width);
        if start >= end {
            return;
        }
        for row in 0..self.height {
            let row_base = row * self.width;
            let from = (row_base + start) * CHANNELS;
            let to = (row_base + end) * CHANNELS;
            for chunk in self.data[from..to].chunks_exact_mut(CHANNELS) {
                chunk.copy_from_slice(&pixel);
            }
        }
    }

    /// Reset every pixel to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Whether every byte is zero.
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Build a new buffer of the same dimensions by mapping every pixel.
    pub fn map_pixels<F>(&self, mut f: F) -> StripBuffer
    where
        F: FnMut(Pixel) -> Pixel,
    {
        let mut data = Vec::with_capacity(self.data.len());
        for chunk in self.data.chunks_exact(CHANNELS) {
            data.extend_from_slice(&f([chunk[0], chunk[1], chunk[2]]));
        }
        StripBuffer { width: self.width, height: self.height, data }
    }

    /// Resize to `width` x `height` with nearest-neighbour sampling.
    ///
    /// Identity when the dimensions already match. An empty source yields
    /// an all-zero buffer.
    pub fn resized(&self, width: usize, height: usize) -> StripBuffer {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = StripBuffer::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }
        for y in 0..height {
            let src_y = y * self.height / height;
            for x in 0..width {
                let src_x = x * self.width / width;
                let src = (src_y * self.width + src_x) * CHANNELS;
                let dst = (y * width + x) * CHANNELS;
                out.data[dst..dst + CHANNELS].copy_from_slice(&self.data[src..src + CHANNELS]);
            }
        }
        out
    }

    /// Resize in place so the buffer is exactly `width` x `height`.
    pub fn normalize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            *self = self.resized(width, height);
        }
    }
}

impl Default for StripBuffer {
    fn default() -> Self {
        Self::blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_has_strip_dimensions() {
        let buffer = StripBuffer::blank();
        assert_eq!(buffer.width(), STRIP_WIDTH);
        assert_eq!(buffer.height(), STRIP_HEIGHT);
        assert_eq!(buffer.as_bytes().len(), STRIP_WIDTH * STRIP_HEIGHT * CHANNELS);
        assert!(buffer.is_zeroed());
    }

    #[test]
    fn fill_columns_paints_every_row() {
        let mut buffer = StripBuffer::new(10, 4);
        buffer.fill_columns(2..5, [1, 2, 3]);

        for y in 0..4 {
            assert_eq!(buffer.pixel(1, y), Some([0, 0, 0]));
            for x in 2..5 {
                assert_eq!(buffer.pixel(x, y), Some([1, 2, 3]));
            }
            assert_eq!(buffer.pixel(5, y), Some([0, 0, 0]));
        }
    }

    #[test]
    fn fill_columns_clamps_to_width() {
        let mut buffer = StripBuffer::new(4, 1);
        buffer.fill_columns(3..100, [9, 9, 9]);
        assert_eq!(buffer.column(3), Some([9, 9, 9]));
        buffer.fill_columns(50..60, [1, 1, 1]);
        assert_eq!(buffer.column(3), Some([9, 9, 9]));
    }

    #[test]
    fn out_of_bounds_pixel_is_none() {
        let buffer = StripBuffer::new(3, 2);
        assert_eq!(buffer.pixel(3, 0), None);
        assert_eq!(buffer.pixel(0, 2), None);
    }

    #[test]
    fn resize_nearest_neighbour() {
        let mut buffer = StripBuffer::new(2, 1);
        buffer.fill_columns(0..1, [10, 10, 10]);
        buffer.fill_columns(1..2, [20, 20, 20]);

        let resized = buffer.resized(4, 3);
        assert_eq!(resized.width(), 4);
        assert_eq!(resized.height(), 3);
        for y in 0..3 {
            assert_eq!(resized.pixel(0, y), Some([10, 10, 10]));
            assert_eq!(resized.pixel(1, y), Some([10, 10, 10]));
            assert_eq!(resized.pixel(2, y), Some([20, 20, 20]));
            assert_eq!(resized.pixel(3, y), Some([20, 20, 20]));
        }
    }

    #[test]
    fn normalize_is_identity_at_target_size() {
        let mut buffer = StripBuffer::blank();
        buffer.fill_columns(0..425, [30, 20, 10]);
        let before = buffer.clone();
        buffer.normalize(STRIP_WIDTH, STRIP_HEIGHT);
        assert_eq!(buffer, before);
    }

    #[test]
    fn normalize_transposed_buffer() {
        let mut buffer = StripBuffer::new(STRIP_HEIGHT, STRIP_WIDTH);
        buffer.normalize(STRIP_WIDTH, STRIP_HEIGHT);
        assert_eq!(buffer.width(), STRIP_WIDTH);
        assert_eq!(buffer.height(), STRIP_HEIGHT);
    }

    #[test]
    fn map_pixels_keeps_dimensions() {
        let mut buffer = StripBuffer::new(3, 2);
        buffer.fill_columns(0..3, [1, 2, 3]);
        let mapped = buffer.map_pixels(|[a, b, c]| [c, b, a]);
        assert_eq!(mapped.width(), 3);
        assert_eq!(mapped.height(), 2);
        assert_eq!(mapped.pixel(2, 1), Some([3, 2, 1]));
    }
}
