//! Per-token pixel samples

use super::strip::Pixel;

/// One pixel as received on the wire.
///
/// Channels are kept in wire order (`ch0, ch1, ch2`). The strip buffer
/// stores them reversed, see [`PixelSample::to_internal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSample {
    wire: [u8; 3],
}

impl PixelSample {
    pub const fn new(ch0: u8, ch1: u8, ch2: u8) -> Self {
        Self { wire: [ch0, ch1, ch2] }
    }

    /// Channels in the order they appeared on the wire.
    pub const fn wire(self) -> [u8; 3] {
        self.wire
    }

    /// Channels in internal buffer order: wire ch0 lands in channel 2,
    /// ch1 in channel 1, ch2 in channel 0.
    pub const fn to_internal(self) -> Pixel {
        [self.wire[2], self.wire[1], self.wire[0]]
    }
}

impl From<[u8; 3]> for PixelSample {
    fn from(wire: [u8; 3]) -> Self {
        Self { wire }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_order_is_reversed() {
        let sample = PixelSample::new(10, 20, 30);
        assert_eq!(sample.wire(), [10, 20, 30]);
        assert_eq!(sample.to_internal(), [30, 20, 10]);
    }
}
