//! Line protocol decoder
//!
//! One serial line is one frame: whitespace-separated tokens, each token a
//! comma-separated `ch0,ch1,ch2` triple of decimal integers in 0..=255.
//!
//! ```text
//! 10,20,30 40,50,60 255,0,0\n
//! ```
//!
//! Decoding is partial-success. A token that does not parse keeps its slot
//! in the frame as `None` so the pixels after it stay in position, and the
//! strip segment it would have painted keeps its previous color. Only a line
//! with no tokens at all is rejected.

use tracing::trace;

use crate::types::PixelSample;
use crate::{Result, SimulatorError};

/// Decoded frame: one slot per token, `None` where the token was malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    slots: Vec<Option<PixelSample>>,
}

impl DecodedFrame {
    /// Build a frame from explicit slots. Returns `EmptyFrame` for no slots.
    pub fn from_slots(slots: Vec<Option<PixelSample>>) -> Result<Self> {
        if slots.is_empty() {
            return Err(SimulatorError::EmptyFrame);
        }
        Ok(Self { slots })
    }

    /// Number of tokens on the line, malformed ones included.
    pub fn token_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of tokens that decoded into a sample.
    pub fn valid_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn malformed_count(&self) -> usize {
        self.token_count() - self.valid_count()
    }

    pub fn slots(&self) -> &[Option<PixelSample>] {
        &self.slots
    }

    /// Samples with their token index, skipping malformed slots.
    pub fn samples(&self) -> impl Iterator<Item = (usize, PixelSample)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.map(|sample| (i, sample)))
    }
}

/// Decode one raw line into a frame.
///
/// Bytes are read as lossy UTF-8; the trailing line delimiter is treated as
/// whitespace. Returns [`SimulatorError::EmptyFrame`] when the line holds no
/// tokens, which also covers a read that produced no bytes.
pub fn decode_line(line: &[u8]) -> Result<DecodedFrame> {
    let text = String::from_utf8_lossy(line);

    let slots: Vec<Option<PixelSample>> = text
        .split_whitespace()
        .map(|token| match parse_token(token) {
            Ok(sample) => Some(sample),
            Err(e) => {
                trace!("Skipping token: {}", e);
                None
            }
        })
        .collect();

    DecodedFrame::from_slots(slots)
}

/// Parse a single `ch0,ch1,ch2` token.
///
/// At least three fields are required; fields past the third are ignored.
pub fn parse_token(token: &str) -> Result<PixelSample> {
    let mut fields = token.split(',');
    let mut channels = [0u8; 3];

    for (index, channel) in channels.iter_mut().enumerate() {
        let field = fields.next().ok_or_else(|| {
            SimulatorError::malformed_token(token, format!("expected 3 fields, found {index}"))
        })?;
        *channel = field.parse::<u8>().map_err(|e| {
            SimulatorError::malformed_token(token, format!("channel {index} '{field}': {e}"))
        })?;
    }

    Ok(PixelSample::from(channels))
}
