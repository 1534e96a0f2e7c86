//! Core types for the strip image pipeline.
//!
//! ## Architecture
//!
//! - [`PixelSample`] is one decoded wire token, kept in wire channel order
//! - [`StripBuffer`] is the fixed 850 x 100 image the samples are stretched into
//! - [`ScalingExponent`] is the validated intensity exponent applied per channel
//! - [`StripSnapshot`] bundles the primary and derived buffers for readers
//! - [`ConnectionState`] is the lifecycle the worker moves through
//!
//! ## Usage Example
//!
//! ```rust
//! use nanolux_sim::types::{PixelSample, StripBuffer, STRIP_WIDTH};
//!
//! let sample = PixelSample::new(10, 20, 30);
//! let mut buffer = StripBuffer::blank();
//! buffer.fill_columns(0..STRIP_WIDTH / 2, sample.to_internal());
//!
//! assert_eq!(buffer.column(0), Some([30, 20, 10]));
//! assert_eq!(buffer.column(STRIP_WIDTH - 1), Some([0, 0, 0]));
//! ```

mod pixel;
mod refresh_rate;
mod scaling;
mod snapshot;
mod state;
mod strip;

pub use pixel::PixelSample;
pub use refresh_rate::RefreshRate;
pub use scaling::ScalingExponent;
pub use snapshot::{DerivedBuffers, DerivedKind, StripSnapshot};
pub use state::ConnectionState;
pub use strip::{CHANNELS, Pixel, STRIP_HEIGHT, STRIP_WIDTH, StripBuffer};
