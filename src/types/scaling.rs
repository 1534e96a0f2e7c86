//! Exponential intensity scaling

use serde::{Deserialize, Serialize};

use crate::{Result, SimulatorError};

/// Exponent applied to normalized channel values, in (0, 1].
///
/// A channel `v` maps to `round((v / 255)^s * 255)`. `s = 1` is the
/// identity; smaller exponents lift dark values toward full brightness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct ScalingExponent(f32);

impl ScalingExponent {
    /// `s = 1`, output equals input.
    pub const IDENTITY: Self = Self(1.0);

    /// Validate and wrap an exponent. NaN and values outside (0, 1] are rejected.
    pub fn new(value: f32) -> Result<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(SimulatorError::InvalidScaling { value })
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Scale one 8-bit channel value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(self, value: u8) -> u8 {
        let normalized = f64::from(value) / 255.0;
        (normalized.powf(f64::from(self.0)) * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

impl Default for ScalingExponent {
    fn default() -> Self {
        Self(0.5)
    }
}

impl TryFrom<f32> for ScalingExponent {
    type Error = SimulatorError;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ScalingExponent> for f32 {
    fn from(value: ScalingExponent) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(ScalingExponent::new(0.0).is_err());
        assert!(ScalingExponent::new(-0.5).is_err());
        assert!(ScalingExponent::new(1.01).is_err());
        assert!(ScalingExponent::new(f32::NAN).is_err());
        assert!(ScalingExponent::new(1.0).is_ok());
        assert!(ScalingExponent::new(0.1).is_ok());
    }

    #[test]
    fn identity_keeps_extremes() {
        assert_eq!(ScalingExponent::IDENTITY.apply(0), 0);
        assert_eq!(ScalingExponent::IDENTITY.apply(255), 255);
    }

    #[test]
    fn half_exponent_brightens() {
        let s = ScalingExponent::new(0.5).unwrap();
        // sqrt(64 / 255) * 255 = 127.75
        assert_eq!(s.apply(64), 128);
        assert_eq!(s.apply(0), 0);
        assert_eq!(s.apply(255), 255);
    }

    proptest! {
        #[test]
        fn identity_has_no_rounding_drift(v in any::<u8>()) {
            prop_assert_eq!(ScalingExponent::IDENTITY.apply(v), v);
        }

        #[test]
        fn scaling_never_darkens(v in any::<u8>(), s in 0.05f32..=1.0f32) {
            let exponent = ScalingExponent::new(s).unwrap();
            prop_assert!(exponent.apply(v) >= v);
        }
    }
}
