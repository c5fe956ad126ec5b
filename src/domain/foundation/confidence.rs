//! Confidence value object (0.0-1.0 scale).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::ValidationError;

/// A probability-like score between 0.0 and 1.0 inclusive.
///
/// Every score the engine produces (layer scores, fused scam-confidence,
/// artifact confidence) travels as a `Confidence`, so out-of-range values
/// cannot leak past construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Zero confidence.
    pub const ZERO: Self = Self(0.0);

    /// Full confidence.
    pub const ONE: Self = Self(1.0);

    /// Creates a Confidence, clamping to the valid range.
    ///
    /// NaN maps to zero. Use only where clamping is the documented rule
    /// (fusion output, artifact scoring); elsewhere prefer [`Confidence::try_new`].
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Creates a Confidence, returning error if out of range or NaN.
    pub fn try_new(value: f64) -> Result<Self, ValidationError> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::invalid_format(
                "confidence",
                format!("{} is outside [0, 1]", value),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns the larger of two confidences.
    pub fn max(self, other: Confidence) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }

    /// Returns `1 - self`.
    pub fn complement(&self) -> Self {
        Self(1.0 - self.0)
    }

    /// True when this confidence meets or exceeds `threshold`.
    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
