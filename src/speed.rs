//! # Speed State
//!
//! A speed change is a whole number of 5% steps. The multiplier for a step
//! count is always derived fresh as `1 + 0.05 × steps`; it is never stored or
//! updated incrementally, so any sequence of actions with the same net step
//! count produces the same multiplier.

use std::fmt;

use num_rational::Ratio;

use crate::decimal::{pow10, DecimalError, DecimalQuantity};

/// Steps per unit of multiplier: one step is 1/20 = 0.05.
const STEPS_PER_UNIT: i128 = 20;

/// Exact speed factor `1 + 0.05 × steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multiplier(Ratio<i128>);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(Ratio::new_raw(1, 1));

    pub fn from_steps(steps: i64) -> Self {
        Multiplier(Ratio::new(
            STEPS_PER_UNIT + i128::from(steps),
            STEPS_PER_UNIT,
        ))
    }

    pub fn as_ratio(&self) -> Ratio<i128> {
        self.0
    }

    /// The multiplier rounded to `precision` fractional digits.
    ///
    /// Fails with [`DecimalError::TooLarge`] when the scaled value leaves
    /// 128-bit range.
    pub fn to_decimal(&self, precision: u32) -> Result<DecimalQuantity, DecimalError> {
        let scaled = self
            .0
            .numer()
            .checked_mul(pow10(precision)?)
            .ok_or(DecimalError::TooLarge)?;
        let rounded = Ratio::new(scaled, *self.0.denom()).round().to_integer();
        Ok(DecimalQuantity::new(rounded, precision))
    }

    /// Lossy conversion for audio tooling that wants a float.
    pub fn to_f64(&self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal(4) {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

/// A step counter: increase, decrease, reset.
///
/// No clamping. Domain limits (such as the pitch-preserving stretch range)
/// are enforced by whoever consumes the multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeedState {
    steps: i64,
}

impl SpeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: i64) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> i64 {
        self.steps
    }

    pub fn increase(&mut self) {
        self.adjust(1);
    }

    pub fn decrease(&mut self) {
        self.adjust(-1);
    }

    pub fn adjust(&mut self, delta: i64) {
        self.steps = self.steps.saturating_add(delta);
    }

    pub fn reset(&mut self) {
        self.steps = 0;
    }

    pub fn multiplier(&self) -> Multiplier {
        Multiplier::from_steps(self.steps)
    }
}
