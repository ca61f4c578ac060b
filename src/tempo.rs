//! # Tempo Ratio Policy
//!
//! Audio speed uses the same `1 + 0.05 × steps` formula as the chart, driven
//! by its own step counter. Two ways of applying it:
//!
//! - [`StretchMode::PreservePitch`]: time-stretch keeping pitch. The stretch
//!   filter only supports ratios in `[0.5, 2.0]`; anything outside fails with
//!   [`SpeedError::UnsupportedRatio`] before the transform is invoked.
//! - [`StretchMode::ShiftPitch`]: reinterpret the sample rate by the ratio and
//!   resample to a fixed output rate. Any positive ratio works; pitch moves
//!   with speed.

use std::fmt;

use num_rational::Ratio;
use tracing::warn;

use crate::audio::{AudioTransform, PcmAudio};
use crate::error::{SpeedError, SpeedResult};
use crate::speed::{Multiplier, SpeedState};

/// Output sample rate for pitch-shifting resamples.
pub const DEFAULT_OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Speed ratio for an audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TempoRatio(Multiplier);

impl TempoRatio {
    pub fn from_steps(steps: i64) -> Self {
        TempoRatio(Multiplier::from_steps(steps))
    }

    pub fn from_state(state: &SpeedState) -> Self {
        TempoRatio(state.multiplier())
    }

    pub fn as_ratio(&self) -> Ratio<i128> {
        self.0.as_ratio()
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64()
    }

    pub fn is_unity(&self) -> bool {
        self.0 == Multiplier::ONE
    }

    /// True when a pitch-preserving stretch can handle this ratio.
    pub fn is_stretchable(&self) -> bool {
        let ratio = self.as_ratio();
        ratio >= Ratio::new(1, 2) && ratio <= Ratio::from_integer(2)
    }

    pub fn is_positive(&self) -> bool {
        *self.as_ratio().numer() > 0
    }

    /// `Err(UnsupportedRatio)` unless the ratio is within `[0.5, 2.0]`.
    pub fn check_stretchable(&self) -> SpeedResult<()> {
        if self.is_stretchable() {
            Ok(())
        } else {
            Err(SpeedError::UnsupportedRatio {
                ratio: self.to_string(),
            })
        }
    }
}

impl fmt::Display for TempoRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// How an audio speed change is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchMode {
    PreservePitch,
    ShiftPitch,
}

impl StretchMode {
    pub fn from_preserve_pitch(preserve_pitch: bool) -> Self {
        if preserve_pitch {
            StretchMode::PreservePitch
        } else {
            StretchMode::ShiftPitch
        }
    }
}

/// Apply `ratio` to `audio` through `transform`.
///
/// Range checks happen here; a refused ratio never reaches the transform.
pub fn apply_tempo(
    transform: &dyn AudioTransform,
    audio: &PcmAudio,
    ratio: TempoRatio,
    mode: StretchMode,
    output_sample_rate: u32,
) -> SpeedResult<PcmAudio> {
    match mode {
        StretchMode::PreservePitch => {
            if let Err(e) = ratio.check_stretchable() {
                warn!(ratio = %ratio, "refusing pitch-preserving stretch");
                return Err(e);
            }
            transform.stretch_preserving_pitch(audio, ratio)
        }
        StretchMode::ShiftPitch => {
            if !ratio.is_positive() {
                warn!(ratio = %ratio, "refusing non-positive resample ratio");
                return Err(SpeedError::UnsupportedRatio {
                    ratio: ratio.to_string(),
                });
            }
            transform.resample_shifting_pitch(audio, ratio, output_sample_rate)
        }
    }
}
