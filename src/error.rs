//! # Error Types
//!
//! This module defines all error types for chart-speed.
//!
//! Errors carry the context a caller needs to act on them: the offending
//! tempo ratio, the fallback baseline that was used, or the 1-based line of
//! a tag whose value could not be rescaled.
//!
//! ## Error Types
//! - `MalformedBaseline` - No baseline tag in the chart; a default was used
//! - `UnsupportedRatio` - Pitch-preserving stretch requested outside [0.5, 2.0]
//! - `ValueOverflow` - A tag value too large to rescale exactly
//! - `UnsupportedAudioFormat` - Audio file with an unknown extension
//! - `Config` - Invalid YAML configuration
//! - `FfmpegNotFound` / `FfmpegFailed` - External audio tool problems
//! - `Resample` - Sample-rate conversion failure
//! - `Io` / `Wav` - File and WAV container errors
//!
//! Lines that do not look like timing tags are never errors; they pass
//! through unchanged.
//!
//! ## Usage
//! ```rust
//! use chart_speed::{apply_tempo, AudioTransform, PcmAudio, SpeedError, StretchMode, TempoRatio};
//! # fn run(transform: &dyn AudioTransform, audio: &PcmAudio) {
//! match apply_tempo(transform, audio, TempoRatio::from_steps(25), StretchMode::PreservePitch, 44100) {
//!     Ok(stretched) => println!("{} frames", stretched.frames()),
//!     Err(SpeedError::UnsupportedRatio { ratio }) => {
//!         eprintln!("cannot keep pitch at {}x", ratio);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type for chart-speed operations.
pub type SpeedResult<T> = Result<T, SpeedError>;

#[derive(Error, Debug)]
pub enum SpeedError {
    /// No baseline tag was found when the chart was loaded.
    ///
    /// Not fatal: the chart still loads and the fallback value is used for
    /// reporting. Returned by [`crate::Baseline::check`] so hosts can surface it once.
    ///
    /// # Example
    /// ```
    /// # use chart_speed::SpeedError;
    /// let err = SpeedError::MalformedBaseline {
    ///     tag: "t".to_string(),
    ///     fallback: "100".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "No baseline 't=' tag found, using default 100");
    /// ```
    #[error("No baseline '{tag}=' tag found, using default {fallback}")]
    MalformedBaseline { tag: String, fallback: String },

    /// Pitch-preserving stretch requested outside the supported range.
    ///
    /// # Example
    /// ```
    /// # use chart_speed::SpeedError;
    /// let err = SpeedError::UnsupportedRatio { ratio: "2.0500".to_string() };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Pitch-preserving tempo adjustment only works between 0.5x and 2.0x (requested 2.0500x)"
    /// );
    /// ```
    #[error("Pitch-preserving tempo adjustment only works between 0.5x and 2.0x (requested {ratio}x)")]
    UnsupportedRatio { ratio: String },

    /// A tag value is too large to rescale with exact arithmetic.
    #[error("Timing value '{value}' at line {line} is too large to rescale")]
    ValueOverflow { line: usize, value: String },

    /// Audio file extension is not one of the supported formats.
    #[error("Unsupported audio format '{}': only .ogg, .mp3 and .wav are supported", path.display())]
    UnsupportedAudioFormat { path: PathBuf },

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No ffmpeg executable could be located.
    #[error("ffmpeg executable not found. Install ffmpeg, put it in PATH, or set FFMPEG_PATH")]
    FfmpegNotFound,

    /// ffmpeg ran but exited unsuccessfully.
    #[error("ffmpeg exited with status {status}: {stderr}")]
    FfmpegFailed { status: i32, stderr: String },

    /// The sinc resampler rejected its setup or a chunk.
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// WAV container error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
