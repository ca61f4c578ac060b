pub mod audio;
pub mod config;
pub mod decimal;
pub mod document;
pub mod error;
pub mod session;
pub mod speed;
pub mod tag;
pub mod tempo;

pub use audio::{AudioCodec, AudioFormat, AudioTransform, Ffmpeg, PcmAudio};
pub use config::SpeedConfig;
pub use decimal::{rescale, DecimalError, DecimalQuantity};
pub use document::{rescale_document, Baseline, BaselineOrigin, ChartDocument, DEFAULT_BASELINE};
pub use error::*;
pub use session::{SaveReport, SaveTargets, Session, SpeedReport};
pub use speed::{Multiplier, SpeedState};
pub use tag::{TagMatcher, TimingTag};
pub use tempo::{apply_tempo, StretchMode, TempoRatio};

/// Rescale a chart's `t=` tags by `steps` 5% steps.
/// This is the main entry point for the library.
pub fn rescale_chart(source: &str, steps: i64) -> Result<String, SpeedError> {
    let chart = ChartDocument::parse(source);
    Ok(chart.rescale(Multiplier::from_steps(steps))?.concat())
}

/// Rescale with a custom tag name and fallback baseline from `config`.
pub fn rescale_chart_with(source: &str, steps: i64, config: &SpeedConfig) -> Result<String, SpeedError> {
    let chart = ChartDocument::parse_with(source, config.matcher(), config.baseline()?);
    Ok(chart.rescale(Multiplier::from_steps(steps))?.concat())
}
