//! # Editing Session
//!
//! A [`Session`] is the state a host keeps between user actions: the loaded
//! chart snapshot, the loaded audio reference, and two independent step
//! counters (one for the chart, one for the audio). Hosts own it and pass it
//! around explicitly.
//!
//! ## Step routing
//! - Chart loaded: step actions move the chart counter, and also the audio
//!   counter when `link_audio_steps` is set.
//! - Audio only: step actions move the audio counter.
//! - `reset` zeroes both counters.
//!
//! ## Saving
//! Chart and audio are saved independently; a failure in one never stops
//! the other. See [`SaveReport`].

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::audio::{AudioCodec, AudioFormat, AudioTransform};
use crate::config::SpeedConfig;
use crate::decimal::DecimalQuantity;
use crate::document::{ChartDocument, DEFAULT_BASELINE};
use crate::error::{SpeedError, SpeedResult};
use crate::speed::{Multiplier, SpeedState};
use crate::tempo::{apply_tempo, StretchMode, TempoRatio};

/// A chart snapshot and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub path: Option<PathBuf>,
    pub document: ChartDocument,
}

/// An audio file reference. Decoding is deferred until save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAudio {
    pub path: PathBuf,
    pub format: AudioFormat,
}

/// Status line: original and current baseline, and the multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedReport {
    pub tag_name: String,
    pub original: DecimalQuantity,
    pub current: Option<DecimalQuantity>,
    pub multiplier: Multiplier,
}

impl fmt::Display for SpeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Original {}: {} | Current {}: ", self.tag_name, self.original, self.tag_name)?;
        match &self.current {
            Some(current) => write!(f, "{}", current)?,
            None => f.write_str("N/A")?,
        }
        write!(f, " | Multiplier: {}", self.multiplier)
    }
}

/// Where to write saved output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveTargets {
    pub chart: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

/// Outcome of [`Session::save_all`]. `None` means nothing of that kind was
/// loaded.
#[derive(Debug)]
pub struct SaveReport {
    pub chart: Option<SpeedResult<PathBuf>>,
    pub audio: Option<SpeedResult<PathBuf>>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.chart.as_ref().map_or(true, Result::is_ok)
            && self.audio.as_ref().map_or(true, Result::is_ok)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    config: SpeedConfig,
    chart: Option<LoadedChart>,
    audio: Option<LoadedAudio>,
    chart_speed: SpeedState,
    audio_speed: SpeedState,
    preserve_pitch: bool,
}

impl Session {
    pub fn new(config: SpeedConfig) -> Self {
        let preserve_pitch = config.preserve_pitch;
        Self {
            config,
            chart: None,
            audio: None,
            chart_speed: SpeedState::new(),
            audio_speed: SpeedState::new(),
            preserve_pitch,
        }
    }

    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    /// Load a chart from disk. The chart counter starts at 0.
    pub fn load_chart(&mut self, path: &Path) -> SpeedResult<&ChartDocument> {
        let document = ChartDocument::load(path, self.config.matcher(), self.config.baseline()?)?;
        Ok(self.set_chart(document, Some(path.to_path_buf())))
    }

    /// Install an already-parsed chart. The chart counter starts at 0.
    pub fn set_chart(&mut self, document: ChartDocument, path: Option<PathBuf>) -> &ChartDocument {
        if let Err(e) = document.baseline().check() {
            warn!("{}", e);
        }
        self.chart_speed.reset();
        &self.chart.insert(LoadedChart { path, document }).document
    }

    /// Reference an audio file. Both counters start at 0.
    pub fn load_audio(&mut self, path: &Path) -> SpeedResult<()> {
        let format = AudioFormat::from_path(path)?;
        self.audio = Some(LoadedAudio {
            path: path.to_path_buf(),
            format,
        });
        self.chart_speed.reset();
        self.audio_speed.reset();
        info!(path = %path.display(), ?format, "loaded audio");
        Ok(())
    }

    pub fn chart(&self) -> Option<&LoadedChart> {
        self.chart.as_ref()
    }

    pub fn audio(&self) -> Option<&LoadedAudio> {
        self.audio.as_ref()
    }

    pub fn is_audio_only(&self) -> bool {
        self.chart.is_none()
    }

    pub fn set_preserve_pitch(&mut self, preserve_pitch: bool) {
        self.preserve_pitch = preserve_pitch;
    }

    pub fn stretch_mode(&self) -> StretchMode {
        StretchMode::from_preserve_pitch(self.preserve_pitch)
    }

    pub fn increase(&mut self) {
        self.adjust(1);
    }

    pub fn decrease(&mut self) {
        self.adjust(-1);
    }

    /// Move the active counter(s) by `delta` steps.
    pub fn adjust(&mut self, delta: i64) {
        if self.is_audio_only() {
            self.audio_speed.adjust(delta);
        } else {
            self.chart_speed.adjust(delta);
            if self.config.link_audio_steps {
                self.audio_speed.adjust(delta);
            }
        }
    }

    pub fn reset(&mut self) {
        self.chart_speed.reset();
        self.audio_speed.reset();
    }

    pub fn chart_speed(&self) -> SpeedState {
        self.chart_speed
    }

    pub fn audio_speed(&self) -> SpeedState {
        self.audio_speed
    }

    /// Direct access to the chart counter, for hosts that drive it alone.
    pub fn chart_speed_mut(&mut self) -> &mut SpeedState {
        &mut self.chart_speed
    }

    /// Direct access to the audio counter, for hosts that drive it alone.
    pub fn audio_speed_mut(&mut self) -> &mut SpeedState {
        &mut self.audio_speed
    }

    pub fn tempo_ratio(&self) -> TempoRatio {
        TempoRatio::from_state(&self.audio_speed)
    }

    /// The chart rescaled for the current chart step count.
    ///
    /// Recomputed from the original snapshot on every call.
    pub fn working_document(&self) -> SpeedResult<Option<Vec<String>>> {
        self.chart
            .as_ref()
            .map(|chart| chart.document.rescale(self.chart_speed.multiplier()))
            .transpose()
    }

    pub fn report(&self) -> SpeedReport {
        let (baseline, speed) = match &self.chart {
            Some(chart) => (chart.document.baseline().value, self.chart_speed),
            None => (
                self.config.baseline().unwrap_or(DEFAULT_BASELINE),
                self.audio_speed,
            ),
        };
        let multiplier = speed.multiplier();
        let original = baseline.with_precision(3).unwrap_or(baseline);
        SpeedReport {
            tag_name: self.config.tag_name.clone(),
            original,
            current: original.rescale(multiplier).ok(),
            multiplier,
        }
    }

    /// Write the working chart to `dest`.
    pub fn save_chart(&self, dest: &Path) -> SpeedResult<Option<PathBuf>> {
        let working = match self.working_document()? {
            Some(working) => working,
            None => return Ok(None),
        };
        std::fs::write(dest, working.concat())?;
        info!(
            path = %dest.display(),
            steps = self.chart_speed.steps(),
            "saved chart"
        );
        Ok(Some(dest.to_path_buf()))
    }

    /// Decode the loaded audio, apply the audio tempo ratio and write it to
    /// `dest` in the source format.
    pub fn save_audio<E>(&self, engine: &E, dest: &Path) -> SpeedResult<Option<PathBuf>>
    where
        E: AudioTransform + AudioCodec,
    {
        let audio = match &self.audio {
            Some(audio) => audio,
            None => return Ok(None),
        };
        let ratio = self.tempo_ratio();
        let mode = self.stretch_mode();
        // Check before paying for a decode.
        if mode == StretchMode::PreservePitch {
            ratio.check_stretchable()?;
        }
        let decoded = engine.decode(&audio.path, audio.format)?;
        let adjusted = apply_tempo(engine, &decoded, ratio, mode, self.config.output_sample_rate)?;
        engine.encode(&adjusted, dest, audio.format)?;
        info!(path = %dest.display(), ratio = %ratio, ?mode, "saved audio");
        Ok(Some(dest.to_path_buf()))
    }

    /// Where the audio goes when no explicit destination is given.
    ///
    /// Beside the saved chart as `<chart-stem>_adjusted.<ext>`, otherwise
    /// beside the source audio as `<audio-stem>_adjusted.<ext>`.
    pub fn audio_destination(&self, chart_dest: Option<&Path>) -> Option<PathBuf> {
        let audio = self.audio.as_ref()?;
        let anchor = chart_dest.unwrap_or(&audio.path);
        let stem = anchor.file_stem()?.to_string_lossy();
        let name = format!("{}_adjusted.{}", stem, audio.format.extension());
        Some(anchor.with_file_name(name))
    }

    /// Save chart and audio independently.
    ///
    /// `engine` is only created when audio is loaded, so a missing ffmpeg
    /// never blocks the chart.
    pub fn save_all<E, F>(&self, targets: &SaveTargets, engine: F) -> SaveReport
    where
        E: AudioTransform + AudioCodec,
        F: FnOnce() -> SpeedResult<E>,
    {
        let chart = match (&self.chart, &targets.chart) {
            (Some(_), Some(dest)) => Some(
                self.save_chart(dest)
                    .map(|saved| saved.unwrap_or_else(|| dest.clone())),
            ),
            _ => None,
        };
        let chart_dest = match &chart {
            Some(Ok(path)) => Some(path.as_path()),
            _ => None,
        };

        let audio = self.audio.as_ref().map(|_| -> SpeedResult<PathBuf> {
            let dest = targets
                .audio
                .clone()
                .or_else(|| self.audio_destination(chart_dest))
                .ok_or_else(|| SpeedError::Config("no destination for audio".to_string()))?;
            let engine = engine()?;
            self.save_audio(&engine, &dest).map(|p| p.unwrap_or(dest))
        });

        if let Some(Err(e)) = &chart {
            warn!("chart not saved: {}", e);
        }
        if let Some(Err(e)) = &audio {
            warn!("audio not saved: {}", e);
        }
        SaveReport { chart, audio }
    }
}
