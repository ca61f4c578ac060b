//! Configuration loaded from `chart-speed.yaml`.
//!
//! Every field is optional; a missing file means all defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decimal::DecimalQuantity;
use crate::error::{SpeedError, SpeedResult};
use crate::tag::{TagMatcher, DEFAULT_TAG_NAME};
use crate::tempo::DEFAULT_OUTPUT_SAMPLE_RATE;

/// File name looked up next to the chart, then in the working directory.
pub const CONFIG_FILE_NAME: &str = "chart-speed.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedConfig {
    /// Timing tag name (`t` in KSH charts).
    pub tag_name: String,
    /// Baseline used when a chart has no bare tag.
    pub default_baseline: String,
    /// Sample rate of pitch-shifted output.
    pub output_sample_rate: u32,
    /// Keep pitch when changing audio speed.
    pub preserve_pitch: bool,
    /// Explicit ffmpeg executable. None = discover.
    pub ffmpeg_path: Option<PathBuf>,
    /// Chart step actions also move the audio step counter.
    pub link_audio_steps: bool,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            default_baseline: "100".to_string(),
            output_sample_rate: DEFAULT_OUTPUT_SAMPLE_RATE,
            preserve_pitch: true,
            ffmpeg_path: None,
            link_audio_steps: true,
        }
    }
}

impl SpeedConfig {
    pub fn from_yaml(yaml: &str) -> SpeedResult<Self> {
        let config: SpeedConfig =
            serde_yaml::from_str(yaml).map_err(|e| SpeedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> SpeedResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            SpeedError::Config(msg) => SpeedError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Load `chart-speed.yaml` from beside `chart` or the working directory.
    ///
    /// Defaults when neither exists.
    pub fn load(chart: Option<&Path>) -> SpeedResult<Self> {
        let beside_chart = chart
            .and_then(Path::parent)
            .map(|dir| dir.join(CONFIG_FILE_NAME));
        let candidates = beside_chart
            .into_iter()
            .chain(std::iter::once(PathBuf::from(CONFIG_FILE_NAME)));
        for candidate in candidates {
            if candidate.is_file() {
                return Self::from_path(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn validate(&self) -> SpeedResult<()> {
        if self.tag_name.is_empty() || self.tag_name.contains(['=', '\n', '\r']) {
            return Err(SpeedError::Config(format!(
                "tag_name '{}' must be non-empty and contain no '=' or newlines",
                self.tag_name
            )));
        }
        self.baseline()?;
        if self.output_sample_rate == 0 {
            return Err(SpeedError::Config(
                "output_sample_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn matcher(&self) -> TagMatcher {
        TagMatcher::new(self.tag_name.clone())
    }

    pub fn baseline(&self) -> SpeedResult<DecimalQuantity> {
        self.default_baseline.parse().map_err(|_| {
            SpeedError::Config(format!(
                "default_baseline '{}' is not a decimal number",
                self.default_baseline
            ))
        })
    }
}
