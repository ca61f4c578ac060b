//! # Audio Boundary
//!
//! The audio side of a speed change is delegated to an [`AudioTransform`]:
//! something that can time-stretch a clip keeping its pitch, or resample it
//! letting the pitch move. [`Ffmpeg`] is the stock implementation; tests use
//! in-memory fakes.
//!
//! Clips travel between the two as [`PcmAudio`]: interleaved signed 16-bit
//! samples plus their sample rate and channel count, read and written as WAV
//! with `hound`.

pub mod ffmpeg;
pub mod resample;

use std::path::Path;

use crate::error::{SpeedError, SpeedResult};
use crate::tempo::TempoRatio;

pub use ffmpeg::Ffmpeg;
pub use resample::resample_shifting_pitch;

/// Container formats accepted for the audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Ogg,
    Mp3,
    Wav,
}

impl AudioFormat {
    /// Pick the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> SpeedResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("ogg") => Ok(AudioFormat::Ogg),
            Some("mp3") => Ok(AudioFormat::Mp3),
            Some("wav") => Ok(AudioFormat::Wav),
            _ => Err(SpeedError::UnsupportedAudioFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Ogg => "ogg",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

/// Decoded audio: interleaved 16-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl PcmAudio {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Read a WAV file, converting any PCM or float layout to 16-bit.
    pub fn read_wav(path: &Path) -> SpeedResult<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => reader
                .samples::<i8>()
                .map(|s| s.map(|v| i16::from(v) << 8))
                .collect::<Result<_, _>>()?,
            (hound::SampleFormat::Int, 16) => {
                reader.samples::<i16>().collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Int, bits) => {
                let shift = u32::from(bits.saturating_sub(16));
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
                .collect::<Result<_, _>>()?,
        };

        Ok(Self::new(spec.sample_rate, spec.channels, samples))
    }

    /// Write as 16-bit PCM WAV.
    pub fn write_wav(&self, path: &Path) -> SpeedResult<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Speed-change operations on decoded audio.
pub trait AudioTransform {
    /// Change tempo without changing pitch.
    ///
    /// Only defined for ratios in `[0.5, 2.0]`; implementations must fail
    /// with [`SpeedError::UnsupportedRatio`] outside that range.
    fn stretch_preserving_pitch(&self, audio: &PcmAudio, ratio: TempoRatio)
        -> SpeedResult<PcmAudio>;

    /// Change tempo and pitch together, producing `target_sample_rate` audio.
    fn resample_shifting_pitch(
        &self,
        audio: &PcmAudio,
        ratio: TempoRatio,
        target_sample_rate: u32,
    ) -> SpeedResult<PcmAudio>;
}

/// Reading and writing audio files in their container format.
pub trait AudioCodec {
    fn decode(&self, path: &Path, format: AudioFormat) -> SpeedResult<PcmAudio>;
    fn encode(&self, audio: &PcmAudio, path: &Path, format: AudioFormat) -> SpeedResult<()>;
}

impl<T: AudioTransform + ?Sized> AudioTransform for &T {
    fn stretch_preserving_pitch(
        &self,
        audio: &PcmAudio,
        ratio: TempoRatio,
    ) -> SpeedResult<PcmAudio> {
        (**self).stretch_preserving_pitch(audio, ratio)
    }

    fn resample_shifting_pitch(
        &self,
        audio: &PcmAudio,
        ratio: TempoRatio,
        target_sample_rate: u32,
    ) -> SpeedResult<PcmAudio> {
        (**self).resample_shifting_pitch(audio, ratio, target_sample_rate)
    }
}

impl<T: AudioCodec + ?Sized> AudioCodec for &T {
    fn decode(&self, path: &Path, format: AudioFormat) -> SpeedResult<PcmAudio> {
        (**self).decode(path, format)
    }

    fn encode(&self, audio: &PcmAudio, path: &Path, format: AudioFormat) -> SpeedResult<()> {
        (**self).encode(audio, path, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(AudioFormat::from_path(Path::new("song.OGG")).unwrap(), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_path(Path::new("a/b.mp3")).unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("x.wav")).unwrap(), AudioFormat::Wav);
        let err = AudioFormat::from_path(Path::new("track.flac")).unwrap_err();
        assert!(matches!(
            err,
            SpeedError::UnsupportedAudioFormat { path } if path == PathBuf::from("track.flac")
        ));
        assert!(AudioFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_frames_and_duration() {
        let audio = PcmAudio::new(100, 2, vec![0; 400]);
        assert_eq!(audio.frames(), 200);
        assert!((audio.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_wav_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let audio = PcmAudio::new(22_050, 2, vec![0, 1, -1, 1000, i16::MIN, i16::MAX]);
        audio.write_wav(&path).unwrap();
        assert_eq!(PcmAudio::read_wav(&path).unwrap(), audio);
    }
}
