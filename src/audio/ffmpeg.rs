//! ffmpeg-backed audio codec and time-stretch.
//!
//! Every operation works inside its own temporary directory, removed when the
//! operation returns (successfully or not).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::audio::{resample, AudioCodec, AudioFormat, AudioTransform, PcmAudio};
use crate::error::{SpeedError, SpeedResult};
use crate::tempo::TempoRatio;

/// Environment variable naming an ffmpeg executable.
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

/// Handle on a located ffmpeg executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    path: PathBuf,
    scratch_root: Option<PathBuf>,
}

impl Ffmpeg {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scratch_root: None,
        }
    }

    /// Create intermediate files under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Find ffmpeg.
    ///
    /// Order: explicit override, `FFMPEG_PATH`, next to the running
    /// executable, then `PATH`.
    pub fn locate(override_path: Option<&Path>) -> SpeedResult<Self> {
        if let Some(path) = override_path {
            if path.exists() {
                return Ok(Self::new(path));
            }
            warn!(
                path = %path.display(),
                "configured ffmpeg not found, searching elsewhere"
            );
        }

        if let Ok(path) = std::env::var(FFMPEG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(Self::new(path));
            }
        }

        let names = if cfg!(windows) {
            vec!["ffmpeg.exe", "ffmpeg"]
        } else {
            vec!["ffmpeg"]
        };

        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            for name in &names {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Ok(Self::new(candidate));
                }
            }
        }

        for name in &names {
            if let Ok(path) = which::which(name) {
                return Ok(Self::new(path));
            }
        }

        Err(SpeedError::FfmpegNotFound)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, args: &[&OsStr]) -> SpeedResult<()> {
        debug!(ffmpeg = %self.path.display(), ?args, "running ffmpeg");
        let output = Command::new(&self.path)
            .arg("-y")
            .arg("-hide_banner")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            return Err(SpeedError::FfmpegFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn scratch_dir(&self) -> SpeedResult<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("chart_speed_ffmpeg_");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

impl AudioCodec for Ffmpeg {
    fn decode(&self, path: &Path, format: AudioFormat) -> SpeedResult<PcmAudio> {
        if format == AudioFormat::Wav {
            return PcmAudio::read_wav(path);
        }
        let scratch = self.scratch_dir()?;
        let wav = scratch.path().join("decoded.wav");
        self.run(&[
            OsStr::new("-i"),
            path.as_os_str(),
            OsStr::new("-acodec"),
            OsStr::new("pcm_s16le"),
            wav.as_os_str(),
        ])?;
        let audio = PcmAudio::read_wav(&wav)?;
        info!(
            path = %path.display(),
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            secs = audio.duration_secs(),
            "decoded audio"
        );
        Ok(audio)
    }

    fn encode(&self, audio: &PcmAudio, path: &Path, format: AudioFormat) -> SpeedResult<()> {
        if format == AudioFormat::Wav {
            return audio.write_wav(path);
        }
        let scratch = self.scratch_dir()?;
        let wav = scratch.path().join("encode_input.wav");
        audio.write_wav(&wav)?;
        self.run(&[OsStr::new("-i"), wav.as_os_str(), path.as_os_str()])
    }
}

impl AudioTransform for Ffmpeg {
    fn stretch_preserving_pitch(
        &self,
        audio: &PcmAudio,
        ratio: TempoRatio,
    ) -> SpeedResult<PcmAudio> {
        ratio.check_stretchable()?;
        let scratch = self.scratch_dir()?;
        let input = scratch.path().join("stretch_input.wav");
        let output = scratch.path().join("stretch_output.wav");
        audio.write_wav(&input)?;

        let filter = format!("atempo={:.4}", ratio.to_f64());
        self.run(&[
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-filter:a"),
            OsStr::new(&filter),
            OsStr::new("-acodec"),
            OsStr::new("pcm_s16le"),
            output.as_os_str(),
        ])?;
        PcmAudio::read_wav(&output)
    }

    fn resample_shifting_pitch(
        &self,
        audio: &PcmAudio,
        ratio: TempoRatio,
        target_sample_rate: u32,
    ) -> SpeedResult<PcmAudio> {
        resample::resample_shifting_pitch(audio, ratio, target_sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_prefers_existing_override() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("my-ffmpeg");
        std::fs::write(&fake, b"").unwrap();
        let ffmpeg = Ffmpeg::locate(Some(fake.as_path())).unwrap();
        assert_eq!(ffmpeg.path(), fake.as_path());
    }

    #[test]
    fn test_stretch_refuses_out_of_range_before_running() {
        // A path that cannot be executed: the range check must fail first.
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg");
        let audio = PcmAudio::new(44_100, 1, vec![0; 8]);
        let err = ffmpeg
            .stretch_preserving_pitch(&audio, TempoRatio::from_steps(21))
            .unwrap_err();
        assert!(matches!(err, SpeedError::UnsupportedRatio { .. }));
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg");
        let audio = PcmAudio::new(44_100, 1, vec![0; 8]);
        let err = ffmpeg
            .stretch_preserving_pitch(&audio, TempoRatio::from_steps(2))
            .unwrap_err();
        assert!(matches!(err, SpeedError::Io(_)));
    }

    #[test]
    fn test_wav_codec_needs_no_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg");
        let audio = PcmAudio::new(8_000, 1, vec![5, -5, 7]);
        ffmpeg.encode(&audio, &path, AudioFormat::Wav).unwrap();
        assert_eq!(ffmpeg.decode(&path, AudioFormat::Wav).unwrap(), audio);
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{}", body).unwrap();
        file.sync_all().unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_stretch_passes_atempo_and_cleans_up() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let args_file = tools.path().join("args.txt");
        // Record argv, then copy the input WAV (after -y -hide_banner -i) to the output.
        let script = format!(
            "printf '%s\\n' \"$@\" > '{}'\nfor last; do :; done\ncp \"$4\" \"$last\"",
            args_file.display()
        );
        let ffmpeg =
            Ffmpeg::new(fake_ffmpeg(tools.path(), &script)).with_scratch_root(scratch.path());

        let audio = PcmAudio::new(44_100, 1, vec![3, -3, 7]);
        let out = ffmpeg
            .stretch_preserving_pitch(&audio, TempoRatio::from_steps(2))
            .unwrap();
        assert_eq!(out, audio);

        let args = std::fs::read_to_string(&args_file).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(&args[..3], &["-y", "-hide_banner", "-i"]);
        let filter = args.iter().position(|a| *a == "-filter:a").unwrap();
        assert_eq!(args[filter + 1], "atempo=1.1000");
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_run_reports_stderr_and_cleans_up() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let ffmpeg = Ffmpeg::new(fake_ffmpeg(tools.path(), "echo 'Invalid filter' >&2\nexit 1"))
            .with_scratch_root(scratch.path());

        let audio = PcmAudio::new(44_100, 1, vec![0; 4]);
        let err = ffmpeg
            .stretch_preserving_pitch(&audio, TempoRatio::from_steps(-4))
            .unwrap_err();
        match err {
            SpeedError::FfmpegFailed { status, stderr } => {
                assert_eq!(status, 1);
                assert_eq!(stderr, "Invalid filter");
            }
            other => panic!("expected FfmpegFailed, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

        let err = ffmpeg
            .decode(Path::new("song.ogg"), AudioFormat::Ogg)
            .unwrap_err();
        assert!(matches!(err, SpeedError::FfmpegFailed { .. }));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_locate_skips_missing_override() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-ffmpeg");
        if let Ok(ffmpeg) = Ffmpeg::locate(Some(missing.as_path())) {
            assert_ne!(ffmpeg.path(), missing.as_path());
        }
    }
}
