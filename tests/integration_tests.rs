//! Integration tests for chart-speed
//!
//! Tests the full pipeline from chart text (and audio) on disk to rescaled
//! output.

use std::path::Path;

use chart_speed::{
    rescale_chart, rescale_chart_with, AudioCodec, AudioFormat, AudioTransform, PcmAudio,
    SaveTargets, Session, SpeedConfig, SpeedError, SpeedResult, TempoRatio,
};
use pretty_assertions::assert_eq;

const KSH: &str = "title=Integration\r
artist=Someone\r
t=120.000\r
m=song.ogg\r
o=0\r
ver=167\r
--\r
beat=4/4\r
t=100.0-200.0\r
0000|00|--\r
0000|00|--\r
--\r
t=90\r
1000|00|--\r
--\r
";

#[test]
fn test_two_increases_rescale_both_shapes() {
    let out = rescale_chart(KSH, 2).unwrap();
    assert!(out.contains("t=132.000\r\n"));
    assert!(out.contains("t=110.0-220.0\r\n"));
    assert!(out.contains("t=99\r\n"));
    assert_eq!(out.lines().count(), KSH.lines().count());
}

#[test]
fn test_one_decrease_rounds_half_away() {
    let out = rescale_chart("t=90\n", -1).unwrap();
    assert_eq!(out, "t=86\n");
}

#[test]
fn test_identity_at_zero_steps() {
    assert_eq!(rescale_chart(KSH, 0).unwrap(), KSH);
}

#[test]
fn test_non_tag_lines_byte_identical() {
    for steps in [-15, -3, 4, 30] {
        let out = rescale_chart(KSH, steps).unwrap();
        for (orig, new) in KSH.split_inclusive('\n').zip(out.split_inclusive('\n')) {
            if !orig.starts_with("t=") {
                assert_eq!(orig, new);
            }
        }
    }
}

#[test]
fn test_sequence_then_reset_matches_original() {
    let mut session = Session::new(SpeedConfig::default());
    session.set_chart(chart_speed::ChartDocument::parse(KSH), None);
    for _ in 0..9 {
        session.increase();
    }
    for _ in 0..4 {
        session.decrease();
    }
    session.reset();
    assert_eq!(session.working_document().unwrap().unwrap().concat(), KSH);
}

#[test]
fn test_path_independence() {
    let mut a = Session::new(SpeedConfig::default());
    a.set_chart(chart_speed::ChartDocument::parse(KSH), None);
    let mut b = a.clone();
    a.increase();
    a.increase();
    a.decrease();
    a.increase();
    b.adjust(2);
    assert_eq!(a.working_document().unwrap(), b.working_document().unwrap());
}

#[test]
fn test_custom_tag_name_from_config() {
    let config = SpeedConfig::from_yaml("tag_name: bpm\ndefault_baseline: \"150\"\n").unwrap();
    let out = rescale_chart_with("bpm=200\nt=200\n", 2, &config).unwrap();
    assert_eq!(out, "bpm=220\nt=200\n");
}

#[test]
fn test_load_chart_from_disk_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let chart_path = dir.path().join("song.ksh");
    std::fs::write(&chart_path, KSH).unwrap();

    let mut session = Session::new(SpeedConfig::default());
    session.load_chart(&chart_path).unwrap();
    session.increase();
    session.increase();

    let out_path = dir.path().join("song_fast.ksh");
    let targets = SaveTargets {
        chart: Some(out_path.clone()),
        audio: None,
    };
    let report = session.save_all(&targets, || Err::<NoAudio, _>(SpeedError::FfmpegNotFound));
    assert!(report.is_success());
    assert!(report.audio.is_none());

    let saved = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(saved, rescale_chart(KSH, 2).unwrap());
    // Source untouched.
    assert_eq!(std::fs::read_to_string(&chart_path).unwrap(), KSH);
}

#[test]
fn test_chart_without_baseline_still_loads() {
    let mut session = Session::new(SpeedConfig::default());
    session.set_chart(chart_speed::ChartDocument::parse("title=x\n--\n"), None);
    session.increase();
    assert_eq!(
        session.report().to_string(),
        "Original t: 100.000 | Current t: 105.000 | Multiplier: 1.0500"
    );
}

#[test]
fn test_wav_audio_pitch_shift_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("song.wav");
    PcmAudio::new(22_050, 1, vec![0; 22_050]).write_wav(&audio_path).unwrap();

    let config = SpeedConfig {
        preserve_pitch: false,
        ..SpeedConfig::default()
    };
    let mut session = Session::new(config);
    session.load_audio(&audio_path).unwrap();
    for _ in 0..20 {
        session.increase();
    }
    assert_eq!(session.tempo_ratio(), TempoRatio::from_steps(20));

    let report = session.save_all(&SaveTargets::default(), || Ok(WavOnly));
    let written = report.audio.unwrap().unwrap();
    assert_eq!(written, dir.path().join("song_adjusted.wav"));

    let out = PcmAudio::read_wav(&written).unwrap();
    assert_eq!(out.sample_rate, 44_100);
    // Twice as fast, normalized from 22.05 kHz to 44.1 kHz: same frame count.
    assert_eq!(out.frames(), 22_050);
}

/// Engine for tests that never touch audio.
struct NoAudio;

impl AudioCodec for NoAudio {
    fn decode(&self, _: &Path, _: AudioFormat) -> SpeedResult<PcmAudio> {
        unreachable!("no audio loaded")
    }

    fn encode(&self, _: &PcmAudio, _: &Path, _: AudioFormat) -> SpeedResult<()> {
        unreachable!("no audio loaded")
    }
}

impl AudioTransform for NoAudio {
    fn stretch_preserving_pitch(&self, _: &PcmAudio, _: TempoRatio) -> SpeedResult<PcmAudio> {
        unreachable!("no audio loaded")
    }

    fn resample_shifting_pitch(
        &self,
        _: &PcmAudio,
        _: TempoRatio,
        _: u32,
    ) -> SpeedResult<PcmAudio> {
        unreachable!("no audio loaded")
    }
}

/// WAV-only engine: hound for I/O, native resampling.
struct WavOnly;

impl AudioCodec for WavOnly {
    fn decode(&self, path: &Path, _: AudioFormat) -> SpeedResult<PcmAudio> {
        PcmAudio::read_wav(path)
    }

    fn encode(&self, audio: &PcmAudio, path: &Path, _: AudioFormat) -> SpeedResult<()> {
        audio.write_wav(path)
    }
}

impl AudioTransform for WavOnly {
    fn stretch_preserving_pitch(&self, _: &PcmAudio, ratio: TempoRatio) -> SpeedResult<PcmAudio> {
        Err(SpeedError::UnsupportedRatio {
            ratio: ratio.to_string(),
        })
    }

    fn resample_shifting_pitch(
        &self,
        audio: &PcmAudio,
        ratio: TempoRatio,
        target_sample_rate: u32,
    ) -> SpeedResult<PcmAudio> {
        chart_speed::audio::resample_shifting_pitch(audio, ratio, target_sample_rate)
    }
}
