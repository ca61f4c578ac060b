//! Pitch-shifting speed change.
//!
//! The clip's sample rate is reinterpreted as `floor(rate × ratio)` (playing
//! the same samples faster or slower) and the result is converted back to
//! the requested output rate with a band-limited sinc resampler. The floor
//! means the effective speed can differ from `ratio` by less than one sample
//! per second of source rate.

use audioadapter_buffers::direct::InterleavedSlice;
use num_rational::Ratio;
use rubato::{
    Async, FixedAsync, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use crate::audio::PcmAudio;
use crate::error::{SpeedError, SpeedResult};
use crate::tempo::TempoRatio;

const RESAMPLE_CHUNK_FRAMES: usize = 1024;
const RESAMPLE_SINC_LEN: usize = 256;
const RESAMPLE_CUTOFF: f32 = 0.95;
const RESAMPLE_OVERSAMPLING_FACTOR: usize = 128;

/// Sample rate the clip is treated as having after the speed change.
pub fn reinterpreted_rate(sample_rate: u32, ratio: TempoRatio) -> Option<u32> {
    let scaled = Ratio::from_integer(i128::from(sample_rate)) * ratio.as_ratio();
    let rate = scaled.floor().to_integer();
    u32::try_from(rate).ok().filter(|&r| r > 0)
}

pub fn resample_shifting_pitch(
    audio: &PcmAudio,
    ratio: TempoRatio,
    target_sample_rate: u32,
) -> SpeedResult<PcmAudio> {
    let source_rate = reinterpreted_rate(audio.sample_rate, ratio)
        .filter(|_| target_sample_rate > 0)
        .ok_or_else(|| SpeedError::UnsupportedRatio {
            ratio: ratio.to_string(),
        })?;

    let channels = usize::from(audio.channels);
    if channels == 0 || audio.samples.is_empty() || source_rate == target_sample_rate {
        return Ok(PcmAudio::new(
            target_sample_rate,
            audio.channels,
            audio.samples.clone(),
        ));
    }

    let input: Vec<f32> = audio.samples.iter().map(|&s| sample_to_f32(s)).collect();
    let output = resample_interleaved(&input, channels, source_rate, target_sample_rate)?;
    Ok(PcmAudio::new(
        target_sample_rate,
        audio.channels,
        output.into_iter().map(sample_from_f32).collect(),
    ))
}

fn create_resampler(src_rate: u32, dst_rate: u32, channels: usize) -> SpeedResult<Async<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: RESAMPLE_SINC_LEN,
        f_cutoff: RESAMPLE_CUTOFF,
        oversampling_factor: RESAMPLE_OVERSAMPLING_FACTOR,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(dst_rate) / f64::from(src_rate);
    Async::<f32>::new_sinc(
        ratio,
        2.0,
        &params,
        RESAMPLE_CHUNK_FRAMES,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| SpeedError::Resample(format!("failed to create resampler: {e}")))
}

fn process_chunk(
    resampler: &mut Async<f32>,
    channels: usize,
    chunk_interleaved: &[f32],
) -> SpeedResult<Vec<f32>> {
    let frames = chunk_interleaved.len() / channels;
    if frames == 0 {
        return Ok(Vec::new());
    }
    resampler
        .set_chunk_size(frames)
        .map_err(|e| SpeedError::Resample(format!("set_chunk_size failed: {e}")))?;

    let input = InterleavedSlice::new(chunk_interleaved, channels, frames)
        .map_err(|e| SpeedError::Resample(format!("input buffer error: {e}")))?;
    let out = resampler
        .process(&input, 0, None)
        .map_err(|e| SpeedError::Resample(format!("{e}")))?;
    Ok(out.take_data())
}

/// Resample a whole interleaved clip from `from_rate` to `to_rate`.
///
/// The output holds `ceil(frames × to / from)` frames, aligned with the
/// input: the filter delay is dropped from the front and the tail is flushed
/// with silence.
fn resample_interleaved(
    samples: &[f32],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> SpeedResult<Vec<f32>> {
    let in_frames = samples.len() / channels;
    let samples = &samples[..in_frames * channels];
    let out_frames =
        (in_frames as u64 * u64::from(to_rate)).div_ceil(u64::from(from_rate)) as usize;

    let mut resampler = create_resampler(from_rate, to_rate, channels)?;
    let delay = resampler.output_delay() * channels;
    let wanted = delay + out_frames * channels;
    let chunk_len = RESAMPLE_CHUNK_FRAMES * channels;
    let silence = vec![0.0f32; chunk_len];

    let mut out = Vec::with_capacity(wanted + chunk_len);
    let mut chunks = samples.chunks(chunk_len);
    while out.len() < wanted {
        let chunk = chunks.next().unwrap_or(silence.as_slice());
        out.extend(process_chunk(&mut resampler, channels, chunk)?);
    }
    out.truncate(wanted);
    Ok(out.split_off(delay))
}

fn sample_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

fn sample_from_f32(sample: f32) -> i16 {
    (sample * 32768.0)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(samples: &[i16]) -> f64 {
        let sum: f64 = samples.iter().map(|&s| f64::from(s).powi(2)).sum();
        (sum / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_reinterpreted_rate_floors() {
        assert_eq!(reinterpreted_rate(44_100, TempoRatio::from_steps(2)), Some(48_510));
        assert_eq!(reinterpreted_rate(44_101, TempoRatio::from_steps(1)), Some(46_306));
        assert_eq!(reinterpreted_rate(44_100, TempoRatio::from_steps(-20)), None);
    }

    #[test]
    fn test_faster_ratio_shortens_clip() {
        let audio = PcmAudio::new(44_100, 1, vec![1000; 44_100]);
        let out = resample_shifting_pitch(&audio, TempoRatio::from_steps(20), 44_100).unwrap();
        assert_eq!(out.sample_rate, 44_100);
        assert_eq!(out.frames(), 22_050);
        for &s in &out.samples[2_000..20_000] {
            assert!((i32::from(s) - 1000).abs() <= 10, "sample {s} drifted from 1000");
        }
    }

    #[test]
    fn test_unity_ratio_at_same_rate_is_identity() {
        let audio = PcmAudio::new(44_100, 2, vec![1, -1, 2, -2, 3, -3]);
        let out = resample_shifting_pitch(&audio, TempoRatio::from_steps(0), 44_100).unwrap();
        assert_eq!(out, audio);
    }

    #[test]
    fn test_normalizes_to_target_rate() {
        let audio = PcmAudio::new(22_050, 2, vec![0; 2 * 22_050]);
        let out = resample_shifting_pitch(&audio, TempoRatio::from_steps(0), 44_100).unwrap();
        assert_eq!(out.sample_rate, 44_100);
        assert_eq!(out.channels, 2);
        assert_eq!(out.frames(), 44_100);
        assert!(out.samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_tone_pushed_past_nyquist_is_filtered() {
        // 14.7 kHz at 44.1 kHz becomes 29.4 kHz at double speed: above the
        // 22.05 kHz output Nyquist, so it must not fold back into the clip.
        let pattern = [10_000i16, -5_000, -5_000];
        let samples: Vec<i16> = pattern.iter().copied().cycle().take(44_100).collect();
        let audio = PcmAudio::new(44_100, 1, samples);
        let out = resample_shifting_pitch(&audio, TempoRatio::from_steps(20), 44_100).unwrap();
        assert_eq!(out.frames(), 22_050);
        let level = rms(&out.samples[2_000..20_000]);
        assert!(level < 0.05 * rms(&audio.samples), "aliased level {level}");
    }

    #[test]
    fn test_tone_below_nyquist_survives() {
        let samples: Vec<i16> = (0..44_100)
            .map(|n| {
                let phase = 2.0 * std::f64::consts::PI * 441.0 * f64::from(n) / 44_100.0;
                (10_000.0 * phase.sin()).round() as i16
            })
            .collect();
        let audio = PcmAudio::new(44_100, 1, samples);
        let out = resample_shifting_pitch(&audio, TempoRatio::from_steps(20), 44_100).unwrap();
        let expected = rms(&audio.samples);
        let level = rms(&out.samples[2_000..20_000]);
        assert!((level - expected).abs() < 0.05 * expected, "tone level {level}");
    }

    #[test]
    fn test_sample_conversion_clamps() {
        assert_eq!(sample_from_f32(sample_to_f32(i16::MIN)), i16::MIN);
        assert_eq!(sample_from_f32(sample_to_f32(1234)), 1234);
        assert_eq!(sample_from_f32(1.5), i16::MAX);
        assert_eq!(sample_from_f32(-1.5), i16::MIN);
    }
}
