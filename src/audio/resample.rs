// Sample-rate conversion
// Band-limited sinc resampler (rubato) used to bring mono audio to the model rate

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;

/// Input frames handed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("Failed to create resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("Resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Resample mono `input` from `from_rate` to `to_rate`
///
/// Output length is `floor(len * to / from)` and is aligned with the input:
/// the filter delay is trimmed and the tail is flushed. Content above the
/// target Nyquist is filtered out rather than folded back. Equal rates (or a
/// zero rate) return a copy.
pub fn resample_mono(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, ResampleError> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || input.is_empty() {
        return Ok(input.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)?;

    let delay = resampler.output_delay();
    let expected = (input.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut output = Vec::with_capacity(expected + delay + CHUNK_FRAMES);
    let mut pos = 0;

    while output.len() < expected + delay {
        let needed = resampler.input_frames_next();
        let chunk = if pos + needed <= input.len() {
            let chunk = resampler.process(&[&input[pos..pos + needed]], None)?;
            pos += needed;
            chunk
        } else if pos < input.len() {
            let chunk = resampler.process_partial(Some(&[&input[pos..]][..]), None)?;
            pos = input.len();
            chunk
        } else {
            resampler.process_partial(None::<&[&[f32]]>, None)?
        };

        match chunk.into_iter().next() {
            Some(frames) if !frames.is_empty() => output.extend(frames),
            _ => break,
        }
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);

    log::debug!(
        "Resampled {} samples from {} Hz to {} Hz ({} out)",
        input.len(),
        from_rate,
        to_rate,
        output.len()
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        let n = (rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    /// RMS of the middle half, away from filter edge effects
    fn rms_middle(samples: &[f32]) -> f32 {
        let middle = &samples[samples.len() / 4..samples.len() * 3 / 4];
        (middle.iter().map(|s| s * s).sum::<f32>() / middle.len() as f32).sqrt()
    }

    #[test]
    fn test_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_mono(&input, 22_050, 22_050).unwrap(), input);
    }

    #[test]
    fn test_output_length() {
        let input = vec![0.0; 44_100];
        assert_eq!(resample_mono(&input, 44_100, 22_050).unwrap().len(), 22_050);

        let input = vec![0.0; 1_000];
        assert_eq!(resample_mono(&input, 48_000, 22_050).unwrap().len(), 459);
        assert_eq!(resample_mono(&input, 11_025, 22_050).unwrap().len(), 2_000);
    }

    #[test]
    fn test_content_above_target_nyquist_is_attenuated() {
        // 15 kHz cannot be represented at 22.05 kHz; it must not alias to 7.05 kHz
        let input = sine(15_000.0, 44_100, 1.0);
        let output = resample_mono(&input, 44_100, 22_050).unwrap();

        assert!(rms_middle(&input) > 0.7);
        assert!(rms_middle(&output) < 0.05, "aliased rms {}", rms_middle(&output));
    }

    #[test]
    fn test_passband_is_preserved() {
        let input = sine(1_000.0, 44_100, 1.0);
        let output = resample_mono(&input, 44_100, 22_050).unwrap();

        let rms = rms_middle(&output);
        assert!((rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.05, "rms {}", rms);
    }

    #[test]
    fn test_delay_is_compensated() {
        // A 100 Hz sine should stay in phase with the ideal resampled sine
        let input = sine(100.0, 44_100, 0.5);
        let output = resample_mono(&input, 44_100, 22_050).unwrap();
        let ideal = sine(100.0, 22_050, 0.5);

        let middle = output.len() / 2;
        for i in middle..middle + 200 {
            assert!((output[i] - ideal[i]).abs() < 0.05, "sample {}: {} vs {}", i, output[i], ideal[i]);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_mono(&[], 44_100, 22_050).unwrap().is_empty());
    }
}
