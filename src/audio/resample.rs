//! # Resampling
//!
//! Sample rate conversion with Rubato's sinc resampler. Audio is
//! processed in fixed-size blocks; the tail block is zero-padded and the
//! output trimmed back to the expected length.

use std::cmp;

use log::debug;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{DublineError, Result};

/// Converts mono PCM samples from one sample rate to another.
///
/// Returns the input unchanged when the rates already match.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;

    // Block size adapted to the input length
    let duration_seconds = input.len() as f64 / from_rate as f64;
    let block_size = if duration_seconds < 0.1 {
        64
    } else if duration_seconds < 0.5 {
        128
    } else if duration_seconds < 2.0 {
        256
    } else {
        512
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, block_size, 1)
        .map_err(|e| DublineError::Resampling(format!("failed to create resampler: {}", e)))?;

    let expected = (input.len() as f64 * ratio).round() as usize;
    let mut output_buf = vec![0.0; expected + block_size * 2];
    let mut total_output = 0;

    let mut idx = 0;
    while idx < input.len() {
        let chunk_size = cmp::min(block_size, input.len() - idx);

        // The resampler wants full blocks; pad the tail with zeros
        let current_chunk = if chunk_size < block_size {
            let mut padded = vec![0.0; block_size];
            padded[..chunk_size].copy_from_slice(&input[idx..idx + chunk_size]);
            padded
        } else {
            input[idx..idx + chunk_size].to_vec()
        };

        let current_frames = vec![current_chunk];
        let output_frames = resampler
            .process(&current_frames, None)
            .map_err(|e| DublineError::Resampling(format!("resampling failed: {}", e)))?;

        let output_len = output_frames[0].len();
        if total_output + output_len > output_buf.len() {
            output_buf.resize(total_output + output_len, 0.0);
        }
        output_buf[total_output..total_output + output_len].copy_from_slice(&output_frames[0]);
        total_output += output_len;

        idx += chunk_size;
    }

    output_buf.truncate(total_output.min(expected));

    debug!(
        "Resampled {} samples at {} Hz to {} samples at {} Hz",
        input.len(),
        from_rate,
        output_buf.len(),
        to_rate
    );
    Ok(output_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, duration: f32, sample_rate: u32) -> Vec<f32> {
        let count = (duration * sample_rate as f32) as usize;
        (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let input = sine(440.0, 0.25, 44100);
        let output = resample(&input, 44100, 44100).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_upsample_length_matches_ratio() {
        let input = sine(440.0, 1.0, 22050);
        let output = resample(&input, 22050, 44100).unwrap();

        let expected = input.len() * 2;
        let delta = (output.len() as i64 - expected as i64).abs();
        assert!(delta < 4096, "expected ~{} samples, got {}", expected, output.len());
    }

    #[test]
    fn test_downsample_length_matches_ratio() {
        let input = sine(440.0, 1.0, 48000);
        let output = resample(&input, 48000, 16000).unwrap();

        let expected = input.len() / 3;
        let delta = (output.len() as i64 - expected as i64).abs();
        assert!(delta < 4096, "expected ~{} samples, got {}", expected, output.len());
    }

    #[test]
    fn test_empty_input() {
        let output = resample(&[], 22050, 44100).unwrap();
        assert!(output.is_empty());
    }
}
