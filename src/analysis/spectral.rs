//! # Spectral Measurements
//!
//! Frame-based energy and spectral centroid extraction used for clip
//! quality scoring.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Generate a Hann window of the given length.
pub fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / window_length as f32).cos())
        .collect()
}

/// Mean per-frame RMS energy.
///
/// Inputs shorter than one frame are measured as a single frame.
pub fn mean_frame_energy(samples: &[f32], frame_len: usize, hop_len: usize) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    if samples.len() < frame_len {
        return frame_rms(samples);
    }

    let mut total = 0.0;
    let mut frames = 0usize;
    let mut start = 0usize;
    while start + frame_len <= samples.len() {
        total += frame_rms(&samples[start..start + frame_len]);
        frames += 1;
        start += hop_len;
    }

    total / frames as f64
}

/// Mean spectral centroid in Hz across FFT frames.
///
/// Returns `None` when the input is shorter than one frame or no frame
/// carries measurable energy.
pub fn spectral_centroid(
    samples: &[f32],
    sample_rate: u32,
    frame_len: usize,
    hop_len: usize,
) -> Option<f64> {
    if samples.len() < frame_len {
        return None;
    }

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_len);
    let window = hann_window(frame_len);

    let bin_width = sample_rate as f64 / frame_len as f64;
    let mut centroid_sum = 0.0;
    let mut contributing_frames = 0usize;

    let mut start = 0usize;
    let mut frame: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); frame_len];
    while start + frame_len <= samples.len() {
        for i in 0..frame_len {
            frame[i] = Complex::new(samples[start + i] * window[i], 0.0);
        }
        fft.process(&mut frame);

        // Only the non-redundant half of the spectrum
        let mut weighted = 0.0f64;
        let mut magnitude_sum = 0.0f64;
        for (bin, value) in frame.iter().take(frame_len / 2 + 1).enumerate() {
            let magnitude = value.norm() as f64;
            weighted += bin as f64 * bin_width * magnitude;
            magnitude_sum += magnitude;
        }

        if magnitude_sum > 1e-9 {
            centroid_sum += weighted / magnitude_sum;
            contributing_frames += 1;
        }

        start += hop_len;
    }

    if contributing_frames == 0 {
        return None;
    }
    Some(centroid_sum / contributing_frames as f64)
}

fn frame_rms(frame: &[f32]) -> f64 {
    let sum_squares: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / frame.len() as f64).sqrt()
}
