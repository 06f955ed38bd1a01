//! # Level Management
//!
//! Loudness normalization and level measurement for assembled tracks.
//! The normalization chain targets consistent speech loudness without
//! clipping: RMS normalization toward the target level, peak limiting,
//! then light soft-knee compression.

use log::debug;
use serde::Serialize;

use crate::audio::format::compute_rms;
use crate::config::NormalizeConfig;

/// Signals quieter than this are left untouched by normalization.
const SILENCE_FLOOR: f32 = 1e-5;

/// Level statistics of a track, for logging and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct TrackStats {
    pub peak_db: f64,
    pub rms_db: f64,
    /// Simplified LUFS approximation derived from RMS
    pub lufs: f64,
    pub duration: f64,
}

/// Measures peak, RMS and approximate loudness of a track.
pub fn track_stats(samples: &[f32], sample_rate: u32) -> TrackStats {
    if samples.is_empty() {
        return TrackStats {
            peak_db: f64::NEG_INFINITY,
            rms_db: f64::NEG_INFINITY,
            lufs: f64::NEG_INFINITY,
            duration: 0.0,
        };
    }

    let peak = samples.iter().fold(0.0f32, |a, &b| a.max(b.abs())) as f64;
    let rms = compute_rms(samples) as f64;

    let peak_db = if peak > 0.0 { 20.0 * peak.log10() } else { f64::NEG_INFINITY };
    let rms_db = if rms > 0.0 { 20.0 * rms.log10() } else { f64::NEG_INFINITY };
    let lufs = if rms > 0.0 { rms_db - 0.691 } else { f64::NEG_INFINITY };

    TrackStats {
        peak_db,
        rms_db,
        lufs,
        duration: samples.len() as f64 / sample_rate as f64,
    }
}

/// Closed-form loudness normalizer.
///
/// Deterministic and near-idempotent: a second pass over already
/// normalized audio leaves peak and RMS unchanged up to float error.
#[derive(Debug, Clone)]
pub struct LoudnessNormalizer {
    config: NormalizeConfig,
}

impl LoudnessNormalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// Normalizes a track in place.
    ///
    /// Empty or silent input is returned unchanged. The chain is:
    /// RMS normalization toward the target level, peak ceiling,
    /// soft-knee compression with makeup gain, final peak limit.
    pub fn normalize(&self, samples: &mut [f32]) {
        if samples.is_empty() {
            return;
        }

        if !self.normalize_rms(samples) {
            return;
        }

        let peak = peak_amplitude(samples);
        if peak > self.config.peak_ceiling {
            scale(samples, self.config.peak_ceiling / peak);
        }

        self.apply_light_compression(samples);
    }

    /// Scales the track so its RMS hits the configured target.
    ///
    /// Returns false when the input is too quiet to normalize.
    fn normalize_rms(&self, samples: &mut [f32]) -> bool {
        let current_rms = compute_rms(samples);
        if current_rms <= SILENCE_FLOOR {
            debug!("Skipping normalization of a silent track (rms={:.6})", current_rms);
            return false;
        }

        let target_linear = 10.0f32.powf(self.config.target_rms_db / 20.0);
        scale(samples, target_linear / current_rms);

        // Gain toward the RMS target may push peaks past full scale
        let peak = peak_amplitude(samples);
        if peak > self.config.peak_limit {
            scale(samples, self.config.peak_limit / peak);
        }

        true
    }

    /// Soft-knee compression above the threshold, with makeup gain.
    fn apply_light_compression(&self, samples: &mut [f32]) {
        let threshold = self.config.compress_threshold;
        let ratio = self.config.compress_ratio;
        let makeup = self.config.makeup_gain;

        for sample in samples.iter_mut() {
            let amplitude = sample.abs();
            let compressed = if amplitude > threshold {
                threshold + (amplitude - threshold) / ratio
            } else {
                amplitude
            };
            *sample = sample.signum() * compressed * makeup;
        }

        let peak = peak_amplitude(samples);
        if peak > self.config.peak_limit {
            scale(samples, self.config.peak_limit / peak);
        }
    }
}

fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()))
}

fn scale(samples: &mut [f32], factor: f32) {
    for sample in samples.iter_mut() {
        *sample *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, duration: f32, amplitude: f32, sample_rate: u32) -> Vec<f32> {
        let count = (duration * sample_rate as f32) as usize;
        (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (t * freq * 2.0 * std::f32::consts::PI).sin() * amplitude
            })
            .collect()
    }

    #[test]
    fn test_silent_input_unchanged() {
        let normalizer = LoudnessNormalizer::new(NormalizeConfig::default());

        let mut empty: Vec<f32> = Vec::new();
        normalizer.normalize(&mut empty);
        assert!(empty.is_empty());

        let mut silence = vec![0.0f32; 4410];
        normalizer.normalize(&mut silence);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_peak_stays_within_limit() {
        let normalizer = LoudnessNormalizer::new(NormalizeConfig::default());

        // Very quiet signal gets boosted but never past the peak limit
        let mut quiet = sine(440.0, 0.5, 0.005, 44100);
        normalizer.normalize(&mut quiet);
        assert!(peak_amplitude(&quiet) <= 0.95 + 1e-4);

        // Hot signal gets pulled down below the limit
        let mut hot = sine(440.0, 0.5, 0.99, 44100);
        normalizer.normalize(&mut hot);
        assert!(peak_amplitude(&hot) <= 0.95 + 1e-4);
    }

    #[test]
    fn test_normalize_is_idempotent_after_first_pass() {
        let normalizer = LoudnessNormalizer::new(NormalizeConfig::default());

        let mut first = sine(330.0, 1.0, 0.4, 44100);
        normalizer.normalize(&mut first);

        let mut second = first.clone();
        normalizer.normalize(&mut second);

        let first_stats = track_stats(&first, 44100);
        let second_stats = track_stats(&second, 44100);
        assert!((first_stats.peak_db - second_stats.peak_db).abs() < 1e-2);
        assert!((first_stats.rms_db - second_stats.rms_db).abs() < 1e-2);
    }

    #[test]
    fn test_rms_moves_toward_target() {
        let normalizer = LoudnessNormalizer::new(NormalizeConfig::default());

        let mut samples = sine(440.0, 1.0, 0.05, 44100);
        normalizer.normalize(&mut samples);

        // -18 dB target, shifted slightly by the makeup gain
        let stats = track_stats(&samples, 44100);
        assert!((stats.rms_db - (-18.0)).abs() < 2.0, "rms_db = {}", stats.rms_db);
    }

    #[test]
    fn test_track_stats_of_silence() {
        let stats = track_stats(&[], 44100);
        assert!(stats.peak_db.is_infinite());
        assert_eq!(stats.duration, 0.0);

        let stats = track_stats(&vec![0.0f32; 44100], 44100);
        assert!(stats.rms_db.is_infinite());
        assert_eq!(stats.duration, 1.0);
    }
}
