//! # Clip Analysis
//!
//! Measures acoustic features of individual speech clips and derives the
//! quality score driving reference selection. Scoring is a sum of three
//! independently capped contributions: duration band, loudness band and
//! signal clarity. The exact band values are tuning policy; the
//! invariants are determinism and monotonic preference for the ideal
//! bands.

pub mod spectral;

use log::{debug, warn};

use crate::audio::format::{compute_rms, decode_audio_file, duration_in_seconds};
use crate::config::AnalysisConfig;
use crate::types::{Clip, ClipFeatures};

/// Ideal clip duration band for voice cloning, seconds.
const DURATION_IDEAL: (f64, f64) = (1.0, 4.0);
/// Acceptable long-clip band, seconds.
const DURATION_GOOD_MAX: f64 = 8.0;

/// Clear speech loudness band, dB full scale.
const VOLUME_SPEECH: (f64, f64) = (-25.0, -5.0);
/// Margin around the speech band still scoring partial credit, dB.
const VOLUME_MARGIN: f64 = 10.0;

/// Mean frame energy above this indicates actual speech content.
const ENERGY_SPEECH_THRESHOLD: f64 = 0.01;
/// Voice-typical spectral centroid band, Hz.
const CENTROID_VOICE: (f64, f64) = (500.0, 4000.0);

/// Measures clips and assigns quality scores.
#[derive(Debug, Clone)]
pub struct ClipFeatureAnalyzer {
    config: AnalysisConfig,
}

impl ClipFeatureAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Decodes and measures one clip.
    ///
    /// Returns `None` when the file cannot be decoded or the clip is
    /// shorter than the configured minimum. Both conditions mean the
    /// clip is unusable for reference selection, never a hard error.
    pub fn analyze(&self, clip: &Clip) -> Option<ClipFeatures> {
        let (samples, sample_rate) = match decode_audio_file(&clip.path) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Skipping unreadable clip {}: {}", clip.path.display(), e);
                return None;
            }
        };

        self.analyze_samples(&samples, sample_rate)
    }

    /// Measures features of already decoded audio.
    pub fn analyze_samples(&self, samples: &[f32], sample_rate: u32) -> Option<ClipFeatures> {
        let duration = duration_in_seconds(samples.len(), sample_rate);
        if duration < self.config.min_clip_duration {
            debug!("Clip too short for analysis: {:.3}s", duration);
            return None;
        }

        let rms = compute_rms(samples) as f64;
        let volume_level = 20.0 * rms.max(1e-10).log10();

        let energy =
            spectral::mean_frame_energy(samples, self.config.frame_len, self.config.hop_len);
        let spectral_centroid = spectral::spectral_centroid(
            samples,
            sample_rate,
            self.config.frame_len,
            self.config.hop_len,
        );

        let quality_score = duration_score(duration)
            + volume_score(volume_level)
            + clarity_score(energy, spectral_centroid);

        Some(ClipFeatures {
            duration,
            volume_level,
            energy,
            spectral_centroid,
            quality_score,
        })
    }
}

/// Duration contribution, capped at 3.0 for the ideal band.
fn duration_score(duration: f64) -> f64 {
    if duration >= DURATION_IDEAL.0 && duration <= DURATION_IDEAL.1 {
        3.0
    } else if duration > DURATION_IDEAL.1 && duration <= DURATION_GOOD_MAX {
        2.0
    } else if duration < DURATION_IDEAL.0 {
        1.0
    } else {
        0.5
    }
}

/// Loudness contribution, capped at 2.0 inside the clear speech band.
fn volume_score(volume_db: f64) -> f64 {
    let (low, high) = VOLUME_SPEECH;
    if volume_db >= low && volume_db <= high {
        2.0
    } else if volume_db >= low - VOLUME_MARGIN && volume_db <= high + VOLUME_MARGIN {
        1.0
    } else {
        0.25
    }
}

/// Signal clarity contribution, capped at 2.0.
///
/// Missing spectral statistics only forfeit the centroid bonus.
fn clarity_score(energy: f64, spectral_centroid: Option<f64>) -> f64 {
    let mut score = 0.0;
    if energy > ENERGY_SPEECH_THRESHOLD {
        score += 1.0;
    }
    if let Some(centroid) = spectral_centroid {
        if centroid >= CENTROID_VOICE.0 && centroid <= CENTROID_VOICE.1 {
            score += 1.0;
        }
    }
    score
}
