//! # Configuration
//!
//! Per-stage configuration structs grouped under [`DublineConfig`].
//! All values have sensible defaults matching the production pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for per-clip acoustic analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Clips shorter than this are rejected outright (seconds)
    pub min_clip_duration: f64,
    /// FFT frame length in samples for spectral measurements
    pub frame_len: usize,
    /// Hop between analysis frames in samples
    pub hop_len: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_clip_duration: 0.5,
            frame_len: 2048,
            hop_len: 512,
        }
    }
}

/// Settings for voice reference selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Minimum usable reference duration (seconds)
    pub min_duration: f64,
    /// Maximum reference duration; longer assemblies are truncated (seconds)
    pub max_duration: f64,
    /// Maximum number of clips combined into one reference
    pub max_count: usize,
    /// Silence inserted between concatenated clips (seconds)
    pub gap_duration: f64,
    /// Stop extending a combination once it reaches this duration (seconds)
    pub target_duration: f64,
    /// How many top-quality clips seed the combination search
    pub seed_count: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_duration: 3.0,
            max_duration: 10.0,
            max_count: 5,
            gap_duration: 0.2,
            target_duration: 8.0,
            seed_count: 8,
        }
    }
}

/// Settings for timeline assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Sample rate of the assembled output track (Hz)
    pub sample_rate: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self { sample_rate: 44100 }
    }
}

/// Settings for loudness normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Target RMS level in dB full scale
    pub target_rms_db: f32,
    /// Peak ceiling applied after RMS normalization
    pub peak_ceiling: f32,
    /// Compression kicks in above this absolute amplitude
    pub compress_threshold: f32,
    /// Compression ratio above the threshold
    pub compress_ratio: f32,
    /// Makeup gain applied after compression
    pub makeup_gain: f32,
    /// Absolute peak limit enforced last
    pub peak_limit: f32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_rms_db: -18.0,
            peak_ceiling: 0.9,
            compress_threshold: 0.7,
            compress_ratio: 3.0,
            makeup_gain: 1.1,
            peak_limit: 0.95,
        }
    }
}

/// Settings for mixing the dubbed voice with the background track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    /// Volume multiplier for the translated voice (1.0 = unchanged)
    pub voice_volume: f32,
    /// Volume multiplier for the background (0.3 = 30% of original)
    pub background_volume: f32,
    /// Overall amplification applied to the mixed result
    pub master_volume: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            voice_volume: 1.0,
            background_volume: 0.3,
            master_volume: 1.2,
        }
    }
}

/// Top-level configuration for [`crate::Dubline`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DublineConfig {
    pub analysis: AnalysisConfig,
    pub selection: SelectionConfig,
    pub assembly: AssemblyConfig,
    pub normalize: NormalizeConfig,
    pub mix: MixConfig,
    /// Directory for stage result caches; caching is disabled when unset
    pub cache_dir: Option<PathBuf>,
}
