//! # Core Types
//!
//! Data types exchanged between pipeline stages and with the external
//! collaborators (diarization, transcription, translation, synthesis).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Diarization output: speaker label to ordered `(start, end)` intervals in seconds.
pub type DiarizationMap = BTreeMap<String, Vec<(f64, f64)>>;

/// Transcription output: speaker label to transcribed segments.
pub type TranscriptMap = BTreeMap<String, Vec<TranscribedSegment>>;

/// Synthesis output: speaker label to synthesized segments.
pub type SynthesisMap = BTreeMap<String, SynthesisResult>;

/// A single extracted speech clip belonging to one speaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    /// Path to the clip's audio file
    pub path: PathBuf,

    /// Diarization speaker label, e.g. "SPEAKER_00"
    pub speaker_id: String,

    /// Position of the clip within the speaker's segment sequence
    pub segment_index: usize,

    /// Start time in the original video timeline, seconds
    pub start_time: Option<f64>,

    /// End time in the original video timeline, seconds
    pub end_time: Option<f64>,

    /// Transcribed text, attached after transcription
    pub text: Option<String>,

    /// Translated text, attached after translation
    pub translation: Option<String>,
}

impl Clip {
    /// Creates a clip with no timing or text attached yet.
    pub fn new(path: impl Into<PathBuf>, speaker_id: impl Into<String>, segment_index: usize) -> Self {
        Self {
            path: path.into(),
            speaker_id: speaker_id.into(),
            segment_index,
            start_time: None,
            end_time: None,
            text: None,
            translation: None,
        }
    }

    /// Timing is valid when both endpoints are known and ordered.
    pub fn has_valid_timing(&self) -> bool {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end > start,
            _ => false,
        }
    }
}

/// Acoustic features measured from a single clip.
///
/// Features are recomputed per run and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipFeatures {
    /// Clip duration in seconds
    pub duration: f64,
    /// Overall loudness on a dB full-scale-like scale
    pub volume_level: f64,
    /// Mean per-frame RMS energy, non-negative
    pub energy: f64,
    /// Mean spectral centroid in Hz, when spectral analysis succeeded
    pub spectral_centroid: Option<f64>,
    /// Composite quality score used by reference selection
    pub quality_score: f64,
}

/// All clips attributed to one speaker, ordered by segment index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerTrack {
    pub speaker_id: String,
    pub clips: Vec<Clip>,
}

/// A transcription produced for one clip by the speech recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribedSegment {
    /// Index of the clip this transcription belongs to
    pub segment_index: usize,

    /// Transcribed text
    pub text: String,

    /// Translated text, filled in by the translation stage
    #[serde(default)]
    pub translation: Option<String>,

    /// Start time from diarization, seconds
    pub start: Option<f64>,

    /// End time from diarization, seconds
    pub end: Option<f64>,

    /// Recognizer confidence in [0, 1]
    #[serde(default)]
    pub confidence: Option<f64>,

    /// Detected language code
    #[serde(default)]
    pub language: Option<String>,
}

/// One synthesized clip to be placed on the output timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedSegment {
    /// Index of the source segment
    pub segment_index: usize,

    /// Path to the synthesized audio file
    pub output_file: PathBuf,

    /// Placement start in the video timeline, seconds
    pub start_time: f64,

    /// Original segment end in the video timeline, seconds.
    /// Placement uses the decoded clip length, not this value.
    pub end_time: f64,
}

/// Synthesis output for one speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub segments: Vec<SynthesizedSegment>,
}

/// Voice reference assembled for one speaker.
#[derive(Debug, Clone)]
pub struct ReferenceBundle {
    pub speaker_id: String,
    /// Selected clips in selection order
    pub clips: Vec<Clip>,
    /// Concatenated mono waveform
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Waveform duration in seconds, after gap insertion and truncation
    pub duration: f64,
    /// Concatenated transcription of the selected clips
    pub transcription: String,
    /// Concatenated translation of the selected clips
    pub translation: String,
}

/// Summary of one speaker's reference bundle as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSummary {
    pub speaker_id: String,
    pub audio_path: PathBuf,
    pub duration: f64,
    pub segments_count: usize,
    pub transcription: String,
    pub translation: String,
    pub transcription_file: Option<PathBuf>,
    pub translation_file: Option<PathBuf>,
}

/// Record of a completed timeline assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub output_path: PathBuf,
    pub duration: f64,
    pub sample_rate: u32,
}

/// Continuous dubbed track spanning the whole video.
#[derive(Debug, Clone)]
pub struct AssembledTrack {
    /// Mono waveform covering exactly the video duration
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Track duration in seconds
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_timing_validity() {
        let mut clip = Clip::new("a.wav", "SPEAKER_00", 0);
        assert!(!clip.has_valid_timing());

        clip.start_time = Some(1.0);
        assert!(!clip.has_valid_timing());

        clip.end_time = Some(2.5);
        assert!(clip.has_valid_timing());

        clip.end_time = Some(0.5);
        assert!(!clip.has_valid_timing());
    }

    #[test]
    fn test_transcribed_segment_deserializes_without_optional_fields() {
        let json = r#"{"segment_index": 3, "text": "hello", "start": 1.25, "end": 2.0}"#;
        let segment: TranscribedSegment = serde_json::from_str(json).unwrap();
        assert_eq!(segment.segment_index, 3);
        assert_eq!(segment.text, "hello");
        assert!(segment.translation.is_none());
        assert!(segment.confidence.is_none());
    }
}
