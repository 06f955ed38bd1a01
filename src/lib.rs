//! # dubline
//!
//! Audio core of a video dubbing pipeline: extracts per-speaker speech
//! segments, selects and merges voice reference samples for cloning,
//! assembles synthesized segments into a continuous dubbed track, and
//! mixes it with the original background.
//!
//! The heavy external stages (diarization, transcription, translation,
//! synthesis) stay outside this crate; their results flow in and out
//! through the types in [`types`].
//!
//! Features:
//! - Per-clip acoustic analysis (duration, loudness, spectral centroid)
//! - Tiered reference selection balancing quality and variety
//! - Timeline assembly with additive overlap mixing
//! - Deterministic loudness normalization
//! - JSON stage caches keyed by input fingerprints
//!
//! ```no_run
//! use std::path::Path;
//! use dubline::{Dubline, DublineConfig};
//!
//! fn run() -> dubline::Result<()> {
//!     let pipeline = Dubline::new(DublineConfig::default());
//!     let tracks = dubline::extract::scan_segments_dir(Path::new("work/segments"))?;
//!     let references = pipeline.build_references(&tracks, Path::new("work/references"))?;
//!     println!("Built {} voice references", references.len());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod reference;
pub mod timeline;
pub mod types;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::audio::format::{decode_audio_file, encode_wav};
use crate::audio::mix::mix_voice_with_background;
use crate::audio::resample::resample;
use crate::cache::{fingerprint, StageCache};
use crate::extract::SegmentExtractor;
use crate::reference::bundle::{build_bundle, write_bundle};
use crate::reference::ReferenceSelector;
use crate::timeline::TimelineAssembler;

pub use crate::analysis::ClipFeatureAnalyzer;
pub use crate::audio::level::{track_stats, LoudnessNormalizer, TrackStats};
pub use crate::config::{
    AnalysisConfig, AssemblyConfig, DublineConfig, MixConfig, NormalizeConfig, SelectionConfig,
};
pub use crate::error::{DublineError, Result};
pub use crate::reference::ScoredClip;
pub use crate::types::{
    AssembledTrack, AssemblyRecord, Clip, ClipFeatures, DiarizationMap, ReferenceBundle,
    ReferenceSummary, SpeakerTrack, SynthesisMap, SynthesisResult, SynthesizedSegment,
    TranscribedSegment, TranscriptMap,
};

/// Facade over the dubbing pipeline stages.
pub struct Dubline {
    config: DublineConfig,
}

impl Dubline {
    pub fn new(config: DublineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DublineConfig {
        &self.config
    }

    fn stage_cache(&self) -> Option<StageCache> {
        self.config.cache_dir.as_ref().map(StageCache::new)
    }

    /// Cuts the vocal track into per-speaker clips along diarization
    /// intervals. See [`extract::SegmentExtractor`].
    pub fn extract_segments(
        &self,
        audio_path: &Path,
        diarization: &DiarizationMap,
        output_dir: &Path,
    ) -> Result<BTreeMap<String, SpeakerTrack>> {
        SegmentExtractor::new(audio_path, diarization.clone()).extract(output_dir)
    }

    /// Builds one voice reference per speaker and writes the audio and
    /// text files under `output_dir`.
    ///
    /// Speakers without usable clips are skipped with a warning, and a
    /// failure for one speaker never aborts the others. The result is
    /// cached when a cache directory is configured.
    pub fn build_references(
        &self,
        tracks: &BTreeMap<String, SpeakerTrack>,
        output_dir: &Path,
    ) -> Result<BTreeMap<String, ReferenceSummary>> {
        let print = reference_fingerprint(tracks);
        if let Some(cache) = self.stage_cache() {
            if let Some(cached) = cache.load::<BTreeMap<String, ReferenceSummary>>("references", &print)
            {
                return Ok(cached);
            }
        }

        info!("Building voice references for {} speakers", tracks.len());
        let selector = ReferenceSelector::new(
            self.config.selection.clone(),
            self.config.analysis.clone(),
        );

        let mut summaries: BTreeMap<String, ReferenceSummary> = BTreeMap::new();
        for (speaker_id, track) in tracks {
            let selection = selector.select(track);
            if selection.is_empty() {
                warn!("Skipping speaker {}: no usable reference clips", speaker_id);
                continue;
            }

            let written = build_bundle(speaker_id, &selection, &self.config.selection)
                .and_then(|bundle| write_bundle(&bundle, output_dir));
            match written {
                Ok(summary) => {
                    summaries.insert(speaker_id.clone(), summary);
                }
                Err(err) => {
                    error!("Failed to build reference for speaker {}: {}", speaker_id, err);
                }
            }
        }

        if let Some(cache) = self.stage_cache() {
            if let Err(err) = cache.store("references", &print, &summaries) {
                warn!("Failed to store reference cache: {}", err);
            }
        }
        Ok(summaries)
    }

    /// Assembles all synthesized segments into one normalized track of
    /// exactly `video_duration` seconds and writes it to `output_path`.
    ///
    /// With a cache directory configured, an unchanged input set reuses
    /// the previously written track.
    pub fn assemble_timeline(
        &self,
        synthesis: &SynthesisMap,
        video_duration: f64,
        output_path: &Path,
    ) -> Result<AssembledTrack> {
        let print = timeline_fingerprint(synthesis, video_duration);
        if let Some(cache) = self.stage_cache() {
            if let Some(record) = cache.load::<AssemblyRecord>("timeline", &print) {
                let (samples, sample_rate) = decode_audio_file(&record.output_path)?;
                let duration = samples.len() as f64 / sample_rate as f64;
                return Ok(AssembledTrack {
                    samples,
                    sample_rate,
                    duration,
                });
            }
        }

        let assembler = TimelineAssembler::new(
            self.config.assembly.clone(),
            self.config.normalize.clone(),
        );
        let track = assembler.assemble(synthesis, video_duration)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        encode_wav(&track.samples, track.sample_rate, output_path)?;
        info!("Wrote assembled voice track to {}", output_path.display());

        if let Some(cache) = self.stage_cache() {
            let record = AssemblyRecord {
                output_path: output_path.to_path_buf(),
                duration: track.duration,
                sample_rate: track.sample_rate,
            };
            if let Err(err) = cache.store("timeline", &print, &record) {
                warn!("Failed to store timeline cache: {}", err);
            }
        }
        Ok(track)
    }

    /// Mixes the dubbed voice track with the original background and
    /// writes the result to `output_path`.
    ///
    /// The mix applies the configured volume gains only; levels are
    /// otherwise left exactly as the inputs provide them.
    pub fn mix_with_background(
        &self,
        voice_path: &Path,
        background_path: &Path,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let (voice, voice_rate) = decode_audio_file(voice_path)?;
        let (mut background, background_rate) = decode_audio_file(background_path)?;
        if background_rate != voice_rate {
            background = resample(&background, background_rate, voice_rate)?;
        }

        let mixed = mix_voice_with_background(&voice, &background, &self.config.mix);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        encode_wav(&mixed, voice_rate, output_path)?;
        info!("Wrote final mix to {}", output_path.display());
        Ok(output_path.to_path_buf())
    }
}

impl Default for Dubline {
    fn default() -> Self {
        Self::new(DublineConfig::default())
    }
}

fn reference_fingerprint(tracks: &BTreeMap<String, SpeakerTrack>) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (speaker_id, track) in tracks {
        parts.push(speaker_id.clone());
        for clip in &track.clips {
            parts.push(format!("{}#{}", clip.path.display(), clip.segment_index));
            if let Some(text) = &clip.text {
                parts.push(text.clone());
            }
            if let Some(translation) = &clip.translation {
                parts.push(translation.clone());
            }
        }
    }
    fingerprint(parts)
}

fn timeline_fingerprint(synthesis: &SynthesisMap, video_duration: f64) -> String {
    let mut parts: Vec<String> = vec![format!("duration:{:.3}", video_duration)];
    for (speaker_id, result) in synthesis {
        parts.push(speaker_id.clone());
        for segment in &result.segments {
            parts.push(format!(
                "{}@{:.3}",
                segment.output_file.display(),
                segment.start_time
            ));
        }
    }
    fingerprint(parts)
}
