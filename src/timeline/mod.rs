//! # Timeline Assembly
//!
//! Places synthesized segments onto a silent track covering the whole
//! video, mixes overlaps additively, and normalizes the result. The
//! output length is derived from the video duration alone, so the
//! dubbed track always lines up with the source footage.

use log::{info, warn};

use crate::audio::format::decode_audio_file;
use crate::audio::level::LoudnessNormalizer;
use crate::audio::mix::mix_additive;
use crate::audio::resample::resample;
use crate::config::{AssemblyConfig, NormalizeConfig};
use crate::error::{DublineError, Result};
use crate::types::{AssembledTrack, SynthesisMap, SynthesizedSegment};

/// A synthesized segment tagged with its speaker, ready for placement.
pub(crate) struct PlacedSegment<'a> {
    pub speaker_id: &'a str,
    pub segment: &'a SynthesizedSegment,
}

/// Flattens per-speaker synthesis results into one list ordered by
/// start time. The sort is stable, so segments starting at the same
/// instant keep their speaker-map order.
pub(crate) fn flatten_and_sort(synthesis: &SynthesisMap) -> Vec<PlacedSegment<'_>> {
    let mut placed: Vec<PlacedSegment> = synthesis
        .iter()
        .flat_map(|(speaker_id, result)| {
            result.segments.iter().map(move |segment| PlacedSegment {
                speaker_id: speaker_id.as_str(),
                segment,
            })
        })
        .collect();
    placed.sort_by(|a, b| a.segment.start_time.total_cmp(&b.segment.start_time));
    placed
}

/// Builds the continuous dubbed voice track.
pub struct TimelineAssembler {
    config: AssemblyConfig,
    normalizer: LoudnessNormalizer,
}

impl TimelineAssembler {
    pub fn new(assembly: AssemblyConfig, normalize: NormalizeConfig) -> Self {
        Self {
            config: assembly,
            normalizer: LoudnessNormalizer::new(normalize),
        }
    }

    /// Assembles all synthesized segments into one normalized track of
    /// exactly `video_duration` seconds.
    ///
    /// Segments whose files are missing or unreadable are skipped with
    /// a warning. A segment's placement length is its decoded length;
    /// the stored end time is ignored. Anything reaching past the video
    /// end is cut at the track boundary.
    pub fn assemble(&self, synthesis: &SynthesisMap, video_duration: f64) -> Result<AssembledTrack> {
        if !video_duration.is_finite() || video_duration <= 0.0 {
            return Err(DublineError::UnknownDuration(format!(
                "cannot assemble a timeline for video duration {}",
                video_duration
            )));
        }

        let sample_rate = self.config.sample_rate;
        let total_samples = (video_duration * sample_rate as f64).round() as usize;

        let placed = flatten_and_sort(synthesis);
        info!(
            "Assembling {} segments from {} speakers onto a {:.2}s track",
            placed.len(),
            synthesis.len(),
            video_duration
        );

        let mut positioned: Vec<Vec<f32>> = Vec::new();
        for item in &placed {
            let (decoded, clip_rate) = match decode_audio_file(&item.segment.output_file) {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        "Skipping segment {} of speaker {}: {}",
                        item.segment.segment_index, item.speaker_id, err
                    );
                    continue;
                }
            };

            let samples = if clip_rate == sample_rate {
                decoded
            } else {
                match resample(&decoded, clip_rate, sample_rate) {
                    Ok(resampled) => resampled,
                    Err(err) => {
                        warn!(
                            "Skipping segment {} of speaker {}: {}",
                            item.segment.segment_index, item.speaker_id, err
                        );
                        continue;
                    }
                }
            };

            let offset = (item.segment.start_time * sample_rate as f64).round() as usize;
            if offset >= total_samples {
                warn!(
                    "Segment {} of speaker {} starts at {:.2}s, past the video end",
                    item.segment.segment_index, item.speaker_id, item.segment.start_time
                );
                continue;
            }

            let mut buffer = vec![0.0f32; offset];
            buffer.extend_from_slice(&samples);
            buffer.truncate(total_samples);
            positioned.push(buffer);
        }

        let mut samples = match positioned.len() {
            0 => {
                info!("No placeable segments, producing a silent track");
                vec![0.0f32; total_samples]
            }
            // A lone segment needs no mixing pass
            1 => positioned.pop().unwrap_or_default(),
            _ => mix_additive(&positioned),
        };
        samples.resize(total_samples, 0.0);

        self.normalizer.normalize(&mut samples);

        Ok(AssembledTrack {
            samples,
            sample_rate,
            duration: total_samples as f64 / sample_rate as f64,
        })
    }
}
