//! # Segment Extraction
//!
//! Cuts per-speaker clips out of the vocal track along diarization
//! intervals, and reloads previously extracted clips from a segments
//! directory. Clip files are named `{speaker}_seg{index}.wav` so a
//! directory scan can rebuild the speaker tracks without re-running
//! diarization.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, info, warn};
use regex::Regex;

use crate::audio::format::{decode_audio_file, encode_wav};
use crate::error::Result;
use crate::types::{Clip, DiarizationMap, SpeakerTrack, TranscriptMap};

const SEGMENT_NAME_PATTERN: &str = r"^(SPEAKER_[A-Za-z0-9]+)_seg(\d+)\.wav$";

/// Cuts diarized speech segments out of one audio file.
pub struct SegmentExtractor {
    audio_path: PathBuf,
    diarization: DiarizationMap,
}

impl SegmentExtractor {
    pub fn new(audio_path: impl Into<PathBuf>, diarization: DiarizationMap) -> Self {
        Self {
            audio_path: audio_path.into(),
            diarization,
        }
    }

    /// Writes one WAV clip per diarization interval into `output_dir`
    /// and returns the resulting speaker tracks.
    ///
    /// Intervals are clamped to the audio length; intervals that end
    /// up empty are skipped but keep their segment index, so indices
    /// stay aligned with the diarization output.
    pub fn extract(&self, output_dir: &Path) -> Result<BTreeMap<String, SpeakerTrack>> {
        fs::create_dir_all(output_dir)?;

        let (samples, sample_rate) = decode_audio_file(&self.audio_path)?;
        let mut tracks: BTreeMap<String, SpeakerTrack> = BTreeMap::new();
        let mut clip_count = 0usize;

        for (speaker_id, intervals) in &self.diarization {
            let mut clips: Vec<Clip> = Vec::new();

            for (index, &(start, end)) in intervals.iter().enumerate() {
                let start_idx = ((start * sample_rate as f64).round() as usize).min(samples.len());
                let end_idx = ((end * sample_rate as f64).round() as usize).min(samples.len());
                if end_idx <= start_idx {
                    warn!(
                        "Skipping empty interval {:.2}-{:.2}s for speaker {}",
                        start, end, speaker_id
                    );
                    continue;
                }

                let path = output_dir.join(format!("{}_seg{}.wav", speaker_id, index));
                encode_wav(&samples[start_idx..end_idx], sample_rate, &path)?;

                let mut clip = Clip::new(path, speaker_id.clone(), index);
                clip.start_time = Some(start);
                clip.end_time = Some(end);
                clips.push(clip);
                clip_count += 1;
            }

            if clips.is_empty() {
                debug!("Speaker {} produced no clips", speaker_id);
                continue;
            }
            tracks.insert(
                speaker_id.clone(),
                SpeakerTrack {
                    speaker_id: speaker_id.clone(),
                    clips,
                },
            );
        }

        info!(
            "Extracted {} clips for {} speakers to {}",
            clip_count,
            tracks.len(),
            output_dir.display()
        );
        Ok(tracks)
    }
}

/// Rebuilds speaker tracks from a directory of extracted clips.
///
/// Files that do not match the segment naming scheme are ignored.
/// Clips come back ordered by segment index, not lexically, so
/// `seg10` sorts after `seg2`.
pub fn scan_segments_dir(dir: &Path) -> Result<BTreeMap<String, SpeakerTrack>> {
    let re = Regex::new(SEGMENT_NAME_PATTERN)
        .context("Failed to compile segment filename pattern")?;

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut tracks: BTreeMap<String, SpeakerTrack> = BTreeMap::new();
    for name in &names {
        let (speaker_id, segment_index) = match parse_segment_filename(&re, name) {
            Some(parsed) => parsed,
            None => continue,
        };

        let clip = Clip::new(dir.join(name), speaker_id.clone(), segment_index);
        tracks
            .entry(speaker_id.clone())
            .or_insert_with(|| SpeakerTrack {
                speaker_id,
                clips: Vec::new(),
            })
            .clips
            .push(clip);
    }

    for track in tracks.values_mut() {
        track.clips.sort_by_key(|clip| clip.segment_index);
    }

    info!(
        "Found {} speakers among {} files in {}",
        tracks.len(),
        names.len(),
        dir.display()
    );
    Ok(tracks)
}

fn parse_segment_filename(re: &Regex, name: &str) -> Option<(String, usize)> {
    let captures = re.captures(name)?;
    let speaker_id = captures.get(1)?.as_str().to_string();
    let segment_index = captures.get(2)?.as_str().parse().ok()?;
    Some((speaker_id, segment_index))
}

/// Attaches transcription results to their clips by segment index.
///
/// Clips scanned from disk have no timing; transcripts carry the
/// diarization times, so those are filled in here as well.
pub fn attach_transcripts(tracks: &mut BTreeMap<String, SpeakerTrack>, transcripts: &TranscriptMap) {
    for (speaker_id, segments) in transcripts {
        let track = match tracks.get_mut(speaker_id) {
            Some(track) => track,
            None => continue,
        };

        for segment in segments {
            let clip = track
                .clips
                .iter_mut()
                .find(|clip| clip.segment_index == segment.segment_index);
            if let Some(clip) = clip {
                clip.text = Some(segment.text.clone());
                clip.translation = segment.translation.clone();
                if clip.start_time.is_none() {
                    clip.start_time = segment.start;
                }
                if clip.end_time.is_none() {
                    clip.end_time = segment.end;
                }
            }
        }
    }
}
