//! # Reference Bundles
//!
//! Turns a selection of clips into one continuous reference sample:
//! decode, resample to a common rate, concatenate with short silence
//! gaps, truncate to the duration ceiling, and write the result next
//! to its transcription and translation.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::audio::format::{decode_audio_file, encode_wav};
use crate::audio::resample::resample;
use crate::config::SelectionConfig;
use crate::error::{DublineError, Result};
use crate::types::{ReferenceBundle, ReferenceSummary};

use super::ScoredClip;

/// Concatenates the selected clips into a single reference waveform.
///
/// The first clip's sample rate becomes the bundle rate; later clips
/// are resampled to match. Clips are separated by `gap_duration` of
/// silence, and the result is cut hard at `max_duration`.
pub fn build_bundle(
    speaker_id: &str,
    selection: &[ScoredClip],
    config: &SelectionConfig,
) -> Result<ReferenceBundle> {
    if selection.is_empty() {
        return Err(DublineError::AudioProcessing(format!(
            "no clips selected for speaker {}",
            speaker_id
        )));
    }

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate: u32 = 0;

    for (position, scored) in selection.iter().enumerate() {
        let (mut clip_samples, clip_rate) = decode_audio_file(&scored.clip.path)?;

        if position == 0 {
            sample_rate = clip_rate;
        } else {
            if clip_rate != sample_rate {
                debug!(
                    "Resampling {} from {} Hz to bundle rate {} Hz",
                    scored.clip.path.display(),
                    clip_rate,
                    sample_rate
                );
                clip_samples = resample(&clip_samples, clip_rate, sample_rate)?;
            }
            let gap_samples = (config.gap_duration * sample_rate as f64).round() as usize;
            samples.extend(std::iter::repeat(0.0).take(gap_samples));
        }

        samples.extend_from_slice(&clip_samples);
    }

    let max_samples = (config.max_duration * sample_rate as f64).round() as usize;
    if samples.len() > max_samples {
        info!(
            "Reference for speaker {} exceeds {:.1}s, truncating",
            speaker_id, config.max_duration
        );
        samples.truncate(max_samples);
    }

    let duration = samples.len() as f64 / sample_rate as f64;
    let transcription = join_texts(selection.iter().map(|s| s.clip.text.as_deref()));
    let translation = join_texts(selection.iter().map(|s| s.clip.translation.as_deref()));

    info!(
        "Built reference bundle for speaker {}: {} clips, {:.2}s at {} Hz",
        speaker_id,
        selection.len(),
        duration,
        sample_rate
    );

    Ok(ReferenceBundle {
        speaker_id: speaker_id.to_string(),
        clips: selection.iter().map(|s| s.clip.clone()).collect(),
        samples,
        sample_rate,
        duration,
        transcription,
        translation,
    })
}

/// Writes the bundle's audio and text files under `output_dir`.
///
/// Text files are only written when there is text to write, so the
/// summary's file fields stay `None` for untranscribed speakers.
pub fn write_bundle(bundle: &ReferenceBundle, output_dir: &Path) -> Result<ReferenceSummary> {
    fs::create_dir_all(output_dir)?;

    let audio_path = output_dir.join(format!("{}_voice_sample.wav", bundle.speaker_id));
    encode_wav(&bundle.samples, bundle.sample_rate, &audio_path)?;

    let transcription_file = if bundle.transcription.is_empty() {
        None
    } else {
        let path = output_dir.join(format!("{}_transcription.txt", bundle.speaker_id));
        fs::write(&path, &bundle.transcription)?;
        Some(path)
    };

    let translation_file = if bundle.translation.is_empty() {
        None
    } else {
        let path = output_dir.join(format!("{}_translation.txt", bundle.speaker_id));
        fs::write(&path, &bundle.translation)?;
        Some(path)
    };

    info!(
        "Wrote reference files for speaker {} to {}",
        bundle.speaker_id,
        output_dir.display()
    );

    Ok(ReferenceSummary {
        speaker_id: bundle.speaker_id.clone(),
        audio_path,
        duration: bundle.duration,
        segments_count: bundle.clips.len(),
        transcription: bundle.transcription.clone(),
        translation: bundle.translation.clone(),
        transcription_file,
        translation_file,
    })
}

fn join_texts<'a>(texts: impl Iterator<Item = Option<&'a str>>) -> String {
    texts.flatten().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Clip, ClipFeatures};
    use std::path::PathBuf;

    fn tone(duration: f64, sample_rate: u32) -> Vec<f32> {
        let count = (duration * sample_rate as f64) as usize;
        (0..count)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (0.3 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as f32
            })
            .collect()
    }

    fn scored_clip(path: PathBuf, index: usize, text: Option<&str>) -> ScoredClip {
        let mut clip = Clip::new(path, "SPEAKER_00", index);
        clip.text = text.map(str::to_string);
        ScoredClip {
            clip,
            features: ClipFeatures {
                duration: 1.0,
                volume_level: -13.5,
                energy: 0.2,
                spectral_centroid: Some(440.0),
                quality_score: 6.0,
            },
        }
    }

    #[test]
    fn test_bundle_concatenates_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        encode_wav(&tone(1.0, 44100), 44100, &a).unwrap();
        encode_wav(&tone(1.0, 44100), 44100, &b).unwrap();

        let selection = vec![
            scored_clip(a, 0, Some("hello")),
            scored_clip(b, 1, Some("world")),
        ];
        let bundle = build_bundle("SPEAKER_00", &selection, &SelectionConfig::default()).unwrap();

        // 1s + 0.2s gap + 1s
        assert_eq!(bundle.samples.len(), 44100 + 8820 + 44100);
        assert_eq!(bundle.sample_rate, 44100);
        assert!((bundle.duration - 2.2).abs() < 1e-3);
        assert_eq!(bundle.transcription, "hello world");
        assert!(bundle.translation.is_empty());
    }

    #[test]
    fn test_bundle_truncates_at_duration_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        encode_wav(&tone(6.0, 44100), 44100, &a).unwrap();
        encode_wav(&tone(6.0, 44100), 44100, &b).unwrap();

        let selection = vec![scored_clip(a, 0, None), scored_clip(b, 1, None)];
        let bundle = build_bundle("SPEAKER_00", &selection, &SelectionConfig::default()).unwrap();

        assert_eq!(bundle.samples.len(), 441000);
        assert!((bundle.duration - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_bundle_resamples_mismatched_clips() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        encode_wav(&tone(1.0, 44100), 44100, &a).unwrap();
        encode_wav(&tone(1.0, 22050), 22050, &b).unwrap();

        let selection = vec![scored_clip(a, 0, None), scored_clip(b, 1, None)];
        let bundle = build_bundle("SPEAKER_00", &selection, &SelectionConfig::default()).unwrap();

        assert_eq!(bundle.sample_rate, 44100);
        // Resampler block handling may trim the tail slightly
        assert!((bundle.duration - 2.2).abs() < 0.05, "duration {}", bundle.duration);
    }

    #[test]
    fn test_bundle_requires_at_least_one_clip() {
        assert!(build_bundle("SPEAKER_00", &[], &SelectionConfig::default()).is_err());
    }

    #[test]
    fn test_write_bundle_creates_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        encode_wav(&tone(1.0, 44100), 44100, &a).unwrap();

        let selection = vec![scored_clip(a, 0, Some("hola"))];
        let bundle = build_bundle("SPEAKER_01", &selection, &SelectionConfig::default()).unwrap();

        let out = dir.path().join("refs");
        let summary = write_bundle(&bundle, &out).unwrap();

        assert!(summary.audio_path.exists());
        assert_eq!(
            summary.audio_path.file_name().unwrap(),
            "SPEAKER_01_voice_sample.wav"
        );
        assert_eq!(summary.segments_count, 1);
        assert_eq!(summary.transcription, "hola");
        assert!(summary.transcription_file.as_ref().unwrap().exists());
        assert!(summary.translation_file.is_none());
    }
}
