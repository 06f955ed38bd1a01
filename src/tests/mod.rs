//! # Pipeline Tests
//!
//! End-to-end tests running extraction, reference selection, timeline
//! assembly and mixing against synthetic audio written to temporary
//! directories.

use std::fs;
use std::path::Path;

use crate::audio::format::{decode_audio_file, encode_wav};
use crate::config::{AnalysisConfig, SelectionConfig};
use crate::extract::scan_segments_dir;
use crate::reference::ReferenceSelector;
use crate::types::{SynthesisMap, SynthesisResult, SynthesizedSegment};
use crate::{Dubline, DublineConfig};

fn tone(duration: f64, sample_rate: u32, freq: f64, amplitude: f64) -> Vec<f32> {
    let count = (duration * sample_rate as f64) as usize;
    (0..count)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
        })
        .collect()
}

fn write_tone(path: &Path, duration: f64, sample_rate: u32, freq: f64) {
    encode_wav(&tone(duration, sample_rate, freq, 0.3), sample_rate, path).unwrap();
}

fn synthesis_entry(speaker: &str, segments: Vec<SynthesizedSegment>) -> (String, SynthesisResult) {
    (speaker.to_string(), SynthesisResult { segments })
}

#[test]
fn test_assembles_overlapping_speakers_into_full_length_track() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.wav");
    let b = dir.path().join("b.wav");
    let c = dir.path().join("c.wav");
    write_tone(&a, 3.0, 44100, 440.0);
    write_tone(&b, 1.0, 44100, 550.0);
    write_tone(&c, 1.0, 44100, 660.0);

    let synthesis: SynthesisMap = [
        synthesis_entry(
            "SPEAKER_00",
            vec![SynthesizedSegment {
                segment_index: 0,
                output_file: a,
                start_time: 0.0,
                end_time: 3.0,
            }],
        ),
        synthesis_entry(
            "SPEAKER_01",
            vec![SynthesizedSegment {
                segment_index: 0,
                output_file: b,
                start_time: 5.0,
                end_time: 6.0,
            }],
        ),
        synthesis_entry(
            "SPEAKER_02",
            vec![SynthesizedSegment {
                segment_index: 0,
                output_file: c,
                start_time: 5.5,
                end_time: 6.5,
            }],
        ),
    ]
    .into_iter()
    .collect();

    let out = dir.path().join("voice_track.wav");
    let track = Dubline::default()
        .assemble_timeline(&synthesis, 10.0, &out)
        .unwrap();

    assert_eq!(track.samples.len(), 441_000);
    assert!(out.exists());

    // Nothing speaks between 3.0s and 5.0s
    let silent = &track.samples[(3.1 * 44100.0) as usize..(4.9 * 44100.0) as usize];
    assert!(silent.iter().all(|&s| s == 0.0));

    // Both speakers are audible in the 5.5s-6.0s overlap
    let overlap = &track.samples[(5.5 * 44100.0) as usize..(6.0 * 44100.0) as usize];
    assert!(overlap.iter().any(|&s| s != 0.0));

    // The last clip ends at 6.5s; the rest of the track is silence
    let tail = &track.samples[(6.6 * 44100.0) as usize..];
    assert!(tail.iter().all(|&s| s == 0.0));
}

#[test]
fn test_selection_prefers_a_combination_over_one_long_clip() {
    let dir = tempfile::tempdir().unwrap();
    let segments = dir.path().join("segments");
    fs::create_dir_all(&segments).unwrap();

    for (index, duration) in [1.2, 0.8, 4.5, 1.0, 2.0].iter().enumerate() {
        let path = segments.join(format!("SPEAKER_00_seg{}.wav", index));
        write_tone(&path, *duration, 22050, 1000.0);
    }

    let tracks = scan_segments_dir(&segments).unwrap();
    let refs = dir.path().join("references");
    let summaries = Dubline::default().build_references(&tracks, &refs).unwrap();

    let summary = &summaries["SPEAKER_00"];
    assert!(summary.segments_count >= 2, "got {}", summary.segments_count);
    assert!(summary.duration >= 3.0);
    assert!(summary.duration <= 10.0 + 1e-6);
    assert!(summary.audio_path.exists());

    let (samples, rate) = decode_audio_file(&summary.audio_path).unwrap();
    assert_eq!(rate, 22050);
    assert!((samples.len() as f64 / rate as f64 - summary.duration).abs() < 1e-6);
}

#[test]
fn test_inter_clip_gaps_count_toward_the_duration_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let segments = dir.path().join("segments");
    fs::create_dir_all(&segments).unwrap();

    // Two clips summing to 9.9s fit the 10s ceiling only if the 0.2s
    // gap is ignored; counting the gap leaves room for just one
    for index in 0..2 {
        let path = segments.join(format!("SPEAKER_00_seg{}.wav", index));
        write_tone(&path, 4.95, 22050, 1000.0);
    }

    let tracks = scan_segments_dir(&segments).unwrap();
    let selector = ReferenceSelector::new(SelectionConfig::default(), AnalysisConfig::default());
    let selection = selector.select(&tracks["SPEAKER_00"]);

    assert_eq!(selection.len(), 1);
    assert!((selection[0].features.duration - 4.95).abs() < 0.01);
}

#[test]
fn test_selection_is_deterministic_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let segments = dir.path().join("segments");
    fs::create_dir_all(&segments).unwrap();

    for (index, duration) in [1.2, 0.8, 4.5, 1.0, 2.0].iter().enumerate() {
        let path = segments.join(format!("SPEAKER_00_seg{}.wav", index));
        write_tone(&path, *duration, 22050, 1000.0);
    }

    let tracks = scan_segments_dir(&segments).unwrap();
    let selector = ReferenceSelector::new(SelectionConfig::default(), AnalysisConfig::default());

    let first: Vec<_> = selector.select(&tracks["SPEAKER_00"])
        .into_iter()
        .map(|s| s.clip.path)
        .collect();
    let second: Vec<_> = selector.select(&tracks["SPEAKER_00"])
        .into_iter()
        .map(|s| s.clip.path)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_empty_synthesis_writes_a_silent_track() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("voice_track.wav");

    let track = Dubline::default()
        .assemble_timeline(&SynthesisMap::new(), 2.0, &out)
        .unwrap();

    assert_eq!(track.samples.len(), 88200);
    assert!(track.samples.iter().all(|&s| s == 0.0));

    let (samples, _) = decode_audio_file(&out).unwrap();
    assert_eq!(samples.len(), 88200);
}

#[test]
fn test_reference_cache_survives_and_invalidates() {
    let dir = tempfile::tempdir().unwrap();
    let segments = dir.path().join("segments");
    fs::create_dir_all(&segments).unwrap();
    for index in 0..3 {
        let path = segments.join(format!("SPEAKER_00_seg{}.wav", index));
        write_tone(&path, 1.5, 22050, 1000.0);
    }

    let config = DublineConfig {
        cache_dir: Some(dir.path().join("cache")),
        ..Default::default()
    };
    let pipeline = Dubline::new(config);

    let tracks = scan_segments_dir(&segments).unwrap();
    let refs = dir.path().join("references");

    let first = pipeline.build_references(&tracks, &refs).unwrap();
    let second = pipeline.build_references(&tracks, &refs).unwrap();
    assert_eq!(first, second);

    // Deleting the written sample invalidates the cache entry and the
    // stage runs again
    fs::remove_file(&first["SPEAKER_00"].audio_path).unwrap();
    let third = pipeline.build_references(&tracks, &refs).unwrap();
    assert!(third["SPEAKER_00"].audio_path.exists());
}

#[test]
fn test_mix_keeps_background_quiet_and_voice_dominant() {
    let dir = tempfile::tempdir().unwrap();
    let voice = dir.path().join("voice.wav");
    let background = dir.path().join("background.wav");
    encode_wav(&tone(1.0, 44100, 440.0, 0.5), 44100, &voice).unwrap();
    encode_wav(&tone(2.0, 44100, 220.0, 0.4), 44100, &background).unwrap();

    let out = dir.path().join("final_mix.wav");
    Dubline::default()
        .mix_with_background(&voice, &background, &out)
        .unwrap();

    let (mixed, rate) = decode_audio_file(&out).unwrap();
    assert_eq!(rate, 44100);
    // Output spans the longer input
    assert_eq!(mixed.len(), 88200);

    // After the voice ends only the attenuated background remains
    let bg_only = &mixed[(1.2 * 44100.0) as usize..];
    let bg_peak = bg_only.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
    assert!(bg_peak > 0.05 && bg_peak < 0.2, "bg peak {}", bg_peak);

    // Voice region peaks well above the background, with no
    // normalization pulling it to a standard level
    let voice_region = &mixed[..44100];
    let voice_peak = voice_region.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
    assert!(voice_peak > 0.45 && voice_peak < 0.75, "voice peak {}", voice_peak);
}
