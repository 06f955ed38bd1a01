//! Walkthrough of the dubbing pipeline stages on synthetic audio.
//!
//! Builds a small two-speaker vocal track, extracts the speech
//! segments, assembles voice references, places stand-in synthesized
//! segments on the timeline and mixes the result with a background
//! bed. Run with `RUST_LOG=info` to see the stage logging.

use std::path::Path;

use dubline::audio::format::encode_wav;
use dubline::extract::attach_transcripts;
use dubline::{
    track_stats, DiarizationMap, Dubline, DublineConfig, SynthesisMap, SynthesisResult,
    SynthesizedSegment, TranscribedSegment, TranscriptMap,
};

const SAMPLE_RATE: u32 = 44100;

fn place_tone(track: &mut [f32], start: f64, duration: f64, freq: f64) {
    let offset = (start * SAMPLE_RATE as f64) as usize;
    let count = (duration * SAMPLE_RATE as f64) as usize;
    for i in 0..count {
        let t = i as f64 / SAMPLE_RATE as f64;
        let sample = 0.3 * (2.0 * std::f64::consts::PI * freq * t).sin();
        if let Some(slot) = track.get_mut(offset + i) {
            *slot = sample as f32;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let workdir = Path::new("demo_output");
    std::fs::create_dir_all(workdir)?;

    println!("Step 1: synthesizing a 12s two-speaker vocal track");
    let mut vocals = vec![0.0f32; (12.0 * SAMPLE_RATE as f64) as usize];
    place_tone(&mut vocals, 0.5, 2.5, 440.0);
    place_tone(&mut vocals, 3.5, 2.0, 330.0);
    place_tone(&mut vocals, 6.0, 2.5, 440.0);
    place_tone(&mut vocals, 9.0, 2.0, 330.0);
    let vocals_path = workdir.join("vocals.wav");
    encode_wav(&vocals, SAMPLE_RATE, &vocals_path)?;

    let mut diarization = DiarizationMap::new();
    diarization.insert("SPEAKER_00".to_string(), vec![(0.5, 3.0), (6.0, 8.5)]);
    diarization.insert("SPEAKER_01".to_string(), vec![(3.5, 5.5), (9.0, 11.0)]);

    let config = DublineConfig {
        cache_dir: Some(workdir.join("cache")),
        ..Default::default()
    };
    let pipeline = Dubline::new(config);

    println!("Step 2: extracting per-speaker segments");
    let segments_dir = workdir.join("segments");
    let mut tracks = pipeline.extract_segments(&vocals_path, &diarization, &segments_dir)?;
    for (speaker, track) in &tracks {
        println!("  {} has {} clips", speaker, track.clips.len());
    }

    // Stand-in transcriptions; a real pipeline gets these from the
    // speech recognizer and translator
    let mut transcripts = TranscriptMap::new();
    transcripts.insert(
        "SPEAKER_00".to_string(),
        vec![
            demo_transcript(0, "First speaker, first line.", 0.5, 3.0),
            demo_transcript(1, "First speaker, second line.", 6.0, 8.5),
        ],
    );
    transcripts.insert(
        "SPEAKER_01".to_string(),
        vec![
            demo_transcript(0, "Second speaker, first line.", 3.5, 5.5),
            demo_transcript(1, "Second speaker, second line.", 9.0, 11.0),
        ],
    );
    attach_transcripts(&mut tracks, &transcripts);

    println!("Step 3: building voice references");
    let references = pipeline.build_references(&tracks, &workdir.join("references"))?;
    for summary in references.values() {
        println!(
            "  {}: {:.2}s from {} clips -> {}",
            summary.speaker_id,
            summary.duration,
            summary.segments_count,
            summary.audio_path.display()
        );
    }

    println!("Step 4: assembling the dubbed timeline");
    // The extracted clips stand in for synthesized speech here
    let mut synthesis = SynthesisMap::new();
    for (speaker, track) in &tracks {
        let segments = track
            .clips
            .iter()
            .map(|clip| SynthesizedSegment {
                segment_index: clip.segment_index,
                output_file: clip.path.clone(),
                start_time: clip.start_time.unwrap_or(0.0),
                end_time: clip.end_time.unwrap_or(0.0),
            })
            .collect();
        synthesis.insert(speaker.clone(), SynthesisResult { segments });
    }

    let voice_path = workdir.join("voice_track.wav");
    let track = pipeline.assemble_timeline(&synthesis, 12.0, &voice_path)?;
    let stats = track_stats(&track.samples, track.sample_rate);
    println!(
        "  voice track: {:.2}s, peak {:.1} dB, rms {:.1} dB, ~{:.1} LUFS",
        stats.duration, stats.peak_db, stats.rms_db, stats.lufs
    );

    println!("Step 5: mixing with the background bed");
    let mut bed = vec![0.0f32; (12.0 * SAMPLE_RATE as f64) as usize];
    place_tone(&mut bed, 0.0, 12.0, 110.0);
    let bed_path = workdir.join("background.wav");
    encode_wav(&bed, SAMPLE_RATE, &bed_path)?;

    let final_path = pipeline.mix_with_background(
        &voice_path,
        &bed_path,
        &workdir.join("final_mix.wav"),
    )?;
    println!("Done: {}", final_path.display());

    Ok(())
}

fn demo_transcript(index: usize, text: &str, start: f64, end: f64) -> TranscribedSegment {
    TranscribedSegment {
        segment_index: index,
        text: text.to_string(),
        translation: Some(text.to_string()),
        start: Some(start),
        end: Some(end),
        confidence: Some(0.95),
        language: Some("en".to_string()),
    }
}
