//! # Audio Format Handling
//!
//! Decoding audio files into PCM samples and encoding PCM back to WAV.
//! WAV files are handled with a dedicated decoder; MP3, M4A, AAC, FLAC and
//! OGG go through the generic Symphonia probe. Multi-channel audio is
//! downmixed to mono.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

use crate::error::{DublineError, Result};

/// Duration in seconds for a sample count at the given rate.
pub fn duration_in_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}

/// Root mean square of a sample buffer. Returns 0.0 for empty input.
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Decodes an audio file into mono PCM samples.
///
/// The format is chosen by file extension: WAV files use the dedicated
/// decoder, everything else goes through Symphonia. Returns the samples
/// and the file's sample rate.
pub fn decode_audio_file<P: AsRef<Path>>(file_path: P) -> Result<(Vec<f32>, u32)> {
    let file_path = file_path.as_ref();
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" => decode_wav_file(file_path),

        "mp3" | "m4a" | "aac" | "flac" | "ogg" => {
            let mut file = File::open(file_path)?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;

            let cursor = std::io::Cursor::new(buffer);
            let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

            let mut hint = Hint::new();
            hint.with_extension(&extension);

            let probed = symphonia::default::get_probe()
                .format(&hint, mss, &Default::default(), &Default::default())
                .map_err(|e| {
                    DublineError::AudioProcessing(format!("failed to probe audio format: {}", e))
                })?;

            let mut format = probed.format;
            let track = format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
                .ok_or_else(|| {
                    DublineError::AudioProcessing("no audio track found".to_string())
                })?;

            let mut decoder = symphonia::default::get_codecs()
                .make(&track.codec_params, &Default::default())
                .map_err(|e| {
                    DublineError::AudioProcessing(format!("failed to create decoder: {}", e))
                })?;

            let track_id = track.id;
            let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
            let channels = track.codec_params.channels.unwrap_or_default().count();

            let mut pcm_data = Vec::new();

            while let Ok(packet) = format.next_packet() {
                if packet.track_id() != track_id {
                    continue;
                }

                match decoder.decode(&packet) {
                    Ok(decoded) => {
                        let mut sample_buf =
                            SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                        sample_buf.copy_planar_ref(decoded);
                        let samples = sample_buf.samples();

                        if channels > 1 {
                            // Planar layout: all of channel 0, then channel 1, ...
                            let frames_per_channel = samples.len() / channels;
                            for frame in 0..frames_per_channel {
                                let mut sum = 0.0;
                                for ch in 0..channels {
                                    sum += samples[ch * frames_per_channel + frame];
                                }
                                pcm_data.push(sum / channels as f32);
                            }
                        } else {
                            pcm_data.extend_from_slice(samples);
                        }
                    }
                    Err(e) => {
                        // Skip the broken packet and keep going
                        warn!("Failed to decode packet in {}: {}", file_path.display(), e);
                        continue;
                    }
                }
            }

            debug!(
                "Decoded {} samples from {} at {} Hz",
                pcm_data.len(),
                file_path.display(),
                sample_rate
            );
            Ok((pcm_data, sample_rate))
        }

        _ => Err(DublineError::UnsupportedFormat(extension)),
    }
}

/// Decodes a WAV file into mono PCM samples.
///
/// Supports 16/24/32-bit integer and 32-bit float sample formats.
pub fn decode_wav_file<P: AsRef<Path>>(file_path: P) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(file_path.as_ref()).map_err(DublineError::WavDecoding)?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let pcm_data: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map_err(DublineError::WavDecoding))
            .collect::<Result<Vec<i16>>>()?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map_err(DublineError::WavDecoding))
            .collect::<Result<Vec<i32>>>()?
            .into_iter()
            .map(|s| s as f32 / 8388608.0)
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map_err(DublineError::WavDecoding))
            .collect::<Result<Vec<i32>>>()?
            .into_iter()
            .map(|s| s as f32 / 2147483648.0)
            .collect(),
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(DublineError::WavDecoding))
            .collect::<Result<Vec<f32>>>()?,
        _ => {
            return Err(DublineError::UnsupportedFormat(format!(
                "WAV {:?} {} bit",
                spec.sample_format, spec.bits_per_sample
            )));
        }
    };

    // Interleaved channels are averaged down to mono
    let channels = spec.channels as usize;
    if channels > 1 {
        let mut mono_data = Vec::with_capacity(pcm_data.len() / channels);
        for chunk in pcm_data.chunks(channels) {
            let sample = chunk.iter().sum::<f32>() / channels as f32;
            mono_data.push(sample);
        }
        Ok((mono_data, sample_rate))
    } else {
        Ok((pcm_data, sample_rate))
    }
}

/// Encodes mono PCM samples as a 32-bit float WAV file.
pub fn encode_wav(pcm_data: &[f32], sample_rate: u32, output_path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(output_path, spec)?;

    for &sample in pcm_data {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;

    debug!(
        "Wrote WAV file {} ({} samples, {} Hz)",
        output_path.display(),
        pcm_data.len(),
        sample_rate
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_duration_calculation() {
        assert_eq!(duration_in_seconds(44100, 44100), 1.0);
        assert_eq!(duration_in_seconds(22050, 44100), 0.5);
        assert_eq!(duration_in_seconds(0, 44100), 0.0);
    }

    #[test]
    fn test_compute_rms() {
        let samples = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        // sqrt((0 + 0.25 + 0.25 + 1 + 1) / 5) = sqrt(0.5)
        assert!((compute_rms(&samples) - 0.7071).abs() < 0.0001);

        assert_eq!(compute_rms(&[]), 0.0);
    }

    #[test]
    fn test_wav_encode_decode_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.wav");

        let sample_rate = 44100;
        let num_samples = (sample_rate as f32 * 0.1) as usize;
        let mut samples = Vec::with_capacity(num_samples);
        for i in 0..num_samples {
            let time = i as f32 / sample_rate as f32;
            samples.push((time * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5);
        }

        encode_wav(&samples, sample_rate, &file_path).unwrap();
        let (decoded, decoded_rate) = decode_wav_file(&file_path).unwrap();

        assert_eq!(decoded_rate, sample_rate);
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.0001);
        }
    }

    #[test]
    fn test_decode_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("audio.xyz");
        std::fs::write(&file_path, b"not audio").unwrap();

        let result = decode_audio_file(&file_path);
        assert!(matches!(result, Err(DublineError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_decode_missing_file_is_an_error() {
        let result = decode_audio_file("does_not_exist.wav");
        assert!(result.is_err());
    }
}
