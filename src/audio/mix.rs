//! # Mixing
//!
//! Additive track mixing for timeline assembly and the final
//! voice-over-background mix. Neither path renormalizes the result;
//! the configured gains fully determine the output level.

use log::info;

use crate::config::MixConfig;

/// Additively mixes positioned tracks into one buffer.
///
/// The output length is the longest input; shorter tracks contribute
/// silence past their end. Summed energy is preserved, overlapping
/// segments simply add up.
pub fn mix_additive(tracks: &[Vec<f32>]) -> Vec<f32> {
    let longest = tracks.iter().map(|t| t.len()).max().unwrap_or(0);
    let mut mixed = vec![0.0f32; longest];

    for track in tracks {
        for (i, &sample) in track.iter().enumerate() {
            mixed[i] += sample;
        }
    }

    mixed
}

/// Mixes the dubbed voice track with the separated background track.
///
/// Each input has an independent volume multiplier and the sum gets a
/// master gain. The mix is never normalized afterwards, so the
/// configured voice-to-background balance survives into the output.
pub fn mix_voice_with_background(
    voice: &[f32],
    background: &[f32],
    config: &MixConfig,
) -> Vec<f32> {
    info!(
        "Mixing voice with background: voice={:.2}, background={:.2}, master={:.2}",
        config.voice_volume, config.background_volume, config.master_volume
    );

    let longest = voice.len().max(background.len());
    let mut mixed = Vec::with_capacity(longest);

    for i in 0..longest {
        let v = voice.get(i).copied().unwrap_or(0.0);
        let b = background.get(i).copied().unwrap_or(0.0);
        mixed.push((v * config.voice_volume + b * config.background_volume) * config.master_volume);
    }

    mixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_mix_length_is_longest() {
        let tracks = vec![vec![0.1f32; 100], vec![0.2f32; 250], vec![0.3f32; 50]];
        let mixed = mix_additive(&tracks);
        assert_eq!(mixed.len(), 250);

        // All three overlap at the start
        assert!((mixed[0] - 0.6).abs() < 1e-6);
        // Only the longest track remains at the end
        assert!((mixed[200] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_additive_mix_does_not_attenuate() {
        let tracks = vec![vec![0.5f32; 10], vec![0.5f32; 10]];
        let mixed = mix_additive(&tracks);
        // Summed energy is preserved even past full scale
        assert!((mixed[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input_mixes_to_empty() {
        assert!(mix_additive(&[]).is_empty());
    }

    #[test]
    fn test_voice_background_gains_are_independent() {
        let voice = vec![1.0f32; 4];
        let background = vec![1.0f32; 4];
        let config = MixConfig {
            voice_volume: 1.0,
            background_volume: 0.3,
            master_volume: 1.2,
        };

        let mixed = mix_voice_with_background(&voice, &background, &config);
        assert_eq!(mixed.len(), 4);
        // (1.0 * 1.0 + 1.0 * 0.3) * 1.2
        assert!((mixed[0] - 1.56).abs() < 1e-6);
    }

    #[test]
    fn test_shorter_input_padded_with_silence() {
        let voice = vec![0.5f32; 2];
        let background = vec![0.5f32; 6];
        let config = MixConfig::default();

        let mixed = mix_voice_with_background(&voice, &background, &config);
        assert_eq!(mixed.len(), 6);
        // Past the voice end only the background remains
        assert!((mixed[4] - 0.5 * 0.3 * 1.2).abs() < 1e-6);
    }
}
