//! # Reference Selection
//!
//! Picks the clips that best represent a speaker's voice and merges
//! them into a single reference sample for voice cloning. Candidates
//! are scored by the feature analyzer, then run through a chain of
//! selection strategies from pickiest to most forgiving.

pub mod bundle;
pub mod strategy;

use log::{info, warn};

use crate::analysis::ClipFeatureAnalyzer;
use crate::config::{AnalysisConfig, SelectionConfig};
use crate::types::{Clip, ClipFeatures, SpeakerTrack};

use strategy::{
    meets_floor, selection_duration, ForcedCombination, LastResort, SelectionStrategy,
    VarietySearch,
};

/// A clip paired with its analyzer verdict.
#[derive(Debug, Clone)]
pub struct ScoredClip {
    pub clip: Clip,
    pub features: ClipFeatures,
}

/// Chooses reference clips for one speaker.
pub struct ReferenceSelector {
    analyzer: ClipFeatureAnalyzer,
    config: SelectionConfig,
    strategies: Vec<Box<dyn SelectionStrategy>>,
}

impl ReferenceSelector {
    pub fn new(selection: SelectionConfig, analysis: AnalysisConfig) -> Self {
        Self {
            analyzer: ClipFeatureAnalyzer::new(analysis),
            config: selection,
            strategies: vec![
                Box::new(VarietySearch),
                Box::new(ForcedCombination),
                Box::new(LastResort),
            ],
        }
    }

    /// Scores every clip of the track and returns the selected subset
    /// in selection order. An empty result means the speaker has no
    /// usable material at all; callers should skip the speaker rather
    /// than abort the run.
    pub fn select(&self, track: &SpeakerTrack) -> Vec<ScoredClip> {
        let scored = self.score_clips(&track.clips);
        if scored.is_empty() {
            warn!(
                "No usable clips for speaker {} ({} candidates rejected)",
                track.speaker_id,
                track.clips.len()
            );
            return Vec::new();
        }

        let chosen = self.choose(&scored);
        let duration = selection_duration(&chosen, &scored, self.config.gap_duration);
        info!(
            "Selected {} of {} clips for speaker {} ({:.2}s of reference audio)",
            chosen.len(),
            scored.len(),
            track.speaker_id,
            duration
        );

        chosen.into_iter().map(|i| scored[i].clone()).collect()
    }

    fn score_clips(&self, clips: &[Clip]) -> Vec<ScoredClip> {
        clips
            .iter()
            .filter_map(|clip| {
                self.analyzer.analyze(clip).map(|features| ScoredClip {
                    clip: clip.clone(),
                    features,
                })
            })
            .collect()
    }

    /// Runs the strategy chain over scored clips.
    ///
    /// The first proposal with two or more members meeting the duration
    /// floor wins. The final strategy is accepted as-is so that a lone
    /// short clip still produces a reference instead of nothing.
    fn choose(&self, scored: &[ScoredClip]) -> Vec<usize> {
        let last = self.strategies.len() - 1;
        for (tier, strategy) in self.strategies.iter().enumerate() {
            let proposal = strategy.propose(scored, &self.config);
            if proposal.is_empty() {
                continue;
            }

            if tier == last || meets_floor(&proposal, scored, &self.config) {
                info!(
                    "Reference selection used {} strategy ({} clips)",
                    strategy.name(),
                    proposal.len()
                );
                return proposal;
            }
        }
        Vec::new()
    }
}
