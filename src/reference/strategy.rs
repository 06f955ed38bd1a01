//! # Selection Strategies
//!
//! The tiered candidate search behind reference selection, expressed as
//! an ordered chain of independent strategies. Each strategy proposes an
//! ordered subset of the scored clips; the chain in
//! [`super::ReferenceSelector`] accepts the first proposal with at least
//! two members meeting the duration floor and falls through to the last
//! strategy's proposal otherwise.

use crate::config::SelectionConfig;

use super::ScoredClip;

/// Scores comparing within this distance count as tied.
const SCORE_EPS: f64 = 1e-9;

/// A single clip above this quality can stand alone as a reference.
const QUALITY_HIGH_BAR: f64 = 5.0;

/// How many clips the forced-combination pass looks at.
const FORCED_POOL: usize = 6;

/// Member cap for the last-resort combination pass.
const LAST_RESORT_MAX: usize = 4;

/// A candidate-generating strategy for reference selection.
pub trait SelectionStrategy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Proposes an ordered subset of `clips` as indices into the slice.
    /// An empty proposal means the strategy found nothing usable.
    fn propose(&self, clips: &[ScoredClip], config: &SelectionConfig) -> Vec<usize>;
}

/// Total duration of a selection including inter-clip silence gaps.
pub(crate) fn selection_duration(indices: &[usize], clips: &[ScoredClip], gap: f64) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let sum: f64 = indices.iter().map(|&i| clips[i].features.duration).sum();
    sum + gap * (indices.len() - 1) as f64
}

/// Clip indices ordered by quality descending.
///
/// The order is total: quality, then duration, then segment index, so
/// identical inputs always produce identical selections.
pub(crate) fn quality_order(clips: &[ScoredClip]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..clips.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = &clips[a].features;
        let fb = &clips[b].features;
        fb.quality_score
            .total_cmp(&fa.quality_score)
            .then_with(|| fb.duration.total_cmp(&fa.duration))
            .then_with(|| clips[a].clip.segment_index.cmp(&clips[b].clip.segment_index))
    });
    order
}

/// Tier 1: seeded combination search maximizing quality and variety.
///
/// Every clip in the quality-ordered top is used as a seed; seeds are
/// greedily extended with further clips, in quality order, while the
/// gap-inclusive total stays within the duration bound and the member
/// count under the cap. A combination stops growing once it reaches the
/// target duration. The best-scoring combination wins; ties go to the
/// one with more members.
pub struct VarietySearch;

impl VarietySearch {
    fn extend_from_seed(
        seed: usize,
        order: &[usize],
        clips: &[ScoredClip],
        config: &SelectionConfig,
    ) -> Vec<usize> {
        let mut members = vec![seed];
        let mut total = clips[seed].features.duration;

        for &candidate in order {
            if candidate == seed || members.contains(&candidate) {
                continue;
            }
            if members.len() >= config.max_count {
                break;
            }
            if total >= config.target_duration {
                break;
            }

            let with_gap = total + config.gap_duration + clips[candidate].features.duration;
            if with_gap <= config.max_duration {
                members.push(candidate);
                total = with_gap;
            }
        }

        members
    }

    fn combination_score(members: &[usize], clips: &[ScoredClip], config: &SelectionConfig) -> f64 {
        let quality_sum: f64 = members.iter().map(|&i| clips[i].features.quality_score).sum();
        let total = selection_duration(members, clips, config.gap_duration);
        quality_sum + variety_bonus(members.len()) + range_bonus(total)
    }
}

impl SelectionStrategy for VarietySearch {
    fn name(&self) -> &'static str {
        "variety search"
    }

    fn propose(&self, clips: &[ScoredClip], config: &SelectionConfig) -> Vec<usize> {
        let order = quality_order(clips);
        let seed_count = config.seed_count.min(order.len());

        let mut best: Vec<usize> = Vec::new();
        let mut best_score = f64::NEG_INFINITY;

        for &seed in &order[..seed_count] {
            let members = Self::extend_from_seed(seed, &order, clips, config);
            let score = Self::combination_score(&members, clips, config);

            let better = score > best_score + SCORE_EPS
                || ((score - best_score).abs() <= SCORE_EPS && members.len() > best.len());
            if better {
                best = members;
                best_score = score;
            }
        }

        best
    }
}

/// Rewards combinations with more distinct clips.
fn variety_bonus(member_count: usize) -> f64 {
    match member_count {
        0 | 1 => 0.0,
        2 => 1.0,
        3 => 2.0,
        _ => 3.0,
    }
}

/// Rewards combinations landing in the preferred duration window.
fn range_bonus(total_duration: f64) -> f64 {
    if (4.0..=8.0).contains(&total_duration) {
        1.5
    } else if (3.0..=9.0).contains(&total_duration) {
        0.75
    } else {
        0.0
    }
}

/// Tier 2: forced combination ignoring quality order.
///
/// Walks the clips in their input order, accumulating whatever fits the
/// duration bound, and stops as soon as the floor and a three-member
/// minimum are reached or the pool is exhausted.
pub struct ForcedCombination;

impl SelectionStrategy for ForcedCombination {
    fn name(&self) -> &'static str {
        "forced combination"
    }

    fn propose(&self, clips: &[ScoredClip], config: &SelectionConfig) -> Vec<usize> {
        let mut members: Vec<usize> = Vec::new();
        let mut total = 0.0;

        for (index, scored) in clips.iter().enumerate().take(FORCED_POOL) {
            let duration = scored.features.duration;
            let with_gap = if members.is_empty() {
                duration
            } else {
                total + config.gap_duration + duration
            };
            if with_gap > config.max_duration {
                continue;
            }

            members.push(index);
            total = with_gap;

            if total >= config.min_duration && members.len() >= 3 {
                break;
            }
        }

        members
    }
}

/// Tier 3: last resort when no diverse combination works.
///
/// Accepts a single clip only when it is both long enough and clearly
/// high quality. Otherwise tries a small quality-ordered combination,
/// and finally falls back to the single best clip even when that
/// undershoots the duration floor.
pub struct LastResort;

impl SelectionStrategy for LastResort {
    fn name(&self) -> &'static str {
        "last resort"
    }

    fn propose(&self, clips: &[ScoredClip], config: &SelectionConfig) -> Vec<usize> {
        let order = quality_order(clips);
        let best = match order.first() {
            Some(&best) => best,
            None => return Vec::new(),
        };

        let best_features = &clips[best].features;
        if best_features.duration >= config.min_duration
            && best_features.quality_score > QUALITY_HIGH_BAR
        {
            return vec![best];
        }

        let mut members: Vec<usize> = Vec::new();
        let mut total = 0.0;
        for &candidate in &order {
            if members.len() >= LAST_RESORT_MAX {
                break;
            }

            let duration = clips[candidate].features.duration;
            let with_gap = if members.is_empty() {
                duration
            } else {
                total + config.gap_duration + duration
            };
            if with_gap > config.max_duration {
                continue;
            }

            members.push(candidate);
            total = with_gap;

            if members.len() >= 2 && total >= config.min_duration {
                return members;
            }
        }

        vec![best]
    }
}

/// Acceptance rule for the strategy chain: at least two clips meeting
/// the gap-inclusive duration floor.
pub(crate) fn meets_floor(
    proposal: &[usize],
    clips: &[ScoredClip],
    config: &SelectionConfig,
) -> bool {
    proposal.len() >= 2
        && selection_duration(proposal, clips, config.gap_duration) >= config.min_duration
}
