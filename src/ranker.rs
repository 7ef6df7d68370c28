use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::config::{MAX_TABLE_LENGTH, Profile, ProfileWeights};
use crate::knapsack::PatternBuilder;
use crate::lengths::candidate_lengths;
use crate::quantize::{EPS, approx_ge, area, cmp_approx};
use crate::state::materialize;
use crate::types::{Part, Pattern};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub side_waste: f64,
    /// Remnant area the remaining demand could still absorb.
    pub useful_remnant_area: f64,
    pub remnant_count: usize,
    pub fragmentation: f64,
    pub compactness: f64,
    pub adjusted_waste_per_produced: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub pattern: Pattern,
    pub score: CandidateScore,
}

pub fn score_pattern(
    parts: &[Part],
    remaining: &[u32],
    pattern: &Pattern,
    weights: &ProfileWeights,
) -> CandidateScore {
    let table = materialize(pattern);
    let mut rects: Vec<(f64, f64)> = table
        .lanes
        .iter()
        .filter(|l| l.remaining_length > EPS && l.width > EPS)
        .map(|l| (l.width, l.remaining_length))
        .collect();

    let remnant_count = rects.len();
    let total_remnant: f64 = rects.iter().map(|&(w, l)| area(w, l)).sum();
    let largest_remnant = rects.iter().map(|&(w, l)| area(w, l)).fold(0.0, f64::max);
    let compactness = if total_remnant <= EPS {
        1.0
    } else {
        largest_remnant / total_remnant
    };
    let fragmentation = if table.lanes.is_empty() {
        0.0
    } else {
        remnant_count.saturating_sub(1) as f64 / table.lanes.len() as f64
    };

    let mut after = remaining.to_vec();
    for strip in &pattern.strips {
        after[strip.part_index] = after[strip.part_index].saturating_sub(strip.produced);
    }
    let useful_remnant_area = absorbable_area(parts, &after, &mut rects);

    let side_waste = pattern.side_waste();
    let produced = pattern.produced_area.max(EPS);
    let length_penalty =
        weights.length_penalty * (1.0 - pattern.table_length / MAX_TABLE_LENGTH).max(0.0);
    let adjusted_waste_per_produced = (pattern.waste_area + weights.side_waste * side_waste
        - weights.remnant_credit * useful_remnant_area)
        / produced
        + length_penalty
        + weights.fragmentation_penalty * fragmentation
        - weights.compactness_bonus * compactness;

    CandidateScore {
        side_waste,
        useful_remnant_area,
        remnant_count,
        fragmentation,
        compactness,
        adjusted_waste_per_produced,
    }
}

/// Greedy estimate of how much pending demand fits into `rects`
/// (largest pieces first, best-fit by leftover area).
fn absorbable_area(parts: &[Part], remaining: &[u32], rects: &mut [(f64, f64)]) -> f64 {
    let mut order: Vec<usize> = (0..parts.len()).filter(|&i| remaining[i] > 0).collect();
    order.sort_by(|&a, &b| {
        parts[b]
            .piece_area()
            .total_cmp(&parts[a].piece_area())
            .then(a.cmp(&b))
    });

    let mut absorbed = 0.0;
    for idx in order {
        let part = &parts[idx];
        for _ in 0..remaining[idx] {
            let best = rects
                .iter()
                .enumerate()
                .filter(|(_, r)| approx_ge(r.0, part.width) && approx_ge(r.1, part.length))
                .min_by(|(_, a), (_, b)| {
                    cmp_approx(area(a.0, a.1), area(b.0, b.1))
                });
            match best {
                Some((r, _)) => {
                    rects[r].1 -= part.length;
                    absorbed += part.piece_area();
                }
                None => break,
            }
        }
    }
    absorbed
}

/// Strict ranking: finishing patterns first, then adjusted waste, useful
/// remnant area, produced area, waste, remaining width, coil, length.
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.pattern
        .finishes_all_demand
        .cmp(&a.pattern.finishes_all_demand)
        .then(cmp_approx(
            a.score.adjusted_waste_per_produced,
            b.score.adjusted_waste_per_produced,
        ))
        .then(cmp_approx(
            b.score.useful_remnant_area,
            a.score.useful_remnant_area,
        ))
        .then(cmp_approx(b.pattern.produced_area, a.pattern.produced_area))
        .then(cmp_approx(a.pattern.waste_area, b.pattern.waste_area))
        .then(cmp_approx(
            a.pattern.remaining_width,
            b.pattern.remaining_width,
        ))
        .then(a.pattern.coil_width.total_cmp(&b.pattern.coil_width))
        .then(a.pattern.table_length.total_cmp(&b.pattern.table_length))
}

/// Builds and orders every `(coil, length)` pattern for a demand vector.
/// Both the patterns and the ordered lists are memoized for one solve.
#[derive(Debug)]
pub struct CandidateRanker {
    coil_widths: Vec<f64>,
    weights: ProfileWeights,
    patterns: PatternBuilder,
    lists: HashMap<Vec<u32>, Vec<Candidate>>,
}

impl CandidateRanker {
    pub fn new(coil_widths: &[f64], profile: Profile) -> Self {
        Self {
            coil_widths: coil_widths.to_vec(),
            weights: profile.weights(),
            patterns: PatternBuilder::new(),
            lists: HashMap::new(),
        }
    }

    pub fn top(&mut self, parts: &[Part], remaining: &[u32], limit: usize) -> Vec<Candidate> {
        if !self.lists.contains_key(remaining) {
            let ranked = self.rank(parts, remaining);
            self.lists.insert(remaining.to_vec(), ranked);
        }
        self.lists
            .get(remaining)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    fn rank(&mut self, parts: &[Part], remaining: &[u32]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for length in candidate_lengths(parts, remaining) {
            for &coil in &self.coil_widths {
                if let Some(pattern) = self.patterns.build(parts, remaining, coil, length) {
                    let score = score_pattern(parts, remaining, &pattern, &self.weights);
                    candidates.push(Candidate { pattern, score });
                }
            }
        }
        candidates.sort_by(compare_candidates);
        candidates
    }

    pub fn pattern_cache_len(&self) -> usize {
        self.patterns.cache_len()
    }
}
