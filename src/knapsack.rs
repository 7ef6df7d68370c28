use std::collections::HashMap;

use crate::quantize::{
    EPS, approx_le, area, fit_count, length_key, to_units, to_units_ceil, to_units_floor,
};
use crate::types::{Part, Pattern, Strip};

/// One incremental strip of a part: taking it adds `value` m² of production
/// for `weight` width units.
#[derive(Debug, Clone, Copy)]
struct StripItem {
    part: usize,
    weight: usize,
    value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    coil_units: u32,
    length_mm: u64,
    demand: Vec<u32>,
}

/// Memoizing front of [`build_pattern`], scoped to one solve.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    cache: HashMap<PatternKey, Option<Pattern>>,
    hits: u64,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &mut self,
        parts: &[Part],
        remaining: &[u32],
        coil_width: f64,
        table_length: f64,
    ) -> Option<Pattern> {
        let key = PatternKey {
            coil_units: to_units(coil_width),
            length_mm: length_key(table_length),
            demand: remaining.to_vec(),
        };
        if let Some(cached) = self.cache.get(&key) {
            self.hits += 1;
            return cached.clone();
        }
        let pattern = build_pattern(parts, remaining, coil_width, table_length);
        self.cache.insert(key, pattern.clone());
        pattern
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hits(&self) -> u64 {
        self.hits
    }
}

/// Maximizes produced area for one `(coil_width, table_length)` pair with a
/// 0/1 knapsack over strip increments. Returns `None` when nothing fits.
pub fn build_pattern(
    parts: &[Part],
    remaining: &[u32],
    coil_width: f64,
    table_length: f64,
) -> Option<Pattern> {
    let items = strip_items(parts, remaining, coil_width, table_length);
    if items.is_empty() {
        return None;
    }

    // Item weights round up and capacity rounds down, so every unit fill fits in cm
    let capacity = to_units_floor(coil_width) as usize;
    let row = capacity + 1;

    // dp[c]: best value using exactly c units; take[i * row + c]: item i improved dp[c]
    let mut dp = vec![f64::NEG_INFINITY; row];
    dp[0] = 0.0;
    let mut take = vec![false; items.len() * row];

    for (i, item) in items.iter().enumerate() {
        if item.weight > capacity {
            continue;
        }
        for c in (item.weight..=capacity).rev() {
            let base = dp[c - item.weight];
            if base.is_finite() && base + item.value > dp[c] + EPS {
                dp[c] = base + item.value;
                take[i * row + c] = true;
            }
        }
    }

    // Ascending scan, later capacity wins ties: prefer fuller fills.
    let mut best_cap = 0;
    let mut best_value = 0.0_f64;
    for (c, &value) in dp.iter().enumerate() {
        if value.is_finite() && value + EPS >= best_value {
            best_cap = c;
            best_value = best_value.max(value);
        }
    }
    if best_value <= EPS {
        return None;
    }

    let mut counts = vec![0u32; parts.len()];
    let mut c = best_cap;
    for i in (0..items.len()).rev() {
        if take[i * row + c] {
            counts[items[i].part] += 1;
            c -= items[i].weight;
        }
    }

    Some(assemble(parts, remaining, &counts, coil_width, table_length))
}

fn strip_items(
    parts: &[Part],
    remaining: &[u32],
    coil_width: f64,
    table_length: f64,
) -> Vec<StripItem> {
    let mut items = Vec::new();
    for (idx, (part, &left)) in parts.iter().zip(remaining).enumerate() {
        if left == 0 || !approx_le(part.length, table_length) || !approx_le(part.width, coil_width)
        {
            continue;
        }
        let weight = to_units_ceil(part.width) as usize;
        let pps = fit_count(table_length, part.length);
        if weight == 0 || pps == 0 {
            continue;
        }
        let strips_needed = left.div_ceil(pps);
        let strips_fit = fit_count(coil_width, part.width);
        let piece_area = part.piece_area();
        let mut produced = 0u32;
        for k in 1..=strips_needed.min(strips_fit) {
            let next = (k * pps).min(left);
            items.push(StripItem {
                part: idx,
                weight,
                value: (next - produced) as f64 * piece_area,
            });
            produced = next;
        }
    }
    items
}

fn assemble(
    parts: &[Part],
    remaining: &[u32],
    counts: &[u32],
    coil_width: f64,
    table_length: f64,
) -> Pattern {
    let mut strips: Vec<Strip> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(idx, &count)| {
            let part = &parts[idx];
            let pps = fit_count(table_length, part.length);
            Strip {
                part_index: idx,
                part_id: part.id,
                width: part.width,
                part_length: part.length,
                pieces_per_strip: pps,
                strip_count: count,
                produced: (count * pps).min(remaining[idx]),
            }
        })
        .collect();
    strips.sort_by(|a, b| {
        b.width
            .total_cmp(&a.width)
            .then(a.part_index.cmp(&b.part_index))
    });

    let used_width: f64 = strips.iter().map(|s| s.width * s.strip_count as f64).sum();
    let produced_area: f64 = strips
        .iter()
        .map(|s| s.produced as f64 * area(s.width, s.part_length))
        .sum();
    let finishes_all_demand = remaining.iter().enumerate().all(|(idx, &left)| {
        let produced: u32 = strips
            .iter()
            .filter(|s| s.part_index == idx)
            .map(|s| s.produced)
            .sum();
        left == produced
    });

    Pattern {
        coil_width,
        table_length,
        remaining_width: coil_width - used_width,
        strips,
        produced_area,
        waste_area: area(coil_width, table_length) - produced_area,
        finishes_all_demand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_pattern_valid(p: &Pattern) {
        let used: f64 = p.strips.iter().map(|s| s.width * s.strip_count as f64).sum();
        assert!((used + p.remaining_width - p.coil_width).abs() < 1e-9);
        assert!(p.remaining_width > -1e-9);
        assert!((p.waste_area - (area(p.coil_width, p.table_length) - p.produced_area)).abs() < 1e-9);
        for s in &p.strips {
            assert!(s.produced <= s.strip_count * s.pieces_per_strip);
            assert!(s.pieces_per_strip as f64 * s.part_length <= p.table_length + 1e-9);
        }
    }

    #[test]
    fn test_exact_width_combination() {
        let parts = vec![Part::new(0, 40.0, 2.0, 3), Part::new(1, 60.0, 2.0, 2)];
        let p = build_pattern(&parts, &[3, 2], 100.0, 2.0).unwrap();
        assert_pattern_valid(&p);
        assert!(p.remaining_width.abs() < 1e-9);
        assert_eq!(p.strips.len(), 2);
        assert!((p.produced_area - 2.0).abs() < 1e-9);
        assert!(!p.finishes_all_demand);
    }

    #[test]
    fn test_strips_clipped_to_demand() {
        // 5 pieces at 3 per strip need 2 strips, the second yields only 2
        let parts = vec![Part::new(0, 10.0, 1.0, 5)];
        let p = build_pattern(&parts, &[5], 100.0, 3.0).unwrap();
        assert_pattern_valid(&p);
        assert_eq!(p.strips[0].strip_count, 2);
        assert_eq!(p.strips[0].produced, 5);
        assert!(p.finishes_all_demand);
        assert!((p.remaining_width - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_nothing_fits() {
        let parts = vec![Part::new(0, 130.0, 1.0, 1), Part::new(1, 20.0, 5.0, 1)];
        assert!(build_pattern(&parts, &[1, 1], 125.0, 3.0).is_none());
        assert!(build_pattern(&parts, &[0, 0], 125.0, 8.0).is_none());
    }

    #[test]
    fn test_tenth_cm_widths_fill_coil() {
        let parts = vec![Part::new(0, 33.3, 1.0, 1)];
        let p = build_pattern(&parts, &[1], 33.3, 1.0).unwrap();
        assert_pattern_valid(&p);
        assert!(p.remaining_width.abs() < 1e-9);
    }

    #[test]
    fn test_rounded_widths_never_overflow_coil() {
        // 11.14 + 22.24 = 33.38 rounds to 333 units but is wider than 33.3
        let parts = vec![Part::new(0, 11.14, 1.0, 1), Part::new(1, 22.24, 1.0, 1)];
        let p = build_pattern(&parts, &[1, 1], 33.3, 1.0).unwrap();
        assert_pattern_valid(&p);
        assert_eq!(p.strips.len(), 1);
        assert_eq!(p.strips[0].part_index, 1);
        assert!(p.remaining_width >= 0.0);
    }

    #[test]
    fn test_ties_prefer_fuller_width() {
        // 50cm x 1m and 25cm x 2m yield the same area; only one fits in 60
        let parts = vec![Part::new(0, 50.0, 1.0, 1), Part::new(1, 25.0, 2.0, 1)];
        let p = build_pattern(&parts, &[1, 1], 60.0, 2.0).unwrap();
        assert_pattern_valid(&p);
        assert_eq!(p.strips.len(), 1);
        assert_eq!(p.strips[0].part_index, 0);
        assert!((p.remaining_width - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_builder_memoizes() {
        let parts = vec![Part::new(0, 25.0, 3.0, 1)];
        let mut builder = PatternBuilder::new();
        let a = builder.build(&parts, &[1], 25.0, 3.0);
        let b = builder.build(&parts, &[1], 25.0, 3.0);
        assert_eq!(a, b);
        assert_eq!(builder.cache_len(), 1);
        assert_eq!(builder.cache_hits(), 1);
    }
}
