use crate::config::MAX_TABLE_LENGTH;
use crate::quantize::{approx_eq, fit_count, round_length};
use crate::types::Part;

/// Candidate table lengths for the active demand: every multiple of an active
/// part's length up to [`MAX_TABLE_LENGTH`], plus the maximum itself.
/// Sorted ascending, rounded to millimetres and deduplicated.
pub fn candidate_lengths(parts: &[Part], remaining: &[u32]) -> Vec<f64> {
    let mut lengths = vec![MAX_TABLE_LENGTH];
    for (part, &left) in parts.iter().zip(remaining) {
        if left == 0 || part.length <= 0.0 {
            continue;
        }
        let multiples = fit_count(MAX_TABLE_LENGTH, part.length);
        for k in 1..=multiples {
            let length = round_length(part.length * k as f64);
            if length > 0.0 && length <= MAX_TABLE_LENGTH {
                lengths.push(length);
            }
        }
    }
    lengths.sort_by(|a, b| a.total_cmp(b));
    lengths.dedup_by(|a, b| approx_eq(*a, *b));
    lengths
}
