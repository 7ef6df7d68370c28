use serde::Serialize;

use crate::config::SolverConfig;
use crate::solver::solve;
use crate::types::{CoilSpec, Part, Plan};

/// How likely a matching offcut is to be lying around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Common,
    Plausible,
    Rare,
}

impl Availability {
    pub fn for_part(part: &Part) -> Self {
        if part.length <= 1.0 && part.width <= 25.0 {
            Availability::Common
        } else if part.length <= 1.5 && part.width <= 33.3 {
            Availability::Plausible
        } else {
            Availability::Rare
        }
    }
}

/// An alternative plan with one piece of `part_id` taken from scrap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub part_id: usize,
    pub width: f64,
    pub length: f64,
    /// `base.total_waste - plan.total_waste`, in m².
    pub saving: f64,
    pub availability: Availability,
    pub plan: Plan,
}

/// Re-solves with one unit of each short part removed and reports the
/// alternatives that strictly reduce waste, most available first.
/// Sub-solve failures only drop that suggestion.
pub fn suggest_scrap_alternatives(
    base: &Plan,
    parts: &[Part],
    coils: &[CoilSpec],
    config: &SolverConfig,
) -> Vec<Suggestion> {
    let limits = &config.scrap;
    let mut suggestions = Vec::new();

    for (idx, part) in parts.iter().enumerate() {
        if part.quantity == 0 || part.length >= limits.max_length || part.width > limits.max_width
        {
            continue;
        }
        let mut reduced = parts.to_vec();
        reduced[idx].quantity -= 1;
        if reduced[idx].quantity == 0 {
            reduced.remove(idx);
        }

        let plan = match solve(&reduced, coils, config) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(part_id = part.id, error = %e, "scrap re-solve failed");
                continue;
            }
        };
        if plan.total_waste < base.total_waste {
            suggestions.push(Suggestion {
                part_id: part.id,
                width: part.width,
                length: part.length,
                saving: base.total_waste - plan.total_waste,
                availability: Availability::for_part(part),
                plan,
            });
        }
    }

    suggestions.sort_by(|a, b| {
        a.availability
            .cmp(&b.availability)
            .then(b.saving.total_cmp(&a.saving))
    });
    suggestions.truncate(limits.max_suggestions);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COILS;

    #[test]
    fn test_availability_tiers() {
        assert_eq!(
            Availability::for_part(&Part::new(0, 20.0, 0.5, 1)),
            Availability::Common
        );
        assert_eq!(
            Availability::for_part(&Part::new(0, 30.0, 1.2, 1)),
            Availability::Plausible
        );
        assert_eq!(
            Availability::for_part(&Part::new(0, 45.0, 1.9, 1)),
            Availability::Rare
        );
        assert!(Availability::Common < Availability::Rare);
    }

    #[test]
    fn test_saving_matches_plan_difference() {
        // The short 30cm part needs its own table with side waste
        let parts = vec![Part::new(0, 25.0, 3.0, 1), Part::new(1, 30.0, 0.4, 1)];
        let config = SolverConfig::default();
        let base = solve(&parts, &DEFAULT_COILS, &config).unwrap();
        let suggestions = suggest_scrap_alternatives(&base, &parts, &DEFAULT_COILS, &config);

        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(s.part_id, 1);
        assert_eq!(s.availability, Availability::Plausible);
        assert!(s.saving > 0.0);
        assert_eq!(s.saving, base.total_waste - s.plan.total_waste);
        // the base plan is untouched
        assert_eq!(base, solve(&parts, &DEFAULT_COILS, &config).unwrap());
    }

    #[test]
    fn test_long_parts_not_considered() {
        let parts = vec![Part::new(0, 25.0, 3.0, 2)];
        let config = SolverConfig::default();
        let base = solve(&parts, &DEFAULT_COILS, &config).unwrap();
        assert!(suggest_scrap_alternatives(&base, &parts, &DEFAULT_COILS, &config).is_empty());
    }
}
