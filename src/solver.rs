use crate::baseline::best_fit_decreasing;
use crate::beam::BeamSearch;
use crate::config::{BeamConfig, MAX_TABLE_LENGTH, SolverConfig};
use crate::error::{Result, SolveError};
use crate::post_opt::post_optimize;
use crate::quantize::{EPS, approx_le, to_units};
use crate::ranker::CandidateRanker;
use crate::state::SolverState;
use crate::types::{CoilSpec, Part, Plan};

pub struct Solver {
    parts: Vec<Part>,
    coil_widths: Vec<f64>,
    config: SolverConfig,
}

impl Solver {
    /// Only the `enabled` coils of `coils` are used.
    pub fn new(parts: Vec<Part>, coils: &[CoilSpec], config: SolverConfig) -> Self {
        Self {
            parts,
            coil_widths: CoilSpec::enabled_widths(coils),
            config,
        }
    }

    pub fn solve(&self) -> Result<Plan> {
        self.validate()?;
        if self.parts.is_empty() {
            return Ok(Plan::from_tables(&self.coil_widths, vec![], &self.parts));
        }

        let mut best = self.run(&self.coil_widths, &self.config.beam)?;
        let mut source = if self.config.beam.is_greedy() { "greedy" } else { "beam" };

        // Baselines: greedy and best-fit decreasing per coil subset, keep the lowest waste
        let subsets = if self.config.beam.is_greedy() {
            Vec::new()
        } else {
            self.coil_subsets()
        };
        for subset in subsets {
            if !self.fits_every_part(&subset) {
                continue;
            }
            let greedy = self.run(&subset, &BeamConfig::greedy()).ok();
            let bfd = self.best_fit_plan(&subset);
            for (name, plan) in [("greedy", greedy), ("best_fit_decreasing", bfd)] {
                let Some(plan) = plan else { continue };
                if plan.total_waste < best.total_waste - EPS {
                    tracing::debug!(
                        baseline = name,
                        coils = ?subset,
                        waste = plan.total_waste,
                        previous = best.total_waste,
                        "baseline beat current plan"
                    );
                    source = name;
                    best = plan;
                }
            }
        }

        tracing::info!(
            source,
            tables = best.table_count(),
            waste = best.total_waste,
            waste_percent = best.waste_percent(),
            "solve finished"
        );
        Ok(best)
    }

    /// Every non-empty subset of the enabled coils in bitmask order, or just
    /// the full set when the sweep is off or the catalog is too large.
    fn coil_subsets(&self) -> Vec<Vec<f64>> {
        let n = self.coil_widths.len();
        if !self.config.coil_subsets || n > self.config.max_subset_coils || n >= usize::BITS as usize
        {
            return vec![self.coil_widths.clone()];
        }
        (1..1usize << n)
            .map(|mask| {
                self.coil_widths
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| mask & (1 << j) != 0)
                    .map(|(_, &w)| w)
                    .collect()
            })
            .collect()
    }

    fn fits_every_part(&self, coil_widths: &[f64]) -> bool {
        self.parts
            .iter()
            .all(|p| coil_widths.iter().any(|&w| approx_le(p.width, w)))
    }

    fn best_fit_plan(&self, coil_widths: &[f64]) -> Option<Plan> {
        let mut tables = best_fit_decreasing(&self.parts, coil_widths)?;
        post_optimize(&mut tables, self.config.post_opt_rounds);
        Some(Plan::from_tables(&self.coil_widths, tables, &self.parts))
    }

    fn validate(&self) -> Result<()> {
        if self.coil_widths.is_empty() {
            return Err(SolveError::InvalidInput("no coil is enabled".to_string()));
        }
        if let Some(w) = self
            .coil_widths
            .iter()
            .find(|w| !w.is_finite() || to_units(**w) == 0)
        {
            return Err(SolveError::InvalidInput(format!(
                "coil width {} must be a positive number of at least 0.1 cm",
                w
            )));
        }
        for part in &self.parts {
            if !part.width.is_finite() || to_units(part.width) == 0 {
                return Err(SolveError::InvalidInput(format!(
                    "part {} width {} must be at least 0.1 cm",
                    part.id, part.width
                )));
            }
            if !part.length.is_finite() || part.length <= 0.0 {
                return Err(SolveError::InvalidInput(format!(
                    "part {} length {} must be positive",
                    part.id, part.length
                )));
            }
            if !approx_le(part.length, MAX_TABLE_LENGTH) {
                return Err(SolveError::InvalidInput(format!(
                    "part {} length {}m exceeds the maximum table length of {}m",
                    part.id, part.length, MAX_TABLE_LENGTH
                )));
            }
            if part.quantity == 0 {
                return Err(SolveError::InvalidInput(format!(
                    "part {} quantity must be a positive integer",
                    part.id
                )));
            }
        }
        Ok(())
    }

    /// One outer loop over `coil_widths`; tables are grouped over all enabled coils.
    fn run(&self, coil_widths: &[f64], beam_config: &BeamConfig) -> Result<Plan> {
        let parts = &self.parts;
        let mut ranker = CandidateRanker::new(coil_widths, self.config.profile);
        let beam = BeamSearch::new(parts, beam_config);
        let mut state = SolverState::new(parts);
        let mut iterations = 0;

        loop {
            state.drain_remnants(parts);
            if state.is_done() {
                break;
            }
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(SolveError::IterationLimitExceeded(self.config.max_iterations));
            }

            let pattern = match beam.next_table(&state, &mut ranker) {
                Some(pattern) => pattern,
                None => {
                    tracing::warn!(
                        remaining = state.remaining_pieces(),
                        "beam search found no table, falling back to best candidate"
                    );
                    match ranker.top(parts, &state.remaining, 1).into_iter().next() {
                        Some(candidate) => candidate.pattern,
                        None => return Err(self.diagnose(&state)),
                    }
                }
            };

            tracing::debug!(
                iteration = iterations,
                coil = pattern.coil_width,
                length = pattern.table_length,
                remaining_width = pattern.remaining_width,
                produced_area = pattern.produced_area,
                "committing table"
            );
            state.apply(&pattern);
        }

        let mut tables = state.tables;
        let removed = post_optimize(&mut tables, self.config.post_opt_rounds);
        let plan = Plan::from_tables(&self.coil_widths, tables, parts);

        tracing::debug!(
            coils = ?coil_widths,
            tables = plan.table_count(),
            removed,
            waste = plan.total_waste,
            patterns = ranker.pattern_cache_len(),
            "search finished"
        );
        Ok(plan)
    }

    /// Explains why no table can be built for the pending demand.
    fn diagnose(&self, state: &SolverState) -> SolveError {
        let widest = self.coil_widths.iter().cloned().fold(0.0, f64::max);
        for (part, &left) in self.parts.iter().zip(&state.remaining) {
            if left == 0 {
                continue;
            }
            let reason = if !approx_le(part.length, MAX_TABLE_LENGTH) {
                format!("length exceeds the maximum table length of {}m", MAX_TABLE_LENGTH)
            } else if !approx_le(part.width, widest) {
                format!("wider than every enabled coil (widest is {}cm)", widest)
            } else {
                continue;
            };
            return SolveError::UnplaceablePart {
                part_id: part.id,
                width: part.width,
                length: part.length,
                reason,
            };
        }
        SolveError::NoSolution {
            remaining: state.remaining_pieces(),
        }
    }
}

/// Computes a cutting plan for `parts` on the enabled `coils`.
pub fn solve(parts: &[Part], coils: &[CoilSpec], config: &SolverConfig) -> Result<Plan> {
    Solver::new(parts.to_vec(), coils, config.clone()).solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_COILS, Profile};
    use crate::quantize::area;
    use crate::types::Table;

    /// Validates a complete plan:
    /// 1. Every requested piece is produced exactly once
    /// 2. Strip widths plus remaining width add up to the coil width, which
    ///    is never exceeded
    /// 3. Strip pieces fit the table length
    /// 4. Lane cuts never exceed the table length
    fn assert_plan_valid(plan: &Plan, parts: &[Part]) {
        let produced = plan.produced_by_part();
        for p in parts {
            assert_eq!(
                produced.get(&p.id).copied().unwrap_or(0),
                p.quantity,
                "part {} produced count mismatch",
                p.id
            );
        }
        assert_eq!(
            produced.values().map(|&q| q as u64).sum::<u64>(),
            parts.iter().map(|p| p.quantity as u64).sum::<u64>()
        );

        for (ti, t) in plan.tables().enumerate() {
            assert!(
                (t.used_width() + t.remaining_width - t.coil_width).abs() < 1e-6,
                "table {ti}: width not conserved"
            );
            assert!(
                t.remaining_width >= -1e-9,
                "table {ti}: strips overflow coil {} by {}",
                t.coil_width,
                -t.remaining_width
            );
            for s in &t.strips {
                assert!(
                    s.pieces_per_strip as f64 * s.part_length <= t.length + 1e-9,
                    "table {ti}: strip of {} overruns length {}",
                    s.part_length,
                    t.length
                );
            }
            for lane in &t.lanes {
                let used: f64 = lane.cuts.iter().map(|c| c.length).sum();
                assert!(used <= t.length + 1e-9, "table {ti}: lane overfilled");
                assert!(lane.cuts.iter().all(|c| c.width <= lane.width + 1e-9));
            }
        }
        let waste: f64 = plan.tables().map(Table::waste_area).sum();
        assert!((waste - plan.total_waste).abs() < 1e-9);
    }

    fn only(width: f64) -> Vec<CoilSpec> {
        vec![CoilSpec::new(width)]
    }

    #[test]
    fn test_single_part_single_table() {
        let parts = vec![Part::new(0, 25.0, 3.0, 1)];
        let plan = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap();
        assert_plan_valid(&plan, &parts);
        assert_eq!(plan.table_count(), 1);
        let t = plan.tables().next().unwrap();
        assert_eq!(t.coil_width, 25.0);
        assert_eq!(t.length, 3.0);
        assert!(t.remaining_width.abs() < 1e-9);
        assert!(plan.total_waste.abs() < 1e-9);
    }

    #[test]
    fn test_two_parts_share_a_table() {
        let parts = vec![Part::new(0, 40.0, 2.0, 3), Part::new(1, 60.0, 2.0, 2)];
        let plan = solve(&parts, &only(100.0), &SolverConfig::default()).unwrap();
        assert_plan_valid(&plan, &parts);
        assert!(plan.tables().any(|t| {
            t.strips.iter().any(|s| s.part_id == 0)
                && t.strips.iter().any(|s| s.part_id == 1)
                && t.remaining_width.abs() < 1e-9
        }));
    }

    #[test]
    fn test_too_wide_part_is_unplaceable() {
        let parts = vec![Part::new(0, 25.0, 1.0, 2), Part::new(7, 130.0, 2.0, 1)];
        let err = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap_err();
        match err {
            SolveError::UnplaceablePart { part_id, width, .. } => {
                assert_eq!(part_id, 7);
                assert_eq!(width, 130.0);
            }
            other => panic!("expected UnplaceablePart, got {other:?}"),
        }
    }

    #[test]
    fn test_too_long_part_rejected() {
        let parts = vec![Part::new(0, 25.0, 9.0, 1)];
        let err = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_invalid_inputs() {
        let config = SolverConfig::default();
        let zero_qty = vec![Part::new(0, 25.0, 1.0, 0)];
        assert!(matches!(
            solve(&zero_qty, &DEFAULT_COILS, &config),
            Err(SolveError::InvalidInput(_))
        ));
        let negative = vec![Part::new(0, -5.0, 1.0, 1)];
        assert!(matches!(
            solve(&negative, &DEFAULT_COILS, &config),
            Err(SolveError::InvalidInput(_))
        ));
        let parts = vec![Part::new(0, 25.0, 1.0, 1)];
        let disabled = vec![CoilSpec {
            width: 100.0,
            enabled: false,
        }];
        assert!(matches!(
            solve(&parts, &disabled, &config),
            Err(SolveError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_no_parts_gives_empty_plan() {
        let plan = solve(&[], &DEFAULT_COILS, &SolverConfig::default()).unwrap();
        assert_eq!(plan.table_count(), 0);
        assert_eq!(plan.total_waste, 0.0);
        assert_eq!(plan.waste_percent(), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let parts = vec![
            Part::new(0, 25.0, 1.2, 4),
            Part::new(1, 33.3, 0.8, 3),
            Part::new(2, 40.0, 2.5, 2),
        ];
        let config = SolverConfig::default();
        let a = solve(&parts, &DEFAULT_COILS, &config).unwrap();
        let b = solve(&parts, &DEFAULT_COILS, &config).unwrap();
        assert_plan_valid(&a, &parts);
        assert_eq!(a, b);
    }

    #[test]
    fn test_beam_never_worse_than_greedy() {
        let parts = vec![
            Part::new(0, 30.0, 1.5, 3),
            Part::new(1, 20.0, 0.7, 5),
            Part::new(2, 45.0, 2.0, 2),
        ];
        let beam = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap();
        let greedy_config = SolverConfig {
            beam: BeamConfig::greedy(),
            ..SolverConfig::default()
        };
        let greedy = solve(&parts, &DEFAULT_COILS, &greedy_config).unwrap();
        assert_plan_valid(&beam, &parts);
        assert_plan_valid(&greedy, &parts);
        assert!(beam.total_waste <= greedy.total_waste + 1e-9);
    }

    #[test]
    fn test_post_optimization_never_hurts() {
        let parts = vec![
            Part::new(0, 50.0, 1.0, 3),
            Part::new(1, 25.0, 0.5, 3),
        ];
        let without = SolverConfig {
            post_opt_rounds: 0,
            ..SolverConfig::default()
        };
        let before = solve(&parts, &only(100.0), &without).unwrap();
        let after = solve(&parts, &only(100.0), &SolverConfig::default()).unwrap();
        assert_plan_valid(&before, &parts);
        assert_plan_valid(&after, &parts);
        assert!(after.total_waste <= before.total_waste + 1e-9);
    }

    #[test]
    fn test_remnants_absorb_demand() {
        // A 2m table for the wide part leaves a 1m tail the short part fits in
        let parts = vec![Part::new(0, 50.0, 2.0, 1), Part::new(1, 50.0, 1.0, 1)];
        let plan = solve(&parts, &only(50.0), &SolverConfig::default()).unwrap();
        assert_plan_valid(&plan, &parts);
        assert_eq!(plan.table_count(), 1);
        assert!(plan.total_waste.abs() < 1e-9);
    }

    #[test]
    fn test_profiles_all_solve() {
        let parts = vec![Part::new(0, 12.5, 0.6, 6), Part::new(1, 40.0, 1.8, 2)];
        for profile in [Profile::MinWaste, Profile::Balanced, Profile::FewerTables] {
            let plan = solve(&parts, &DEFAULT_COILS, &SolverConfig::with_profile(profile)).unwrap();
            assert_plan_valid(&plan, &parts);
        }
    }

    #[test]
    fn test_iteration_guard() {
        let parts = vec![Part::new(0, 125.0, 8.0, 3)];
        let config = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        assert_eq!(
            solve(&parts, &only(125.0), &config).unwrap_err(),
            SolveError::IterationLimitExceeded(1)
        );
    }

    #[test]
    fn test_rounded_widths_never_overflow_coil() {
        // 11.14 + 22.24 = 33.38 cm, wider than the coil once unrounded
        let parts = vec![Part::new(0, 11.14, 1.0, 1), Part::new(1, 22.24, 1.0, 1)];
        let plan = solve(&parts, &only(33.3), &SolverConfig::default()).unwrap();
        assert_plan_valid(&plan, &parts);
        assert!(plan.tables().all(|t| t.used_width() <= t.coil_width + 1e-9));
    }

    #[test]
    fn test_never_worse_than_baselines() {
        let parts = vec![
            Part::new(0, 30.0, 1.5, 3),
            Part::new(1, 20.0, 0.7, 5),
            Part::new(2, 45.0, 2.0, 2),
            Part::new(3, 30.0, 0.4, 1),
        ];
        let plan = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap();
        assert_plan_valid(&plan, &parts);

        let widths = CoilSpec::enabled_widths(&DEFAULT_COILS);
        let bfd = best_fit_decreasing(&parts, &widths).unwrap();
        let bfd_waste: f64 = bfd.iter().map(Table::waste_area).sum();
        assert!(plan.total_waste <= bfd_waste + 1e-6);

        // the sweep also covers greedy on each single coil
        let greedy_config = SolverConfig {
            beam: BeamConfig::greedy(),
            ..SolverConfig::default()
        };
        for &w in &widths {
            if let Ok(single) = solve(&parts, &only(w), &greedy_config) {
                assert_plan_valid(&single, &parts);
                assert!(plan.total_waste <= single.total_waste + 1e-6);
            }
        }
    }

    #[test]
    fn test_coil_sweep_never_hurts() {
        let parts = vec![Part::new(0, 25.0, 3.0, 1), Part::new(1, 30.0, 0.4, 1)];
        let full_only = SolverConfig {
            coil_subsets: false,
            ..SolverConfig::default()
        };
        let swept = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap();
        let unswept = solve(&parts, &DEFAULT_COILS, &full_only).unwrap();
        assert_plan_valid(&swept, &parts);
        assert_plan_valid(&unswept, &parts);
        assert!(swept.total_waste <= unswept.total_waste + 1e-6);
        // best-fit decreasing puts each part on its own narrow coil
        assert!((swept.total_waste - area(3.3, 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_coil_subsets_enumerated() {
        let coils: Vec<CoilSpec> = [25.0, 50.0, 100.0].map(CoilSpec::new).to_vec();
        let solver = Solver::new(vec![], &coils, SolverConfig::default());
        let subsets = solver.coil_subsets();
        assert_eq!(subsets.len(), 7);
        assert_eq!(subsets[0], vec![25.0]);
        assert_eq!(subsets[6], vec![25.0, 50.0, 100.0]);

        let capped = SolverConfig {
            max_subset_coils: 2,
            ..SolverConfig::default()
        };
        let solver = Solver::new(vec![], &coils, capped);
        assert_eq!(solver.coil_subsets(), vec![vec![25.0, 50.0, 100.0]]);
    }

    #[test]
    fn test_plan_totals() {
        let parts = vec![Part::new(0, 25.0, 3.0, 2)];
        let plan = solve(&parts, &DEFAULT_COILS, &SolverConfig::default()).unwrap();
        assert_plan_valid(&plan, &parts);
        assert!((plan.required_length - 6.0).abs() < 1e-9);
        assert!((plan.used_length - 6.0).abs() < 1e-9);
        assert!((plan.produced_area - 1.5).abs() < 1e-9);
        assert!(plan.total_waste.abs() < 1e-9);
        // one group per enabled coil, ascending
        let widths: Vec<f64> = plan.coils.iter().map(|c| c.coil_width).collect();
        assert_eq!(widths, vec![25.0, 33.3, 50.0, 100.0, 125.0]);
    }
}
