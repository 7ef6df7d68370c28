use crate::config::BeamConfig;
use crate::quantize::{EPS, cmp_approx};
use crate::ranker::CandidateRanker;
use crate::state::SolverState;
use crate::types::{Part, Pattern};

#[derive(Debug, Clone)]
struct Node {
    state: SolverState,
    first: Option<Pattern>,
    score: f64,
}

/// Bounded lookahead over solver states. Only the first table of the best
/// surviving path is returned; the rest is re-planned on the next call.
pub struct BeamSearch<'a> {
    parts: &'a [Part],
    config: &'a BeamConfig,
    total_area: f64,
}

impl<'a> BeamSearch<'a> {
    pub fn new(parts: &'a [Part], config: &'a BeamConfig) -> Self {
        let total_area = parts
            .iter()
            .map(|p| p.quantity as f64 * p.piece_area())
            .sum::<f64>()
            .max(EPS);
        Self {
            parts,
            config,
            total_area,
        }
    }

    /// Lower is better.
    pub fn score(&self, state: &SolverState) -> f64 {
        let remaining = state.remaining_area(self.parts);
        let potential = state.remnant_potential(self.parts).min(remaining);
        state.waste_area() / self.total_area
            + self.config.remaining_demand_weight * remaining / self.total_area
            + self.config.table_count_weight * state.table_count() as f64
            - self.config.remnant_potential_weight * potential / self.total_area
    }

    pub fn next_table(
        &self,
        root: &SolverState,
        ranker: &mut CandidateRanker,
    ) -> Option<Pattern> {
        let width = self
            .config
            .adaptive_width(root.active_types(), root.remnants.len())
            .max(1);
        let per_node = self.config.candidates_per_node.max(1);

        let mut frontier = vec![Node {
            state: root.clone(),
            first: None,
            score: self.score(root),
        }];

        for _ in 0..self.config.depth.max(1) {
            let mut children = Vec::new();
            for node in &frontier {
                if node.state.is_done() {
                    children.push(node.clone());
                    continue;
                }
                let mut base = node.state.clone();
                base.drain_remnants(self.parts);
                if base.is_done() {
                    children.push(Node {
                        score: self.score(&base),
                        state: base,
                        first: node.first.clone(),
                    });
                    continue;
                }
                for candidate in ranker.top(self.parts, &base.remaining, per_node) {
                    let mut child = base.clone();
                    child.apply(&candidate.pattern);
                    children.push(Node {
                        score: self.score(&child),
                        state: child,
                        first: node.first.clone().or(Some(candidate.pattern)),
                    });
                }
            }
            if children.is_empty() {
                break;
            }
            // stable: equal scores keep ranker order
            children.sort_by(|a, b| cmp_approx(a.score, b.score));
            children.truncate(width);
            frontier = children;
        }

        frontier.into_iter().find_map(|node| node.first)
    }
}
