use crate::quantize::{EPS, area};
use crate::remnant::{Remnant, place_into_remnants};
use crate::types::{Cut, Lane, Part, Pattern, Table};

/// Expands a pattern into concrete lanes. Each strip fills its first lanes
/// completely, then one partial lane, then leaves any extra lanes empty. The
/// unused coil width becomes a trailing side lane.
pub fn materialize(pattern: &Pattern) -> Table {
    let mut lanes = Vec::new();
    for strip in &pattern.strips {
        let pps = strip.pieces_per_strip.max(1);
        let full = strip.produced / pps;
        let partial = strip.produced % pps;
        for i in 0..strip.strip_count {
            let pieces = if i < full {
                pps
            } else if i == full {
                partial
            } else {
                0
            };
            let cut = Cut {
                part_index: strip.part_index,
                part_id: strip.part_id,
                width: strip.width,
                length: strip.part_length,
                from_remnant: false,
            };
            lanes.push(Lane {
                width: strip.width,
                part_id: Some(strip.part_id),
                cuts: vec![cut; pieces as usize],
                remaining_length: (pattern.table_length - pieces as f64 * strip.part_length)
                    .max(0.0),
            });
        }
    }
    if pattern.remaining_width > EPS {
        lanes.push(Lane {
            width: pattern.remaining_width,
            part_id: None,
            cuts: Vec::new(),
            remaining_length: pattern.table_length,
        });
    }

    Table {
        coil_width: pattern.coil_width,
        length: pattern.table_length,
        remaining_width: pattern.remaining_width,
        strips: pattern.strips.clone(),
        lanes,
    }
}

/// One node of the search: remaining demand plus everything cut so far.
/// Cloned whole when the beam branches.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverState {
    pub remaining: Vec<u32>,
    pub remnants: Vec<Remnant>,
    pub remnant_order: u64,
    pub opened_area: f64,
    pub tables: Vec<Table>,
}

impl SolverState {
    pub fn new(parts: &[Part]) -> Self {
        Self {
            remaining: parts.iter().map(|p| p.quantity).collect(),
            remnants: Vec::new(),
            remnant_order: 0,
            opened_area: 0.0,
            tables: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.remaining.iter().all(|&q| q == 0)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn remaining_pieces(&self) -> u64 {
        self.remaining.iter().map(|&q| q as u64).sum()
    }

    pub fn remaining_area(&self, parts: &[Part]) -> f64 {
        parts
            .iter()
            .zip(&self.remaining)
            .map(|(p, &q)| q as f64 * p.piece_area())
            .sum()
    }

    pub fn active_types(&self) -> usize {
        self.remaining.iter().filter(|&&q| q > 0).count()
    }

    pub fn produced_area(&self) -> f64 {
        self.tables.iter().map(Table::produced_area).sum()
    }

    pub fn waste_area(&self) -> f64 {
        (self.opened_area - self.produced_area()).max(0.0)
    }

    /// Remnant area that some still-pending part could fit into.
    pub fn remnant_potential(&self, parts: &[Part]) -> f64 {
        self.remnants
            .iter()
            .filter(|r| {
                parts
                    .iter()
                    .zip(&self.remaining)
                    .any(|(p, &q)| q > 0 && r.fits(p.width, p.length))
            })
            .map(|r| area(r.width, r.remaining_length))
            .sum()
    }

    pub fn drain_remnants(&mut self, parts: &[Part]) -> u32 {
        place_into_remnants(
            parts,
            &mut self.remaining,
            &mut self.remnants,
            &mut self.tables,
        )
    }

    /// Commits a pattern built from this state's demand: decrements demand,
    /// opens the table and registers its lane tails as remnants.
    pub fn apply(&mut self, pattern: &Pattern) {
        for strip in &pattern.strips {
            let left = &mut self.remaining[strip.part_index];
            *left = left.saturating_sub(strip.produced);
        }
        let table = materialize(pattern);
        self.opened_area += table.opened_area();
        let table_idx = self.tables.len();
        for (lane_idx, lane) in table.lanes.iter().enumerate() {
            if lane.remaining_length > EPS {
                self.remnants.push(Remnant {
                    width: lane.width,
                    remaining_length: lane.remaining_length,
                    cuts: Vec::new(),
                    order: self.remnant_order,
                    table: table_idx,
                    lane: lane_idx,
                });
                self.remnant_order += 1;
            }
        }
        self.tables.push(table);
    }
}
