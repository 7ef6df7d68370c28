use crate::quantize::{EPS, approx_eq, approx_le, area};
use crate::state::materialize;
use crate::types::{Part, Pattern, Strip, Table};

/// A table filled piece by piece; every piece is a full-length strip.
#[derive(Debug, Clone)]
struct OpenTable {
    coil_width: f64,
    length: f64,
    remaining_width: f64,
    counts: Vec<u32>,
}

impl OpenTable {
    fn into_table(self, parts: &[Part]) -> Table {
        let mut strips: Vec<Strip> = self
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(idx, &n)| Strip {
                part_index: idx,
                part_id: parts[idx].id,
                width: parts[idx].width,
                part_length: parts[idx].length,
                pieces_per_strip: 1,
                strip_count: n,
                produced: n,
            })
            .collect();
        strips.sort_by(|a, b| {
            b.width
                .total_cmp(&a.width)
                .then(a.part_index.cmp(&b.part_index))
        });
        let produced_area: f64 = strips
            .iter()
            .map(|s| s.produced as f64 * area(s.width, s.part_length))
            .sum();

        materialize(&Pattern {
            coil_width: self.coil_width,
            table_length: self.length,
            remaining_width: self.remaining_width,
            strips,
            produced_area,
            waste_area: area(self.coil_width, self.length) - produced_area,
            finishes_all_demand: false,
        })
    }
}

enum Slot {
    Open(usize),
    Fresh(f64),
}

/// Best-fit decreasing packer. Pieces go widest first into the open table of
/// the same length, or the fresh coil, that leaves the least width over.
/// Coils are scanned ascending, their open tables before a fresh one, and
/// only a strictly smaller leftover replaces the current choice.
///
/// Returns `None` when a piece is wider than every coil.
pub fn best_fit_decreasing(parts: &[Part], coil_widths: &[f64]) -> Option<Vec<Table>> {
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| parts[b].width.total_cmp(&parts[a].width).then(a.cmp(&b)));

    let mut open: Vec<OpenTable> = Vec::new();
    for idx in order {
        let part = &parts[idx];
        for _ in 0..part.quantity {
            let t = match best_slot(&open, coil_widths, part)? {
                Slot::Open(t) => t,
                Slot::Fresh(coil_width) => {
                    open.push(OpenTable {
                        coil_width,
                        length: part.length,
                        remaining_width: coil_width,
                        counts: vec![0; parts.len()],
                    });
                    open.len() - 1
                }
            };
            let table = &mut open[t];
            table.remaining_width = (table.remaining_width - part.width).max(0.0);
            table.counts[idx] += 1;
        }
    }

    Some(open.into_iter().map(|t| t.into_table(parts)).collect())
}

fn best_slot(open: &[OpenTable], coil_widths: &[f64], part: &Part) -> Option<Slot> {
    let mut best: Option<(f64, Slot)> = None;
    for &coil in coil_widths {
        for (t, table) in open.iter().enumerate() {
            if !approx_eq(table.coil_width, coil)
                || !approx_eq(table.length, part.length)
                || !approx_le(part.width, table.remaining_width)
            {
                continue;
            }
            let left = table.remaining_width - part.width;
            if best.as_ref().is_none_or(|(b, _)| left < *b - EPS) {
                best = Some((left, Slot::Open(t)));
            }
        }
        if approx_le(part.width, coil) {
            let left = coil - part.width;
            if best.as_ref().is_none_or(|(b, _)| left < *b - EPS) {
                best = Some((left, Slot::Fresh(coil)));
            }
        }
    }
    best.map(|(_, slot)| slot)
}
