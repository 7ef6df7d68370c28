use serde::Serialize;

use crate::quantize::{EPS, approx_ge, cmp_approx};
use crate::types::{Cut, Part, Table};

/// A reusable offcut: the unused tail of one lane of an opened table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Remnant {
    pub width: f64,
    pub remaining_length: f64,
    pub cuts: Vec<Cut>,
    /// Creation counter; lower is older.
    pub order: u64,
    pub table: usize,
    pub lane: usize,
}

impl Remnant {
    pub fn fits(&self, width: f64, length: f64) -> bool {
        approx_ge(self.width, width) && approx_ge(self.remaining_length, length)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_length <= EPS
    }
}

/// Best-fit remnant for a `width x length` piece: least width slack, then
/// least leftover length, then oldest.
pub fn best_remnant(remnants: &[Remnant], width: f64, length: f64) -> Option<usize> {
    remnants
        .iter()
        .enumerate()
        .filter(|(_, r)| r.fits(width, length))
        .min_by(|(_, a), (_, b)| {
            cmp_approx(a.width - width, b.width - width)
                .then(cmp_approx(
                    a.remaining_length - length,
                    b.remaining_length - length,
                ))
                .then(a.order.cmp(&b.order))
        })
        .map(|(idx, _)| idx)
}

/// Cuts `cut` from `remnants[idx]`, mirroring it into the source table lane.
/// Exhausted remnants are removed.
pub fn place_cut(remnants: &mut Vec<Remnant>, idx: usize, cut: Cut, tables: &mut [Table]) {
    let remnant = &mut remnants[idx];
    remnant.remaining_length = (remnant.remaining_length - cut.length).max(0.0);
    if let Some(lane) = tables
        .get_mut(remnant.table)
        .and_then(|t| t.lanes.get_mut(remnant.lane))
    {
        lane.remaining_length = remnant.remaining_length;
        lane.cuts.push(cut.clone());
    }
    remnant.cuts.push(cut);
    if remnant.is_exhausted() {
        remnants.remove(idx);
    }
}

/// Drains pending demand into existing remnants, one piece at a time, widest
/// (then longest) part first. Returns the number of pieces placed.
pub fn place_into_remnants(
    parts: &[Part],
    remaining: &mut [u32],
    remnants: &mut Vec<Remnant>,
    tables: &mut [Table],
) -> u32 {
    if remnants.is_empty() {
        return 0;
    }
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        parts[b]
            .width
            .total_cmp(&parts[a].width)
            .then(parts[b].length.total_cmp(&parts[a].length))
            .then(a.cmp(&b))
    });

    let mut placed = 0;
    'outer: loop {
        for &idx in &order {
            if remaining[idx] == 0 {
                continue;
            }
            let part = &parts[idx];
            if let Some(r) = best_remnant(remnants, part.width, part.length) {
                let cut = Cut {
                    part_index: idx,
                    part_id: part.id,
                    width: part.width,
                    length: part.length,
                    from_remnant: true,
                };
                place_cut(remnants, r, cut, tables);
                remaining[idx] -= 1;
                placed += 1;
                continue 'outer;
            }
        }
        break;
    }
    placed
}
