use crate::quantize::{EPS, cmp_approx};
use crate::remnant::{Remnant, best_remnant, place_cut};
use crate::types::{Cut, Table};

/// Tries to delete high-waste tables by re-homing their cuts into the lane
/// tails of the other tables. Returns the number of deleted tables.
pub fn post_optimize(tables: &mut Vec<Table>, rounds: usize) -> usize {
    let mut deleted = 0;
    for round in 0..rounds {
        let mut round_deleted = 0;
        'restart: loop {
            for idx in rank_by_waste(tables) {
                if tables[idx].produced_pieces() == 0 {
                    tracing::debug!(round, table = idx, "dropping empty table");
                    tables.remove(idx);
                    round_deleted += 1;
                    continue 'restart;
                }
                if let Some(rehomed) = rehome_table(tables, idx) {
                    tracing::debug!(
                        round,
                        table = idx,
                        waste = tables[idx].waste_area(),
                        "table absorbed into remnants"
                    );
                    *tables = rehomed;
                    round_deleted += 1;
                    continue 'restart;
                }
            }
            break;
        }
        deleted += round_deleted;
        if round_deleted == 0 {
            break;
        }
    }
    deleted
}

/// Table indices, worst first: descending waste, then ascending production.
fn rank_by_waste(tables: &[Table]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tables.len()).collect();
    order.sort_by(|&a, &b| {
        cmp_approx(tables[b].waste_area(), tables[a].waste_area())
            .then(cmp_approx(
                tables[a].produced_area(),
                tables[b].produced_area(),
            ))
            .then(a.cmp(&b))
    });
    order
}

/// Remnant pool built from the lane tails of every table except `skip`.
fn pool_without(tables: &[Table], skip: usize) -> Vec<Remnant> {
    let mut pool = Vec::new();
    for (t, table) in tables.iter().enumerate() {
        if t == skip {
            continue;
        }
        for (l, lane) in table.lanes.iter().enumerate() {
            if lane.remaining_length > EPS {
                pool.push(Remnant {
                    width: lane.width,
                    remaining_length: lane.remaining_length,
                    cuts: Vec::new(),
                    order: pool.len() as u64,
                    table: t,
                    lane: l,
                });
            }
        }
    }
    pool
}

/// On a scratch copy, moves every cut of `tables[idx]` into the other tables'
/// remnants and drops the table. `None` if any cut has no home.
fn rehome_table(tables: &[Table], idx: usize) -> Option<Vec<Table>> {
    let mut scratch = tables.to_vec();
    let mut pool = pool_without(&scratch, idx);
    let mut cuts: Vec<Cut> = scratch[idx].cuts().cloned().collect();
    cuts.sort_by(|a, b| {
        b.width
            .total_cmp(&a.width)
            .then(b.length.total_cmp(&a.length))
    });
    for cut in cuts {
        let r = best_remnant(&pool, cut.width, cut.length)?;
        place_cut(
            &mut pool,
            r,
            Cut {
                from_remnant: true,
                ..cut
            },
            &mut scratch,
        );
    }
    scratch.remove(idx);
    Some(scratch)
}
