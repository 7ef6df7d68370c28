use serde::{Deserialize, Deserializer, Serialize};

use crate::quantize::{EPS, approx_eq, area};

/// A demanded part: `width` in cm, `length` in m.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub id: usize,
    pub width: f64,
    pub length: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub quantity: u32,
}

impl Part {
    pub fn new(id: usize, width: f64, length: f64, quantity: u32) -> Self {
        Self {
            id,
            width,
            length,
            quantity,
        }
    }

    pub fn piece_area(&self) -> f64 {
        area(self.width, self.length)
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}cm x {}m", self.width, self.length)
    }
}

/// A stock coil of fixed width (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoilSpec {
    pub width: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl CoilSpec {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            enabled: true,
        }
    }

    /// Enabled widths of a catalog, ascending.
    pub fn enabled_widths(catalog: &[CoilSpec]) -> Vec<f64> {
        let mut widths: Vec<f64> = catalog
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.width)
            .collect();
        widths.sort_by(|a, b| a.total_cmp(b));
        widths.dedup_by(|a, b| approx_eq(*a, *b));
        widths
    }
}

/// Accepts a JSON number only when it is a non-negative integer (`3` or `3.0`).
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    if !n.is_finite() || n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {}",
            n
        )));
    }
    Ok(n as u32)
}

/// `strip_count` parallel bands of one part type inside a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strip {
    pub part_index: usize,
    pub part_id: usize,
    pub width: f64,
    pub part_length: f64,
    pub pieces_per_strip: u32,
    pub strip_count: u32,
    pub produced: u32,
}

/// Quantities-only description of a candidate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub coil_width: f64,
    pub table_length: f64,
    pub remaining_width: f64,
    pub strips: Vec<Strip>,
    pub produced_area: f64,
    pub waste_area: f64,
    pub finishes_all_demand: bool,
}

impl Pattern {
    pub fn side_waste(&self) -> f64 {
        area(self.remaining_width.max(0.0), self.table_length)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cut {
    pub part_index: usize,
    pub part_id: usize,
    pub width: f64,
    pub length: f64,
    /// Placed into an offcut after the table was opened.
    pub from_remnant: bool,
}

impl Cut {
    pub fn area(&self) -> f64 {
        area(self.width, self.length)
    }
}

/// A concrete lengthwise band of a materialized table. Strip lanes carry
/// `part_id`; the side lane left over by `remaining_width` does not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lane {
    pub width: f64,
    pub part_id: Option<usize>,
    pub cuts: Vec<Cut>,
    pub remaining_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WasteRect {
    pub width: f64,
    pub length: f64,
}

/// A pattern expanded into concrete lanes and cuts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub coil_width: f64,
    pub length: f64,
    pub remaining_width: f64,
    pub strips: Vec<Strip>,
    pub lanes: Vec<Lane>,
}

impl Table {
    pub fn opened_area(&self) -> f64 {
        area(self.coil_width, self.length)
    }

    pub fn produced_area(&self) -> f64 {
        self.cuts().map(Cut::area).sum()
    }

    pub fn waste_area(&self) -> f64 {
        (self.opened_area() - self.produced_area()).max(0.0)
    }

    pub fn used_width(&self) -> f64 {
        self.strips
            .iter()
            .map(|s| s.width * s.strip_count as f64)
            .sum()
    }

    pub fn cuts(&self) -> impl Iterator<Item = &Cut> {
        self.lanes.iter().flat_map(|l| &l.cuts)
    }

    pub fn produced_pieces(&self) -> usize {
        self.cuts().count()
    }

    pub fn used_length(&self) -> f64 {
        self.cuts().map(|c| c.length).sum()
    }

    /// Leftover rectangles: lane tails plus the width beside narrower cuts.
    pub fn waste_rects(&self) -> Vec<WasteRect> {
        let mut rects = Vec::new();
        for lane in &self.lanes {
            for cut in &lane.cuts {
                if lane.width - cut.width > EPS {
                    rects.push(WasteRect {
                        width: lane.width - cut.width,
                        length: cut.length,
                    });
                }
            }
            if lane.remaining_length > EPS {
                rects.push(WasteRect {
                    width: lane.width,
                    length: lane.remaining_length,
                });
            }
        }
        rects
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoilPlan {
    pub coil_width: f64,
    pub tables: Vec<Table>,
}

/// Final cutting plan: tables grouped per enabled coil.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub coils: Vec<CoilPlan>,
    pub total_waste: f64,
    pub opened_area: f64,
    pub produced_area: f64,
    /// Sum of quantity x length over the requested parts (m).
    pub required_length: f64,
    pub used_length: f64,
}

impl Plan {
    /// Groups `tables` by coil, keeping creation order within each coil.
    pub fn from_tables(coil_widths: &[f64], tables: Vec<Table>, parts: &[Part]) -> Self {
        let mut coils: Vec<CoilPlan> = coil_widths
            .iter()
            .map(|&w| CoilPlan {
                coil_width: w,
                tables: Vec::new(),
            })
            .collect();
        for table in tables {
            match coils
                .iter_mut()
                .find(|c| approx_eq(c.coil_width, table.coil_width))
            {
                Some(coil) => coil.tables.push(table),
                None => coils.push(CoilPlan {
                    coil_width: table.coil_width,
                    tables: vec![table],
                }),
            }
        }

        let all = coils.iter().flat_map(|c| &c.tables);
        let opened_area: f64 = all.clone().map(Table::opened_area).sum();
        let produced_area: f64 = all.clone().map(Table::produced_area).sum();
        let total_waste: f64 = all.clone().map(Table::waste_area).sum();
        let used_length: f64 = all.map(Table::used_length).sum();
        let required_length = parts
            .iter()
            .map(|p| p.quantity as f64 * p.length)
            .sum();

        Self {
            coils,
            total_waste,
            opened_area,
            produced_area,
            required_length,
            used_length,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.coils.iter().flat_map(|c| &c.tables)
    }

    pub fn table_count(&self) -> usize {
        self.coils.iter().map(|c| c.tables.len()).sum()
    }

    pub fn waste_percent(&self) -> f64 {
        if self.opened_area <= 0.0 {
            return 0.0;
        }
        self.total_waste / self.opened_area * 100.0
    }

    /// Pieces produced per part id, summed over every table.
    pub fn produced_by_part(&self) -> std::collections::BTreeMap<usize, u32> {
        let mut produced = std::collections::BTreeMap::new();
        for cut in self.tables().flat_map(|t| t.cuts()) {
            *produced.entry(cut.part_id).or_insert(0) += 1;
        }
        produced
    }
}
