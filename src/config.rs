use serde::{Deserialize, Serialize};

use crate::types::CoilSpec;

/// Longest table that can be cut from a coil, in metres.
pub const MAX_TABLE_LENGTH: f64 = 8.0;

/// Width quantization: 10 units per cm, i.e. 0.1 cm.
pub const WIDTH_UNITS_PER_CM: u32 = 10;

/// The reference coil catalog. The 42 cm coil ships disabled.
pub const DEFAULT_COILS: [CoilSpec; 6] = [
    CoilSpec { width: 125.0, enabled: true },
    CoilSpec { width: 100.0, enabled: true },
    CoilSpec { width: 50.0, enabled: true },
    CoilSpec { width: 42.0, enabled: false },
    CoilSpec { width: 33.3, enabled: true },
    CoilSpec { width: 25.0, enabled: true },
];

/// Scoring preset trading strict waste minimization against fewer tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    MinWaste,
    #[default]
    Balanced,
    FewerTables,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileWeights {
    /// Extra weight on side waste (alpha).
    pub side_waste: f64,
    /// Credit for remnant area that remaining demand can still use (beta).
    pub remnant_credit: f64,
    /// Penalty for tables shorter than the maximum length.
    pub length_penalty: f64,
    pub fragmentation_penalty: f64,
    pub compactness_bonus: f64,
}

impl Profile {
    pub fn weights(self) -> ProfileWeights {
        match self {
            Profile::MinWaste => ProfileWeights {
                side_waste: 1.0,
                remnant_credit: 0.5,
                length_penalty: 0.0,
                fragmentation_penalty: 0.02,
                compactness_bonus: 0.01,
            },
            Profile::Balanced => ProfileWeights {
                side_waste: 0.6,
                remnant_credit: 0.35,
                length_penalty: 0.05,
                fragmentation_penalty: 0.05,
                compactness_bonus: 0.03,
            },
            Profile::FewerTables => ProfileWeights {
                side_waste: 0.4,
                remnant_credit: 0.2,
                length_penalty: 0.15,
                fragmentation_penalty: 0.1,
                compactness_bonus: 0.05,
            },
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min-waste" | "min_waste" => Ok(Profile::MinWaste),
            "balanced" => Ok(Profile::Balanced),
            "fewer-tables" | "fewer_tables" => Ok(Profile::FewerTables),
            _ => Err(format!(
                "invalid profile '{}', expected: min-waste, balanced, or fewer-tables",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub min_width: usize,
    pub max_width: usize,
    pub base_width: usize,
    /// Lookahead depth in tables.
    pub depth: usize,
    /// Top candidates expanded per frontier node.
    pub candidates_per_node: usize,
    pub remaining_demand_weight: f64,
    pub table_count_weight: f64,
    pub remnant_potential_weight: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            min_width: 2,
            max_width: 6,
            base_width: 2,
            depth: 2,
            candidates_per_node: 4,
            remaining_demand_weight: 1.0,
            table_count_weight: 0.01,
            remnant_potential_weight: 0.5,
        }
    }
}

impl BeamConfig {
    /// Single-shot search: always commit the best immediate candidate.
    pub fn greedy() -> Self {
        Self {
            min_width: 1,
            max_width: 1,
            base_width: 1,
            depth: 1,
            candidates_per_node: 1,
            ..Self::default()
        }
    }

    pub fn is_greedy(&self) -> bool {
        self.max_width <= 1 && self.depth <= 1
    }

    /// Beam width for a node: base plus bonuses for variety of active part
    /// types and for the remnant backlog, clamped to the configured bounds.
    pub fn adaptive_width(&self, active_types: usize, remnant_count: usize) -> usize {
        let type_bonus = (active_types / 3).min(2);
        let backlog_bonus = (remnant_count / 5).min(2);
        (self.base_width + type_bonus + backlog_bonus).clamp(self.min_width, self.max_width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapConfig {
    /// Parts strictly shorter than this (m) may come from scrap.
    pub max_length: f64,
    /// Parts at most this wide (cm) may come from scrap.
    pub max_width: f64,
    pub max_suggestions: usize,
}

impl Default for ScrapConfig {
    fn default() -> Self {
        Self {
            max_length: 2.0,
            max_width: 50.0,
            max_suggestions: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub profile: Profile,
    pub beam: BeamConfig,
    pub post_opt_rounds: usize,
    pub max_iterations: usize,
    pub scrap: ScrapConfig,
    /// Also run the baseline packers on every non-empty subset of the
    /// enabled coils, up to `max_subset_coils` coils (2^n - 1 subsets).
    pub coil_subsets: bool,
    pub max_subset_coils: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            beam: BeamConfig::default(),
            post_opt_rounds: 2,
            max_iterations: 5000,
            scrap: ScrapConfig::default(),
            coil_subsets: true,
            max_subset_coils: 6,
        }
    }
}

impl SolverConfig {
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }
}
