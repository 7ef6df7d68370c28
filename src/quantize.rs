use std::cmp::Ordering;

use crate::config::WIDTH_UNITS_PER_CM;

/// Tolerance shared by every floating-point comparison in the solver.
pub const EPS: f64 = 1e-9;

/// Converts a width in cm to integer width units (0.1 cm resolution).
pub fn to_units(width_cm: f64) -> u32 {
    (width_cm * WIDTH_UNITS_PER_CM as f64).round().max(0.0) as u32
}

/// Width units an item occupies: rounded up, so a set of items whose unit
/// weights fit a capacity also fits it in cm.
pub fn to_units_ceil(width_cm: f64) -> u32 {
    (width_cm * WIDTH_UNITS_PER_CM as f64 - UNIT_SLACK).ceil().max(0.0) as u32
}

/// Width units a coil offers: rounded down.
pub fn to_units_floor(width_cm: f64) -> u32 {
    (width_cm * WIDTH_UNITS_PER_CM as f64 + UNIT_SLACK).floor().max(0.0) as u32
}

// Absorbs binary drift such as 33.3 * 10 = 333.00000000000006
const UNIT_SLACK: f64 = 1e-6;

pub fn from_units(units: u32) -> f64 {
    units as f64 / WIDTH_UNITS_PER_CM as f64
}

/// Area in m² of a rectangle given in cm × m.
pub fn area(width_cm: f64, length_m: f64) -> f64 {
    width_cm / 100.0 * length_m
}

/// Rounds a length in metres to 3 decimals (millimetres).
pub fn round_length(length_m: f64) -> f64 {
    (length_m * 1000.0).round() / 1000.0
}

/// Integer millimetre key for a length, used in cache keys.
pub fn length_key(length_m: f64) -> u64 {
    (length_m * 1000.0).round().max(0.0) as u64
}

/// How many pieces of `piece` fit along `span`.
pub fn fit_count(span: f64, piece: f64) -> u32 {
    if piece <= 0.0 {
        return 0;
    }
    ((span + EPS) / piece).floor().max(0.0) as u32
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPS
}

pub fn approx_le(a: f64, b: f64) -> bool {
    a <= b + EPS
}

pub fn approx_ge(a: f64, b: f64) -> bool {
    a + EPS >= b
}

/// Position of `v` on a grid of [`EPS`] steps.
pub fn snap(v: f64) -> i64 {
    (v / EPS).round() as i64
}

/// Compares floats by their [`snap`] grid point. Values within [`EPS`] of
/// each other usually compare equal, and the order stays transitive, so it
/// is safe to hand to `sort_by`.
pub fn cmp_approx(a: f64, b: f64) -> Ordering {
    snap(a).cmp(&snap(b))
}
