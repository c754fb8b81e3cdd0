#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tabletop distance measurement between grid cells.
//!
//! [`distance_feet`] implements the alternating diagonal rule used when a
//! player measures a range: the first diagonal costs one cell-length, the
//! second two, the third one again, and so on. Terrain never affects a
//! measurement; movement cost accounting lives in the movement system.

use tactical_grid_core::{CellCoord, GridConfig};

/// Distance in feet between two cells under the alternating diagonal rule.
#[must_use]
pub fn distance_feet(from: CellCoord, to: CellCoord, config: &GridConfig) -> u32 {
    let dx = from.x().abs_diff(to.x());
    let dy = from.y().abs_diff(to.y());
    let diagonal_moves = dx.min(dy);
    let straight_moves = dx.abs_diff(dy);

    // Every second diagonal costs double.
    let diagonal_cells = diagonal_moves.saturating_add(diagonal_moves / 2);
    diagonal_cells
        .saturating_add(straight_moves)
        .saturating_mul(config.feet_per_cell)
}

/// Straight-line distance in feet between the centres of two cells.
#[must_use]
pub fn euclidean_distance_feet(from: CellCoord, to: CellCoord, config: &GridConfig) -> f64 {
    let dx = f64::from(to.x()) - f64::from(from.x());
    let dy = f64::from(to.y()) - f64::from(from.y());
    dx.hypot(dy) * f64::from(config.feet_per_cell)
}

/// Distance in feet between two cells moving only orthogonally.
#[must_use]
pub fn manhattan_distance_feet(from: CellCoord, to: CellCoord, config: &GridConfig) -> u32 {
    from.manhattan_distance(to)
        .saturating_mul(config.feet_per_cell)
}

/// Reports whether `to` lies within `range_feet` of `from`.
///
/// A disabled grid has no measurable range and always answers `false`.
#[must_use]
pub fn is_within_range(
    from: CellCoord,
    to: CellCoord,
    range_feet: u32,
    config: &GridConfig,
) -> bool {
    config.is_enabled() && distance_feet(from, to, config) <= range_feet
}
