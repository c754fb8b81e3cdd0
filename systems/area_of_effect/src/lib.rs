#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rasterises area-of-effect templates onto the grid.
//!
//! Spheres and cones are measured centre-to-centre in straight-line feet.
//! Lines and cubes are marched cell by cell along their heading and report
//! the marched distance. Every shape is clipped to the map and reports each
//! cell once, keeping the first (nearest) distance it was reached at.

use std::collections::HashSet;

use glam::DVec2;
use tactical_grid_core::{
    AffectedCell, AoeShape, AreaOfEffect, CellCoord, GridConfig, GridTokenData, TokenId,
};
use tactical_grid_system_distance::euclidean_distance_feet;

/// Half of the cone's opening angle.
///
/// Only cells other than the apex are measured against it. The apex cell has
/// no bearing and is left out of every cone, even when the heading points
/// along the positive x axis where a plain `atan2` test would keep it.
pub const CONE_HALF_ANGLE: f64 = std::f64::consts::FRAC_PI_4;

/// Width of a line template in feet.
pub const LINE_WIDTH_FEET: f64 = 5.0;

const ANGLE_TOLERANCE: f64 = 1e-9;
const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Cells covered by the area of effect.
///
/// A disabled grid yields an empty list.
#[must_use]
pub fn affected_cells(aoe: &AreaOfEffect, config: &GridConfig) -> Vec<AffectedCell> {
    if !config.is_enabled() {
        return Vec::new();
    }

    let mut collector = CellCollector::new(config);
    match aoe.shape {
        AoeShape::Sphere => rasterise_sphere(aoe, config, &mut collector),
        AoeShape::Cone => rasterise_cone(aoe, config, &mut collector),
        AoeShape::Line => rasterise_line(aoe, config, &mut collector),
        AoeShape::Cube => rasterise_cube(aoe, config, &mut collector),
    }

    let cells = collector.finish();
    tracing::debug!(
        shape = ?aoe.shape,
        origin = %aoe.origin(),
        size_feet = aoe.size_feet,
        affected = cells.len(),
        "rasterised area of effect"
    );
    cells
}

/// Tokens whose footprint overlaps the area of effect, in input order.
#[must_use]
pub fn tokens_in_area(
    aoe: &AreaOfEffect,
    tokens: &[GridTokenData],
    config: &GridConfig,
) -> Vec<TokenId> {
    let covered: HashSet<CellCoord> = affected_cells(aoe, config)
        .iter()
        .map(AffectedCell::cell)
        .collect();
    if covered.is_empty() {
        return Vec::new();
    }

    tokens
        .iter()
        .filter(|token| token.footprint().any(|cell| covered.contains(&cell)))
        .map(|token| token.id)
        .collect()
}

fn rasterise_sphere(aoe: &AreaOfEffect, config: &GridConfig, out: &mut CellCollector<'_>) {
    let origin = aoe.origin();
    let limit = f64::from(aoe.size_feet);

    for cell in bounding_square(origin, config.cells_for_feet(aoe.size_feet)) {
        let distance = euclidean_distance_feet(origin, cell, config);
        if distance <= limit + DISTANCE_TOLERANCE {
            out.add(cell, distance);
        }
    }
}

fn rasterise_cone(aoe: &AreaOfEffect, config: &GridConfig, out: &mut CellCollector<'_>) {
    let origin = aoe.origin();
    let limit = f64::from(aoe.size_feet);
    let facing = DVec2::from_angle(aoe.heading().radians());

    for cell in bounding_square(origin, config.cells_for_feet(aoe.size_feet)) {
        // apex excluded for every heading
        if cell == origin {
            continue;
        }

        let distance = euclidean_distance_feet(origin, cell, config);
        if distance > limit + DISTANCE_TOLERANCE {
            continue;
        }

        let offset = DVec2::new(
            f64::from(cell.x() - origin.x()),
            f64::from(cell.y() - origin.y()),
        );
        if facing.angle_between(offset).abs() <= CONE_HALF_ANGLE + ANGLE_TOLERANCE {
            out.add(cell, distance);
        }
    }
}

fn rasterise_line(aoe: &AreaOfEffect, config: &GridConfig, out: &mut CellCollector<'_>) {
    let origin = aoe.origin();
    let facing = DVec2::from_angle(aoe.heading().radians());
    let across = facing.perp();
    let offsets = corridor_offsets(LINE_WIDTH_FEET / f64::from(config.feet_per_cell));

    for step in 1..=config.cells_for_feet(aoe.size_feet) {
        for &offset in &offsets {
            let point = facing * f64::from(step) + across * offset;
            out.add(
                snap(origin, point),
                f64::from(step) * f64::from(config.feet_per_cell),
            );
        }
    }
}

fn rasterise_cube(aoe: &AreaOfEffect, config: &GridConfig, out: &mut CellCollector<'_>) {
    let origin = aoe.origin();
    let facing = DVec2::from_angle(aoe.heading().radians());
    let across = facing.perp();
    let side = config.cells_for_feet(aoe.size_feet);
    let half = side / 2;

    for depth in 0..side {
        for width in -half..=half {
            let point = facing * f64::from(depth) + across * f64::from(width);
            out.add(
                snap(origin, point),
                f64::from(depth) * f64::from(config.feet_per_cell),
            );
        }
    }
}

/// Perpendicular sample offsets, in half-cell steps, strictly inside a
/// corridor `width_cells` wide. The centre line is always sampled.
fn corridor_offsets(width_cells: f64) -> Vec<f64> {
    let half_width = width_cells / 2.0;
    let steps = (half_width / 0.5).ceil() as i32;
    (-steps..=steps)
        .map(|step| f64::from(step) * 0.5)
        .filter(|offset| *offset == 0.0 || offset.abs() < half_width - DISTANCE_TOLERANCE)
        .collect()
}

fn bounding_square(origin: CellCoord, radius: i32) -> impl Iterator<Item = CellCoord> {
    (-radius..=radius)
        .flat_map(move |dy| (-radius..=radius).map(move |dx| origin.offset(dx, dy)))
}

fn snap(origin: CellCoord, point: DVec2) -> CellCoord {
    let rounded = point.round();
    origin.offset(rounded.x as i32, rounded.y as i32)
}

/// Accumulates in-bounds cells, keeping the first distance seen per cell.
struct CellCollector<'a> {
    config: &'a GridConfig,
    seen: HashSet<CellCoord>,
    cells: Vec<AffectedCell>,
}

impl<'a> CellCollector<'a> {
    fn new(config: &'a GridConfig) -> Self {
        Self {
            config,
            seen: HashSet::new(),
            cells: Vec::new(),
        }
    }

    fn add(&mut self, cell: CellCoord, distance_feet: f64) {
        if !self.config.contains(cell) || !self.seen.insert(cell) {
            return;
        }
        self.cells
            .push(AffectedCell::new(cell, distance_feet.round() as u32));
    }

    fn finish(self) -> Vec<AffectedCell> {
        self.cells
    }
}
