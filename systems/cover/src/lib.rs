#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cover classification by corner-to-corner sightlines.
//!
//! Each occupant is treated as an axis-aligned square in fractional grid
//! coordinates. Every corner of the attacker's square is joined to every
//! corner of the target's square and each segment is sampled at evenly spaced
//! interior points. A segment counts as blocked when any sample lands in a
//! blocked cell that neither occupant stands on. The blocked fraction picks
//! the cover tier.
//!
//! Sampling approximates the exact intersection test; [`SAMPLES_PER_LINE`]
//! trades precision for speed.

use std::collections::HashSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tactical_grid_core::{CellCoord, CellStateMap, GridConfig, GridTokenData};

/// Interior points sampled along every corner-to-corner segment.
pub const SAMPLES_PER_LINE: u32 = 20;

/// Corners of an occupant's square.
pub const CORNERS_PER_OCCUPANT: u32 = 4;

/// Segments traced between attacker and target.
pub const LINES_PER_CHECK: u32 = CORNERS_PER_OCCUPANT * CORNERS_PER_OCCUPANT;

/// Tier of cover a target enjoys against an attacker.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CoverLevel {
    /// Nothing in the way.
    #[default]
    None,
    /// At least half of the sightlines are obstructed.
    Half,
    /// At least three quarters of the sightlines are obstructed.
    ThreeQuarters,
    /// Every sightline is obstructed; the target cannot be targeted directly.
    Total,
}

impl CoverLevel {
    /// Classifies cover from the number of obstructed sightlines.
    #[must_use]
    pub fn from_blocked_lines(blocked: u32, total: u32) -> Self {
        if total == 0 || blocked == 0 {
            return Self::None;
        }
        if blocked >= total {
            return Self::Total;
        }
        // Integer comparisons keep the 75% and 50% thresholds exact.
        if blocked * 4 >= total * 3 {
            Self::ThreeQuarters
        } else if blocked * 2 >= total {
            Self::Half
        } else {
            Self::None
        }
    }

    /// Bonus granted to armour class and Dexterity saving throws.
    #[must_use]
    pub const fn bonus(self) -> CoverBonus {
        match self {
            Self::None => CoverBonus::Flat(0),
            Self::Half => CoverBonus::Flat(2),
            Self::ThreeQuarters => CoverBonus::Flat(5),
            Self::Total => CoverBonus::Unlimited,
        }
    }

    /// Whether an attack can target a creature behind this cover.
    #[must_use]
    pub const fn can_be_targeted(self) -> bool {
        !matches!(self, Self::Total)
    }
}

/// Defensive bonus conferred by cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverBonus {
    /// Fixed bonus added to the defence.
    Flat(u8),
    /// Total cover; no bonus is large enough to express it.
    Unlimited,
}

/// Cover between an attacker and a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverResult {
    /// Cover tier.
    pub level: CoverLevel,
    /// Armour class bonus.
    pub ac_bonus: CoverBonus,
    /// Dexterity saving throw bonus.
    pub dex_save_bonus: CoverBonus,
    /// Sightlines that hit a blocked cell.
    pub blocked_lines: u32,
    /// Sightlines traced.
    pub total_lines: u32,
    /// Whether the target can be targeted at all.
    pub can_be_targeted: bool,
}

impl CoverResult {
    fn classify(blocked_lines: u32, total_lines: u32) -> Self {
        let level = CoverLevel::from_blocked_lines(blocked_lines, total_lines);
        Self {
            level,
            ac_bonus: level.bonus(),
            dex_save_bonus: level.bonus(),
            blocked_lines,
            total_lines,
            can_be_targeted: level.can_be_targeted(),
        }
    }

    fn uncovered() -> Self {
        Self::classify(0, LINES_PER_CHECK)
    }
}

/// Cover a target in cell `target` has against an attacker in cell `attacker`.
///
/// A disabled grid has no terrain to hide behind and reports no cover.
#[must_use]
pub fn calculate_cover(
    attacker: CellCoord,
    target: CellCoord,
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> CoverResult {
    if attacker == target || !config.is_enabled() {
        return CoverResult::uncovered();
    }

    let attacker_area = Occupancy::single(attacker);
    let target_area = Occupancy::single(target);
    trace_cover(&attacker_area, &target_area, cell_states)
}

/// Cover between two tokens, using the corners of each token's whole footprint.
///
/// Overlapping footprints are treated like a shared cell: no cover.
#[must_use]
pub fn calculate_token_cover(
    attacker: &GridTokenData,
    target: &GridTokenData,
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> CoverResult {
    let attacker_area = Occupancy::token(attacker);
    let target_area = Occupancy::token(target);
    if !config.is_enabled() || attacker_area.overlaps(&target_area) {
        return CoverResult::uncovered();
    }

    trace_cover(&attacker_area, &target_area, cell_states)
}

fn trace_cover(
    attacker: &Occupancy,
    target: &Occupancy,
    cell_states: &CellStateMap,
) -> CoverResult {
    let is_obstacle = |cell: CellCoord| {
        !attacker.cells.contains(&cell)
            && !target.cells.contains(&cell)
            && cell_states.state(cell).blocks_sight()
    };

    let mut blocked_lines = 0;
    for from in attacker.corners() {
        for to in target.corners() {
            if segment_is_blocked(from, to, &is_obstacle) {
                blocked_lines += 1;
            }
        }
    }

    let result = CoverResult::classify(blocked_lines, LINES_PER_CHECK);
    tracing::debug!(
        attacker = %attacker.origin,
        target = %target.origin,
        blocked_lines,
        level = ?result.level,
        "classified cover"
    );
    result
}

fn segment_is_blocked<F>(from: DVec2, to: DVec2, is_obstacle: &F) -> bool
where
    F: Fn(CellCoord) -> bool,
{
    let divisions = f64::from(SAMPLES_PER_LINE + 1);
    (1..=SAMPLES_PER_LINE).any(|step| {
        let sample = from.lerp(to, f64::from(step) / divisions).floor();
        is_obstacle(CellCoord::new(sample.x as i32, sample.y as i32))
    })
}

/// Square region held by an occupant, in grid units.
#[derive(Debug)]
struct Occupancy {
    origin: CellCoord,
    size: i32,
    cells: HashSet<CellCoord>,
}

impl Occupancy {
    fn single(cell: CellCoord) -> Self {
        Self {
            origin: cell,
            size: 1,
            cells: std::iter::once(cell).collect(),
        }
    }

    fn token(token: &GridTokenData) -> Self {
        Self {
            origin: token.cell(),
            size: token.footprint_size(),
            cells: token.footprint().collect(),
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.cells.iter().any(|cell| other.cells.contains(cell))
    }

    fn corners(&self) -> [DVec2; CORNERS_PER_OCCUPANT as usize] {
        let left = f64::from(self.origin.x());
        let top = f64::from(self.origin.y());
        let right = left + f64::from(self.size);
        let bottom = top + f64::from(self.size);
        [
            DVec2::new(left, top),
            DVec2::new(right, top),
            DVec2::new(left, bottom),
            DVec2::new(right, bottom),
        ]
    }
}
