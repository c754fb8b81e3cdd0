#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tactical grid engine.
//!
//! This crate defines the data surface that connects the combat UI, the
//! external map/session store, and the pure geometry systems. Callers hand
//! the systems a [`GridConfig`], a sparse [`CellStateMap`] and per-call
//! descriptors such as [`GridTokenData`] or [`AreaOfEffect`]; systems answer
//! with fresh result collections and never mutate the snapshots they were
//! given.

use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod grid;
mod zone;

pub use grid::{ConfigError, GridConfig, GridType, PercentPoint, PixelPoint};
pub use zone::{
    Ability, DamageSpec, EffectKind, PersistentZone, SaveSpec, Trigger, ZoneColor, ZoneEffect,
    ZoneId,
};

/// Feet represented by one cell edge on a standard tabletop grid.
pub const DEFAULT_FEET_PER_CELL: u32 = 5;

/// Location of a single grid cell expressed as column (`x`) and row (`y`).
///
/// Coordinates are signed so that shape rasterisation near the map edge can
/// produce out-of-range cells that bounds checks then discard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (king move) distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for CellCoord {
    type Err = CellKeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let (x, y) = key
            .split_once(',')
            .ok_or_else(|| CellKeyError::MissingSeparator(key.to_owned()))?;
        let parse = |component: &str| {
            component
                .trim()
                .parse::<i32>()
                .map_err(|_| CellKeyError::InvalidComponent {
                    key: key.to_owned(),
                    component: component.to_owned(),
                })
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Errors raised while parsing legacy `"x,y"` cell keys.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CellKeyError {
    /// The key did not contain the `,` separator.
    #[error("cell key '{0}' is missing the ',' separator")]
    MissingSeparator(String),
    /// One of the components was not an integer.
    #[error("cell key '{key}' has a non-integer component '{component}'")]
    InvalidComponent {
        /// Key that failed to parse.
        key: String,
        /// Offending component of the key.
        component: String,
    },
}

/// Terrain state of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    /// Open ground.
    #[default]
    Free,
    /// Impassable and opaque to sight.
    Blocked,
    /// Passable at double movement cost; does not block sight.
    Difficult,
}

impl CellState {
    /// Reports whether a creature may enter a cell in this state.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }

    /// Reports whether the cell obstructs sight lines.
    #[must_use]
    pub const fn blocks_sight(self) -> bool {
        matches!(self, Self::Blocked)
    }

    /// Factor applied to the cost of moving into a cell in this state.
    #[must_use]
    pub const fn movement_multiplier(self) -> u32 {
        match self {
            Self::Difficult => 2,
            Self::Free | Self::Blocked => 1,
        }
    }
}

/// Sparse terrain map keyed by cell coordinate. Missing cells are free.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CellRecord>", into = "Vec<CellRecord>")]
pub struct CellStateMap {
    cells: BTreeMap<CellCoord, CellState>,
}

impl CellStateMap {
    /// Creates an empty map where every cell is free.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a map keyed by legacy `"x,y"` strings.
    ///
    /// The first malformed key aborts the import.
    pub fn from_legacy_keys<'a, I>(entries: I) -> Result<Self, CellKeyError>
    where
        I: IntoIterator<Item = (&'a str, CellState)>,
    {
        let mut map = Self::new();
        for (key, state) in entries {
            map.set(key.parse()?, state);
        }
        Ok(map)
    }

    /// Terrain state of the provided cell.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> CellState {
        self.cells.get(&cell).copied().unwrap_or_default()
    }

    /// Records the state of a cell. Assigning [`CellState::Free`] clears the entry.
    pub fn set(&mut self, cell: CellCoord, state: CellState) {
        if state == CellState::Free {
            let _ = self.cells.remove(&cell);
        } else {
            let _ = self.cells.insert(cell, state);
        }
    }

    /// Reports whether the cell is blocked.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        self.state(cell) == CellState::Blocked
    }

    /// Reports whether the cell is difficult terrain on the static map.
    #[must_use]
    pub fn is_difficult(&self, cell: CellCoord) -> bool {
        self.state(cell) == CellState::Difficult
    }

    /// Number of non-free cells recorded in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` when every cell is free.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterator over the non-free cells in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, CellState)> + '_ {
        self.cells.iter().map(|(cell, state)| (*cell, *state))
    }
}

impl FromIterator<(CellCoord, CellState)> for CellStateMap {
    fn from_iter<T: IntoIterator<Item = (CellCoord, CellState)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (cell, state) in iter {
            map.set(cell, state);
        }
        map
    }
}

/// Serialized form of one non-free cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Column of the cell.
    pub x: i32,
    /// Row of the cell.
    pub y: i32,
    /// Terrain state of the cell.
    pub state: CellState,
}

impl From<Vec<CellRecord>> for CellStateMap {
    fn from(records: Vec<CellRecord>) -> Self {
        records
            .into_iter()
            .map(|record| (CellCoord::new(record.x, record.y), record.state))
            .collect()
    }
}

impl From<CellStateMap> for Vec<CellRecord> {
    fn from(map: CellStateMap) -> Self {
        map.iter()
            .map(|(cell, state)| CellRecord {
                x: cell.x(),
                y: cell.y(),
                state,
            })
            .collect()
    }
}

/// Unique identifier assigned to a token by the combat UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(u32);

impl TokenId {
    /// Creates a new token identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable description of a token placed on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridTokenData {
    /// Identifier of the token.
    pub id: TokenId,
    /// Column of the token's upper-left cell.
    pub cell_x: i32,
    /// Row of the token's upper-left cell.
    pub cell_y: i32,
    /// Edge length of the token's square footprint in cells.
    pub size_in_cells: u32,
    /// Walking speed of the token in feet.
    pub speed_feet: u32,
    /// Movement budget in feet available to the current reachability query.
    pub movement_remaining: u32,
}

impl GridTokenData {
    /// Creates a one-cell token with its full speed available.
    #[must_use]
    pub const fn new(id: TokenId, cell: CellCoord, speed_feet: u32) -> Self {
        Self {
            id,
            cell_x: cell.x(),
            cell_y: cell.y(),
            size_in_cells: 1,
            speed_feet,
            movement_remaining: speed_feet,
        }
    }

    /// Overrides the footprint size of the token.
    #[must_use]
    pub const fn with_size(mut self, size_in_cells: u32) -> Self {
        self.size_in_cells = size_in_cells;
        self
    }

    /// Overrides the movement budget of the token.
    #[must_use]
    pub const fn with_movement_remaining(mut self, feet: u32) -> Self {
        self.movement_remaining = feet;
        self
    }

    /// Cell anchoring the token.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.cell_x, self.cell_y)
    }

    /// Edge length of the footprint, never smaller than one cell.
    #[must_use]
    pub fn footprint_size(&self) -> i32 {
        i32::try_from(self.size_in_cells.max(1)).unwrap_or(i32::MAX)
    }

    /// Cells covered by the token, row by row.
    pub fn footprint(&self) -> impl Iterator<Item = CellCoord> {
        let size = self.footprint_size();
        let origin = self.cell();
        (0..size).flat_map(move |dy| (0..size).map(move |dx| origin.offset(dx, dy)))
    }
}

/// Geometric template of an area of effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AoeShape {
    /// Quarter-circle fanning out from the origin.
    Cone,
    /// Five-foot-wide corridor.
    Line,
    /// Disc centred on the origin cell.
    Sphere,
    /// Square whose near face is centred on the origin cell.
    Cube,
}

/// Facing of a directional shape, stored in radians.
///
/// Zero faces east (increasing `x`); positive angles turn toward increasing
/// `y`, matching screen-space rotation captured by the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Heading(f64);

impl Heading {
    /// Converts a rotation captured in degrees.
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    /// Angle of the heading in radians.
    #[must_use]
    pub fn radians(self) -> f64 {
        self.0
    }
}

/// Area of effect requested by the combat UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaOfEffect {
    /// Shape to rasterise.
    pub shape: AoeShape,
    /// Column of the origin cell.
    pub origin_x: i32,
    /// Row of the origin cell.
    pub origin_y: i32,
    /// Size of the shape in feet (radius, length or side).
    pub size_feet: u32,
    /// Facing in degrees for cones, lines and cubes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
}

impl AreaOfEffect {
    /// Creates an area of effect without a facing.
    #[must_use]
    pub const fn new(shape: AoeShape, origin: CellCoord, size_feet: u32) -> Self {
        Self {
            shape,
            origin_x: origin.x(),
            origin_y: origin.y(),
            size_feet,
            direction: None,
        }
    }

    /// Sets the facing of the shape in degrees.
    #[must_use]
    pub fn facing(mut self, degrees: f64) -> Self {
        self.direction = Some(degrees);
        self
    }

    /// Cell the shape originates from.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        CellCoord::new(self.origin_x, self.origin_y)
    }

    /// Facing converted to radians. A missing direction faces east.
    #[must_use]
    pub fn heading(&self) -> Heading {
        Heading::from_degrees(self.direction.unwrap_or(0.0))
    }
}

/// Cell covered by an area query together with its distance from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedCell {
    /// Column of the cell.
    pub x: i32,
    /// Row of the cell.
    pub y: i32,
    /// Rounded distance from the origin in feet.
    pub distance_feet: u32,
}

impl AffectedCell {
    /// Creates a new affected cell record.
    #[must_use]
    pub const fn new(cell: CellCoord, distance_feet: u32) -> Self {
        Self {
            x: cell.x(),
            y: cell.y(),
            distance_feet,
        }
    }

    /// Coordinate of the affected cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Cooperative cancellation handle shared between a caller and a search.
///
/// Cloning yields a handle to the same flag, so a UI thread can cancel a
/// query running on a worker.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every search observing this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
