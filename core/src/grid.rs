//! Grid configuration and cell/pixel/percent conversions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, DEFAULT_FEET_PER_CELL};

const DEFAULT_CELL_SIZE: f64 = 50.0;
const DEFAULT_MAP_LENGTH: f64 = 1000.0;

/// Kind of grid overlaid on the map image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    /// Square cells aligned with the image axes.
    #[default]
    Square,
    /// Grid disabled; every grid query answers with an empty result.
    None,
}

/// Point measured in map-image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal pixel offset from the image's left edge.
    pub x: f64,
    /// Vertical pixel offset from the image's top edge.
    pub y: f64,
}

impl PixelPoint {
    /// Creates a new pixel-space point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Point measured as a percentage of the map image dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    /// Horizontal position in the range `0.0..=100.0`.
    pub x: f64,
    /// Vertical position in the range `0.0..=100.0`.
    pub y: f64,
}

impl PercentPoint {
    /// Creates a new percent-space point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Grid overlay configuration supplied by the map/session store.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    /// Kind of grid overlaid on the map.
    pub grid_type: GridType,
    /// Edge length of a cell in pixels.
    pub cell_size: f64,
    /// Horizontal pixel offset of the grid origin.
    pub offset_x: f64,
    /// Vertical pixel offset of the grid origin.
    pub offset_y: f64,
    /// Width of the map image in pixels.
    pub map_width: f64,
    /// Height of the map image in pixels.
    pub map_height: f64,
    /// Real-world distance represented by one cell edge.
    pub feet_per_cell: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_type: GridType::Square,
            cell_size: DEFAULT_CELL_SIZE,
            offset_x: 0.0,
            offset_y: 0.0,
            map_width: DEFAULT_MAP_LENGTH,
            map_height: DEFAULT_MAP_LENGTH,
            feet_per_cell: DEFAULT_FEET_PER_CELL,
        }
    }
}

impl GridConfig {
    /// Creates a square grid covering `columns × rows` cells of `cell_size` pixels.
    #[must_use]
    pub fn square(columns: u32, rows: u32, cell_size: f64) -> Self {
        Self {
            cell_size,
            map_width: f64::from(columns) * cell_size,
            map_height: f64::from(rows) * cell_size,
            ..Self::default()
        }
    }

    /// Replaces the grid type.
    #[must_use]
    pub fn with_grid_type(mut self, grid_type: GridType) -> Self {
        self.grid_type = grid_type;
        self
    }

    /// Replaces the pixel offset of the grid origin.
    #[must_use]
    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Replaces the distance represented by one cell edge.
    #[must_use]
    pub fn with_feet_per_cell(mut self, feet_per_cell: u32) -> Self {
        self.feet_per_cell = feet_per_cell;
        self
    }

    /// Checks the configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feet_per_cell == 0 {
            return Err(ConfigError::ZeroFeetPerCell);
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        let valid_length = |length: f64| length.is_finite() && length >= 0.0;
        if !valid_length(self.map_width) || !valid_length(self.map_height) {
            return Err(ConfigError::InvalidMapSize {
                width: self.map_width,
                height: self.map_height,
            });
        }
        Ok(())
    }

    /// Reports whether grid queries should produce results.
    ///
    /// A disabled grid and a configuration violating its invariants both
    /// answer `false`, which systems translate into empty results.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.grid_type == GridType::Square && self.validate().is_ok()
    }

    /// Number of cell columns, counting a trailing partial column.
    #[must_use]
    pub fn columns(&self) -> i32 {
        cells_spanning(self.map_width, self.cell_size)
    }

    /// Number of cell rows, counting a trailing partial row.
    #[must_use]
    pub fn rows(&self) -> i32 {
        cells_spanning(self.map_height, self.cell_size)
    }

    /// Reports whether the cell lies within the map bounds.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x() >= 0 && cell.y() >= 0 && cell.x() < self.columns() && cell.y() < self.rows()
    }

    /// Number of whole cells needed to span `feet`, rounding up.
    #[must_use]
    pub fn cells_for_feet(&self, feet: u32) -> i32 {
        if self.feet_per_cell == 0 {
            return 0;
        }
        i32::try_from(feet.div_ceil(self.feet_per_cell)).unwrap_or(i32::MAX)
    }

    /// Cell containing the provided pixel.
    #[must_use]
    pub fn pixel_to_cell(&self, pixel: PixelPoint) -> CellCoord {
        if self.cell_size <= 0.0 {
            return CellCoord::new(0, 0);
        }
        CellCoord::new(
            ((pixel.x - self.offset_x) / self.cell_size).floor() as i32,
            ((pixel.y - self.offset_y) / self.cell_size).floor() as i32,
        )
    }

    /// Pixel at the centre of the provided cell.
    #[must_use]
    pub fn cell_to_pixel(&self, cell: CellCoord) -> PixelPoint {
        PixelPoint::new(
            self.offset_x + (f64::from(cell.x()) + 0.5) * self.cell_size,
            self.offset_y + (f64::from(cell.y()) + 0.5) * self.cell_size,
        )
    }

    /// Cell containing the provided percent-space position.
    #[must_use]
    pub fn percent_to_cell(&self, percent: PercentPoint) -> CellCoord {
        self.pixel_to_cell(PixelPoint::new(
            percent.x / 100.0 * self.map_width,
            percent.y / 100.0 * self.map_height,
        ))
    }

    /// Percent-space position of the centre of the provided cell.
    #[must_use]
    pub fn cell_to_percent(&self, cell: CellCoord) -> PercentPoint {
        let pixel = self.cell_to_pixel(cell);
        PercentPoint::new(
            percent_of(pixel.x, self.map_width),
            percent_of(pixel.y, self.map_height),
        )
    }

    /// Quantises a percent-space position onto the centre of its cell.
    #[must_use]
    pub fn snap_to_grid(&self, percent: PercentPoint) -> PercentPoint {
        self.cell_to_percent(self.percent_to_cell(percent))
    }
}

fn cells_spanning(length: f64, cell_size: f64) -> i32 {
    if !(cell_size > 0.0) || !(length > 0.0) {
        return 0;
    }
    (length / cell_size).ceil() as i32
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

/// Reasons a grid configuration is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `feet_per_cell` was zero.
    #[error("feet per cell must be greater than zero")]
    ZeroFeetPerCell,
    /// The cell size was zero, negative or not finite.
    #[error("cell size must be a positive number of pixels, got {0}")]
    InvalidCellSize(f64),
    /// A map dimension was negative or not finite.
    #[error("map dimensions must be non-negative, got {width}x{height}")]
    InvalidMapSize {
        /// Configured map width in pixels.
        width: f64,
        /// Configured map height in pixels.
        height: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GridConfig {
        GridConfig::square(20, 10, 50.0).with_offset(10.0, 20.0)
    }

    #[test]
    fn pixel_conversions_use_offset_and_cell_centre() {
        let config = config();
        assert_eq!(
            config.pixel_to_cell(PixelPoint::new(10.0, 20.0)),
            CellCoord::new(0, 0)
        );
        assert_eq!(
            config.pixel_to_cell(PixelPoint::new(65.0, 125.0)),
            CellCoord::new(1, 2)
        );
        assert_eq!(
            config.pixel_to_cell(PixelPoint::new(5.0, 5.0)),
            CellCoord::new(-1, -1)
        );
        assert_eq!(
            config.cell_to_pixel(CellCoord::new(1, 2)),
            PixelPoint::new(85.0, 145.0)
        );
    }

    #[test]
    fn snap_to_grid_quantises_onto_cell_centres() {
        let config = GridConfig::square(10, 10, 50.0);
        let snapped = config.snap_to_grid(PercentPoint::new(12.0, 47.0));
        assert_eq!(config.percent_to_cell(snapped), CellCoord::new(1, 4));
        assert!((snapped.x - 15.0).abs() < 1e-9);
        assert!((snapped.y - 45.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_include_trailing_partial_cells() {
        let mut config = GridConfig::square(4, 3, 10.0);
        config.map_width = 45.0;
        assert_eq!(config.columns(), 5);
        assert_eq!(config.rows(), 3);
        assert!(config.contains(CellCoord::new(4, 2)));
        assert!(!config.contains(CellCoord::new(5, 0)));
        assert!(!config.contains(CellCoord::new(0, -1)));
    }

    #[test]
    fn validation_rejects_degenerate_configurations() {
        assert_eq!(GridConfig::default().validate(), Ok(()));
        assert_eq!(
            GridConfig::default().with_feet_per_cell(0).validate(),
            Err(ConfigError::ZeroFeetPerCell)
        );
        let zero_cells = GridConfig::square(5, 5, 0.0);
        assert_eq!(
            zero_cells.validate(),
            Err(ConfigError::InvalidCellSize(0.0))
        );
        assert!(!zero_cells.is_enabled());
        assert!(!GridConfig::default()
            .with_grid_type(GridType::None)
            .is_enabled());
    }

    #[test]
    fn cells_for_feet_rounds_up() {
        let config = GridConfig::default();
        assert_eq!(config.cells_for_feet(15), 3);
        assert_eq!(config.cells_for_feet(12), 3);
        assert_eq!(config.cells_for_feet(0), 0);
    }

    #[test]
    fn grid_config_round_trips_through_bincode() {
        let config = config();
        let bytes = bincode::serialize(&config).expect("serialize");
        let restored: GridConfig = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, config);
    }
}
