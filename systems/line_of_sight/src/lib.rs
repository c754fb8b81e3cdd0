#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cell-to-cell line of sight.
//!
//! Lines are traced with Bresenham's algorithm between cell indices. Only the
//! cells strictly between the endpoints can obstruct sight, and only blocked
//! cells do; difficult terrain slows movement but never hides anything.

use serde::{Deserialize, Serialize};
use tactical_grid_core::{CancelFlag, CellCoord, CellStateMap, GridConfig};

/// Outcome of tracing sight from one cell to another.
///
/// On an enabled grid `blocking_cell` is set exactly when
/// `has_line_of_sight` is false, and `path_cells` runs from the observer to
/// the observed cell. A disabled grid breaks both: it yields the default
/// value, with no sight, no blocker and an empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineOfSight {
    /// Whether no intermediate cell blocks sight.
    pub has_line_of_sight: bool,
    /// Every cell on the traced line, endpoints included.
    pub path_cells: Vec<CellCoord>,
    /// First intermediate cell that blocks sight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_cell: Option<CellCoord>,
}

/// Traces sight from `from` to `to`.
///
/// A disabled grid reports no sight and an empty path.
#[must_use]
pub fn line_of_sight(
    from: CellCoord,
    to: CellCoord,
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> LineOfSight {
    if !config.is_enabled() {
        return LineOfSight::default();
    }

    let path_cells: Vec<CellCoord> = BresenhamLine::new(from, to).collect();
    let interior = path_cells.len().saturating_sub(2);
    let blocking_cell = path_cells
        .iter()
        .skip(1)
        .take(interior)
        .copied()
        .find(|&cell| cell_states.state(cell).blocks_sight());

    LineOfSight {
        has_line_of_sight: blocking_cell.is_none(),
        path_cells,
        blocking_cell,
    }
}

/// Boolean form of [`line_of_sight`].
#[must_use]
pub fn has_line_of_sight(
    from: CellCoord,
    to: CellCoord,
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> bool {
    if !config.is_enabled() {
        return false;
    }

    let mut line = BresenhamLine::new(from, to);
    let _ = line.next();
    line.take_while(|&cell| cell != to)
        .all(|cell| !cell_states.state(cell).blocks_sight())
}

/// Cells within `range_cells` of `origin` that `origin` can see.
///
/// The range is a circle measured between cell indices. The origin itself is
/// always visible. Cells are returned row by row.
#[must_use]
pub fn visible_cells(
    origin: CellCoord,
    range_cells: u32,
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> Vec<CellCoord> {
    visible_cells_with_cancel(origin, range_cells, cell_states, config, &CancelFlag::new())
}

/// Variant of [`visible_cells`] that stops tracing once `cancel` fires and
/// returns the cells confirmed visible so far.
#[must_use]
pub fn visible_cells_with_cancel(
    origin: CellCoord,
    range_cells: u32,
    cell_states: &CellStateMap,
    config: &GridConfig,
    cancel: &CancelFlag,
) -> Vec<CellCoord> {
    if !config.is_enabled() {
        return Vec::new();
    }

    scan_visible(origin, range_cells, config, cancel, |cell| {
        has_line_of_sight(origin, cell, cell_states, config)
    })
}

fn scan_visible<F>(
    origin: CellCoord,
    range_cells: u32,
    config: &GridConfig,
    cancel: &CancelFlag,
    mut sees: F,
) -> Vec<CellCoord>
where
    F: FnMut(CellCoord) -> bool,
{

    let range = i32::try_from(range_cells).unwrap_or(i32::MAX);
    let range_squared = i64::from(range) * i64::from(range);
    let min_x = origin.x().saturating_sub(range).max(0);
    let max_x = origin.x().saturating_add(range).min(config.columns() - 1);
    let min_y = origin.y().saturating_sub(range).max(0);
    let max_y = origin.y().saturating_add(range).min(config.rows() - 1);

    let mut visible = Vec::new();
    let mut traced = 0usize;
    'rows: for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = i64::from(x) - i64::from(origin.x());
            let dy = i64::from(y) - i64::from(origin.y());
            if dx * dx + dy * dy > range_squared {
                continue;
            }

            if cancel.is_cancelled() {
                tracing::trace!(origin = %origin, traced, "visibility scan cancelled");
                break 'rows;
            }

            let cell = CellCoord::new(x, y);
            traced += 1;
            if sees(cell) {
                visible.push(cell);
            }
        }
    }

    tracing::debug!(
        origin = %origin,
        range_cells,
        traced,
        visible = visible.len(),
        "computed visible cells"
    );
    visible
}

/// Iterator over the cells of a Bresenham line, both endpoints included.
#[derive(Clone, Debug)]
pub struct BresenhamLine {
    current: CellCoord,
    end: CellCoord,
    dx: i64,
    dy: i64,
    step_x: i32,
    step_y: i32,
    error: i64,
    done: bool,
}

impl BresenhamLine {
    /// Starts a line at `from` heading to `to`.
    #[must_use]
    pub fn new(from: CellCoord, to: CellCoord) -> Self {
        let dx = (i64::from(to.x()) - i64::from(from.x())).abs();
        let dy = (i64::from(to.y()) - i64::from(from.y())).abs();
        Self {
            current: from,
            end: to,
            dx,
            dy,
            step_x: if from.x() < to.x() { 1 } else { -1 },
            step_y: if from.y() < to.y() { 1 } else { -1 },
            error: dx - dy,
            done: false,
        }
    }
}

impl Iterator for BresenhamLine {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let cell = self.current;
        if cell == self.end {
            self.done = true;
            return Some(cell);
        }

        let doubled = 2 * self.error;
        let mut step_x = 0;
        let mut step_y = 0;
        if doubled > -self.dy {
            self.error -= self.dy;
            step_x = self.step_x;
        }
        if doubled < self.dx {
            self.error += self.dx;
            step_y = self.step_y;
        }
        self.current = cell.offset(step_x, step_y);

        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(from: (i32, i32), to: (i32, i32)) -> Vec<(i32, i32)> {
        BresenhamLine::new(CellCoord::new(from.0, from.1), CellCoord::new(to.0, to.1))
            .map(|cell| (cell.x(), cell.y()))
            .collect()
    }

    #[test]
    fn horizontal_and_vertical_lines() {
        assert_eq!(line((0, 0), (3, 0)), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(line((2, 3), (2, 0)), vec![(2, 3), (2, 2), (2, 1), (2, 0)]);
    }

    #[test]
    fn diagonal_line_steps_both_axes() {
        assert_eq!(line((0, 0), (3, 3)), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn shallow_line_has_no_gaps() {
        let cells = line((0, 0), (5, 2));
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(5, 2)));
        assert_eq!(cells.len(), 6);
        for pair in cells.windows(2) {
            assert!((pair[1].0 - pair[0].0).abs() <= 1);
            assert!((pair[1].1 - pair[0].1).abs() <= 1);
        }
    }

    #[test]
    fn single_cell_line() {
        assert_eq!(line((4, 4), (4, 4)), vec![(4, 4)]);
    }

    #[test]
    fn scan_cancelled_midway_keeps_confirmed_cells() {
        let config = GridConfig::square(9, 9, 50.0);
        let origin = CellCoord::new(4, 4);
        let full = visible_cells(origin, 3, &CellStateMap::new(), &config);

        let cancel = CancelFlag::new();
        let mut traced = 0;
        let partial = scan_visible(origin, 3, &config, &cancel, |_| {
            traced += 1;
            if traced == 10 {
                cancel.cancel();
            }
            true
        });

        assert_eq!(traced, 10);
        assert_eq!(partial.len(), 10);
        assert!(full.len() > partial.len());
        assert_eq!(partial[..], full[..10]);
    }
}
