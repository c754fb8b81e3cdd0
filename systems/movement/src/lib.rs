#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement reachability under tabletop terrain rules.
//!
//! A straight step costs one cell-length (5 ft on a standard grid). Diagonal
//! steps alternate between one and two cell-lengths along a path, so the
//! price of the next diagonal depends on how many diagonals the path already
//! took. Entering difficult terrain doubles the step cost, blocked cells and
//! cells outside the map are never entered, and a diagonal may not squeeze
//! past a blocked orthogonal neighbour.
//!
//! The search is Dijkstra over `(cell, diagonal parity)` states with a binary
//! heap frontier. Two paths reaching the same cell with different diagonal
//! parity are tracked separately because their future diagonals are priced
//! differently; each cell reports the cheaper of the two.

use std::{
    cmp::Reverse,
    collections::{hash_map::Entry, BinaryHeap, HashMap, HashSet},
};

use serde::{Deserialize, Serialize};
use tactical_grid_core::{
    CancelFlag, CellCoord, CellState, CellStateMap, GridConfig, GridTokenData,
};

/// Orthogonal steps first so that equal-cost ties favour straight moves.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Cell a token can reach this turn together with the cheapest way there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachableCell {
    /// Column of the reachable cell.
    pub x: i32,
    /// Row of the reachable cell.
    pub y: i32,
    /// Movement spent to reach the cell in feet.
    pub cost_feet: u32,
    /// Cells walked from the token's cell (inclusive) to this cell (inclusive).
    pub path: Vec<CellCoord>,
}

impl ReachableCell {
    /// Coordinate of the reachable cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Computes every cell the token can reach within its movement budget.
///
/// The token's own cell is not part of the result. A disabled grid or an
/// exhausted budget yields an empty list.
#[must_use]
pub fn reachable_cells(
    token: &GridTokenData,
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> Vec<ReachableCell> {
    Reachability::new().compute(
        token,
        config,
        |cell| cell_states.state(cell),
        &CancelFlag::new(),
    )
}

/// Variant of [`reachable_cells`] with a caller-provided terrain lookup and
/// cancellation flag.
///
/// The terrain closure lets callers fold zone difficult terrain into the
/// static map. When `cancel` fires the search stops between expansions and
/// returns the cells it had settled so far.
#[must_use]
pub fn reachable_cells_with<F>(
    token: &GridTokenData,
    config: &GridConfig,
    terrain: F,
    cancel: &CancelFlag,
) -> Vec<ReachableCell>
where
    F: Fn(CellCoord) -> CellState,
{
    Reachability::new().compute(token, config, terrain, cancel)
}

/// Prices an explicit path drawn by the caller.
///
/// The first cell is the token's current position. Returns `None` when the
/// grid is disabled or any step is not a legal single-cell move.
#[must_use]
pub fn path_cost(
    path: &[CellCoord],
    cell_states: &CellStateMap,
    config: &GridConfig,
) -> Option<u32> {
    if !config.is_enabled() {
        return None;
    }

    let terrain = |cell: CellCoord| cell_states.state(cell);
    let mut total: u32 = 0;
    let mut odd_diagonals = false;

    for step in path.windows(2) {
        let (from, to) = (step[0], step[1]);
        let dx = to.x() - from.x();
        let dy = to.y() - from.y();
        if from.chebyshev_distance(to) != 1 {
            return None;
        }

        let cost = step_cost(from, dx, dy, odd_diagonals, config, &terrain)?;
        total = total.checked_add(cost)?;
        if dx != 0 && dy != 0 {
            odd_diagonals = !odd_diagonals;
        }
    }

    Some(total)
}

/// Reachability search that reuses its scratch buffers between queries.
#[derive(Debug, Default)]
pub struct Reachability {
    nodes: Vec<SearchNode>,
    frontier: BinaryHeap<Reverse<(u32, usize)>>,
    best: HashMap<StateKey, u32>,
    settled: HashSet<StateKey>,
    cheapest: HashMap<CellCoord, usize>,
}

impl Reachability {
    /// Creates a search with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the search for `token` over the provided terrain.
    pub fn compute<F>(
        &mut self,
        token: &GridTokenData,
        config: &GridConfig,
        terrain: F,
        cancel: &CancelFlag,
    ) -> Vec<ReachableCell>
    where
        F: Fn(CellCoord) -> CellState,
    {
        self.reset();

        let budget = token.movement_remaining;
        if !config.is_enabled() || budget == 0 {
            return Vec::new();
        }

        let start = token.cell();
        self.push(start, None, 0, false);

        while let Some(Reverse((cost, index))) = self.frontier.pop() {
            if cancel.is_cancelled() {
                tracing::trace!(
                    token = token.id.get(),
                    settled = self.settled.len(),
                    "reachability search cancelled"
                );
                break;
            }

            let node = self.nodes[index];
            let key = node.key();
            if !self.settled.insert(key) {
                continue;
            }

            if node.cell != start {
                if let Entry::Vacant(slot) = self.cheapest.entry(node.cell) {
                    let _ = slot.insert(index);
                }
            }

            for (dx, dy) in NEIGHBOR_OFFSETS {
                let next = node.cell.offset(dx, dy);
                let Some(step) =
                    step_cost(node.cell, dx, dy, node.odd_diagonals, config, &terrain)
                else {
                    continue;
                };
                let Some(next_cost) = cost.checked_add(step) else {
                    continue;
                };
                if next_cost > budget {
                    continue;
                }

                let odd_diagonals = if dx != 0 && dy != 0 {
                    !node.odd_diagonals
                } else {
                    node.odd_diagonals
                };
                let next_key = StateKey {
                    cell: next,
                    odd_diagonals,
                };
                if self.settled.contains(&next_key) {
                    continue;
                }
                if self
                    .best
                    .get(&next_key)
                    .is_some_and(|&known| known <= next_cost)
                {
                    continue;
                }

                self.push(next, Some(index), next_cost, odd_diagonals);
            }
        }

        let mut reachable: Vec<ReachableCell> = self
            .cheapest
            .iter()
            .map(|(&cell, &index)| ReachableCell {
                x: cell.x(),
                y: cell.y(),
                cost_feet: self.nodes[index].cost,
                path: self.path_to(index),
            })
            .collect();
        reachable.sort_by_key(|cell| (cell.cost_feet, cell.y, cell.x));

        tracing::debug!(
            token = token.id.get(),
            budget,
            expanded = self.settled.len(),
            reachable = reachable.len(),
            "computed reachable cells"
        );

        reachable
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.frontier.clear();
        self.best.clear();
        self.settled.clear();
        self.cheapest.clear();
    }

    fn push(&mut self, cell: CellCoord, parent: Option<usize>, cost: u32, odd_diagonals: bool) {
        let node = SearchNode {
            cell,
            parent,
            cost,
            odd_diagonals,
        };
        let index = self.nodes.len();
        self.nodes.push(node);
        let _ = self.best.insert(node.key(), cost);
        self.frontier.push(Reverse((cost, index)));
    }

    fn path_to(&self, index: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            let node = self.nodes[current];
            path.push(node.cell);
            cursor = node.parent;
        }
        path.reverse();
        path
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct StateKey {
    cell: CellCoord,
    odd_diagonals: bool,
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    cell: CellCoord,
    parent: Option<usize>,
    cost: u32,
    odd_diagonals: bool,
}

impl SearchNode {
    fn key(self) -> StateKey {
        StateKey {
            cell: self.cell,
            odd_diagonals: self.odd_diagonals,
        }
    }
}

/// Cost of stepping from `from` by `(dx, dy)`, or `None` if the step is illegal.
///
/// `odd_diagonals` records whether the path so far took an odd number of
/// diagonals, in which case the next diagonal is the expensive one.
fn step_cost<F>(
    from: CellCoord,
    dx: i32,
    dy: i32,
    odd_diagonals: bool,
    config: &GridConfig,
    terrain: &F,
) -> Option<u32>
where
    F: Fn(CellCoord) -> CellState,
{
    let to = from.offset(dx, dy);
    if !config.contains(to) {
        return None;
    }

    let destination = terrain(to);
    if !destination.is_walkable() {
        return None;
    }

    let diagonal = dx != 0 && dy != 0;
    if diagonal {
        let squeezed = !terrain(from.offset(dx, 0)).is_walkable()
            || !terrain(from.offset(0, dy)).is_walkable();
        if squeezed {
            return None;
        }
    }

    let cell_lengths: u32 = if diagonal && odd_diagonals { 2 } else { 1 };
    cell_lengths
        .checked_mul(config.feet_per_cell)?
        .checked_mul(destination.movement_multiplier())
}
