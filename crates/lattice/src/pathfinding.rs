//! A* pathfinding over the anisotropic grid.
//!
//! The search walks 8 directions. Orthogonal and diagonal steps cost the same
//! (1 each, not √2), while the heuristic is the Euclidean world-space distance
//! to the goal. Because a skewed diagonal spans more than one world unit, the
//! heuristic can overestimate, so in rare diagonal-heavy layouts the returned
//! path may be one step longer than optimal. This is kept as-is; use
//! [`AStar::with_step_costs`] if another cost table is wanted.
//!
//! # Tie-breaking
//!
//! The open set is an insertion-ordered list. Among nodes with equal f-cost the
//! one inserted first wins, and neighbors are inserted in [`Direction::ALL`]
//! order, so results are fully deterministic.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::{Direction, GridCoord};
use crate::walkable::WalkableSet;

/// Reasons a path search produced nothing.
///
/// Neither is fatal: callers degrade to "the move does not happen".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// Start or goal is not in the walkable set.
    #[error("invalid endpoint: start {start} or goal {goal} is not walkable")]
    InvalidEndpoint {
        /// Search origin
        start: GridCoord,
        /// Search target
        goal: GridCoord,
    },
    /// The open set was exhausted before reaching the goal.
    #[error("no path from {start} to {goal}")]
    PathNotFound {
        /// Search origin
        start: GridCoord,
        /// Search target
        goal: GridCoord,
    },
}

/// Path search over a [`WalkableSet`].
///
/// Schedulers hold a `Box<dyn PathPlanner>` so the search strategy is injected
/// rather than looked up.
///
/// # Example
///
/// ```
/// use lattice::{AStar, GridCoord, PathPlanner, WalkableSet};
///
/// let walkable: WalkableSet = (0..4).map(|x| GridCoord::new(x, 0)).collect();
/// let planner: Box<dyn PathPlanner> = Box::new(AStar::new());
///
/// let path = planner.find_path(GridCoord::new(0, 0), GridCoord::new(3, 0), &walkable);
/// assert_eq!(path, vec![GridCoord::new(1, 0), GridCoord::new(2, 0), GridCoord::new(3, 0)]);
/// ```
pub trait PathPlanner: Send + Sync {
    /// Finds a path from `start` to `goal`.
    ///
    /// The returned sequence excludes `start` and ends with `goal`. When
    /// `start == goal` the path is empty.
    ///
    /// # Errors
    ///
    /// - [`PathError::InvalidEndpoint`] if either endpoint is not walkable
    /// - [`PathError::PathNotFound`] if the goal is unreachable
    fn try_find_path(
        &self,
        start: GridCoord,
        goal: GridCoord,
        walkable: &WalkableSet,
    ) -> Result<Vec<GridCoord>, PathError>;

    /// Like [`PathPlanner::try_find_path`] but logs failures and returns an
    /// empty path instead.
    fn find_path(&self, start: GridCoord, goal: GridCoord, walkable: &WalkableSet) -> Vec<GridCoord> {
        match self.try_find_path(start, goal, walkable) {
            Ok(path) => path,
            Err(err) => {
                warn!(%start, %goal, error = %err, "path search failed");
                Vec::new()
            }
        }
    }

    /// Total cost of walking `path` starting from `start`.
    fn path_cost(&self, start: GridCoord, path: &[GridCoord]) -> f32;
}

// =============================================================================
// AStar
// =============================================================================

/// Classic A* with a configurable orthogonal/diagonal step cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AStar {
    orthogonal_cost: f32,
    diagonal_cost: f32,
}

impl Default for AStar {
    fn default() -> Self {
        Self::new()
    }
}

impl AStar {
    /// Step cost for both orthogonal and diagonal moves.
    pub const STEP_COST: f32 = 1.0;

    /// Creates a planner where every step costs [`AStar::STEP_COST`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            orthogonal_cost: Self::STEP_COST,
            diagonal_cost: Self::STEP_COST,
        }
    }

    /// Creates a planner with a custom cost table.
    #[must_use]
    pub const fn with_step_costs(orthogonal_cost: f32, diagonal_cost: f32) -> Self {
        Self {
            orthogonal_cost,
            diagonal_cost,
        }
    }

    /// Cost of one step in `direction`.
    #[must_use]
    pub const fn step_cost(&self, direction: Direction) -> f32 {
        if direction.is_diagonal() {
            self.diagonal_cost
        } else {
            self.orthogonal_cost
        }
    }

    fn heuristic(node: GridCoord, goal: GridCoord) -> f32 {
        node.world_distance(goal)
    }

    /// Index of the first open node with strictly lowest f-cost.
    fn lowest_f_index(open: &[GridCoord], f_cost: &HashMap<GridCoord, f32>) -> usize {
        let cost = |node: &GridCoord| f_cost.get(node).copied().unwrap_or(f32::INFINITY);
        let mut best = 0;
        let mut best_cost = cost(&open[0]);
        for (idx, node) in open.iter().enumerate().skip(1) {
            let node_cost = cost(node);
            if node_cost < best_cost {
                best = idx;
                best_cost = node_cost;
            }
        }
        best
    }

    fn reconstruct_path(
        came_from: &HashMap<GridCoord, GridCoord>,
        mut current: GridCoord,
    ) -> Vec<GridCoord> {
        let mut path = Vec::new();
        while let Some(&prev) = came_from.get(&current) {
            path.push(current);
            current = prev;
        }
        path.reverse();
        path
    }

    fn direction_between(from: GridCoord, to: GridCoord) -> Option<Direction> {
        let delta = (to.x - from.x, to.y - from.y);
        Direction::ALL.into_iter().find(|dir| dir.offset() == delta)
    }
}

impl PathPlanner for AStar {
    fn try_find_path(
        &self,
        start: GridCoord,
        goal: GridCoord,
        walkable: &WalkableSet,
    ) -> Result<Vec<GridCoord>, PathError> {
        if !walkable.contains(start) || !walkable.contains(goal) {
            return Err(PathError::InvalidEndpoint { start, goal });
        }

        let mut open: Vec<GridCoord> = vec![start];
        let mut in_open: HashSet<GridCoord> = HashSet::from([start]);
        let mut closed: HashSet<GridCoord> = HashSet::new();
        let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut g_cost: HashMap<GridCoord, f32> = HashMap::new();
        let mut f_cost: HashMap<GridCoord, f32> = HashMap::new();

        g_cost.insert(start, 0.0);
        f_cost.insert(start, Self::heuristic(start, goal));

        while !open.is_empty() {
            let idx = Self::lowest_f_index(&open, &f_cost);
            let current = open[idx];

            if current == goal {
                let path = Self::reconstruct_path(&came_from, current);
                debug!(%start, %goal, steps = path.len(), expanded = closed.len(), "path found");
                return Ok(path);
            }

            open.remove(idx);
            in_open.remove(&current);
            closed.insert(current);

            let current_g = g_cost.get(&current).copied().unwrap_or(f32::INFINITY);

            for direction in Direction::ALL {
                let neighbor = current.step(direction);
                if !walkable.contains(neighbor) || closed.contains(&neighbor) {
                    continue;
                }

                let tentative_g = current_g + self.step_cost(direction);
                if in_open.insert(neighbor) {
                    open.push(neighbor);
                } else if tentative_g >= g_cost.get(&neighbor).copied().unwrap_or(f32::INFINITY) {
                    continue;
                }

                came_from.insert(neighbor, current);
                g_cost.insert(neighbor, tentative_g);
                f_cost.insert(neighbor, tentative_g + Self::heuristic(neighbor, goal));
            }
        }

        Err(PathError::PathNotFound { start, goal })
    }

    fn path_cost(&self, start: GridCoord, path: &[GridCoord]) -> f32 {
        let mut total = 0.0;
        let mut previous = start;
        for &tile in path {
            total += match Self::direction_between(previous, tile) {
                Some(direction) => self.step_cost(direction),
                None => f32::INFINITY,
            };
            previous = tile;
        }
        total
    }
}
