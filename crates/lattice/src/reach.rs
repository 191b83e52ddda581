//! Bounded-cost flood-fill for range queries.
//!
//! [`RangeResolver`] answers "which tiles lie within `max_cost` of here?" for
//! both attack-range highlighting and movement-range previews. It expands
//! breadth-first from a single seed, admitting a tile the first time it is
//! reached within budget. Orthogonal steps cost 1 and diagonal steps 1.4.
//!
//! The diagonal cost differs from the pathfinder, where every step costs 1.
//! Both tables are kept as they are; a range preview therefore can show fewer
//! diagonal tiles than the pathfinder would actually reach.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::coord::{Direction, GridCoord};

/// Result of a flood-fill: every admitted tile and the cost it was admitted at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReachableSet {
    costs: BTreeMap<GridCoord, f32>,
}

impl ReachableSet {
    /// Returns `true` if `tile` was admitted.
    #[must_use]
    pub fn contains(&self, tile: GridCoord) -> bool {
        self.costs.contains_key(&tile)
    }

    /// Cumulative cost at which `tile` was admitted.
    #[must_use]
    pub fn cost_of(&self, tile: GridCoord) -> Option<f32> {
        self.costs.get(&tile).copied()
    }

    /// Number of admitted tiles (origin included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Always `false` for a set produced by [`RangeResolver::find_reachable`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Iterates admitted tiles in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.costs.keys().copied()
    }

    /// Iterates `(tile, cost)` pairs in coordinate order.
    pub fn iter_costs(&self) -> impl Iterator<Item = (GridCoord, f32)> + '_ {
        self.costs.iter().map(|(tile, cost)| (*tile, *cost))
    }
}

/// Breadth-first flood-fill with a per-direction cost table.
///
/// # Example
///
/// ```
/// use lattice::{GridCoord, RangeResolver};
///
/// let reach = RangeResolver::new().find_reachable(GridCoord::new(0, 0), 1.0, |_| true);
///
/// // Orthogonal neighbors cost 1, diagonals 1.4.
/// assert_eq!(reach.len(), 5);
/// assert!(!reach.contains(GridCoord::new(1, 1)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeResolver {
    orthogonal_cost: f32,
    diagonal_cost: f32,
}

impl Default for RangeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeResolver {
    /// Cost of an orthogonal step.
    pub const ORTHOGONAL_COST: f32 = 1.0;
    /// Cost of a diagonal step.
    pub const DIAGONAL_COST: f32 = 1.4;

    /// Creates a resolver with the standard 1 / 1.4 cost table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            orthogonal_cost: Self::ORTHOGONAL_COST,
            diagonal_cost: Self::DIAGONAL_COST,
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

    /// Collects every tile reachable from `origin` within `max_cost`.
    ///
    /// `test` is the external tile check: map existence for attack ranges,
    /// walkability for movement previews. The origin is admitted without being
    /// tested.
    ///
    /// Tiles are admitted on first contact and the queue is strictly FIFO, so
    /// the recorded cost is the cost along the first breadth-first route found.
    #[must_use]
    pub fn find_reachable(
        &self,
        origin: GridCoord,
        max_cost: f32,
        test: impl Fn(GridCoord) -> bool,
    ) -> ReachableSet {
        let mut costs = BTreeMap::new();
        let mut queue = VecDeque::new();

        costs.insert(origin, 0.0);
        queue.push_back((origin, 0.0_f32));

        while let Some((current, current_cost)) = queue.pop_front() {
            for direction in Direction::ALL {
                let neighbor = current.step(direction);
                let cost = current_cost + self.step_cost(direction);

                if cost <= max_cost && !costs.contains_key(&neighbor) && test(neighbor) {
                    costs.insert(neighbor, cost);
                    queue.push_back((neighbor, cost));
                }
            }
        }

        trace!(%origin, max_cost, admitted = costs.len(), "flood-fill complete");
        ReachableSet { costs }
    }
}
