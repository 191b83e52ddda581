//! # Lattice
//!
//! Anisotropic tile grid for turn-based tactics: coordinates, walkability
//! snapshots, A* pathfinding and bounded flood-fill.
//!
//! Tiles are laid out on an integer lattice, but the world-space pitch of a row
//! is only [`TILE_Y_SCALE`] of a column. Every distance in this crate is
//! measured in world space so that adjacency, heuristics and range checks all
//! agree on the same skew.
//!
//! ## Quick Start
//!
//! ```
//! use lattice::{AStar, GridCoord, PathPlanner, RangeResolver, WalkableSet};
//!
//! let tiles = (0..5).flat_map(|x| (0..5).map(move |y| GridCoord::new(x, y)));
//! let walkable = WalkableSet::build(tiles, [], None);
//!
//! let path = AStar::new().find_path(GridCoord::new(0, 0), GridCoord::new(3, 3), &walkable);
//! assert_eq!(path.last(), Some(&GridCoord::new(3, 3)));
//!
//! let reach = RangeResolver::new().find_reachable(GridCoord::new(2, 2), 1.0, |t| walkable.contains(t));
//! assert!(reach.contains(GridCoord::new(2, 2)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coord;
pub mod pathfinding;
pub mod reach;
pub mod walkable;

// Re-exports for convenience
pub use coord::{Direction, GridCoord, TILE_Y_SCALE};
pub use pathfinding::{AStar, PathError, PathPlanner};
pub use reach::{RangeResolver, ReachableSet};
pub use walkable::WalkableSet;
