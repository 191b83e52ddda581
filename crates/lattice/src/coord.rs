//! Grid coordinates and the anisotropic tile metric.
//!
//! A [`GridCoord`] names a tile by integer column and row. Its world-space
//! position is `(x, y * TILE_Y_SCALE)`: rows are packed tighter than columns,
//! which is what makes the grid look skewed on screen. Snapping a continuous
//! position back to a tile must divide by the same scale, otherwise a unit
//! standing on row 3 would be reported on row 2 and adjacency breaks.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Vertical cell pitch as a fraction of the horizontal pitch.
pub const TILE_Y_SCALE: f32 = 0.5625;

// =============================================================================
// GridCoord
// =============================================================================

/// Integer tile coordinate.
///
/// Ordering is lexicographic on `(x, y)`, which gives sets and maps of
/// coordinates a stable iteration order.
///
/// # Example
///
/// ```
/// use lattice::{GridCoord, TILE_Y_SCALE};
/// use glam::Vec2;
///
/// let tile = GridCoord::new(2, 4);
/// assert_eq!(tile.to_world(), Vec2::new(2.0, 4.0 * TILE_Y_SCALE));
/// assert_eq!(GridCoord::from_world(tile.to_world()), tile);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column index.
    pub x: i32,
    /// Row index (scaled by [`TILE_Y_SCALE`] in world space).
    pub y: i32,
}

impl GridCoord {
    /// Creates a coordinate from column and row.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the world-space center of this tile.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_world(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32 * TILE_Y_SCALE)
    }

    /// Snaps a world-space position to the tile containing it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_world(position: Vec2) -> Self {
        Self {
            x: position.x.round() as i32,
            y: (position.y / TILE_Y_SCALE).round() as i32,
        }
    }

    /// Euclidean distance between tile centers in world space.
    #[must_use]
    pub fn world_distance(self, other: Self) -> f32 {
        self.to_world().distance(other.to_world())
    }

    /// Returns the tile one step away in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Returns all 8 neighbors in [`Direction::ALL`] order.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        Direction::ALL.into_iter().map(move |dir| self.step(dir))
    }

    /// Returns the 4 orthogonal neighbors in [`Direction::ORTHOGONAL`] order.
    pub fn orthogonal_neighbors(self) -> impl Iterator<Item = Self> {
        Direction::ORTHOGONAL.into_iter().map(move |dir| self.step(dir))
    }

    /// Chebyshev distance in tile steps, ignoring the world-space skew.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl fmt::Debug for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

// =============================================================================
// Direction
// =============================================================================

/// One of the 8 grid directions.
///
/// The declaration order is also the neighbor scan order used by both the
/// pathfinder and the flood-fill. Search results depend on it, so it must not
/// be reshuffled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +x
    East,
    /// -x
    West,
    /// +y
    North,
    /// -y
    South,
    /// +x +y
    NorthEast,
    /// +x -y
    SouthEast,
    /// -x +y
    NorthWest,
    /// -x -y
    SouthWest,
}

impl Direction {
    /// All directions, orthogonal first.
    pub const ALL: [Self; 8] = [
        Self::East,
        Self::West,
        Self::North,
        Self::South,
        Self::NorthEast,
        Self::SouthEast,
        Self::NorthWest,
        Self::SouthWest,
    ];

    /// The 4 orthogonal directions.
    pub const ORTHOGONAL: [Self; 4] = [Self::East, Self::West, Self::North, Self::South];

    /// Tile offset `(dx, dy)` of one step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::NorthEast => (1, 1),
            Self::SouthEast => (1, -1),
            Self::NorthWest => (-1, 1),
            Self::SouthWest => (-1, -1),
        }
    }

    /// Returns `true` for the 4 diagonal directions.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::NorthEast | Self::SouthEast | Self::NorthWest | Self::SouthWest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod world_space_tests {
        use super::*;

        #[test]
        fn row_pitch_is_scaled() {
            let tile = GridCoord::new(0, 1);
            assert!((tile.to_world().y - 0.5625).abs() < f32::EPSILON);
        }

        #[test]
        fn snapping_round_trips_every_tile() {
            for x in -4..5 {
                for y in -4..5 {
                    let tile = GridCoord::new(x, y);
                    assert_eq!(GridCoord::from_world(tile.to_world()), tile);
                }
            }
        }

        #[test]
        fn snapping_uses_nearest_row() {
            // 0.8 / 0.5625 = 1.42 -> row 1
            assert_eq!(GridCoord::from_world(Vec2::new(0.4, 0.8)), GridCoord::new(0, 1));
            // 0.9 / 0.5625 = 1.6 -> row 2
            assert_eq!(GridCoord::from_world(Vec2::new(0.6, 0.9)), GridCoord::new(1, 2));
        }

        #[test]
        fn horizontal_distance_is_unscaled() {
            let d = GridCoord::new(0, 0).world_distance(GridCoord::new(3, 0));
            assert!((d - 3.0).abs() < 1e-6);
        }

        #[test]
        fn vertical_distance_is_scaled() {
            let d = GridCoord::new(0, 0).world_distance(GridCoord::new(0, 4));
            assert!((d - 2.25).abs() < 1e-6);
        }

        #[test]
        fn diagonal_distance_uses_skew() {
            let d = GridCoord::new(0, 0).world_distance(GridCoord::new(1, 1));
            let expected = (1.0f32 + TILE_Y_SCALE * TILE_Y_SCALE).sqrt();
            assert!((d - expected).abs() < 1e-6);
        }
    }

    mod direction_tests {
        use super::*;

        #[test]
        fn scan_order_is_orthogonal_first() {
            assert!(Direction::ALL[..4].iter().all(|d| !d.is_diagonal()));
            assert!(Direction::ALL[4..].iter().all(|d| d.is_diagonal()));
        }

        #[test]
        fn neighbors_are_distinct_and_adjacent() {
            let origin = GridCoord::new(5, 5);
            let neighbors: Vec<_> = origin.neighbors().collect();
            assert_eq!(neighbors.len(), 8);
            for n in &neighbors {
                assert_eq!(origin.chebyshev(*n), 1);
            }
            let mut dedup = neighbors.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), 8);
        }

        #[test]
        fn orthogonal_neighbors_follow_scan_order() {
            let got: Vec<_> = GridCoord::new(0, 0).orthogonal_neighbors().collect();
            assert_eq!(
                got,
                vec![
                    GridCoord::new(1, 0),
                    GridCoord::new(-1, 0),
                    GridCoord::new(0, 1),
                    GridCoord::new(0, -1),
                ]
            );
        }
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", GridCoord::new(3, -2)), "(3, -2)");
    }

    #[test]
    fn serialization_roundtrip() {
        let tile = GridCoord::new(7, 11);
        let json = serde_json::to_string(&tile).unwrap();
        let back: GridCoord = serde_json::from_str(&json).unwrap();
        assert_eq!(tile, back);
    }
}
