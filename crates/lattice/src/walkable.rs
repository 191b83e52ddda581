//! Per-query walkability snapshot.
//!
//! A [`WalkableSet`] is rebuilt from the live battlefield every time a move or
//! attack begins: start from the map's tiles, drop every tile some other unit
//! stands on, then force the mover's own tile back in so that the search has a
//! valid start. It is never cached across turns.

use std::collections::HashSet;

use crate::coord::GridCoord;

/// Set of tiles a mover may currently step on.
///
/// # Note on `HashSet` Usage
///
/// Searches only test membership, so the non-deterministic iteration order of
/// `HashSet` never leaks into results. [`WalkableSet::iter_sorted`] is
/// available where an ordered view is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkableSet {
    tiles: HashSet<GridCoord>,
}

impl WalkableSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the snapshot for a single query.
    ///
    /// # Arguments
    ///
    /// * `tiles` - Every tile that exists on the map
    /// * `occupied` - Tiles blocked by units or obstacles
    /// * `mover` - The acting unit's own tile, always included
    #[must_use]
    pub fn build(
        tiles: impl IntoIterator<Item = GridCoord>,
        occupied: impl IntoIterator<Item = GridCoord>,
        mover: Option<GridCoord>,
    ) -> Self {
        let mut set: HashSet<GridCoord> = tiles.into_iter().collect();
        for tile in occupied {
            set.remove(&tile);
        }
        if let Some(own) = mover {
            set.insert(own);
        }
        Self { tiles: set }
    }

    /// Returns `true` if `tile` can be stepped on.
    #[must_use]
    pub fn contains(&self, tile: GridCoord) -> bool {
        self.tiles.contains(&tile)
    }

    /// Adds a tile. Returns `true` if it was not present.
    pub fn insert(&mut self, tile: GridCoord) -> bool {
        self.tiles.insert(tile)
    }

    /// Removes a tile. Returns `true` if it was present.
    pub fn remove(&mut self, tile: GridCoord) -> bool {
        self.tiles.remove(&tile)
    }

    /// Number of walkable tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns `true` if nothing is walkable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterates in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.tiles.iter().copied()
    }

    /// Returns the tiles sorted by coordinate.
    #[must_use]
    pub fn iter_sorted(&self) -> Vec<GridCoord> {
        let mut tiles: Vec<_> = self.iter().collect();
        tiles.sort();
        tiles
    }
}

impl FromIterator<GridCoord> for WalkableSet {
    fn from_iter<I: IntoIterator<Item = GridCoord>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: i32) -> impl Iterator<Item = GridCoord> {
        (0..size).flat_map(move |x| (0..size).map(move |y| GridCoord::new(x, y)))
    }

    #[test]
    fn build_removes_occupied_tiles() {
        let set = WalkableSet::build(square(3), [GridCoord::new(1, 1)], None);
        assert_eq!(set.len(), 8);
        assert!(!set.contains(GridCoord::new(1, 1)));
    }

    #[test]
    fn mover_tile_is_forced_in() {
        let own = GridCoord::new(1, 1);
        let set = WalkableSet::build(square(3), [own], Some(own));
        assert!(set.contains(own));
        assert_eq!(set.len(), 9);
    }

    #[test]
    fn mover_off_map_is_still_included() {
        let own = GridCoord::new(-5, -5);
        let set = WalkableSet::build(square(2), [], Some(own));
        assert!(set.contains(own));
    }

    #[test]
    fn sorted_view_is_ordered() {
        let set: WalkableSet = [GridCoord::new(2, 0), GridCoord::new(0, 1), GridCoord::new(0, 0)]
            .into_iter()
            .collect();
        assert_eq!(
            set.iter_sorted(),
            vec![GridCoord::new(0, 0), GridCoord::new(0, 1), GridCoord::new(2, 0)]
        );
    }

    #[test]
    fn insert_and_remove_report_changes() {
        let mut set = WalkableSet::new();
        assert!(set.is_empty());
        assert!(set.insert(GridCoord::new(0, 0)));
        assert!(!set.insert(GridCoord::new(0, 0)));
        assert!(set.remove(GridCoord::new(0, 0)));
        assert!(!set.remove(GridCoord::new(0, 0)));
    }
}
