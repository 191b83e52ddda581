//! Battlefield snapshot: map tiles plus the units standing on them.
//!
//! Units are stored in a `BTreeMap` keyed by [`UnitId`] so every scan runs in
//! id order. Destroyed units stay in the map for reporting but no longer act
//! or block tiles.
//!
//! Walkability is never stored. [`Battlefield::walkable_for`] recomputes it
//! from current positions on every call.

use std::collections::{BTreeMap, BTreeSet};

use lattice::{GridCoord, WalkableSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::unit::{Faction, Unit, UnitId};

// =============================================================================
// TileMap
// =============================================================================

/// The set of tiles that exist on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    tiles: BTreeSet<GridCoord>,
}

impl TileMap {
    /// A `width x height` rectangle anchored at `(0, 0)`.
    #[must_use]
    pub fn rectangular(width: i32, height: i32) -> Self {
        (0..width)
            .flat_map(|x| (0..height).map(move |y| GridCoord::new(x, y)))
            .collect()
    }

    /// Removes obstacle tiles from the map.
    #[must_use]
    pub fn with_obstacles(mut self, obstacles: impl IntoIterator<Item = GridCoord>) -> Self {
        for tile in obstacles {
            self.tiles.remove(&tile);
        }
        self
    }

    /// Returns `true` if `tile` is part of the map.
    #[must_use]
    pub fn contains(&self, tile: GridCoord) -> bool {
        self.tiles.contains(&tile)
    }

    /// Iterates tiles in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.tiles.iter().copied()
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns `true` if the map has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl FromIterator<GridCoord> for TileMap {
    fn from_iter<I: IntoIterator<Item = GridCoord>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Battlefield
// =============================================================================

/// Map and units.
///
/// # Example
///
/// ```
/// use gridwar_core::{Attributes, Battlefield, Control, Faction, TileMap, Unit, UnitStats, WeaponTemplate};
/// use lattice::GridCoord;
///
/// let mut field = Battlefield::new(TileMap::rectangular(4, 4));
/// let id = field.spawn(Unit::new(
///     "scout", Faction::Ally, Control::Controllable, GridCoord::new(1, 1),
///     Attributes::default(), UnitStats::default(), WeaponTemplate::pistol().instantiate(),
/// ));
///
/// let walkable = field.walkable_for(id).unwrap();
/// assert!(walkable.contains(GridCoord::new(1, 1)));
/// assert_eq!(walkable.len(), 16);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battlefield {
    map: TileMap,
    units: BTreeMap<UnitId, Unit>,
    next_id: u64,
}

impl Battlefield {
    /// Creates an empty battlefield over `map`.
    #[must_use]
    pub fn new(map: TileMap) -> Self {
        Self {
            map,
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// The map.
    #[must_use]
    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Adds a fully initialized unit and assigns it the next id.
    pub fn spawn(&mut self, mut unit: Unit) -> UnitId {
        let id = UnitId::new(self.next_id.max(1));
        self.next_id = id.as_u64() + 1;
        unit.id = id;
        debug!(unit = %id, name = %unit.name, faction = %unit.faction, position = %unit.position, "unit spawned");
        self.units.insert(id, unit);
        id
    }

    /// Looks up a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Looks up a unit mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Borrows two distinct units mutably, in argument order.
    #[must_use]
    pub fn pair_mut(&mut self, first: UnitId, second: UnitId) -> Option<(&mut Unit, &mut Unit)> {
        if first == second {
            return None;
        }
        let mut a = None;
        let mut b = None;
        for (id, unit) in &mut self.units {
            if *id == first {
                a = Some(unit);
            } else if *id == second {
                b = Some(unit);
            }
        }
        a.zip(b)
    }

    /// Number of units, destroyed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if no unit was ever spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units in id order.
    pub fn units_sorted(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units still in the fight, in id order.
    pub fn active_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|unit| unit.is_active())
    }

    /// The active unit standing on `tile`, if any.
    #[must_use]
    pub fn unit_at(&self, tile: GridCoord) -> Option<&Unit> {
        self.active_units().find(|unit| unit.position == tile)
    }

    /// Tiles held by active units, optionally leaving one unit out.
    #[must_use]
    pub fn occupied_tiles(&self, excluding: Option<UnitId>) -> Vec<GridCoord> {
        self.active_units()
            .filter(|unit| Some(unit.id) != excluding)
            .map(|unit| unit.position)
            .collect()
    }

    /// Fresh walkability snapshot for `mover`: map tiles, minus tiles held by
    /// other active units, plus the mover's own tile.
    #[must_use]
    pub fn walkable_for(&self, mover: UnitId) -> Option<WalkableSet> {
        let unit = self.get(mover)?;
        Some(WalkableSet::build(
            self.map.iter(),
            self.occupied_tiles(Some(mover)),
            Some(unit.position),
        ))
    }

    /// Returns `true` while `faction` has at least one active unit.
    #[must_use]
    pub fn faction_active(&self, faction: Faction) -> bool {
        self.active_units().any(|unit| unit.faction == faction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{Attributes, Control, UnitStats};
    use crate::weapon::WeaponTemplate;

    fn soldier(faction: Faction, x: i32, y: i32) -> Unit {
        Unit::new(
            "soldier",
            faction,
            Control::Autonomous,
            GridCoord::new(x, y),
            Attributes::default(),
            UnitStats::default(),
            WeaponTemplate::pistol().instantiate(),
        )
    }

    mod map_tests {
        use super::*;

        #[test]
        fn rectangle_has_every_tile() {
            let map = TileMap::rectangular(3, 2);
            assert_eq!(map.len(), 6);
            assert!(map.contains(GridCoord::new(2, 1)));
            assert!(!map.contains(GridCoord::new(3, 0)));
        }

        #[test]
        fn obstacles_are_removed() {
            let map = TileMap::rectangular(3, 3).with_obstacles([GridCoord::new(1, 1)]);
            assert_eq!(map.len(), 8);
            assert!(!map.contains(GridCoord::new(1, 1)));
        }
    }

    mod unit_storage_tests {
        use super::*;

        #[test]
        fn spawn_assigns_increasing_ids() {
            let mut field = Battlefield::new(TileMap::rectangular(4, 4));
            let a = field.spawn(soldier(Faction::Ally, 0, 0));
            let b = field.spawn(soldier(Faction::Enemy, 1, 0));
            assert!(a < b);
            assert_eq!(field.get(a).unwrap().id, a);
            assert_eq!(field.len(), 2);
        }

        #[test]
        fn pair_mut_returns_argument_order() {
            let mut field = Battlefield::new(TileMap::rectangular(4, 4));
            let a = field.spawn(soldier(Faction::Ally, 0, 0));
            let b = field.spawn(soldier(Faction::Enemy, 1, 0));
            let (first, second) = field.pair_mut(b, a).unwrap();
            assert_eq!(first.id, b);
            assert_eq!(second.id, a);
            assert!(field.pair_mut(a, a).is_none());
            assert!(field.pair_mut(a, UnitId::new(99)).is_none());
        }

        #[test]
        fn faction_activity_tracks_destruction() {
            let mut field = Battlefield::new(TileMap::rectangular(4, 4));
            let enemy = field.spawn(soldier(Faction::Enemy, 1, 0));
            assert!(field.faction_active(Faction::Enemy));
            field.get_mut(enemy).unwrap().take_health_damage(1000);
            assert!(!field.faction_active(Faction::Enemy));
            assert_eq!(field.active_units().count(), 0);
        }
    }

    mod walkability_tests {
        use super::*;

        #[test]
        fn other_units_block_tiles() {
            let mut field = Battlefield::new(TileMap::rectangular(3, 3));
            let me = field.spawn(soldier(Faction::Ally, 0, 0));
            field.spawn(soldier(Faction::Enemy, 1, 1));
            let walkable = field.walkable_for(me).unwrap();
            assert!(walkable.contains(GridCoord::new(0, 0)));
            assert!(!walkable.contains(GridCoord::new(1, 1)));
            assert_eq!(walkable.len(), 8);
        }

        #[test]
        fn destroyed_units_do_not_block() {
            let mut field = Battlefield::new(TileMap::rectangular(3, 3));
            let me = field.spawn(soldier(Faction::Ally, 0, 0));
            let corpse = field.spawn(soldier(Faction::Enemy, 1, 1));
            field.get_mut(corpse).unwrap().take_health_damage(1000);
            assert!(field.walkable_for(me).unwrap().contains(GridCoord::new(1, 1)));
            assert!(field.unit_at(GridCoord::new(1, 1)).is_none());
        }

        #[test]
        fn snapshot_follows_movement() {
            let mut field = Battlefield::new(TileMap::rectangular(3, 3));
            let me = field.spawn(soldier(Faction::Ally, 0, 0));
            let other = field.spawn(soldier(Faction::Ally, 2, 2));
            assert!(!field.walkable_for(me).unwrap().contains(GridCoord::new(2, 2)));
            field.get_mut(other).unwrap().position = GridCoord::new(2, 1);
            let walkable = field.walkable_for(me).unwrap();
            assert!(walkable.contains(GridCoord::new(2, 2)));
            assert!(!walkable.contains(GridCoord::new(2, 1)));
        }

        #[test]
        fn unknown_mover_has_no_snapshot() {
            let field = Battlefield::new(TileMap::rectangular(3, 3));
            assert!(field.walkable_for(UnitId::new(5)).is_none());
        }
    }
}
