//! Randomized unit creation and placement.
//!
//! The [`Spawner`] owns its own seeded RNG, separate from the scheduler's, so
//! adding a unit to a scenario never shifts the dice of the battle itself.

use lattice::GridCoord;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battlefield::Battlefield;
use crate::config::SquadConfig;
use crate::error::ConfigError;
use crate::unit::stats::non_negative;
use crate::unit::{Attributes, Control, Faction, Unit, UnitId, UnitStats};
use crate::weapon::WeaponTemplate;

/// Inclusive integer range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRange {
    /// Lowest value
    pub min: i32,
    /// Highest value
    pub max: i32,
}

impl StatRange {
    /// Creates `min..=max`.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Draws a value uniformly from the range.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        rng.gen_range(self.min..=self.max.max(self.min))
    }

    /// Draws a pool size; negative draws become zero.
    pub fn roll_pool<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        non_negative(self.roll(rng))
    }
}

/// Stat ranges for freshly spawned units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnRanges {
    /// Head armor
    pub head_armor: StatRange,
    /// Body armor
    pub body_armor: StatRange,
    /// Bonus stamina
    pub bonus_stamina: StatRange,
    /// Bonus strength
    pub bonus_strength: StatRange,
    /// Bonus dexterity
    pub bonus_dexterity: StatRange,
    /// Maximum health
    pub max_health: StatRange,
    /// Basic stamina
    pub basic_stamina: StatRange,
    /// Maximum morale
    pub max_morale: StatRange,
    /// Strength, dexterity, intelligence, charisma and luck
    pub core_stat: StatRange,
}

impl Default for SpawnRanges {
    fn default() -> Self {
        Self {
            head_armor: StatRange::new(100, 300),
            body_armor: StatRange::new(100, 500),
            bonus_stamina: StatRange::new(100, 120),
            bonus_strength: StatRange::new(1, 5),
            bonus_dexterity: StatRange::new(1, 5),
            max_health: StatRange::new(100, 150),
            basic_stamina: StatRange::new(50, 100),
            max_morale: StatRange::new(50, 100),
            core_stat: StatRange::new(1, 6),
        }
    }
}

impl SpawnRanges {
    /// Checks every range is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first inverted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("head_armor", self.head_armor),
            ("body_armor", self.body_armor),
            ("bonus_stamina", self.bonus_stamina),
            ("bonus_strength", self.bonus_strength),
            ("bonus_dexterity", self.bonus_dexterity),
            ("max_health", self.max_health),
            ("basic_stamina", self.basic_stamina),
            ("max_morale", self.max_morale),
            ("core_stat", self.core_stat),
        ];
        for (name, range) in named {
            if range.min > range.max {
                return Err(ConfigError::Invalid(format!(
                    "spawn range {name} is inverted: {}..={}",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

/// Rectangle of tiles, inclusive on both corners.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnZone {
    /// Lowest corner
    pub min: GridCoord,
    /// Highest corner
    pub max: GridCoord,
}

impl SpawnZone {
    /// Returns `true` if `tile` lies inside the zone.
    #[must_use]
    pub fn contains(&self, tile: GridCoord) -> bool {
        (self.min.x..=self.max.x).contains(&tile.x) && (self.min.y..=self.max.y).contains(&tile.y)
    }
}

/// Creates units with randomized stats and drops them on free tiles.
#[derive(Debug, Clone)]
pub struct Spawner {
    ranges: SpawnRanges,
    rng: ChaCha8Rng,
}

impl Spawner {
    /// Creates a spawner with its own seeded RNG.
    #[must_use]
    pub fn new(ranges: SpawnRanges, seed: u64) -> Self {
        Self {
            ranges,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Rolls a unit at `position` carrying a fresh copy of `weapon`.
    pub fn roll_unit(
        &mut self,
        name: impl Into<String>,
        faction: Faction,
        control: Control,
        position: GridCoord,
        weapon: &WeaponTemplate,
    ) -> Unit {
        let r = &self.ranges;
        let rng = &mut self.rng;
        let stats = UnitStats {
            head_armor: r.head_armor.roll_pool(rng),
            body_armor: r.body_armor.roll_pool(rng),
            bonus_stamina: r.bonus_stamina.roll_pool(rng),
            max_health: r.max_health.roll_pool(rng),
            basic_stamina: r.basic_stamina.roll_pool(rng),
            max_morale: r.max_morale.roll_pool(rng),
        };
        let attributes = Attributes {
            bonus_strength: r.bonus_strength.roll(rng),
            bonus_dexterity: r.bonus_dexterity.roll(rng),
            strength: r.core_stat.roll(rng),
            dexterity: r.core_stat.roll(rng),
            intelligence: r.core_stat.roll(rng),
            charisma: r.core_stat.roll(rng),
            luck: r.core_stat.roll(rng),
        };
        Unit::new(name, faction, control, position, attributes, stats, weapon.instantiate())
    }

    /// Picks a random map tile that no active unit stands on.
    pub fn free_tile(&mut self, field: &Battlefield, zone: Option<SpawnZone>) -> Option<GridCoord> {
        let occupied = field.occupied_tiles(None);
        let candidates: Vec<GridCoord> = field
            .map()
            .iter()
            .filter(|tile| !occupied.contains(tile))
            .filter(|tile| zone.map_or(true, |z| z.contains(*tile)))
            .collect();
        candidates.choose(&mut self.rng).copied()
    }

    /// Spawns every unit of `squad` on random free tiles.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the map (or the squad's zone) runs
    /// out of free tiles. Units spawned before that point stay on the field.
    pub fn spawn_squad(
        &mut self,
        field: &mut Battlefield,
        squad: &SquadConfig,
    ) -> Result<Vec<UnitId>, ConfigError> {
        let mut ids = Vec::new();
        for n in 1..=squad.count {
            let tile = self.free_tile(field, squad.zone).ok_or_else(|| {
                ConfigError::Invalid(format!("no free tile left for {}_{n}", squad.name))
            })?;
            let unit = self.roll_unit(
                format!("{}_{n}", squad.name),
                squad.faction,
                squad.control,
                tile,
                &squad.weapon,
            );
            ids.push(field.spawn(unit));
        }
        debug!(squad = %squad.name, spawned = ids.len(), "squad spawned");
        Ok(ids)
    }
}
