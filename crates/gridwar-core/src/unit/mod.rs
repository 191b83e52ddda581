//! Units and their identity.
//!
//! This module provides:
//! - [`UnitId`]: Unique identifier, assigned by the battlefield on spawn
//! - [`Faction`] / [`Control`]: Side and who drives the unit
//! - [`Unit`]: The mutable entity owning resource pools and a weapon
//! - [`UnitStatus`]: Read-only snapshot for state-changed notifications
//!
//! Resource pools live in [`stats`].

pub mod stats;

use std::fmt;

use lattice::GridCoord;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::weapon::Weapon;

pub use stats::{Attributes, Pool, StatusFlags};

// =============================================================================
// Identity
// =============================================================================

/// Unique identifier for a unit.
///
/// Ordered by numeric value, which is the iteration order of every unit
/// collection and the tie-breaker wherever two units compare equal.
///
/// # Example
///
/// ```
/// use gridwar_core::UnitId;
///
/// let a = UnitId::new(1);
/// let b = UnitId::new(2);
/// assert!(a < b);
/// assert_eq!(b.as_u64(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UnitId(u64);

impl UnitId {
    /// Creates a `UnitId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Side a unit fights for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// Player side
    Ally,
    /// Opposing side
    Enemy,
}

impl Faction {
    /// Returns `true` if units of `other` are valid targets for this faction.
    #[must_use]
    pub fn hostile_to(self, other: Self) -> bool {
        self != other
    }

    /// The opposing faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Ally => Self::Enemy,
            Self::Enemy => Self::Ally,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ally => write!(f, "Ally"),
            Self::Enemy => write!(f, "Enemy"),
        }
    }
}

/// Who issues a unit's actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Host submits intents (player input).
    Controllable,
    /// The scheduler's controller policy decides.
    Autonomous,
}

// =============================================================================
// Unit
// =============================================================================

/// Pool sizes a unit is created with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    /// Maximum health
    pub max_health: u32,
    /// Head armor
    pub head_armor: u32,
    /// Body armor
    pub body_armor: u32,
    /// Basic stamina
    pub basic_stamina: u32,
    /// Bonus stamina, added to basic for the pool maximum
    pub bonus_stamina: u32,
    /// Maximum morale
    pub max_morale: u32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: 100,
            head_armor: 0,
            body_armor: 0,
            basic_stamina: 100,
            bonus_stamina: 0,
            max_morale: 100,
        }
    }
}

/// A combatant on the grid.
///
/// All pools start full. `ap.max` is derived from attributes and the stamina
/// maximum is basic plus bonus stamina.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Assigned by [`Battlefield::spawn`](crate::Battlefield::spawn).
    pub id: UnitId,
    /// Display name
    pub name: String,
    /// Side
    pub faction: Faction,
    /// Player or policy driven
    pub control: Control,
    /// Current tile
    pub position: GridCoord,
    /// Health
    pub health: Pool,
    /// Head armor
    pub head_armor: Pool,
    /// Body armor
    pub body_armor: Pool,
    /// Stamina
    pub stamina: Pool,
    /// Action points
    pub ap: Pool,
    /// Morale
    pub morale: Pool,
    /// Last rolled initiative
    pub initiative: i32,
    /// Stats
    pub attributes: Attributes,
    /// Probability in `[0, 1]` that a hit lands on the head
    pub head_hit_chance: f32,
    /// Equipped weapon (owned copy)
    pub weapon: Weapon,
    /// Lifecycle flags
    pub flags: StatusFlags,
}

impl Unit {
    /// Default probability of a head hit.
    pub const HEAD_HIT_CHANCE: f32 = 0.25;

    /// Creates a unit with full pools.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        faction: Faction,
        control: Control,
        position: GridCoord,
        attributes: Attributes,
        stats: UnitStats,
        weapon: Weapon,
    ) -> Self {
        Self {
            id: UnitId::default(),
            name: name.into(),
            faction,
            control,
            position,
            health: Pool::full(stats.max_health),
            head_armor: Pool::full(stats.head_armor),
            body_armor: Pool::full(stats.body_armor),
            stamina: Pool::full(stats.basic_stamina.saturating_add(stats.bonus_stamina)),
            ap: Pool::full(attributes.max_ap()),
            morale: Pool::full(stats.max_morale),
            initiative: 0,
            attributes,
            head_hit_chance: Self::HEAD_HIT_CHANCE,
            weapon,
            flags: StatusFlags::empty(),
        }
    }

    /// Probability that a hit lands on the body.
    #[must_use]
    pub fn body_hit_chance(&self) -> f32 {
        1.0 - self.head_hit_chance
    }

    /// Spends AP if the whole amount is available.
    pub fn spend_ap(&mut self, amount: u32) -> bool {
        self.ap.spend(amount)
    }

    /// Spends stamina if the whole amount is available.
    pub fn spend_stamina(&mut self, amount: u32) -> bool {
        self.stamina.spend(amount)
    }

    /// Refills AP for a new turn.
    pub fn recover_ap(&mut self) {
        self.ap.refill();
    }

    /// Restores up to `amount` stamina.
    pub fn recover_stamina(&mut self, amount: u32) {
        self.stamina.restore(amount);
    }

    /// Rolls `uniform(0..=roll_max) + dexterity + bonus dexterity + intelligence`
    /// and stores it.
    pub fn roll_initiative<R: Rng + ?Sized>(&mut self, rng: &mut R, roll_max: u32) -> i32 {
        let roll = i32::try_from(rng.gen_range(0..=roll_max)).unwrap_or(i32::MAX);
        self.initiative = roll.saturating_add(self.attributes.initiative_base());
        self.initiative
    }

    /// Removes health. Returns `true` if this call destroyed the unit.
    pub fn take_health_damage(&mut self, amount: u32) -> bool {
        self.health.drain(amount);
        if self.health.is_empty() && self.is_active() {
            self.flags.insert(StatusFlags::DESTROYED);
            return true;
        }
        false
    }

    /// `false` once the unit is destroyed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.flags.contains(StatusFlags::DESTROYED)
    }

    /// `true` once the unit has finished its turn this round.
    #[must_use]
    pub fn has_acted(&self) -> bool {
        self.flags.contains(StatusFlags::TURN_DONE)
    }

    /// Snapshot of the values a presentation layer renders.
    #[must_use]
    pub fn status(&self) -> UnitStatus {
        UnitStatus {
            unit: self.id,
            position: self.position,
            ap: self.ap,
            stamina: self.stamina,
            health: self.health,
            head_armor: self.head_armor,
            body_armor: self.body_armor,
            ammo: self.weapon.magazine,
            durability: self.weapon.durability,
        }
    }
}

/// Unit state carried by [`BattleEvent::UnitStateChanged`](crate::BattleEvent::UnitStateChanged).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    /// Which unit
    pub unit: UnitId,
    /// Tile
    pub position: GridCoord,
    /// AP pool
    pub ap: Pool,
    /// Stamina pool
    pub stamina: Pool,
    /// Health pool
    pub health: Pool,
    /// Head armor pool
    pub head_armor: Pool,
    /// Body armor pool
    pub body_armor: Pool,
    /// Rounds left
    pub ammo: u32,
    /// Weapon durability left
    pub durability: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::WeaponTemplate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_unit(attributes: Attributes) -> Unit {
        Unit::new(
            "test",
            Faction::Ally,
            Control::Controllable,
            GridCoord::new(0, 0),
            attributes,
            UnitStats::default(),
            WeaponTemplate::pistol().instantiate(),
        )
    }

    mod identity_tests {
        use super::*;

        #[test]
        fn id_formats() {
            let id = UnitId::new(7);
            assert_eq!(format!("{id}"), "7");
            assert_eq!(format!("{id:?}"), "UnitId(7)");
            assert_eq!(UnitId::from(7), id);
        }

        #[test]
        fn factions_are_mutually_hostile() {
            assert!(Faction::Ally.hostile_to(Faction::Enemy));
            assert!(!Faction::Enemy.hostile_to(Faction::Enemy));
            assert_eq!(Faction::Ally.opponent(), Faction::Enemy);
        }
    }

    mod pool_tests {
        use super::*;

        #[test]
        fn new_unit_derives_ap_and_stamina() {
            let unit = Unit::new(
                "u",
                Faction::Enemy,
                Control::Autonomous,
                GridCoord::new(1, 1),
                Attributes {
                    dexterity: 2,
                    bonus_dexterity: 3,
                    ..Attributes::default()
                },
                UnitStats {
                    basic_stamina: 60,
                    bonus_stamina: 110,
                    ..UnitStats::default()
                },
                WeaponTemplate::claws().instantiate(),
            );
            assert_eq!(unit.ap, Pool::full(10));
            assert_eq!(unit.stamina, Pool::full(170));
        }

        #[test]
        fn failed_spend_leaves_pool_untouched() {
            let mut unit = test_unit(Attributes::default());
            assert!(!unit.spend_ap(100));
            assert_eq!(unit.ap.current, unit.ap.max);
            assert!(!unit.spend_stamina(1000));
            assert_eq!(unit.stamina.current, unit.stamina.max);
        }

        #[test]
        fn recover_restores_to_max() {
            let mut unit = test_unit(Attributes::default());
            unit.spend_ap(3);
            unit.spend_stamina(40);
            unit.recover_ap();
            unit.recover_stamina(15);
            assert_eq!(unit.ap.current, unit.ap.max);
            assert_eq!(unit.stamina.current, unit.stamina.max - 25);
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn lethal_damage_destroys_once() {
            let mut unit = test_unit(Attributes::default());
            assert!(unit.take_health_damage(250));
            assert_eq!(unit.health.current, 0);
            assert!(!unit.is_active());
            assert!(!unit.take_health_damage(5));
        }

        #[test]
        fn status_snapshot_reflects_weapon() {
            let unit = test_unit(Attributes::default());
            let status = unit.status();
            assert_eq!(status.ammo, unit.weapon.magazine);
            assert_eq!(status.durability, unit.weapon.durability);
        }
    }

    mod initiative_tests {
        use super::*;

        #[test]
        fn initiative_stays_within_roll_bounds() {
            let attrs = Attributes {
                dexterity: 4,
                bonus_dexterity: 1,
                intelligence: 2,
                ..Attributes::default()
            };
            let mut unit = test_unit(attrs);
            let mut rng = ChaCha8Rng::seed_from_u64(9);
            for _ in 0..100 {
                let init = unit.roll_initiative(&mut rng, 5);
                assert!((7..=12).contains(&init));
            }
        }

        #[test]
        fn same_seed_same_roll() {
            let mut a = test_unit(Attributes::default());
            let mut b = test_unit(Attributes::default());
            let mut rng_a = ChaCha8Rng::seed_from_u64(3);
            let mut rng_b = ChaCha8Rng::seed_from_u64(3);
            assert_eq!(a.roll_initiative(&mut rng_a, 5), b.roll_initiative(&mut rng_b, 5));
        }
    }
}
