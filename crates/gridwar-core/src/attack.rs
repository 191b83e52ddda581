//! Attack options and their cost / hit-chance table.
//!
//! Options form a closed set. Each one is a row in [`OptionSpec`]: AP and
//! stamina cost, whether it fires a round, the weapon tag that unlocks it, and
//! the two terms of its hit-chance formula
//!
//! ```text
//! raw = accuracy + accuracy_offset + 5 * (attacker.dex - target.dex)
//!       - (distance - 1) * falloff_per_unit
//! ```
//!
//! Adding an option means adding a row, not a new type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::unit::Unit;
use crate::weapon::{Weapon, CLAW, PISTOL};

/// Hit-chance points per point of dexterity advantage.
pub const DEXTERITY_WEIGHT: f32 = 5.0;

/// One row of the option table.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OptionSpec {
    /// AP spent per use
    pub ap_cost: u32,
    /// Stamina spent per use
    pub stamina_cost: u32,
    /// Fires a round from the magazine
    pub uses_ammo: bool,
    /// Weapon tag that offers the option
    pub required_tag: &'static str,
    /// Flat modifier on weapon accuracy
    pub accuracy_offset: f32,
    /// Hit-chance lost per world unit beyond the first
    pub falloff_per_unit: f32,
}

/// A way of attacking with the equipped weapon.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackOption {
    /// Fast, inaccurate shot.
    QuickShot,
    /// Slow, accurate shot.
    AimedShot,
    /// Melee swipe; range-independent, no ammo.
    MeleeClaw,
}

impl AttackOption {
    /// Every option in table order.
    pub const ALL: [Self; 3] = [Self::QuickShot, Self::AimedShot, Self::MeleeClaw];

    /// The option's row in the table.
    #[must_use]
    pub const fn spec(self) -> OptionSpec {
        match self {
            Self::QuickShot => OptionSpec {
                ap_cost: 2,
                stamina_cost: 15,
                uses_ammo: true,
                required_tag: PISTOL,
                accuracy_offset: -15.0,
                falloff_per_unit: 16.0,
            },
            Self::AimedShot => OptionSpec {
                ap_cost: 3,
                stamina_cost: 20,
                uses_ammo: true,
                required_tag: PISTOL,
                accuracy_offset: 0.0,
                falloff_per_unit: 8.0,
            },
            Self::MeleeClaw => OptionSpec {
                ap_cost: 3,
                stamina_cost: 30,
                uses_ammo: false,
                required_tag: CLAW,
                accuracy_offset: 0.0,
                falloff_per_unit: 0.0,
            },
        }
    }

    /// AP spent per use.
    #[must_use]
    pub const fn ap_cost(self) -> u32 {
        self.spec().ap_cost
    }

    /// Stamina spent per use.
    #[must_use]
    pub const fn stamina_cost(self) -> u32 {
        self.spec().stamina_cost
    }

    /// Fires a round from the magazine.
    #[must_use]
    pub const fn uses_ammo(self) -> bool {
        self.spec().uses_ammo
    }

    /// Unclamped hit chance from raw inputs.
    #[must_use]
    pub fn raw_hit_chance(self, accuracy: f32, dexterity_bonus: f32, distance: f32) -> f32 {
        let spec = self.spec();
        accuracy + spec.accuracy_offset + dexterity_bonus * DEXTERITY_WEIGHT
            - (distance - 1.0) * spec.falloff_per_unit
    }

    /// Hit chance in percent, clamped to `[0, 100]`.
    ///
    /// # Example
    ///
    /// ```
    /// use gridwar_core::{AttackOption, Attributes, Control, Faction, Unit, UnitStats, WeaponTemplate};
    /// use lattice::GridCoord;
    ///
    /// let make = |dexterity, x| Unit::new(
    ///     "u", Faction::Ally, Control::Autonomous, GridCoord::new(x, 0),
    ///     Attributes { dexterity, ..Attributes::default() },
    ///     UnitStats::default(), WeaponTemplate::pistol().instantiate(),
    /// );
    /// let attacker = make(5, 0);
    /// let target = make(3, 2);
    ///
    /// // 75 - 15 + 2 * 5 - (2 - 1) * 16
    /// assert_eq!(AttackOption::QuickShot.hit_chance(&attacker, &target, 2.0), 54.0);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_chance(self, attacker: &Unit, target: &Unit, distance: f32) -> f32 {
        let bonus = (attacker.attributes.dexterity - target.attributes.dexterity) as f32;
        let raw = self.raw_hit_chance(attacker.weapon.accuracy as f32, bonus, distance);
        raw.clamp(0.0, 100.0)
    }

    /// Returns `true` if the weapon's tags offer this option.
    #[must_use]
    pub fn offered_by(self, weapon: &Weapon) -> bool {
        weapon.has_tag(self.spec().required_tag)
    }

    /// Options the weapon offers, in table order.
    #[must_use]
    pub fn available_for(weapon: &Weapon) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|option| option.offered_by(weapon))
            .collect()
    }

    /// Returns `true` if `unit` could fire this option right now: offered,
    /// weapon intact, ammo loaded where needed, AP and stamina covered.
    #[must_use]
    pub fn usable_by(self, unit: &Unit) -> bool {
        let weapon = &unit.weapon;
        self.offered_by(weapon)
            && !weapon.is_broken()
            && (!self.uses_ammo() || weapon.magazine > 0)
            && unit.ap.can_afford(self.ap_cost())
            && unit.stamina.can_afford(self.stamina_cost())
    }
}

impl fmt::Display for AttackOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuickShot => write!(f, "Quick Shot"),
            Self::AimedShot => write!(f, "Aimed Shot"),
            Self::MeleeClaw => write!(f, "Claw"),
        }
    }
}
