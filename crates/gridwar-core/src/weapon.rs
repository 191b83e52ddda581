//! Weapon templates and per-unit weapon instances.
//!
//! A [`WeaponTemplate`] is authored data shared by many units. Equipping it
//! makes a deep copy, a [`Weapon`], so wear and ammo use on one unit never
//! leak into the template or into another unit's copy.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tag carried by handguns; unlocks the ranged options.
pub const PISTOL: &str = "Pistol";
/// Tag carried by natural melee weapons; unlocks the claw option.
pub const CLAW: &str = "Claw";

/// Immutable weapon definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponTemplate {
    /// Display name
    pub name: String,
    /// Trade value
    pub value: u32,
    /// Lowest damage roll (inclusive)
    pub min_damage: u32,
    /// Highest damage roll (inclusive)
    pub max_damage: u32,
    /// Base accuracy in percent points
    pub accuracy: i32,
    /// Maximum world-space attack distance
    pub range: f32,
    /// Hits the weapon survives
    pub durability: u32,
    /// Percent of damage that bypasses armor
    pub armor_penetration: u32,
    /// Percent of non-penetrating damage converted into armor damage
    pub armor_shredding: u32,
    /// Fatigue per use
    pub fatigue_cost: u32,
    /// Rounds per magazine; 0 for weapons without ammo
    pub magazine_capacity: u32,
    /// Tags selecting the attack options on offer
    pub tags: BTreeSet<String>,
}

impl WeaponTemplate {
    /// Stock sidearm.
    #[must_use]
    pub fn pistol() -> Self {
        Self {
            name: "Service Pistol".to_string(),
            value: 120,
            min_damage: 30,
            max_damage: 45,
            accuracy: 75,
            range: 6.0,
            durability: 60,
            armor_penetration: 30,
            armor_shredding: 60,
            fatigue_cost: 5,
            magazine_capacity: 8,
            tags: BTreeSet::from([PISTOL.to_string()]),
        }
    }

    /// Stock claws for melee creatures.
    #[must_use]
    pub fn claws() -> Self {
        Self {
            name: "Claws".to_string(),
            value: 0,
            min_damage: 20,
            max_damage: 35,
            accuracy: 70,
            range: 1.5,
            durability: 999,
            armor_penetration: 10,
            armor_shredding: 40,
            fatigue_cost: 10,
            magazine_capacity: 0,
            tags: BTreeSet::from([CLAW.to_string()]),
        }
    }

    /// Makes the per-unit copy.
    #[must_use]
    pub fn instantiate(&self) -> Weapon {
        Weapon {
            name: self.name.clone(),
            value: self.value,
            min_damage: self.min_damage,
            max_damage: self.max_damage,
            accuracy: self.accuracy,
            range: self.range,
            durability: self.durability,
            armor_penetration: self.armor_penetration,
            armor_shredding: self.armor_shredding,
            fatigue_cost: self.fatigue_cost,
            magazine: self.magazine_capacity,
            capacity: self.magazine_capacity,
            tags: self.tags.clone(),
        }
    }

    /// Checks that the numbers describe a usable weapon.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an inverted damage range, a
    /// negative or non-finite range, or percentages above 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_damage > self.max_damage {
            return Err(ConfigError::Invalid(format!(
                "{}: min_damage {} exceeds max_damage {}",
                self.name, self.min_damage, self.max_damage
            )));
        }
        if !self.range.is_finite() || self.range < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{}: range must be a non-negative number",
                self.name
            )));
        }
        if self.armor_penetration > 100 || self.armor_shredding > 100 {
            return Err(ConfigError::Invalid(format!(
                "{}: armor percentages must be within 0..=100",
                self.name
            )));
        }
        Ok(())
    }
}

/// Mutable weapon owned by one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Display name
    pub name: String,
    /// Trade value
    pub value: u32,
    /// Lowest damage roll (inclusive)
    pub min_damage: u32,
    /// Highest damage roll (inclusive)
    pub max_damage: u32,
    /// Base accuracy in percent points
    pub accuracy: i32,
    /// Maximum world-space attack distance
    pub range: f32,
    /// Remaining durability
    pub durability: u32,
    /// Percent of damage that bypasses armor
    pub armor_penetration: u32,
    /// Percent of non-penetrating damage converted into armor damage
    pub armor_shredding: u32,
    /// Fatigue per use
    pub fatigue_cost: u32,
    /// Rounds currently loaded
    pub magazine: u32,
    /// Rounds a full magazine holds
    pub capacity: u32,
    /// Tags copied from the template
    pub tags: BTreeSet<String>,
}

impl Weapon {
    /// Durability is spent.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.durability == 0
    }

    /// Returns `true` if the weapon carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Loses one point of durability, stopping at zero.
    pub fn wear(&mut self) {
        self.durability = self.durability.saturating_sub(1);
    }

    /// Uses one round. Returns `false` if the magazine was already empty.
    pub fn consume_round(&mut self) -> bool {
        if self.magazine == 0 {
            return false;
        }
        self.magazine -= 1;
        true
    }

    /// Refills the magazine. Returns the number of rounds loaded.
    pub fn reload(&mut self) -> u32 {
        let loaded = self.capacity - self.magazine.min(self.capacity);
        self.magazine = self.capacity;
        loaded
    }

    /// Rolls damage uniformly in `[min_damage, max_damage]`.
    pub fn roll_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min_damage..=self.max_damage.max(self.min_damage))
    }
}
