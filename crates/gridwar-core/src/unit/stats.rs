//! Resource pools, attributes and status flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// =============================================================================
// Pool
// =============================================================================

/// A bounded resource such as health, armor, stamina or AP.
///
/// Every mutation keeps `current <= max`, and the unsigned representation keeps
/// the pool from ever going negative.
///
/// # Example
///
/// ```
/// use gridwar_core::Pool;
///
/// let mut ap = Pool::full(7);
/// assert!(ap.spend(5));
/// assert!(!ap.spend(5)); // all-or-nothing
/// assert_eq!(ap.current, 2);
///
/// ap.drain(10); // saturating
/// assert_eq!(ap.current, 0);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pool {
    /// Amount remaining.
    pub current: u32,
    /// Upper bound.
    pub max: u32,
}

impl Pool {
    /// Creates a pool at capacity.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Creates a pool with `current` clamped to `max`.
    #[must_use]
    pub fn new(current: u32, max: u32) -> Self {
        Self {
            current: current.min(max),
            max,
        }
    }

    /// Deducts `amount` only if the whole amount is available.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.current < amount {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Deducts up to `amount`, stopping at zero. Returns the amount removed.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current);
        self.current -= removed;
        removed
    }

    /// Adds up to `amount`, stopping at `max`.
    pub fn restore(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }

    /// Sets `current` back to `max`.
    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Returns `true` if at least `amount` is available.
    #[must_use]
    pub const fn can_afford(&self, amount: u32) -> bool {
        self.current >= amount
    }

    /// Returns `true` when nothing is left.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.current == 0
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Core stats plus equipment/training bonuses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    /// Strength
    pub strength: i32,
    /// Dexterity; drives AP and hit-chance bonus
    pub dexterity: i32,
    /// Intelligence; added to initiative
    pub intelligence: i32,
    /// Charisma
    pub charisma: i32,
    /// Luck
    pub luck: i32,
    /// Bonus strength
    pub bonus_strength: i32,
    /// Bonus dexterity; counts toward AP and initiative
    pub bonus_dexterity: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 3,
            dexterity: 3,
            intelligence: 3,
            charisma: 3,
            luck: 3,
            bonus_strength: 0,
            bonus_dexterity: 0,
        }
    }
}

impl Attributes {
    /// Base AP every unit gets before dexterity.
    pub const BASE_AP: i32 = 5;

    /// Maximum AP: `5 + dexterity + bonus dexterity`, never below zero.
    #[must_use]
    pub fn max_ap(&self) -> u32 {
        non_negative(Self::BASE_AP + self.dexterity + self.bonus_dexterity)
    }

    /// Stat part of initiative: `dexterity + bonus dexterity + intelligence`.
    #[must_use]
    pub const fn initiative_base(&self) -> i32 {
        self.dexterity + self.bonus_dexterity + self.intelligence
    }
}

/// Clamps a signed stat into a pool size.
pub(crate) fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// =============================================================================
// StatusFlags
// =============================================================================

bitflags! {
    /// Lifecycle flags on a unit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StatusFlags: u8 {
        /// Health reached zero; the unit no longer acts or blocks tiles.
        const DESTROYED = 1 << 0;
        /// The unit has finished its turn this round.
        const TURN_DONE = 1 << 1;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}
