//! # Gridwar Core
//!
//! Tactical decision engine for a turn-based grid combat game.
//!
//! The crate sits on top of [`lattice`] and owns everything that decides what
//! a unit is allowed to do and what happens when it does it:
//!
//! - **Units**: resource pools, attributes, equipped weapon
//! - **Combat**: attack options, hit chance, the armor-aware damage split
//! - **Scheduling**: initiative order, turn lifecycle, intent validation
//! - **Control**: pluggable autonomous policies for non-player units
//!
//! Presentation is not handled here. A host drives the [`TurnScheduler`] one
//! step at a time, submits [`Intent`]s for player-controlled units and drains
//! [`BattleEvent`]s to render.
//!
//! ## Usage
//!
//! ```
//! use gridwar_core::{
//!     Attributes, Battlefield, Control, Faction, RulesConfig, StepOutcome, TileMap,
//!     TurnScheduler, Unit, UnitStats, WeaponTemplate,
//! };
//! use lattice::GridCoord;
//!
//! let mut field = Battlefield::new(TileMap::rectangular(8, 8));
//! for (name, faction, x, weapon) in [
//!     ("scout", Faction::Ally, 0, WeaponTemplate::pistol()),
//!     ("ghoul", Faction::Enemy, 4, WeaponTemplate::claws()),
//! ] {
//!     field.spawn(Unit::new(
//!         name,
//!         faction,
//!         Control::Autonomous,
//!         GridCoord::new(x, 0),
//!         Attributes::default(),
//!         UnitStats::default(),
//!         weapon.instantiate(),
//!     ));
//! }
//!
//! let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), 7);
//! let outcome = scheduler.run_until_idle();
//!
//! assert!(matches!(outcome, StepOutcome::Halted | StepOutcome::Advanced));
//! assert!(!scheduler.take_events().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attack;
pub mod battlefield;
pub mod combat;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod spawn;
pub mod unit;
pub mod weapon;

#[cfg(test)]
mod tests;

// Re-export lattice for grid types
pub use lattice;

pub use attack::AttackOption;
pub use battlefield::{Battlefield, TileMap};
pub use combat::{AttackPhase, AttackReport, CombatResolver, DamageReport, HitLocation};
pub use config::{MapConfig, RulesConfig, ScenarioConfig, SquadConfig};
pub use controller::{Controller, Decision, NearestEnemy, TurnContext};
pub use error::{ActionError, ConfigError, Resource};
pub use events::{BattleEvent, EventLog, EventRecord};
pub use scheduler::{Dependencies, Intent, PathStep, StepOutcome, TurnPhase, TurnScheduler};
pub use spawn::{SpawnRanges, SpawnZone, Spawner, StatRange};
pub use unit::{Attributes, Control, Faction, Pool, StatusFlags, Unit, UnitId, UnitStats, UnitStatus};
pub use weapon::{Weapon, WeaponTemplate};
