//! Rules and scenario configuration.
//!
//! All structs deserialize from JSON with every field optional; missing fields
//! fall back to the documented defaults.
//!
//! # Example
//!
//! ```
//! use gridwar_core::ScenarioConfig;
//!
//! let scenario = ScenarioConfig::from_json_str(r#"{
//!     "seed": 3,
//!     "map": { "width": 10, "height": 10 },
//!     "rules": { "stamina_recovery_per_turn": 20 }
//! }"#).unwrap();
//!
//! assert_eq!(scenario.rules.stamina_recovery_per_turn, 20);
//! assert_eq!(scenario.rules.move_ap_cost, 2);
//! ```

use std::path::Path;

use lattice::GridCoord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::battlefield::{Battlefield, TileMap};
use crate::error::ConfigError;
use crate::scheduler::TurnScheduler;
use crate::spawn::{SpawnRanges, SpawnZone, Spawner};
use crate::unit::{Control, Faction};
use crate::weapon::WeaponTemplate;

// =============================================================================
// RulesConfig
// =============================================================================

/// Turn and movement rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// AP per tile moved.
    pub move_ap_cost: u32,
    /// Stamina per tile moved.
    pub move_stamina_cost: u32,
    /// World-space radius within which autonomous units notice enemies.
    pub detection_radius: f32,
    /// Initiative roll is `uniform(0..=initiative_roll_max)` plus stats.
    pub initiative_roll_max: u32,
    /// Stamina restored at the start of each of a unit's turns.
    pub stamina_recovery_per_turn: u32,
    /// AP cost of reloading.
    pub reload_ap_cost: u32,
    /// Factions whose elimination halts the battle.
    pub watched_factions: Vec<Faction>,
    /// Step budget for one [`TurnScheduler::run_until_idle`] call.
    pub max_steps: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            move_ap_cost: 2,
            move_stamina_cost: 10,
            detection_radius: 10.0,
            initiative_roll_max: 5,
            stamina_recovery_per_turn: 0,
            reload_ap_cost: 0,
            watched_factions: vec![Faction::Ally, Faction::Enemy],
            max_steps: 10_000,
        }
    }
}

impl RulesConfig {
    /// Checks the rules are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero move cost, a negative or
    /// non-finite detection radius, or a zero step budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.move_ap_cost == 0 {
            return Err(ConfigError::Invalid("move_ap_cost must be at least 1".into()));
        }
        if !self.detection_radius.is_finite() || self.detection_radius < 0.0 {
            return Err(ConfigError::Invalid(
                "detection_radius must be a non-negative number".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid("max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Scenario
// =============================================================================

/// Map dimensions and blocked tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Columns
    pub width: i32,
    /// Rows
    pub height: i32,
    /// Tiles removed from the map
    pub obstacles: Vec<GridCoord>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            obstacles: Vec::new(),
        }
    }
}

impl MapConfig {
    /// Builds the tile map.
    #[must_use]
    pub fn build(&self) -> TileMap {
        TileMap::rectangular(self.width, self.height).with_obstacles(self.obstacles.iter().copied())
    }
}

/// A group of identical units spawned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadConfig {
    /// Unit names are `"{name}_{n}"`, counting from 1.
    pub name: String,
    /// Side
    pub faction: Faction,
    /// Player or policy driven
    pub control: Control,
    /// Number of units
    pub count: u32,
    /// Weapon each unit is equipped with
    pub weapon: WeaponTemplate,
    /// Restrict spawn tiles to this rectangle
    #[serde(default)]
    pub zone: Option<SpawnZone>,
}

/// Everything needed to set up a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Seed for spawning and for the scheduler's dice
    pub seed: u64,
    /// Map layout
    pub map: MapConfig,
    /// Squads to spawn, in order
    pub squads: Vec<SquadConfig>,
    /// Turn rules
    pub rules: RulesConfig,
    /// Stat ranges for spawned units
    pub spawn: SpawnRanges,
    /// Rounds a headless host plays before giving up
    pub max_rounds: u32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            map: MapConfig::default(),
            squads: vec![
                SquadConfig {
                    name: "Ally".to_string(),
                    faction: Faction::Ally,
                    control: Control::Autonomous,
                    count: 5,
                    weapon: WeaponTemplate::pistol(),
                    zone: None,
                },
                SquadConfig {
                    name: "Enemy".to_string(),
                    faction: Faction::Enemy,
                    control: Control::Autonomous,
                    count: 5,
                    weapon: WeaponTemplate::claws(),
                    zone: None,
                },
            ],
            rules: RulesConfig::default(),
            spawn: SpawnRanges::default(),
            max_rounds: 100,
        }
    }
}

impl ScenarioConfig {
    /// Parses and validates a scenario from JSON.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`] if
    /// validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reads, parses and validates a scenario file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`ScenarioConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let scenario = Self::from_json_str(&json)?;
        info!(path = %path.display(), squads = scenario.squads.len(), "scenario loaded");
        Ok(scenario)
    }

    /// Checks map, rules, weapons and that every unit fits on the map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map.width <= 0 || self.map.height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "map must be at least 1x1, got {}x{}",
                self.map.width, self.map.height
            )));
        }
        self.rules.validate()?;
        self.spawn.validate()?;

        let tiles = self.map.build().len();
        let mut units = 0usize;
        for squad in &self.squads {
            squad.weapon.validate()?;
            units += usize::try_from(squad.count).unwrap_or(usize::MAX);
        }
        if units > tiles {
            return Err(ConfigError::Invalid(format!(
                "{units} units do not fit on {tiles} tiles"
            )));
        }
        Ok(())
    }

    /// Builds the map, spawns every squad and returns a ready scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if validation fails or a squad's zone
    /// runs out of free tiles.
    pub fn build_scheduler(&self) -> Result<TurnScheduler, ConfigError> {
        self.validate()?;
        let mut field = Battlefield::new(self.map.build());
        let mut spawner = Spawner::new(self.spawn.clone(), self.seed);
        for squad in &self.squads {
            spawner.spawn_squad(&mut field, squad)?;
        }
        Ok(TurnScheduler::new(field, self.rules.clone(), self.seed))
    }
}
