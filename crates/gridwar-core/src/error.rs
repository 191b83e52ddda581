//! Error types for actions and scenario loading.
//!
//! None of the [`ActionError`] kinds are fatal. Every one of them means "the
//! action does not happen": the scheduler rejects the intent, logs it and emits
//! a diagnostic event, and the battle carries on.

use std::fmt;

use lattice::PathError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attack::AttackOption;
use crate::combat::AttackPhase;
use crate::unit::UnitId;

/// Resource an action can run short of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Action points
    ActionPoints,
    /// Stamina
    Stamina,
    /// Rounds in the magazine
    Ammo,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActionPoints => write!(f, "AP"),
            Self::Stamina => write!(f, "stamina"),
            Self::Ammo => write!(f, "ammo"),
        }
    }
}

/// Reasons an intent or step was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// Path search failed (`InvalidEndpoint` or `PathNotFound`).
    #[error(transparent)]
    Path(#[from] PathError),

    /// AP, stamina or ammo below the action's cost.
    #[error("insufficient {resource}: need {needed}, have {available}")]
    InsufficientResources {
        /// Which pool ran short
        resource: Resource,
        /// Cost of the action
        needed: u32,
        /// Amount left in the pool
        available: u32,
    },

    /// Weapon durability reached zero.
    #[error("weapon {weapon} is depleted")]
    WeaponDepleted {
        /// Weapon name
        weapon: String,
    },

    /// No enemy can be reached or surrounded.
    #[error("no legal target for unit {unit}")]
    NoLegalTarget {
        /// The acting unit
        unit: UnitId,
    },

    /// The id does not name a unit on the battlefield.
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    /// Another unit is acting.
    #[error("unit {unit} cannot act: it is not its turn")]
    NotYourTurn {
        /// The unit named in the intent
        unit: UnitId,
    },

    /// The unit has been destroyed.
    #[error("unit {0} is destroyed")]
    UnitDestroyed(UnitId),

    /// The equipped weapon has no magazine to reload.
    #[error("weapon {weapon} cannot be reloaded")]
    NotReloadable {
        /// Weapon name
        weapon: String,
    },

    /// The equipped weapon does not offer the option.
    #[error("{option} is not offered by {weapon}")]
    OptionUnavailable {
        /// Requested option
        option: AttackOption,
        /// Weapon name
        weapon: String,
    },

    /// Target lies beyond weapon range.
    #[error("target at distance {distance:.2} is beyond range {range:.2}")]
    TargetOutOfRange {
        /// World-space distance to the target
        distance: f32,
        /// Weapon range
        range: f32,
    },

    /// The combat resolver is not in the phase the call needs.
    #[error("attack not ready: resolver is in phase {phase:?}")]
    AttackNotReady {
        /// Current phase
        phase: AttackPhase,
    },

    /// A unit tried to act on itself or an ally.
    #[error("unit {target} is not a hostile target")]
    InvalidTarget {
        /// The refused target
        target: UnitId,
    },

    /// Queued steps must drain or be cancelled first.
    #[error("{pending} queued steps are still pending")]
    Busy {
        /// Steps still in the queue
        pending: usize,
    },

    /// No unit turn is in progress.
    #[error("no unit turn is in progress")]
    NoActiveTurn,

    /// The battle has ended.
    #[error("battle has halted")]
    Halted,
}

impl ActionError {
    /// Shorthand for [`ActionError::InsufficientResources`].
    #[must_use]
    pub const fn insufficient(resource: Resource, needed: u32, available: u32) -> Self {
        Self::InsufficientResources {
            resource,
            needed,
            available,
        }
    }
}

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Scenario file could not be read.
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario JSON is malformed.
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    /// Scenario is well-formed but unusable.
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Convenience alias for action results.
pub type ActionResult<T> = Result<T, ActionError>;
