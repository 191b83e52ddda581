//! Notifications for the presentation layer.
//!
//! The scheduler never renders anything. It records what changed as
//! [`BattleEvent`]s in an [`EventLog`], and the host drains the log with
//! [`EventLog::take_events`] whenever it wants to catch up.

use serde::{Deserialize, Serialize};

use lattice::GridCoord;

use crate::combat::AttackReport;
use crate::unit::{Faction, UnitId, UnitStatus};

/// Something the presentation layer may want to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// A new round began with this turn order.
    RoundStarted {
        /// Round number, starting at 1
        round: u32,
        /// Acting order for the round
        order: Vec<UnitId>,
    },
    /// A unit became the acting unit.
    TurnStarted {
        /// The acting unit
        unit: UnitId,
    },
    /// The acting unit finished.
    TurnEnded {
        /// The unit whose turn ended
        unit: UnitId,
    },
    /// One tile of movement.
    UnitMoved {
        /// Who moved
        unit: UnitId,
        /// Previous tile
        from: GridCoord,
        /// New tile
        to: GridCoord,
    },
    /// Pools, position or weapon state changed.
    UnitStateChanged(UnitStatus),
    /// One shot was fired.
    AttackResolved(AttackReport),
    /// A unit's health reached zero.
    UnitDestroyed {
        /// The destroyed unit
        unit: UnitId,
        /// The unit that fired the last shot
        by: UnitId,
    },
    /// An intent or step was refused; nothing changed.
    ActionRejected {
        /// The unit the action was for, when known
        unit: Option<UnitId>,
        /// Human-readable reason
        reason: String,
    },
    /// Queued steps were dropped; already spent resources stay spent.
    ActionCancelled {
        /// The acting unit
        unit: UnitId,
        /// Number of steps discarded
        dropped_steps: usize,
    },
    /// A watched faction has no active units left. The battle halts.
    FactionDefeated {
        /// The defeated faction
        faction: Faction,
    },
}

/// An event stamped with where it happened in the battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Round the event belongs to
    pub round: u32,
    /// Global sequence number, strictly increasing
    pub sequence: u64,
    /// The event
    pub event: BattleEvent,
}

/// Append-only event buffer drained by the host.
///
/// # Example
///
/// ```
/// use gridwar_core::{BattleEvent, EventLog, UnitId};
///
/// let mut log = EventLog::new();
/// log.push(1, BattleEvent::TurnStarted { unit: UnitId::new(3) });
/// log.push(1, BattleEvent::TurnEnded { unit: UnitId::new(3) });
///
/// let records = log.take_events();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].sequence, 1);
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_sequence: u64,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `event` under `round`.
    pub fn push(&mut self, round: u32, event: BattleEvent) {
        self.records.push(EventRecord {
            round,
            sequence: self.next_sequence,
            event,
        });
        self.next_sequence += 1;
    }

    /// Drains and returns all recorded events in order.
    ///
    /// Sequence numbers keep counting across drains.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    /// Pending events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
