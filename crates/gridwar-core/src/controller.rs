//! Decision policies for autonomous units.
//!
//! A [`Controller`] looks at a read-only [`Battlefield`] and returns one
//! [`Decision`] at a time. The scheduler turns each decision into queued
//! steps, runs them, and asks again, so a policy never mutates state itself.
//!
//! # Thread Safety
//!
//! Controllers must be `Send + Sync`. [`NearestEnemy`] evaluates its candidate
//! approach tiles in parallel with rayon; the search is read-only and the
//! result is reduced deterministically.

use lattice::{GridCoord, PathPlanner};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attack::AttackOption;
use crate::battlefield::Battlefield;
use crate::error::ActionError;
use crate::unit::{Unit, UnitId};

/// What the policy knows about the turn in progress.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    /// The acting unit
    pub unit: UnitId,
    /// The unit already moved this turn
    pub has_moved: bool,
    /// How far the unit can see enemies (world units)
    pub detection_radius: f32,
    /// AP cost of a reload
    pub reload_ap_cost: u32,
}

/// One decision for the acting unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Walk this path (start excluded, one step per tile).
    ///
    /// Each tile costs the same AP and stamina as a player move. The scheduler
    /// cuts the path short at the last tile the unit can afford.
    Move {
        /// Tiles to walk
        path: Vec<GridCoord>,
    },
    /// Fire once at `target`.
    Attack {
        /// The target
        target: UnitId,
        /// Option to fire
        option: AttackOption,
    },
    /// Refill the magazine.
    Reload,
    /// Nothing more to do this turn.
    EndTurn,
}

/// Policy for autonomous units.
///
/// # Example
///
/// ```
/// use gridwar_core::{Battlefield, Controller, Decision, TurnContext};
/// use lattice::PathPlanner;
///
/// struct Passive;
///
/// impl Controller for Passive {
///     fn decide(&self, _ctx: &TurnContext, _field: &Battlefield, _planner: &dyn PathPlanner) -> Decision {
///         Decision::EndTurn
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Chooses the next action for `ctx.unit`.
    fn decide(&self, ctx: &TurnContext, field: &Battlefield, planner: &dyn PathPlanner) -> Decision;
}

/// "Attack the nearest enemy" policy.
///
/// 1. Target the nearest active hostile within the detection radius; ties go
///    to the lower id.
/// 2. Out of weapon range and not yet moved: walk toward whichever of the 4
///    orthogonal tiles around the target has the shortest path.
/// 3. In range: fire the affordable option with the best hit chance, or
///    reload an empty magazine if that is all that stands in the way.
/// 4. Otherwise end the turn.
///
/// The unit moves at most once per turn. After each shot the target is picked
/// again, so a kill moves fire onto the next nearest enemy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestEnemy;

impl NearestEnemy {
    /// Creates the policy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Nearest active hostile within `radius`, lower id on ties.
    #[must_use]
    pub fn nearest_hostile<'a>(unit: &Unit, field: &'a Battlefield, radius: f32) -> Option<&'a Unit> {
        let mut best: Option<(&Unit, f32)> = None;
        for other in field.active_units() {
            if !unit.faction.hostile_to(other.faction) {
                continue;
            }
            let distance = unit.position.world_distance(other.position);
            if distance > radius {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((other, distance));
            }
        }
        best.map(|(other, _)| other)
    }

    /// Affordable option with the highest hit chance, table order on ties.
    #[must_use]
    pub fn best_option(attacker: &Unit, target: &Unit) -> Option<AttackOption> {
        let distance = attacker.position.world_distance(target.position);
        let mut best: Option<(AttackOption, f32)> = None;
        for option in AttackOption::ALL {
            if !option.usable_by(attacker) {
                continue;
            }
            let chance = option.hit_chance(attacker, target, distance);
            if best.map_or(true, |(_, c)| chance > c) {
                best = Some((option, chance));
            }
        }
        best.map(|(option, _)| option)
    }

    /// Empty magazine, and a reload both fits the AP and leaves a shot possible.
    fn should_reload(unit: &Unit, reload_ap_cost: u32) -> bool {
        let weapon = &unit.weapon;
        if weapon.capacity == 0 || weapon.magazine > 0 || !unit.ap.can_afford(reload_ap_cost) {
            return false;
        }
        let ap_left = unit.ap.current - reload_ap_cost;
        AttackOption::available_for(weapon).into_iter().any(|option| {
            option.uses_ammo()
                && ap_left >= option.ap_cost()
                && unit.stamina.can_afford(option.stamina_cost())
        })
    }

    /// Shortest path to a free tile orthogonally adjacent to `target`.
    fn approach_path(
        unit: &Unit,
        target: &Unit,
        field: &Battlefield,
        planner: &dyn PathPlanner,
    ) -> Option<Vec<GridCoord>> {
        let walkable = field.walkable_for(unit.id)?;
        let candidates: Vec<GridCoord> = target
            .position
            .orthogonal_neighbors()
            .filter(|tile| walkable.contains(*tile))
            .collect();

        candidates
            .par_iter()
            .enumerate()
            .filter_map(|(idx, goal)| {
                let path = planner.find_path(unit.position, *goal, &walkable);
                (!path.is_empty()).then_some((path.len(), idx, path))
            })
            .min_by_key(|(len, idx, _)| (*len, *idx))
            .map(|(_, _, path)| path)
    }
}

impl Controller for NearestEnemy {
    fn decide(&self, ctx: &TurnContext, field: &Battlefield, planner: &dyn PathPlanner) -> Decision {
        let Some(unit) = field.get(ctx.unit).filter(|u| u.is_active()) else {
            return Decision::EndTurn;
        };

        let Some(target) = Self::nearest_hostile(unit, field, ctx.detection_radius) else {
            debug!(unit = %unit.id, error = %ActionError::NoLegalTarget { unit: unit.id }, "nothing in sight");
            return Decision::EndTurn;
        };

        if unit.weapon.is_broken() {
            debug!(unit = %unit.id, weapon = %unit.weapon.name, "weapon depleted, ending turn");
            return Decision::EndTurn;
        }

        let distance = unit.position.world_distance(target.position);
        if distance <= unit.weapon.range {
            return match Self::best_option(unit, target) {
                Some(option) => Decision::Attack {
                    target: target.id,
                    option,
                },
                None if Self::should_reload(unit, ctx.reload_ap_cost) => Decision::Reload,
                None => Decision::EndTurn,
            };
        }

        if ctx.has_moved {
            return Decision::EndTurn;
        }

        match Self::approach_path(unit, target, field, planner) {
            Some(path) => {
                debug!(unit = %unit.id, target = %target.id, steps = path.len(), "approaching target");
                Decision::Move { path }
            }
            None => {
                warn!(unit = %unit.id, error = %ActionError::NoLegalTarget { unit: unit.id }, "cannot surround target");
                Decision::EndTurn
            }
        }
    }
}
