//! Turn scheduler: the battle's state machine.
//!
//! The scheduler moves through
//!
//! ```text
//! RoundStart -> UnitTurn(0) -> UnitTurn(1) -> ... -> RoundEnd -> RoundStart -> ...
//! ```
//!
//! and parks in `Halted` once a watched faction has no active units. Every
//! call to [`TurnScheduler::step`] performs exactly one transition or one
//! queued step: a tile of movement, a shot, a reload, a controller decision or
//! the end of a turn. Nothing happens between steps, so a host can render,
//! cancel or submit input at any step boundary.
//!
//! # Determinism
//!
//! All dice (initiative and combat) come from one `ChaCha8Rng` seeded at
//! construction. Units are scanned in id order and the initiative sort is
//! stable, so the same seed and the same inputs replay the same battle.

use std::cmp::Reverse;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use lattice::{AStar, GridCoord, PathError, PathPlanner, RangeResolver, ReachableSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::attack::AttackOption;
use crate::battlefield::Battlefield;
use crate::combat::{check_costs, CombatResolver};
use crate::config::RulesConfig;
use crate::controller::{Controller, Decision, NearestEnemy, TurnContext};
use crate::error::{ActionError, ActionResult, Resource};
use crate::events::{BattleEvent, EventLog, EventRecord};
use crate::unit::{Control, StatusFlags, Unit, UnitId};

// =============================================================================
// Public types
// =============================================================================

/// Where the scheduler is in the round.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// About to purge the order and roll initiative.
    RoundStart,
    /// The unit at this index of the turn order is acting.
    UnitTurn(usize),
    /// Every unit has acted.
    RoundEnd,
    /// A watched faction was defeated. Terminal.
    Halted,
}

/// Host input for the acting controllable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Walk to `destination` along the planner's path.
    Move {
        /// The acting unit
        unit: UnitId,
        /// Tile to walk to
        destination: GridCoord,
    },
    /// Fire `option` once at `target`.
    Attack {
        /// The acting unit
        unit: UnitId,
        /// Option to fire
        option: AttackOption,
        /// The target
        target: UnitId,
    },
    /// Refill the magazine.
    Reload {
        /// The acting unit
        unit: UnitId,
    },
    /// Finish the turn.
    EndTurn {
        /// The acting unit
        unit: UnitId,
    },
}

impl Intent {
    /// The unit the intent is for.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        match self {
            Self::Move { unit, .. }
            | Self::Attack { unit, .. }
            | Self::Reload { unit }
            | Self::EndTurn { unit } => *unit,
        }
    }
}

/// Result of one [`TurnScheduler::step`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Something happened; call `step` again.
    Advanced,
    /// A controllable unit is waiting for an [`Intent`].
    AwaitingInput,
    /// The battle is over.
    Halted,
}

/// One tile of a previewed path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Tile entered by this step
    pub tile: GridCoord,
    /// AP left after the step, if it is taken
    pub ap_after: u32,
    /// The unit can pay for this step and every one before it
    pub affordable: bool,
}

/// Swappable collaborators of the scheduler.
pub struct Dependencies {
    /// Path search for movement
    pub planner: Box<dyn PathPlanner>,
    /// Flood-fill for movement and attack previews
    pub ranges: RangeResolver,
    /// Attack state machine
    pub combat: CombatResolver,
    /// Policy for autonomous units
    pub controller: Box<dyn Controller>,
}

impl Default for Dependencies {
    fn default() -> Self {
        Self {
            planner: Box::new(AStar::new()),
            ranges: RangeResolver::new(),
            combat: CombatResolver::new(),
            controller: Box::new(NearestEnemy::new()),
        }
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("planner", &"<dyn PathPlanner>")
            .field("ranges", &self.ranges)
            .field("combat", &self.combat)
            .field("controller", &"<dyn Controller>")
            .finish()
    }
}

/// A queued atomic action of the acting unit.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Step {
    MoveTo(GridCoord),
    Attack { target: UnitId, option: AttackOption },
    Reload,
    EndTurn,
}

// =============================================================================
// TurnScheduler
// =============================================================================

/// Drives rounds, turns and queued steps over a [`Battlefield`].
///
/// # Example
///
/// ```
/// use gridwar_core::{
///     Attributes, Battlefield, Control, Faction, Intent, RulesConfig, StepOutcome, TileMap,
///     TurnScheduler, Unit, UnitStats, WeaponTemplate,
/// };
/// use lattice::GridCoord;
///
/// let mut field = Battlefield::new(TileMap::rectangular(6, 6));
/// let hero = field.spawn(Unit::new(
///     "hero", Faction::Ally, Control::Controllable, GridCoord::new(0, 0),
///     Attributes::default(), UnitStats::default(), WeaponTemplate::pistol().instantiate(),
/// ));
/// field.spawn(Unit::new(
///     "grunt", Faction::Enemy, Control::Autonomous, GridCoord::new(5, 5),
///     Attributes::default(), UnitStats::default(), WeaponTemplate::claws().instantiate(),
/// ));
///
/// let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), 1);
/// assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
/// assert_eq!(scheduler.current_unit(), Some(hero));
///
/// scheduler.submit(Intent::EndTurn { unit: hero }).unwrap();
/// scheduler.step();
/// assert_ne!(scheduler.current_unit(), Some(hero));
/// ```
pub struct TurnScheduler {
    field: Battlefield,
    rules: RulesConfig,
    deps: Dependencies,
    rng: ChaCha8Rng,
    seed: u64,
    phase: TurnPhase,
    round: u32,
    order: Vec<UnitId>,
    queue: VecDeque<Step>,
    turn_started: bool,
    has_moved: bool,
    events: EventLog,
}

impl fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("order", &self.order)
            .field("queue", &self.queue)
            .field("units", &self.field.len())
            .field("seed", &self.seed)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

impl TurnScheduler {
    /// Creates a scheduler with the default collaborators.
    #[must_use]
    pub fn new(field: Battlefield, rules: RulesConfig, seed: u64) -> Self {
        Self::with_dependencies(field, rules, seed, Dependencies::default())
    }

    /// Creates a scheduler with injected collaborators.
    #[must_use]
    pub fn with_dependencies(
        field: Battlefield,
        rules: RulesConfig,
        seed: u64,
        deps: Dependencies,
    ) -> Self {
        Self {
            field,
            rules,
            deps,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            phase: TurnPhase::RoundStart,
            round: 0,
            order: Vec::new(),
            queue: VecDeque::new(),
            turn_started: false,
            has_moved: false,
            events: EventLog::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The battlefield.
    #[must_use]
    pub fn battlefield(&self) -> &Battlefield {
        &self.field
    }

    /// Mutable battlefield access for hosts and editors. Changes take effect
    /// from the next step.
    pub fn battlefield_mut(&mut self) -> &mut Battlefield {
        &mut self.field
    }

    /// Adds a unit mid-battle. It joins the order at the next round start.
    pub fn spawn(&mut self, unit: Unit) -> UnitId {
        self.field.spawn(unit)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Current round, starting at 1 once the first round begins.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// The unit whose turn it is, if a unit turn is in progress.
    #[must_use]
    pub fn current_unit(&self) -> Option<UnitId> {
        match self.phase {
            TurnPhase::UnitTurn(idx) => self.order.get(idx).copied(),
            _ => None,
        }
    }

    /// Acting order of the current round.
    #[must_use]
    pub fn turn_order(&self) -> &[UnitId] {
        &self.order
    }

    /// Steps waiting to run for the acting unit.
    #[must_use]
    pub fn queued_steps(&self) -> usize {
        self.queue.len()
    }

    /// The master seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The rules in force.
    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Drains every event recorded since the last call.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.take_events()
    }

    // -------------------------------------------------------------------------
    // Driving
    // -------------------------------------------------------------------------

    /// Performs one transition or one queued step.
    pub fn step(&mut self) -> StepOutcome {
        match self.phase {
            TurnPhase::Halted => return StepOutcome::Halted,
            TurnPhase::RoundStart => self.start_round(),
            TurnPhase::UnitTurn(idx) => {
                if let Some(waiting) = self.step_unit_turn(idx) {
                    return waiting;
                }
            }
            TurnPhase::RoundEnd => {
                debug!(round = self.round, "round ended");
                self.phase = TurnPhase::RoundStart;
            }
        }
        if self.phase == TurnPhase::Halted {
            StepOutcome::Halted
        } else {
            StepOutcome::Advanced
        }
    }

    /// Steps until input is needed, the battle halts, or the step budget from
    /// [`RulesConfig::max_steps`] runs out (reported as `Advanced`).
    pub fn run_until_idle(&mut self) -> StepOutcome {
        for _ in 0..self.rules.max_steps {
            match self.step() {
                StepOutcome::Advanced => {}
                idle => return idle,
            }
        }
        warn!(round = self.round, budget = self.rules.max_steps, "step budget exhausted");
        StepOutcome::Advanced
    }

    /// Validates an intent for the acting controllable unit and queues its
    /// steps. Returns the number of steps queued.
    ///
    /// # Errors
    ///
    /// Any [`ActionError`]. A rejected intent changes nothing except for an
    /// [`BattleEvent::ActionRejected`] in the log.
    pub fn submit(&mut self, intent: Intent) -> ActionResult<usize> {
        match self.plan_intent(&intent) {
            Ok(steps) => {
                let count = steps.len();
                debug!(unit = %intent.unit(), ?intent, steps = count, "intent accepted");
                self.queue.extend(steps);
                Ok(count)
            }
            Err(err) => {
                self.reject(Some(intent.unit()), &err);
                Err(err)
            }
        }
    }

    /// Drops all queued steps of the acting unit. Resources already spent stay
    /// spent. Returns the number of steps dropped.
    pub fn cancel(&mut self) -> usize {
        let dropped = self.queue.len();
        if dropped > 0 {
            if let Some(unit) = self.current_unit() {
                self.drop_queue(unit);
            }
        }
        dropped
    }

    // -------------------------------------------------------------------------
    // Previews
    // -------------------------------------------------------------------------

    /// The path `unit` would walk to `destination`, each step flagged with
    /// whether AP and stamina cover it.
    ///
    /// # Errors
    ///
    /// [`ActionError::UnknownUnit`] or the planner's [`PathError`].
    pub fn path_preview(&self, unit: UnitId, destination: GridCoord) -> ActionResult<Vec<PathStep>> {
        let mover = self.field.get(unit).ok_or(ActionError::UnknownUnit(unit))?;
        let path = self.find_path_for(mover, destination)?;

        let mut ap = mover.ap.current;
        let mut stamina = mover.stamina.current;
        let mut affordable = true;
        Ok(path
            .into_iter()
            .map(|tile| {
                affordable = affordable
                    && ap >= self.rules.move_ap_cost
                    && stamina >= self.rules.move_stamina_cost;
                if affordable {
                    ap -= self.rules.move_ap_cost;
                    stamina -= self.rules.move_stamina_cost;
                }
                PathStep {
                    tile,
                    ap_after: ap,
                    affordable,
                }
            })
            .collect())
    }

    /// Tiles `unit` could reach this turn, flood-filled over the current
    /// walkable set with its remaining step budget.
    ///
    /// # Errors
    ///
    /// [`ActionError::UnknownUnit`].
    #[allow(clippy::cast_precision_loss)]
    pub fn movement_range(&self, unit: UnitId) -> ActionResult<ReachableSet> {
        let mover = self.field.get(unit).ok_or(ActionError::UnknownUnit(unit))?;
        let walkable = self
            .field
            .walkable_for(unit)
            .ok_or(ActionError::UnknownUnit(unit))?;
        let budget = self.step_budget(mover) as f32;
        Ok(self
            .deps
            .ranges
            .find_reachable(mover.position, budget, |tile| walkable.contains(tile)))
    }

    /// Map tiles within `unit`'s weapon range.
    ///
    /// # Errors
    ///
    /// [`ActionError::UnknownUnit`].
    pub fn attack_range(&self, unit: UnitId) -> ActionResult<ReachableSet> {
        let attacker = self.field.get(unit).ok_or(ActionError::UnknownUnit(unit))?;
        let map = self.field.map();
        Ok(self
            .deps
            .ranges
            .find_reachable(attacker.position, attacker.weapon.range, |tile| map.contains(tile)))
    }

    /// Hit chance `attacker` would have with `option` against `target`.
    ///
    /// # Errors
    ///
    /// Whatever selecting the option or aiming at the target would raise.
    pub fn hit_chance_preview(
        &self,
        attacker: UnitId,
        target: UnitId,
        option: AttackOption,
    ) -> ActionResult<f32> {
        let shooter = self.field.get(attacker).ok_or(ActionError::UnknownUnit(attacker))?;
        let defender = self.field.get(target).ok_or(ActionError::UnknownUnit(target))?;
        let mut trial = CombatResolver::new();
        trial.select(shooter, option)?;
        trial.choose_target(shooter, defender)
    }

    // -------------------------------------------------------------------------
    // Round lifecycle
    // -------------------------------------------------------------------------

    fn start_round(&mut self) {
        if self.check_defeat() {
            return;
        }
        self.round += 1;

        let field = &self.field;
        self.order
            .retain(|id| field.get(*id).is_some_and(Unit::is_active));
        let known: BTreeSet<UnitId> = self.order.iter().copied().collect();
        let newcomers: Vec<UnitId> = field
            .active_units()
            .map(|unit| unit.id)
            .filter(|id| !known.contains(id))
            .collect();
        self.order.extend(newcomers);

        let mut by_id = self.order.clone();
        by_id.sort_unstable();
        for id in by_id {
            if let Some(unit) = self.field.get_mut(id) {
                unit.flags.remove(StatusFlags::TURN_DONE);
                unit.roll_initiative(&mut self.rng, self.rules.initiative_roll_max);
            }
        }

        let field = &self.field;
        self.order
            .sort_by_key(|id| Reverse(field.get(*id).map_or(i32::MIN, |unit| unit.initiative)));

        info!(round = self.round, units = self.order.len(), "round started");
        self.events.push(
            self.round,
            BattleEvent::RoundStarted {
                round: self.round,
                order: self.order.clone(),
            },
        );

        self.phase = if self.order.is_empty() {
            warn!(round = self.round, "no active units, halting");
            TurnPhase::Halted
        } else {
            TurnPhase::UnitTurn(0)
        };
    }

    /// Runs one step of the turn at `idx`. Returns `Some` when the turn is
    /// waiting for input.
    fn step_unit_turn(&mut self, idx: usize) -> Option<StepOutcome> {
        let Some(id) = self.order.get(idx).copied() else {
            self.phase = TurnPhase::RoundEnd;
            return None;
        };

        if !self.turn_started {
            if self.field.get(id).is_some_and(|unit| unit.is_active() && !unit.has_acted()) {
                self.begin_turn(id);
            } else {
                trace!(unit = %id, "skipping destroyed or finished unit");
                self.phase = self.next_turn(idx);
            }
            return None;
        }

        if let Some(step) = self.queue.pop_front() {
            self.execute(id, step);
            return None;
        }

        let control = self.field.get(id).filter(|unit| unit.is_active()).map(|unit| unit.control);
        match control {
            Some(Control::Autonomous) => self.think(id),
            Some(Control::Controllable) if self.can_still_act(id) => {
                return Some(StepOutcome::AwaitingInput);
            }
            Some(Control::Controllable) => {
                debug!(unit = %id, "out of AP, ending turn");
                self.end_turn(id);
            }
            None => self.end_turn(id),
        }
        None
    }

    fn begin_turn(&mut self, id: UnitId) {
        let recovery = self.rules.stamina_recovery_per_turn;
        let Some(unit) = self.field.get_mut(id) else {
            return;
        };
        unit.recover_ap();
        unit.recover_stamina(recovery);
        let status = unit.status();

        self.turn_started = true;
        self.has_moved = false;
        self.queue.clear();
        self.deps.combat.cancel();

        debug!(unit = %id, ap = status.ap.current, stamina = status.stamina.current, "turn started");
        self.events.push(self.round, BattleEvent::TurnStarted { unit: id });
        self.events.push(self.round, BattleEvent::UnitStateChanged(status));
    }

    fn end_turn(&mut self, id: UnitId) {
        if let Some(unit) = self.field.get_mut(id) {
            unit.flags.insert(StatusFlags::TURN_DONE);
        }
        self.queue.clear();
        self.deps.combat.cancel();
        self.turn_started = false;
        self.events.push(self.round, BattleEvent::TurnEnded { unit: id });
        debug!(unit = %id, "turn ended");

        if self.check_defeat() {
            return;
        }
        if let TurnPhase::UnitTurn(idx) = self.phase {
            self.phase = self.next_turn(idx);
        }
    }

    fn next_turn(&self, idx: usize) -> TurnPhase {
        if idx + 1 < self.order.len() {
            TurnPhase::UnitTurn(idx + 1)
        } else {
            TurnPhase::RoundEnd
        }
    }

    /// Halts if a watched faction has no active unit left.
    fn check_defeat(&mut self) -> bool {
        let field = &self.field;
        let defeated = self
            .rules
            .watched_factions
            .iter()
            .copied()
            .find(|faction| !field.faction_active(*faction));
        let Some(faction) = defeated else {
            return false;
        };

        info!(round = self.round, %faction, "faction defeated, battle halted");
        self.events.push(self.round, BattleEvent::FactionDefeated { faction });
        self.queue.clear();
        self.deps.combat.cancel();
        self.turn_started = false;
        self.phase = TurnPhase::Halted;
        true
    }

    // -------------------------------------------------------------------------
    // Steps
    // -------------------------------------------------------------------------

    fn execute(&mut self, id: UnitId, step: Step) {
        trace!(unit = %id, ?step, "executing step");
        let result = match step {
            Step::MoveTo(tile) => self.move_unit(id, tile),
            Step::Attack { target, option } => self.attack(id, target, option),
            Step::Reload => self.reload(id),
            Step::EndTurn => {
                self.end_turn(id);
                Ok(())
            }
        };

        if let Err(err) = result {
            self.deps.combat.cancel();
            self.reject(Some(id), &err);
            self.drop_queue(id);
            let autonomous = self.field.get(id).is_some_and(|unit| unit.control == Control::Autonomous);
            if autonomous && matches!(step, Step::Attack { .. } | Step::Reload) {
                self.queue.push_back(Step::EndTurn);
            }
        }
    }

    fn move_unit(&mut self, id: UnitId, tile: GridCoord) -> ActionResult<()> {
        let walkable = self.field.walkable_for(id).ok_or(ActionError::UnknownUnit(id))?;
        let (move_ap, move_stamina) = (self.rules.move_ap_cost, self.rules.move_stamina_cost);
        let unit = self.field.get_mut(id).ok_or(ActionError::UnknownUnit(id))?;
        let from = unit.position;

        if from.chebyshev(tile) != 1 || !walkable.contains(tile) {
            return Err(PathError::InvalidEndpoint {
                start: from,
                goal: tile,
            }
            .into());
        }
        if !unit.ap.can_afford(move_ap) {
            return Err(ActionError::insufficient(Resource::ActionPoints, move_ap, unit.ap.current));
        }
        if !unit.stamina.can_afford(move_stamina) {
            return Err(ActionError::insufficient(Resource::Stamina, move_stamina, unit.stamina.current));
        }

        unit.spend_ap(move_ap);
        unit.spend_stamina(move_stamina);
        unit.position = tile;
        let status = unit.status();

        trace!(unit = %id, %from, to = %tile, "unit moved");
        self.events.push(self.round, BattleEvent::UnitMoved { unit: id, from, to: tile });
        self.events.push(self.round, BattleEvent::UnitStateChanged(status));
        Ok(())
    }

    fn attack(&mut self, id: UnitId, target: UnitId, option: AttackOption) -> ActionResult<()> {
        let attacker = self.field.get(id).ok_or(ActionError::UnknownUnit(id))?;
        let defender = self.field.get(target).ok_or(ActionError::UnknownUnit(target))?;
        if !attacker.faction.hostile_to(defender.faction) {
            return Err(ActionError::InvalidTarget { target });
        }
        self.deps.combat.select(attacker, option)?;
        self.deps.combat.choose_target(attacker, defender)?;

        let (attacker, defender) = self
            .field
            .pair_mut(id, target)
            .ok_or(ActionError::InvalidTarget { target })?;
        let report = self.deps.combat.resolve(attacker, defender, &mut self.rng)?;
        let attacker_status = attacker.status();
        let defender_status = defender.status();
        let destroyed = report.target_destroyed;

        self.events.push(self.round, BattleEvent::AttackResolved(report));
        self.events.push(self.round, BattleEvent::UnitStateChanged(attacker_status));
        self.events.push(self.round, BattleEvent::UnitStateChanged(defender_status));
        if destroyed {
            self.events.push(self.round, BattleEvent::UnitDestroyed { unit: target, by: id });
            self.check_defeat();
        }
        Ok(())
    }

    fn reload(&mut self, id: UnitId) -> ActionResult<()> {
        let cost = self.rules.reload_ap_cost;
        let unit = self.field.get_mut(id).ok_or(ActionError::UnknownUnit(id))?;
        check_reload(unit, cost)?;
        unit.spend_ap(cost);
        let loaded = unit.weapon.reload();
        let status = unit.status();

        debug!(unit = %id, loaded, "weapon reloaded");
        self.events.push(self.round, BattleEvent::UnitStateChanged(status));
        Ok(())
    }

    fn think(&mut self, id: UnitId) {
        let ctx = TurnContext {
            unit: id,
            has_moved: self.has_moved,
            detection_radius: self.rules.detection_radius,
            reload_ap_cost: self.rules.reload_ap_cost,
        };
        let decision = self
            .deps
            .controller
            .decide(&ctx, &self.field, self.deps.planner.as_ref());
        trace!(unit = %id, ?decision, "controller decided");

        match decision {
            Decision::Move { mut path } => {
                self.has_moved = true;
                let budget = self
                    .field
                    .get(id)
                    .map_or(0, |unit| self.step_budget(unit));
                path.truncate(usize::try_from(budget).unwrap_or(usize::MAX));
                self.queue.extend(path.into_iter().map(Step::MoveTo));
            }
            Decision::Attack { target, option } => {
                self.queue.push_back(Step::Attack { target, option });
            }
            Decision::Reload => self.queue.push_back(Step::Reload),
            Decision::EndTurn => self.queue.push_back(Step::EndTurn),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn plan_intent(&self, intent: &Intent) -> ActionResult<Vec<Step>> {
        if self.phase == TurnPhase::Halted {
            return Err(ActionError::Halted);
        }
        let acting = self
            .current_unit()
            .filter(|_| self.turn_started)
            .ok_or(ActionError::NoActiveTurn)?;

        let id = intent.unit();
        let unit = self.field.get(id).ok_or(ActionError::UnknownUnit(id))?;
        if !unit.is_active() {
            return Err(ActionError::UnitDestroyed(id));
        }
        if id != acting || unit.has_acted() || unit.control != Control::Controllable {
            return Err(ActionError::NotYourTurn { unit: id });
        }
        if !self.queue.is_empty() {
            return Err(ActionError::Busy {
                pending: self.queue.len(),
            });
        }

        match *intent {
            Intent::Move { destination, .. } => {
                let path = self.find_path_for(unit, destination)?;
                let steps = u32::try_from(path.len()).unwrap_or(u32::MAX);
                let ap_needed = steps.saturating_mul(self.rules.move_ap_cost);
                let stamina_needed = steps.saturating_mul(self.rules.move_stamina_cost);
                if !unit.ap.can_afford(ap_needed) {
                    return Err(ActionError::insufficient(Resource::ActionPoints, ap_needed, unit.ap.current));
                }
                if !unit.stamina.can_afford(stamina_needed) {
                    return Err(ActionError::insufficient(Resource::Stamina, stamina_needed, unit.stamina.current));
                }
                Ok(path.into_iter().map(Step::MoveTo).collect())
            }
            Intent::Attack { option, target, .. } => {
                let defender = self.field.get(target).ok_or(ActionError::UnknownUnit(target))?;
                if !unit.faction.hostile_to(defender.faction) {
                    return Err(ActionError::InvalidTarget { target });
                }
                let mut trial = CombatResolver::new();
                trial.select(unit, option)?;
                trial.choose_target(unit, defender)?;
                check_costs(unit, option)?;
                Ok(vec![Step::Attack { target, option }])
            }
            Intent::Reload { .. } => {
                check_reload(unit, self.rules.reload_ap_cost)?;
                Ok(vec![Step::Reload])
            }
            Intent::EndTurn { .. } => Ok(vec![Step::EndTurn]),
        }
    }

    fn find_path_for(&self, unit: &Unit, destination: GridCoord) -> ActionResult<Vec<GridCoord>> {
        let walkable = self
            .field
            .walkable_for(unit.id)
            .ok_or(ActionError::UnknownUnit(unit.id))?;
        Ok(self
            .deps
            .planner
            .try_find_path(unit.position, destination, &walkable)?)
    }

    /// Tiles the unit can still pay for.
    fn step_budget(&self, unit: &Unit) -> u32 {
        let by_ap = unit
            .ap
            .current
            .checked_div(self.rules.move_ap_cost)
            .unwrap_or(u32::MAX);
        let by_stamina = unit
            .stamina
            .current
            .checked_div(self.rules.move_stamina_cost)
            .unwrap_or(u32::MAX);
        by_ap.min(by_stamina)
    }

    /// A controllable unit has AP left and can afford its cheapest action.
    fn can_still_act(&self, id: UnitId) -> bool {
        let Some(unit) = self.field.get(id) else {
            return false;
        };
        if unit.ap.is_empty() {
            return false;
        }
        let mut cheapest = self.rules.move_ap_cost;
        for option in AttackOption::available_for(&unit.weapon) {
            cheapest = cheapest.min(option.ap_cost());
        }
        if unit.weapon.capacity > 0 && unit.weapon.magazine < unit.weapon.capacity {
            cheapest = cheapest.min(self.rules.reload_ap_cost);
        }
        unit.ap.can_afford(cheapest)
    }

    fn reject(&mut self, unit: Option<UnitId>, err: &ActionError) {
        warn!(unit = ?unit, error = %err, "action rejected");
        self.events.push(
            self.round,
            BattleEvent::ActionRejected {
                unit,
                reason: err.to_string(),
            },
        );
    }

    fn drop_queue(&mut self, unit: UnitId) {
        let dropped_steps = self.queue.len();
        self.queue.clear();
        if dropped_steps > 0 {
            debug!(unit = %unit, dropped_steps, "queued steps cancelled");
            self.events.push(
                self.round,
                BattleEvent::ActionCancelled {
                    unit,
                    dropped_steps,
                },
            );
        }
    }
}

fn check_reload(unit: &Unit, cost: u32) -> ActionResult<()> {
    if unit.weapon.capacity == 0 {
        return Err(ActionError::NotReloadable {
            weapon: unit.weapon.name.clone(),
        });
    }
    if !unit.ap.can_afford(cost) {
        return Err(ActionError::insufficient(Resource::ActionPoints, cost, unit.ap.current));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlefield::TileMap;
    use crate::unit::{Attributes, Faction, Pool, UnitStats};
    use crate::weapon::WeaponTemplate;

    fn unit(faction: Faction, control: Control, x: i32, y: i32, weapon: &WeaponTemplate) -> Unit {
        Unit::new(
            "u",
            faction,
            control,
            GridCoord::new(x, y),
            Attributes::default(),
            UnitStats::default(),
            weapon.instantiate(),
        )
    }

    /// A controllable ally that always acts before the autonomous enemy.
    fn duel(enemy_x: i32) -> (TurnScheduler, UnitId, UnitId) {
        let mut field = Battlefield::new(TileMap::rectangular(10, 10));
        let mut hero = unit(Faction::Ally, Control::Controllable, 0, 0, &WeaponTemplate::pistol());
        hero.attributes.intelligence = 50;
        let hero = field.spawn(hero);
        let enemy = field.spawn(unit(Faction::Enemy, Control::Autonomous, enemy_x, 0, &WeaponTemplate::claws()));
        let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), 11);
        assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
        (scheduler, hero, enemy)
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn first_step_starts_round_one() {
            let mut field = Battlefield::new(TileMap::rectangular(4, 4));
            field.spawn(unit(Faction::Ally, Control::Controllable, 0, 0, &WeaponTemplate::pistol()));
            field.spawn(unit(Faction::Enemy, Control::Controllable, 3, 3, &WeaponTemplate::claws()));
            let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), 1);

            assert_eq!(scheduler.phase(), TurnPhase::RoundStart);
            assert_eq!(scheduler.step(), StepOutcome::Advanced);
            assert_eq!(scheduler.round(), 1);
            assert_eq!(scheduler.phase(), TurnPhase::UnitTurn(0));
            assert_eq!(scheduler.turn_order().len(), 2);
        }

        #[test]
        fn initiative_sorts_descending() {
            let (scheduler, hero, enemy) = duel(5);
            assert_eq!(scheduler.turn_order(), &[hero, enemy]);
            assert_eq!(scheduler.current_unit(), Some(hero));
        }

        #[test]
        fn missing_faction_halts_at_round_start() {
            let mut field = Battlefield::new(TileMap::rectangular(4, 4));
            field.spawn(unit(Faction::Ally, Control::Autonomous, 0, 0, &WeaponTemplate::pistol()));
            let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), 1);

            assert_eq!(scheduler.step(), StepOutcome::Halted);
            let events = scheduler.take_events();
            assert!(matches!(
                events.last().map(|r| &r.event),
                Some(BattleEvent::FactionDefeated { faction: Faction::Enemy })
            ));
        }

        #[test]
        fn tied_initiative_keeps_previous_order() {
            let rules = RulesConfig {
                initiative_roll_max: 0,
                ..RulesConfig::default()
            };
            let mut field = Battlefield::new(TileMap::rectangular(6, 6));
            let first = field.spawn(unit(Faction::Ally, Control::Controllable, 0, 0, &WeaponTemplate::pistol()));
            let mut fast = unit(Faction::Enemy, Control::Controllable, 5, 5, &WeaponTemplate::claws());
            fast.attributes.intelligence = 10;
            let fast = field.spawn(fast);
            let mut scheduler = TurnScheduler::new(field, rules, 3);

            assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
            assert_eq!(scheduler.turn_order(), &[fast, first]);

            // From round two on every unit rolls the same initiative.
            scheduler.battlefield_mut().get_mut(fast).unwrap().attributes.intelligence = 3;
            let newcomer = scheduler.spawn(unit(Faction::Enemy, Control::Controllable, 5, 0, &WeaponTemplate::claws()));
            let second_newcomer = scheduler.spawn(unit(Faction::Ally, Control::Controllable, 0, 5, &WeaponTemplate::pistol()));
            assert!(newcomer < second_newcomer);

            for _ in 0..2 {
                let acting = scheduler.current_unit().unwrap();
                scheduler.submit(Intent::EndTurn { unit: acting }).unwrap();
                assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
            }
            assert_eq!(scheduler.round(), 2);
            assert_eq!(scheduler.turn_order(), &[fast, first, newcomer, second_newcomer]);
        }

        #[test]
        fn finished_unit_is_flagged_until_next_round() {
            let (mut scheduler, hero, _) = duel(5);
            assert!(!scheduler.battlefield().get(hero).unwrap().has_acted());

            scheduler.submit(Intent::EndTurn { unit: hero }).unwrap();
            scheduler.step();
            assert!(scheduler.battlefield().get(hero).unwrap().has_acted());

            assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
            assert_eq!(scheduler.round(), 2);
            assert!(!scheduler.battlefield().get(hero).unwrap().has_acted());
        }

        #[test]
        fn finished_unit_is_skipped_when_its_slot_comes_up() {
            let (mut scheduler, hero, enemy) = duel(5);
            scheduler
                .battlefield_mut()
                .get_mut(enemy)
                .unwrap()
                .flags
                .insert(StatusFlags::TURN_DONE);
            scheduler.submit(Intent::EndTurn { unit: hero }).unwrap();

            assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
            let events = scheduler.take_events();
            let round_one: Vec<_> = events.iter().filter(|r| r.round == 1).collect();
            assert!(!round_one
                .iter()
                .any(|r| r.event == BattleEvent::TurnStarted { unit: enemy }));
            assert_eq!(scheduler.round(), 2);
        }

        #[test]
        fn turn_refills_ap() {
            let (mut scheduler, hero, _) = duel(5);
            scheduler.submit(Intent::Move { unit: hero, destination: GridCoord::new(1, 0) }).unwrap();
            scheduler.step();
            let spent = scheduler.battlefield().get(hero).unwrap().ap;
            assert_eq!(spent.current, spent.max - 2);

            scheduler.submit(Intent::EndTurn { unit: hero }).unwrap();
            assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
            let refilled = scheduler.battlefield().get(hero).unwrap().ap;
            assert_eq!(refilled.current, refilled.max);
        }
    }

    mod intent_tests {
        use super::*;

        #[test]
        fn move_queues_one_step_per_tile() {
            let (mut scheduler, hero, _) = duel(9);
            let steps = scheduler
                .submit(Intent::Move { unit: hero, destination: GridCoord::new(3, 0) })
                .unwrap();
            assert_eq!(steps, 3);
            assert_eq!(scheduler.queued_steps(), 3);

            scheduler.step();
            assert_eq!(scheduler.battlefield().get(hero).unwrap().position, GridCoord::new(1, 0));
            assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
            assert_eq!(scheduler.battlefield().get(hero).unwrap().position, GridCoord::new(3, 0));
        }

        #[test]
        fn unaffordable_move_is_rejected_without_mutation() {
            let (mut scheduler, hero, _) = duel(9);
            let before = scheduler.battlefield().get(hero).unwrap().clone();
            scheduler.take_events();

            let err = scheduler
                .submit(Intent::Move { unit: hero, destination: GridCoord::new(8, 8) })
                .unwrap_err();
            assert!(matches!(
                err,
                ActionError::InsufficientResources { resource: Resource::ActionPoints, .. }
            ));
            assert_eq!(scheduler.battlefield().get(hero).unwrap(), &before);
            assert_eq!(scheduler.queued_steps(), 0);
            assert!(matches!(
                scheduler.take_events()[0].event,
                BattleEvent::ActionRejected { unit: Some(_), .. }
            ));
        }

        #[test]
        fn occupied_destination_is_invalid() {
            let (mut scheduler, hero, _) = duel(4);
            let err = scheduler
                .submit(Intent::Move { unit: hero, destination: GridCoord::new(4, 0) })
                .unwrap_err();
            assert!(matches!(err, ActionError::Path(PathError::InvalidEndpoint { .. })));
        }

        #[test]
        fn other_units_cannot_act() {
            let (mut scheduler, _, enemy) = duel(5);
            let err = scheduler.submit(Intent::EndTurn { unit: enemy }).unwrap_err();
            assert_eq!(err, ActionError::NotYourTurn { unit: enemy });
        }

        #[test]
        fn busy_queue_rejects_new_intents() {
            let (mut scheduler, hero, _) = duel(9);
            scheduler.submit(Intent::Move { unit: hero, destination: GridCoord::new(2, 0) }).unwrap();
            let err = scheduler.submit(Intent::EndTurn { unit: hero }).unwrap_err();
            assert_eq!(err, ActionError::Busy { pending: 2 });
        }

        #[test]
        fn cancel_keeps_spent_resources() {
            let (mut scheduler, hero, _) = duel(9);
            scheduler.submit(Intent::Move { unit: hero, destination: GridCoord::new(3, 0) }).unwrap();
            scheduler.step();
            assert_eq!(scheduler.cancel(), 2);

            let hero_state = scheduler.battlefield().get(hero).unwrap();
            assert_eq!(hero_state.position, GridCoord::new(1, 0));
            assert_eq!(hero_state.ap.current, hero_state.ap.max - 2);
            assert!(scheduler
                .take_events()
                .iter()
                .any(|r| r.event == BattleEvent::ActionCancelled { unit: hero, dropped_steps: 2 }));
        }

        #[test]
        fn out_of_range_attack_is_rejected() {
            let (mut scheduler, hero, enemy) = duel(9);
            let err = scheduler
                .submit(Intent::Attack { unit: hero, option: AttackOption::QuickShot, target: enemy })
                .unwrap_err();
            assert!(matches!(err, ActionError::TargetOutOfRange { .. }));
        }

        #[test]
        fn attack_spends_ammo_and_ap() {
            let (mut scheduler, hero, enemy) = duel(2);
            scheduler
                .submit(Intent::Attack { unit: hero, option: AttackOption::AimedShot, target: enemy })
                .unwrap();
            scheduler.step();

            let hero_state = scheduler.battlefield().get(hero).unwrap();
            assert_eq!(hero_state.ap.current, hero_state.ap.max - 3);
            assert_eq!(hero_state.weapon.magazine, hero_state.weapon.capacity - 1);
            assert!(scheduler
                .take_events()
                .iter()
                .any(|r| matches!(r.event, BattleEvent::AttackResolved(_))));
        }

        #[test]
        fn reload_refills_magazine() {
            let (mut scheduler, hero, _) = duel(9);
            scheduler.field.get_mut(hero).unwrap().weapon.magazine = 1;
            scheduler.submit(Intent::Reload { unit: hero }).unwrap();
            scheduler.step();
            let weapon = &scheduler.battlefield().get(hero).unwrap().weapon;
            assert_eq!(weapon.magazine, weapon.capacity);
        }

        #[test]
        fn no_turn_before_first_round() {
            let mut field = Battlefield::new(TileMap::rectangular(4, 4));
            let id = field.spawn(unit(Faction::Ally, Control::Controllable, 0, 0, &WeaponTemplate::pistol()));
            let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), 1);
            assert_eq!(scheduler.submit(Intent::EndTurn { unit: id }), Err(ActionError::NoActiveTurn));
        }
    }

    mod auto_end_tests {
        use super::*;

        #[test]
        fn shooting_away_all_ap_ends_the_turn() {
            let (mut scheduler, hero, enemy) = duel(2);
            scheduler.battlefield_mut().get_mut(enemy).unwrap().health = Pool::full(1000);

            // 8 AP buys four quick shots and leaves a half-empty magazine.
            for _ in 0..4 {
                scheduler
                    .submit(Intent::Attack { unit: hero, option: AttackOption::QuickShot, target: enemy })
                    .unwrap();
                scheduler.step();
            }
            let shooter = scheduler.battlefield().get(hero).unwrap();
            assert_eq!(shooter.ap.current, 0);
            assert_eq!(shooter.weapon.magazine, 4);

            scheduler.step();
            assert_ne!(scheduler.current_unit(), Some(hero));
            assert!(scheduler
                .take_events()
                .iter()
                .any(|r| r.event == BattleEvent::TurnEnded { unit: hero }));
        }

        #[test]
        fn controllable_turn_ends_when_ap_runs_out() {
            let (mut scheduler, hero, _) = duel(9);
            // 8 AP: four tiles use it all.
            scheduler.submit(Intent::Move { unit: hero, destination: GridCoord::new(4, 0) }).unwrap();
            for _ in 0..4 {
                scheduler.step();
            }
            assert_eq!(scheduler.battlefield().get(hero).unwrap().ap.current, 0);

            scheduler.step();
            let events = scheduler.take_events();
            assert!(events
                .iter()
                .any(|r| r.event == BattleEvent::TurnEnded { unit: hero }));
        }

        #[test]
        fn autonomous_walk_pays_per_tile_and_stops_when_broke() {
            let (mut scheduler, hero, enemy) = duel(9);
            scheduler.submit(Intent::EndTurn { unit: hero }).unwrap();
            assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);

            // 8 AP at 2 per tile: four of the eight tiles toward the hero.
            let moves = scheduler
                .take_events()
                .iter()
                .filter(|r| matches!(r.event, BattleEvent::UnitMoved { unit, .. } if unit == enemy))
                .count();
            assert_eq!(moves, 4);
            let walker = scheduler.battlefield().get(enemy).unwrap();
            assert_eq!(walker.position.chebyshev(GridCoord::new(0, 0)), 5);
            assert_eq!(walker.ap.current, 0);
            assert_eq!(walker.stamina.current, 60);
        }
    }

    mod preview_tests {
        use super::*;

        #[test]
        fn path_preview_flags_unaffordable_tail() {
            let (scheduler, hero, _) = duel(9);
            let preview = scheduler.path_preview(hero, GridCoord::new(6, 0)).unwrap();
            assert_eq!(preview.len(), 6);
            assert!(preview[..4].iter().all(|s| s.affordable));
            assert!(preview[4..].iter().all(|s| !s.affordable));
            assert_eq!(preview[3].ap_after, 0);
        }

        #[test]
        fn movement_range_respects_budget() {
            let (scheduler, hero, _) = duel(9);
            let range = scheduler.movement_range(hero).unwrap();
            assert!(range.contains(GridCoord::new(4, 0)));
            assert!(!range.contains(GridCoord::new(5, 0)));
            assert!(range.contains(GridCoord::new(0, 0)));
        }

        #[test]
        fn attack_range_covers_weapon_reach() {
            let (scheduler, hero, _) = duel(9);
            let range = scheduler.attack_range(hero).unwrap();
            assert!(range.contains(GridCoord::new(6, 0)));
            assert!(!range.contains(GridCoord::new(7, 0)));
            assert!(!range.contains(GridCoord::new(-1, 0)));
        }

        #[test]
        fn hit_chance_preview_uses_formula() {
            let (scheduler, hero, enemy) = duel(3);
            let chance = scheduler
                .hit_chance_preview(hero, enemy, AttackOption::QuickShot)
                .unwrap();
            // 75 - 15 + 0 - (3 - 1) * 16
            assert!((chance - 28.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn default_dependencies_are_debuggable() {
        let text = format!("{:?}", Dependencies::default());
        assert!(text.contains("Dependencies"));
    }
}
