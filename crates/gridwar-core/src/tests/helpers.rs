//! Battlefield setup and event queries shared by the scenario tests.

use lattice::GridCoord;

use crate::battlefield::{Battlefield, TileMap};
use crate::config::RulesConfig;
use crate::events::{BattleEvent, EventRecord};
use crate::scheduler::{Intent, StepOutcome, TurnScheduler};
use crate::unit::{Attributes, Control, Faction, Unit, UnitId, UnitStats};
use crate::weapon::WeaponTemplate;

// =============================================================================
// Setup
// =============================================================================

/// Spawns a unit with default stats.
pub fn spawn_unit(
    field: &mut Battlefield,
    faction: Faction,
    control: Control,
    position: GridCoord,
    weapon: &WeaponTemplate,
) -> UnitId {
    field.spawn(Unit::new(
        format!("{faction}_{}", field.len() + 1),
        faction,
        control,
        position,
        Attributes::default(),
        UnitStats::default(),
        weapon.instantiate(),
    ))
}

/// Rules with per-turn stamina recovery and map-wide sight, so long fights
/// do not stall.
pub fn endurance_rules() -> RulesConfig {
    RulesConfig {
        stamina_recovery_per_turn: 100,
        detection_radius: 20.0,
        ..RulesConfig::default()
    }
}

/// Two autonomous squads of `per_side` units eight columns apart on a
/// 12x12 map: pistols at `x = 0`, claws at `x = 8`.
pub fn setup_skirmish(per_side: i32, seed: u64) -> TurnScheduler {
    let mut field = Battlefield::new(TileMap::rectangular(12, 12));
    for y in 0..per_side {
        spawn_unit(
            &mut field,
            Faction::Ally,
            Control::Autonomous,
            GridCoord::new(0, y * 2),
            &WeaponTemplate::pistol(),
        );
    }
    for y in 0..per_side {
        spawn_unit(
            &mut field,
            Faction::Enemy,
            Control::Autonomous,
            GridCoord::new(8, y * 2),
            &WeaponTemplate::claws(),
        );
    }
    TurnScheduler::new(field, endurance_rules(), seed)
}

/// A controllable ally at `(0, 0)` that always wins initiative, and one
/// autonomous enemy at `enemy_at`. Returns the scheduler parked on the ally's
/// first turn.
pub fn setup_player_turn(enemy_at: GridCoord, seed: u64) -> (TurnScheduler, UnitId, UnitId) {
    let mut field = Battlefield::new(TileMap::rectangular(10, 10));
    let mut hero = Unit::new(
        "hero",
        Faction::Ally,
        Control::Controllable,
        GridCoord::new(0, 0),
        Attributes {
            intelligence: 40,
            ..Attributes::default()
        },
        UnitStats::default(),
        WeaponTemplate::pistol().instantiate(),
    );
    hero.head_hit_chance = 0.0;
    let hero = field.spawn(hero);
    let enemy = spawn_unit(
        &mut field,
        Faction::Enemy,
        Control::Autonomous,
        enemy_at,
        &WeaponTemplate::claws(),
    );

    let mut scheduler = TurnScheduler::new(field, RulesConfig::default(), seed);
    assert_eq!(scheduler.run_until_idle(), StepOutcome::AwaitingInput);
    assert_eq!(scheduler.current_unit(), Some(hero));
    (scheduler, hero, enemy)
}

/// Runs until halt or `max_rounds`, ending every controllable turn at once.
pub fn play_out(scheduler: &mut TurnScheduler, max_rounds: u32) -> Vec<EventRecord> {
    let mut events = Vec::new();
    while scheduler.round() <= max_rounds {
        match scheduler.run_until_idle() {
            StepOutcome::Halted => break,
            StepOutcome::AwaitingInput => {
                if let Some(unit) = scheduler.current_unit() {
                    scheduler
                        .submit(Intent::EndTurn { unit })
                        .expect("acting unit can always end its turn");
                }
            }
            StepOutcome::Advanced => {}
        }
        events.extend(scheduler.take_events());
    }
    events.extend(scheduler.take_events());
    events
}

// =============================================================================
// Event queries
// =============================================================================

/// Turn orders announced by `RoundStarted`, in round order.
pub fn round_orders(events: &[EventRecord]) -> Vec<Vec<UnitId>> {
    events
        .iter()
        .filter_map(|record| match &record.event {
            BattleEvent::RoundStarted { order, .. } => Some(order.clone()),
            _ => None,
        })
        .collect()
}

/// Units reported destroyed, in order.
pub fn destroyed_units(events: &[EventRecord]) -> Vec<UnitId> {
    events
        .iter()
        .filter_map(|record| match record.event {
            BattleEvent::UnitDestroyed { unit, .. } => Some(unit),
            _ => None,
        })
        .collect()
}

/// The faction reported defeated, if any.
pub fn defeated_faction(events: &[EventRecord]) -> Option<Faction> {
    events.iter().find_map(|record| match record.event {
        BattleEvent::FactionDefeated { faction } => Some(faction),
        _ => None,
    })
}
