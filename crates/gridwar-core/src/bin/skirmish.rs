//! Headless skirmish runner.
//!
//! Usage: `skirmish [scenario.json]`
//!
//! Loads the scenario (or the built-in 5 vs 5 default), spawns every squad and
//! plays the battle to the end. Controllable units have no player attached, so
//! their turns are ended as soon as they come up. Set `RUST_LOG=debug` for a
//! step-by-step log.

use anyhow::{Context, Result};
use tracing::{info, warn};

use gridwar_core::{BattleEvent, Intent, ScenarioConfig, StepOutcome, TurnScheduler};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let scenario = match std::env::args().nth(1) {
        Some(path) => ScenarioConfig::load(&path)
            .with_context(|| format!("loading scenario {path}"))?,
        None => ScenarioConfig::default(),
    };

    let mut scheduler = scenario
        .build_scheduler()
        .context("setting up the battlefield")?;
    info!(
        seed = scenario.seed,
        units = scheduler.battlefield().len(),
        max_rounds = scenario.max_rounds,
        "skirmish started"
    );

    let outcome = run(&mut scheduler, scenario.max_rounds)?;
    report(&scheduler, outcome);
    Ok(())
}

/// Plays until the battle halts or `max_rounds` have been completed.
fn run(scheduler: &mut TurnScheduler, max_rounds: u32) -> Result<StepOutcome> {
    loop {
        let outcome = scheduler.run_until_idle();
        log_events(scheduler);

        match outcome {
            StepOutcome::Halted => return Ok(outcome),
            StepOutcome::AwaitingInput => {
                let unit = scheduler
                    .current_unit()
                    .context("scheduler awaits input without an acting unit")?;
                scheduler.submit(Intent::EndTurn { unit })?;
            }
            StepOutcome::Advanced => {}
        }

        if scheduler.round() > max_rounds {
            warn!(max_rounds, "round limit reached without a decision");
            return Ok(outcome);
        }
    }
}

fn log_events(scheduler: &mut TurnScheduler) {
    for record in scheduler.take_events() {
        match record.event {
            BattleEvent::RoundStarted { round, order } => {
                info!(round, units = order.len(), "round started");
            }
            BattleEvent::AttackResolved(report) => {
                info!(
                    round = record.round,
                    attacker = %report.attacker,
                    target = %report.target,
                    option = %report.option,
                    hit_chance = report.hit_chance,
                    hit = report.is_hit(),
                    health_damage = report.damage.map_or(0, |d| d.health_damage()),
                    "attack"
                );
            }
            BattleEvent::UnitDestroyed { unit, by } => {
                info!(round = record.round, %unit, %by, "unit destroyed");
            }
            BattleEvent::ActionRejected { unit, reason } => {
                warn!(round = record.round, ?unit, %reason, "action rejected");
            }
            BattleEvent::FactionDefeated { faction } => {
                info!(round = record.round, %faction, "faction defeated");
            }
            _ => {}
        }
    }
}

fn report(scheduler: &TurnScheduler, outcome: StepOutcome) {
    let field = scheduler.battlefield();
    for unit in field.units_sorted() {
        info!(
            unit = %unit.id,
            name = %unit.name,
            faction = %unit.faction,
            alive = unit.is_active(),
            health = unit.health.current,
            position = %unit.position,
            "final state"
        );
    }
    info!(rounds = scheduler.round(), ?outcome, "skirmish finished");
}
