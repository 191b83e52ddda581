//! Replay tests: identical seeds and inputs must produce identical battles.

use crate::config::ScenarioConfig;
use crate::events::EventRecord;
use crate::scheduler::StepOutcome;

use super::helpers::{play_out, round_orders, setup_skirmish};

fn battle(seed: u64) -> Vec<EventRecord> {
    let mut scheduler = setup_skirmish(3, seed);
    play_out(&mut scheduler, 300)
}

#[test]
fn same_seed_same_event_stream() {
    let a = battle(42);
    let b = battle(42);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn same_seed_same_turn_order() {
    let a = round_orders(&battle(7));
    let b = round_orders(&battle(7));
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn different_seeds_diverge() {
    // Initiative rolls alone make two seeds disagree almost immediately.
    let streams: Vec<_> = (0..4).map(battle).collect();
    assert!(streams.windows(2).any(|pair| pair[0] != pair[1]));
}

#[test]
fn scenario_builds_replay_exactly() {
    let scenario = ScenarioConfig::default();
    let mut a = scenario.build_scheduler().unwrap();
    let mut b = scenario.build_scheduler().unwrap();

    assert_eq!(a.battlefield(), b.battlefield());
    for _ in 0..200 {
        let outcome_a = a.step();
        let outcome_b = b.step();
        assert_eq!(outcome_a, outcome_b);
        if outcome_a == StepOutcome::Halted {
            break;
        }
    }
    assert_eq!(a.take_events(), b.take_events());
    assert_eq!(a.battlefield(), b.battlefield());
}

#[test]
fn parallel_approach_search_is_stable() {
    // The controller evaluates approach tiles on the rayon pool; repeating the
    // same battle many times must never change its outcome.
    let reference = battle(99);
    for _ in 0..5 {
        assert_eq!(battle(99), reference);
    }
}
