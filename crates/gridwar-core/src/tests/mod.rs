//! Determinism and integration tests for the turn scheduler.
//!
//! - `determinism.rs`: same seed and inputs replay the same battle
//! - `integration.rs`: whole battles and host-driven turns end to end
//! - `helpers.rs`: battlefield setup and event queries

mod determinism;
mod helpers;

// Re-export for convenience
pub use helpers::*;
