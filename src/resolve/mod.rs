//! Combat resolution between pieces.
//!
//! Applies the fixed rank table (officer order plus the bomb, landmine and
//! flag exceptions) and derives outcome odds from rank distributions.

pub mod combat;

pub use combat::{
    attackers_consistent_with, defenders_consistent_with, outcome_odds, resolve_combat,
    CombatOutcome, OutcomeOdds,
};
