//! Combat session engine
//!
//! Implements encounter tracking with:
//! - Combatant normalization from creature and player records
//! - Name-based grouping of identical combatants
//! - Turn order derivation (initiative, highest first)
//! - Round/turn state machine
//! - Initiative rolls (d20 + bonus)

mod combatant;
mod dice;
mod grouping;
mod normalize;
mod session;
mod turn_order;

pub use combatant::{
    token_reference, Combatant, CombatantSource, PlayerProfile, CUSTOM_SOURCE, PLAYER_SOURCE,
};
pub use dice::{roll_initiative, INITIATIVE_DIE};
pub use grouping::{is_group_enabled, GroupFlags};
pub use session::{CombatSession, StopOutcome};
pub use turn_order::{compute_turn_order, display_rows, DisplayRow, TurnEntry};
