//! Combat sessions and the round/turn state machine
//!
//! A session is either not started or in progress. `start` enters the
//! fight, `stop` leaves it; `next_turn` only works in between. Turn order
//! is recomputed on every advance, so grouping changes made mid-fight take
//! effect on the next advance and may shift whose turn it is.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dice::roll_initiative;
use super::grouping::{self, GroupFlags};
use super::turn_order::{compute_turn_order, display_rows, DisplayRow, TurnEntry};
use super::Combatant;

/// What `stop` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The fight ended; the roster was kept
    Finished,
    /// No fight was running; the roster was emptied
    Cleared,
}

/// One encounter's full state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSession {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Roster order matters before the fight starts
    #[serde(default)]
    pub combatants: Vec<Combatant>,
    #[serde(default)]
    pub group_by_name: GroupFlags,
    pub round: u32,
    pub turn_index: usize,
    pub started: bool,
    #[serde(default)]
    pub campaign_id: Option<String>,
}

impl CombatSession {
    /// Create an empty, not-started session
    pub fn new(name: impl Into<String>, campaign_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            combatants: Vec::new(),
            group_by_name: GroupFlags::new(),
            round: 1,
            turn_index: 0,
            started: false,
            campaign_id,
        }
    }

    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: &str) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    /// Append a combatant to the roster
    pub fn add(&mut self, combatant: Combatant) {
        self.combatants.push(combatant);
    }

    /// Remove a combatant; the rest keep their ids and order
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.combatants.len();
        self.combatants.retain(|c| c.id != id);
        self.combatants.len() != before
    }

    /// Effective grouping flag for a name (players never group)
    pub fn is_group_enabled(&self, name: &str) -> bool {
        grouping::is_group_enabled(&self.combatants, &self.group_by_name, name)
    }

    /// Store a grouping flag
    pub fn set_group(&mut self, name: &str, enabled: bool) {
        self.group_by_name.insert(name.to_string(), enabled);
    }

    /// Flip the stored grouping flag, returning the new value
    pub fn toggle_group(&mut self, name: &str) -> bool {
        let enabled = !grouping::stored_flag(&self.group_by_name, name);
        self.set_group(name, enabled);
        enabled
    }

    pub fn turn_order(&self) -> Vec<TurnEntry> {
        compute_turn_order(&self.combatants, &self.group_by_name)
    }

    pub fn display_rows(&self) -> Vec<DisplayRow> {
        display_rows(&self.combatants, &self.group_by_name)
    }

    /// The entry whose turn it is, if a fight is running
    pub fn active_turn(&self) -> Option<TurnEntry> {
        if !self.started {
            return None;
        }
        self.turn_order().into_iter().nth(self.turn_index)
    }

    /// Start the fight. Sorts the roster by initiative (highest first).
    ///
    /// Returns false if already started.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.combatants.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        self.round = 1;
        self.turn_index = 0;
        self.started = true;
        true
    }

    /// Advance to the next turn, wrapping into a new round.
    ///
    /// Returns false when not started or when there is nobody to act.
    pub fn next_turn(&mut self) -> bool {
        if !self.started {
            return false;
        }
        let len = self.turn_order().len();
        if len == 0 {
            return false;
        }

        self.turn_index += 1;
        if self.turn_index >= len {
            self.turn_index = 0;
            self.round += 1;
        }
        true
    }

    /// Finish a running fight, or clear the roster if none is running.
    pub fn stop(&mut self) -> StopOutcome {
        if self.started {
            self.started = false;
            self.round = 1;
            self.turn_index = 0;
            StopOutcome::Finished
        } else {
            self.combatants.clear();
            StopOutcome::Cleared
        }
    }

    /// Roll d20 + bonus for every combatant. Does not reorder anything.
    pub fn randomize_initiative<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for c in &mut self.combatants {
            c.initiative = roll_initiative(rng, c.initiative_bonus);
        }
    }
}
