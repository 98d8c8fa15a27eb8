//! Session store
//!
//! Owns every combat session plus the "currently selected" pointer. All
//! mutations go through here: the in-memory session is updated first and
//! is immediately visible to the next call, then a full snapshot is handed
//! to the writer without waiting for it to land.
//!
//! Unknown session or combatant ids make a mutator a no-op (`false`/`None`)
//! so stale references from the UI degrade quietly.

use std::collections::HashMap;

use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::combat::{
    CombatSession, Combatant, DisplayRow, PlayerProfile, StopOutcome, TurnEntry,
};
use crate::persist::{PersistError, SessionWriter};

/// All combat sessions, with write-through persistence
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, CombatSession>,
    selected: Option<String>,
    writer: Option<SessionWriter>,
}

impl SessionStore {
    /// Create an empty store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that writes through to the given writer
    pub fn with_writer(writer: SessionWriter) -> Self {
        Self {
            writer: Some(writer),
            ..Self::default()
        }
    }

    /// Load every indexed session eagerly.
    ///
    /// Missing or unreadable bodies are skipped; the newest session is selected.
    pub async fn load(writer: SessionWriter) -> Result<Self, PersistError> {
        let backend = writer.backend();
        let index = backend.load_index().await?;

        let mut sessions = HashMap::with_capacity(index.len());
        for entry in index {
            match backend.load_session(&entry.file).await {
                Ok(Some(session)) => {
                    sessions.insert(session.id.clone(), session);
                }
                Ok(None) => warn!(
                    "Session {} is indexed but {} is missing",
                    entry.id, entry.file
                ),
                Err(e) => warn!("Skipping session {}: {}", entry.id, e),
            }
        }

        let selected = sessions
            .values()
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|s| s.id.clone());

        info!("Loaded {} combat sessions", sessions.len());

        Ok(Self {
            sessions,
            selected,
            writer: Some(writer),
        })
    }

    /// Get the writer, if persistence is enabled
    pub fn writer(&self) -> Option<&SessionWriter> {
        self.writer.as_ref()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get(&self, session_id: &str) -> Option<&CombatSession> {
        self.sessions.get(session_id)
    }

    /// All sessions, oldest first
    pub fn list(&self) -> Vec<&CombatSession> {
        let mut sessions: Vec<&CombatSession> = self.sessions.values().collect();
        sessions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn selected(&self) -> Option<&CombatSession> {
        self.selected.as_deref().and_then(|id| self.sessions.get(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn turn_order(&self, session_id: &str) -> Option<Vec<TurnEntry>> {
        self.get(session_id).map(CombatSession::turn_order)
    }

    pub fn display_rows(&self, session_id: &str) -> Option<Vec<DisplayRow>> {
        self.get(session_id).map(CombatSession::display_rows)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Create an empty session and select it
    pub fn create_session(
        &mut self,
        name: impl Into<String>,
        campaign_id: Option<String>,
    ) -> &CombatSession {
        let session = CombatSession::new(name, campaign_id);
        let id = session.id.clone();
        info!("Created combat session '{}' ({})", session.name, id);

        self.persist(&session);
        self.selected = Some(id.clone());
        self.sessions.entry(id).or_insert(session)
    }

    /// Point the selection at a session
    pub fn select_session(&mut self, session_id: &str) -> bool {
        if !self.sessions.contains_key(session_id) {
            debug!("Ignoring select of unknown session {}", session_id);
            return false;
        }
        self.selected = Some(session_id.to_string());
        true
    }

    pub fn rename_session(&mut self, session_id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        self.commit(session_id, |session| {
            session.name = name;
            Some(())
        })
        .is_some()
    }

    /// Delete a session and its durable record
    pub fn delete_session(&mut self, session_id: &str) -> bool {
        if self.sessions.remove(session_id).is_none() {
            debug!("Ignoring delete of unknown session {}", session_id);
            return false;
        }
        if self.selected.as_deref() == Some(session_id) {
            self.selected = None;
        }
        if let Some(ref writer) = self.writer {
            writer.delete(session_id);
        }
        info!("Deleted combat session {}", session_id);
        true
    }

    /// Delete every session, returning how many were removed
    pub fn clear_sessions(&mut self) -> usize {
        let ids: Vec<String> = self.sessions.keys().cloned().collect();
        for id in &ids {
            self.delete_session(id);
        }
        ids.len()
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Normalize a creature record and append it, returning the new id
    pub fn add_creature(&mut self, session_id: &str, record: &Value) -> Option<String> {
        self.add_combatant(session_id, Combatant::from_creature(record))
    }

    /// Append a player combatant built from a roster profile
    pub fn add_player(&mut self, session_id: &str, profile: &PlayerProfile) -> Option<String> {
        self.add_combatant(session_id, Combatant::from_player(profile))
    }

    fn add_combatant(&mut self, session_id: &str, combatant: Combatant) -> Option<String> {
        self.commit(session_id, |session| {
            let id = combatant.id.clone();
            debug!("Adding '{}' ({}) to session {}", combatant.name, id, session.id);
            session.add(combatant);
            Some(id)
        })
    }

    pub fn remove_combatant(&mut self, session_id: &str, combatant_id: &str) -> bool {
        self.commit(session_id, |session| session.remove(combatant_id).then_some(()))
            .is_some()
    }

    /// Push a roster edit into every matching player combatant in every
    /// session. Battle state (hp, initiative, conditions, note, color) is
    /// left alone. Returns the number of combatants updated.
    ///
    /// The one exception: current hit points are clamped down when the new
    /// maximum is below them, so `current_hp <= max_hp` keeps holding.
    pub fn sync_player_combatants(&mut self, profile: &PlayerProfile) -> usize {
        let mut updated = 0;

        for session in self.sessions.values_mut() {
            let mut touched = false;
            for c in session
                .combatants
                .iter_mut()
                .filter(|c| c.is_player() && c.name == profile.name)
            {
                c.apply_profile(profile);
                touched = true;
                updated += 1;
            }
            if touched {
                if let Some(ref writer) = self.writer {
                    writer.save(session);
                }
            }
        }

        debug!("Synced player '{}' into {} combatants", profile.name, updated);
        updated
    }

    // ------------------------------------------------------------------
    // Combatant fields
    // ------------------------------------------------------------------

    /// Set current hit points, clamped to `0..=max_hp`
    pub fn update_hp(&mut self, session_id: &str, combatant_id: &str, value: i32) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.set_hp(value))
    }

    /// Set maximum hit points, floored at 1
    pub fn update_max_hp(&mut self, session_id: &str, combatant_id: &str, value: i32) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.set_max_hp(value))
    }

    /// Set armor class, floored at 0
    pub fn update_ac(&mut self, session_id: &str, combatant_id: &str, value: i32) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.set_armor_class(value))
    }

    pub fn update_initiative(&mut self, session_id: &str, combatant_id: &str, value: i32) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.initiative = value)
    }

    pub fn update_initiative_bonus(
        &mut self,
        session_id: &str,
        combatant_id: &str,
        value: i32,
    ) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.initiative_bonus = value)
    }

    /// Set or clear (`None`) the highlight color
    pub fn update_color(
        &mut self,
        session_id: &str,
        combatant_id: &str,
        color: Option<String>,
    ) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.color = color)
    }

    /// Replace the whole condition set
    pub fn update_conditions(
        &mut self,
        session_id: &str,
        combatant_id: &str,
        conditions: Vec<String>,
    ) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.set_conditions(conditions))
    }

    pub fn update_note(&mut self, session_id: &str, combatant_id: &str, note: Option<String>) -> bool {
        self.update_combatant(session_id, combatant_id, |c| c.note = note)
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// Flip the stored grouping flag for a name, returning the new value
    pub fn toggle_group(&mut self, session_id: &str, name: &str) -> Option<bool> {
        self.commit(session_id, |session| Some(session.toggle_group(name)))
    }

    pub fn set_group(&mut self, session_id: &str, name: &str, enabled: bool) -> bool {
        self.commit(session_id, |session| {
            session.set_group(name, enabled);
            Some(())
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // Rounds and turns
    // ------------------------------------------------------------------

    pub fn start_combat(&mut self, session_id: &str) -> bool {
        self.commit(session_id, |session| session.start().then_some(()))
            .is_some()
    }

    pub fn next_turn(&mut self, session_id: &str) -> bool {
        self.commit(session_id, |session| session.next_turn().then_some(()))
            .is_some()
    }

    /// Finish the running fight, or clear the roster when none is running
    pub fn stop_combat(&mut self, session_id: &str) -> Option<StopOutcome> {
        self.commit(session_id, |session| Some(session.stop()))
    }

    pub fn randomize_initiative<R: Rng + ?Sized>(&mut self, session_id: &str, rng: &mut R) -> bool {
        self.commit(session_id, |session| {
            session.randomize_initiative(rng);
            Some(())
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Apply `f` to a session and persist it if `f` reports a change
    fn commit<R>(
        &mut self,
        session_id: &str,
        f: impl FnOnce(&mut CombatSession) -> Option<R>,
    ) -> Option<R> {
        let Some(session) = self.sessions.get_mut(session_id) else {
            debug!("Ignoring update of unknown session {}", session_id);
            return None;
        };

        let result = f(session)?;
        if let Some(ref writer) = self.writer {
            writer.save(session);
        }
        Some(result)
    }

    fn update_combatant(
        &mut self,
        session_id: &str,
        combatant_id: &str,
        f: impl FnOnce(&mut Combatant),
    ) -> bool {
        self.commit(session_id, |session| {
            let Some(c) = session.combatant_mut(combatant_id) else {
                debug!("Ignoring update of unknown combatant {}", combatant_id);
                return None;
            };
            f(c);
            Some(())
        })
        .is_some()
    }

    fn persist(&self, session: &CombatSession) {
        if let Some(ref writer) = self.writer {
            writer.save(session);
        }
    }
}
