//! Combatant records
//!
//! A combatant is one participant in a combat session. Creature combatants
//! are normalized from arbitrary reference records; player combatants are
//! built from a roster profile and kept in sync with it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::normalize;

/// Source tag reserved for player characters
pub const PLAYER_SOURCE: &str = "player";

/// Source used when a creature record names none
pub const CUSTOM_SOURCE: &str = "custom";

/// Name used when a creature record names none
const UNNAMED: &str = "Unknown";

/// Where a combatant came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CombatantSource {
    /// A player character from the roster
    Player,
    /// A creature reference source identifier
    Reference(String),
}

impl CombatantSource {
    pub fn as_str(&self) -> &str {
        match self {
            CombatantSource::Player => PLAYER_SOURCE,
            CombatantSource::Reference(source) => source,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, CombatantSource::Player)
    }
}

impl From<String> for CombatantSource {
    fn from(s: String) -> Self {
        if s == PLAYER_SOURCE {
            CombatantSource::Player
        } else {
            CombatantSource::Reference(s)
        }
    }
}

impl From<&str> for CombatantSource {
    fn from(s: &str) -> Self {
        CombatantSource::from(s.to_string())
    }
}

impl From<CombatantSource> for String {
    fn from(source: CombatantSource) -> Self {
        match source {
            CombatantSource::Player => PLAYER_SOURCE.to_string(),
            CombatantSource::Reference(source) => source,
        }
    }
}

impl fmt::Display for CombatantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic token handle for a (source, name) pair.
///
/// The token cache keys assets the same way, so equal inputs always map
/// to the same asset.
pub fn token_reference(source: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(name.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("tokens/{}/{}", source, &digest[..16])
}

/// Roster entry for a player character
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub max_hp: Option<i32>,
    #[serde(default)]
    pub armor_class: Option<i32>,
    #[serde(default)]
    pub initiative_bonus: Option<i32>,
    #[serde(default)]
    pub token: Option<String>,
}

/// One participant's battle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique within the session, never reused
    pub id: String,
    /// Display name (unit of grouping)
    pub name: String,
    pub source: CombatantSource,
    /// Display asset handle
    #[serde(default)]
    pub token: Option<String>,
    pub max_hp: i32,
    /// Always within `0..=max_hp`
    pub current_hp: i32,
    #[serde(default)]
    pub initiative: i32,
    #[serde(default)]
    pub initiative_bonus: i32,
    #[serde(default)]
    pub armor_class: i32,
    /// Highlight color token, opaque to the engine
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    // Player-only
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
}

impl Combatant {
    fn blank(name: String, source: CombatantSource) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            source,
            token: None,
            max_hp: 1,
            current_hp: 1,
            initiative: 0,
            initiative_bonus: 0,
            armor_class: 0,
            color: None,
            conditions: Vec::new(),
            note: None,
            race: None,
            class: None,
        }
    }

    /// Normalize an arbitrary creature record into a combatant.
    ///
    /// Unusable hit points fall back to 1 (with a warning), unusable
    /// armor class to 0. Never fails.
    pub fn from_creature(record: &Value) -> Self {
        let name = normalize::text_field(record, &["name"]).unwrap_or_else(|| UNNAMED.to_string());
        let source = normalize::text_field(record, &["source"])
            .unwrap_or_else(|| CUSTOM_SOURCE.to_string());
        let stats = record.as_object();

        let max_hp = match stats.and_then(|m| normalize::max_hp(m.get("hp"))) {
            Some(hp) => hp.max(1),
            None => {
                warn!(
                    "No usable hit points for '{}' ({}), falling back to 1",
                    name, source
                );
                1
            }
        };

        let armor_class = stats
            .and_then(|m| normalize::armor_class(m.get("ac")))
            .unwrap_or(0)
            .max(0);

        let token = normalize::text_field(record, &["token", "tokenUrl", "token_url"])
            .unwrap_or_else(|| token_reference(&source, &name));

        let mut combatant = Self::blank(name, CombatantSource::from(source));
        combatant.max_hp = max_hp;
        combatant.current_hp = max_hp;
        combatant.armor_class = armor_class;
        combatant.initiative_bonus = normalize::initiative_bonus(record);
        combatant.token = Some(token);
        combatant
    }

    /// Build a player combatant from a roster profile.
    ///
    /// Unspecified hit points and armor class are 0 here, unlike the
    /// creature path.
    pub fn from_player(profile: &PlayerProfile) -> Self {
        let mut combatant = Self::blank(profile.name.clone(), CombatantSource::Player);
        combatant.max_hp = profile.max_hp.unwrap_or(0).max(0);
        combatant.current_hp = combatant.max_hp;
        combatant.armor_class = profile.armor_class.unwrap_or(0).max(0);
        combatant.initiative_bonus = profile.initiative_bonus.unwrap_or(0);
        combatant.race = profile.race.clone();
        combatant.class = profile.class.clone();
        combatant.token = profile.token.clone();
        combatant
    }

    pub fn is_player(&self) -> bool {
        self.source.is_player()
    }

    /// Set current hit points, clamped to `0..=max_hp`
    pub fn set_hp(&mut self, value: i32) {
        self.current_hp = value.clamp(0, self.max_hp.max(0));
    }

    /// Set maximum hit points (at least 1); current hit points follow it down
    pub fn set_max_hp(&mut self, value: i32) {
        self.max_hp = value.max(1);
        self.set_hp(self.current_hp);
    }

    /// Set armor class (at least 0)
    pub fn set_armor_class(&mut self, value: i32) {
        self.armor_class = value.max(0);
    }

    /// Replace the condition set, keeping first-seen order
    pub fn set_conditions(&mut self, conditions: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(conditions.len());
        for condition in conditions {
            if !deduped.contains(&condition) {
                deduped.push(condition);
            }
        }
        self.conditions = deduped;
    }

    /// Overwrite roster-owned fields from a profile, leaving battle state alone
    pub fn apply_profile(&mut self, profile: &PlayerProfile) {
        self.race = profile.race.clone();
        self.class = profile.class.clone();
        self.max_hp = profile.max_hp.unwrap_or(0).max(0);
        self.armor_class = profile.armor_class.unwrap_or(0).max(0);
        if let Some(ref token) = profile.token {
            self.token = Some(token.clone());
        }
        if self.current_hp > self.max_hp {
            self.current_hp = self.max_hp;
        }
    }
}
