//! Name-based grouping
//!
//! Identically named combatants act as one unit unless grouping is turned
//! off for that name. Player characters are never grouped, whatever the
//! stored flag says; the exception is applied here at read time.

use std::collections::{BTreeMap, HashMap};

use super::Combatant;

/// Stored per-name grouping flags. Absent means grouped.
pub type GroupFlags = BTreeMap<String, bool>;

/// Stored flag for a name, defaulting to grouped
pub fn stored_flag(flags: &GroupFlags, name: &str) -> bool {
    flags.get(name).copied().unwrap_or(true)
}

/// Effective grouping flag for a name.
///
/// False whenever every combatant with that name is a player.
pub fn is_group_enabled(combatants: &[Combatant], flags: &GroupFlags, name: &str) -> bool {
    let mut members = combatants.iter().filter(|c| c.name == name).peekable();
    if members.peek().is_some() && members.all(Combatant::is_player) {
        return false;
    }
    stored_flag(flags, name)
}

/// Names whose non-player members collapse into a single unit
pub(crate) fn grouped_names<'a>(
    combatants: &'a [Combatant],
    flags: &GroupFlags,
) -> HashMap<&'a str, bool> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for c in combatants.iter().filter(|c| !c.is_player()) {
        *counts.entry(c.name.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(name, count)| (name, count > 1 && stored_flag(flags, name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::PlayerProfile;
    use serde_json::json;

    fn creature(name: &str) -> Combatant {
        Combatant::from_creature(&json!({"name": name, "source": "MM", "hp": 10}))
    }

    fn player(name: &str) -> Combatant {
        Combatant::from_player(&PlayerProfile {
            name: name.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_default_is_grouped() {
        let combatants = vec![creature("Goblin"), creature("Goblin")];
        let flags = GroupFlags::new();
        assert!(is_group_enabled(&combatants, &flags, "Goblin"));
        // Names with no members fall back to the stored flag
        assert!(is_group_enabled(&combatants, &flags, "Orc"));
    }

    #[test]
    fn test_explicit_flag() {
        let combatants = vec![creature("Goblin"), creature("Goblin")];
        let mut flags = GroupFlags::new();
        flags.insert("Goblin".to_string(), false);
        assert!(!is_group_enabled(&combatants, &flags, "Goblin"));
    }

    #[test]
    fn test_players_never_grouped() {
        let combatants = vec![player("Aria"), player("Aria")];
        let mut flags = GroupFlags::new();
        assert!(!is_group_enabled(&combatants, &flags, "Aria"));

        flags.insert("Aria".to_string(), true);
        assert!(!is_group_enabled(&combatants, &flags, "Aria"));
    }

    #[test]
    fn test_grouped_names() {
        let combatants = vec![
            creature("Goblin"),
            creature("Goblin"),
            creature("Ogre"),
            player("Aria"),
            player("Aria"),
        ];
        let names = grouped_names(&combatants, &GroupFlags::new());
        assert_eq!(names.get("Goblin"), Some(&true));
        assert_eq!(names.get("Ogre"), Some(&false));
        assert_eq!(names.get("Aria"), None);
    }
}
