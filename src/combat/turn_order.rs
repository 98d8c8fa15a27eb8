//! Turn order derivation
//!
//! Turn order is recomputed from the combatant list and grouping flags
//! whenever it is needed; nothing here is cached or persisted.
//!
//! Each combatant lands in one slot. A grouped name's non-player members
//! share the slot opened by the first of them; everyone else gets a slot
//! of their own. Slots keep the position of their first member, which is
//! both the display order and the tie-break for equal initiative.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::grouping::{grouped_names, GroupFlags};
use super::Combatant;

/// One turn: a single combatant or a grouped unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEntry {
    pub ids: Vec<String>,
    pub name: String,
    /// Highest initiative among the members
    pub initiative: i32,
}

/// A row of the pre-combat roster view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayRow {
    Single { id: String },
    Group { name: String, ids: Vec<String> },
}

struct Slot<'a> {
    name: &'a str,
    members: Vec<&'a Combatant>,
}

fn slots<'a>(combatants: &'a [Combatant], flags: &GroupFlags) -> Vec<Slot<'a>> {
    let grouped = grouped_names(combatants, flags);
    let mut open_groups: HashMap<&str, usize> = HashMap::new();
    let mut slots: Vec<Slot<'a>> = Vec::with_capacity(combatants.len());

    for c in combatants {
        let name = c.name.as_str();
        if !c.is_player() && grouped.get(name).copied().unwrap_or(false) {
            if let Some(&index) = open_groups.get(name) {
                slots[index].members.push(c);
                continue;
            }
            open_groups.insert(name, slots.len());
        }
        slots.push(Slot {
            name,
            members: vec![c],
        });
    }

    slots
}

/// Compute the turn order, highest initiative first.
///
/// Equal initiative keeps roster order (the sort is stable).
pub fn compute_turn_order(combatants: &[Combatant], flags: &GroupFlags) -> Vec<TurnEntry> {
    let mut entries: Vec<TurnEntry> = slots(combatants, flags)
        .into_iter()
        .map(|slot| TurnEntry {
            ids: slot.members.iter().map(|c| c.id.clone()).collect(),
            name: slot.name.to_string(),
            initiative: slot
                .members
                .iter()
                .map(|c| c.initiative)
                .max()
                .unwrap_or_default(),
        })
        .collect();

    entries.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    entries
}

/// Rows for the roster view before combat starts, in insertion order
pub fn display_rows(combatants: &[Combatant], flags: &GroupFlags) -> Vec<DisplayRow> {
    slots(combatants, flags)
        .into_iter()
        .map(|slot| {
            let mut ids: Vec<String> = slot.members.iter().map(|c| c.id.clone()).collect();
            if ids.len() > 1 {
                DisplayRow::Group {
                    name: slot.name.to_string(),
                    ids,
                }
            } else {
                DisplayRow::Single {
                    id: ids.pop().unwrap_or_default(),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::PlayerProfile;
    use proptest::prelude::*;
    use serde_json::json;

    fn creature(id: &str, name: &str, initiative: i32) -> Combatant {
        let mut c = Combatant::from_creature(&json!({"name": name, "source": "MM", "hp": 7}));
        c.id = id.to_string();
        c.initiative = initiative;
        c
    }

    fn player(id: &str, name: &str, initiative: i32) -> Combatant {
        let mut c = Combatant::from_player(&PlayerProfile {
            name: name.to_string(),
            ..Default::default()
        });
        c.id = id.to_string();
        c.initiative = initiative;
        c
    }

    fn ids(entry: &TurnEntry) -> Vec<&str> {
        entry.ids.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_grouped_goblins() {
        let combatants = vec![creature("1", "Goblin", 5), creature("2", "Goblin", 9)];
        let order = compute_turn_order(&combatants, &GroupFlags::new());

        assert_eq!(order.len(), 1);
        assert_eq!(ids(&order[0]), vec!["1", "2"]);
        assert_eq!(order[0].initiative, 9);
        assert_eq!(order[0].name, "Goblin");
    }

    #[test]
    fn test_ungrouped_goblins() {
        let combatants = vec![creature("1", "Goblin", 5), creature("2", "Goblin", 9)];
        let mut flags = GroupFlags::new();
        flags.insert("Goblin".to_string(), false);
        let order = compute_turn_order(&combatants, &flags);

        assert_eq!(order.len(), 2);
        assert_eq!(ids(&order[0]), vec!["2"]);
        assert_eq!(order[0].initiative, 9);
        assert_eq!(ids(&order[1]), vec!["1"]);
        assert_eq!(order[1].initiative, 5);
    }

    #[test]
    fn test_players_individual() {
        let combatants = vec![player("a", "Aria", 12), player("b", "Aria", 3)];
        let order = compute_turn_order(&combatants, &GroupFlags::new());
        assert_eq!(order.len(), 2);
        assert_eq!(ids(&order[0]), vec!["a"]);
        assert_eq!(ids(&order[1]), vec!["b"]);
    }

    #[test]
    fn test_mixed_name_bucket() {
        let combatants = vec![
            creature("1", "Guard", 4),
            player("p", "Guard", 10),
            creature("2", "Guard", 8),
        ];
        let order = compute_turn_order(&combatants, &GroupFlags::new());
        assert_eq!(order.len(), 2);
        assert_eq!(ids(&order[0]), vec!["p"]);
        assert_eq!(ids(&order[1]), vec!["1", "2"]);
        assert_eq!(order[1].initiative, 8);
    }

    #[test]
    fn test_tie_keeps_roster_order() {
        let combatants = vec![
            creature("1", "Wolf", 10),
            creature("2", "Bandit", 10),
            creature("3", "Cultist", 10),
        ];
        let order = compute_turn_order(&combatants, &GroupFlags::new());
        let names: Vec<&str> = order.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Wolf", "Bandit", "Cultist"]);

        // Same result on every call
        assert_eq!(order, compute_turn_order(&combatants, &GroupFlags::new()));
    }

    #[test]
    fn test_empty() {
        assert!(compute_turn_order(&[], &GroupFlags::new()).is_empty());
        assert!(display_rows(&[], &GroupFlags::new()).is_empty());
    }

    #[test]
    fn test_display_rows_insertion_order() {
        let combatants = vec![
            creature("1", "Goblin", 1),
            creature("2", "Ogre", 20),
            creature("3", "Goblin", 15),
            player("p", "Aria", 30),
        ];
        let rows = display_rows(&combatants, &GroupFlags::new());
        assert_eq!(
            rows,
            vec![
                DisplayRow::Group {
                    name: "Goblin".to_string(),
                    ids: vec!["1".to_string(), "3".to_string()],
                },
                DisplayRow::Single { id: "2".to_string() },
                DisplayRow::Single { id: "p".to_string() },
            ]
        );
    }

    #[test]
    fn test_display_rows_ungrouped() {
        let combatants = vec![creature("1", "Goblin", 1), creature("2", "Goblin", 2)];
        let mut flags = GroupFlags::new();
        flags.insert("Goblin".to_string(), false);
        let rows = display_rows(&combatants, &flags);
        assert_eq!(
            rows,
            vec![
                DisplayRow::Single { id: "1".to_string() },
                DisplayRow::Single { id: "2".to_string() },
            ]
        );
    }

    fn arb_roster() -> impl Strategy<Value = Vec<(u8, i32, bool)>> {
        prop::collection::vec((0u8..4, -5i32..30, any::<bool>()), 0..12)
    }

    fn build(roster: &[(u8, i32, bool)]) -> Vec<Combatant> {
        roster
            .iter()
            .enumerate()
            .map(|(i, (name, init, is_player))| {
                let name = format!("N{}", name);
                if *is_player {
                    player(&i.to_string(), &name, *init)
                } else {
                    creature(&i.to_string(), &name, *init)
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_turn_order_descending(roster in arb_roster(), group in any::<bool>()) {
            let combatants = build(&roster);
            let mut flags = GroupFlags::new();
            flags.insert("N0".to_string(), group);
            let order = compute_turn_order(&combatants, &flags);
            for pair in order.windows(2) {
                prop_assert!(pair[0].initiative >= pair[1].initiative);
            }
        }

        #[test]
        fn prop_every_combatant_once(roster in arb_roster()) {
            let combatants = build(&roster);
            let order = compute_turn_order(&combatants, &GroupFlags::new());
            let mut seen: Vec<String> = order.into_iter().flat_map(|e| e.ids).collect();
            seen.sort();
            let mut expected: Vec<String> = combatants.iter().map(|c| c.id.clone()).collect();
            expected.sort();
            prop_assert_eq!(seen, expected);
        }
    }
}
