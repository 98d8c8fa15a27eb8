//! Stat extraction from heterogeneous creature records
//!
//! Creature data comes from reference sources in several shapes:
//! - hp: `{"average": 7, "formula": "2d6"}`, `{"max": 30}`, `12`, `"12"`
//! - ac: `15`, `"15 (natural armor)"`, `[{"ac": 15, "from": ["chain shirt"]}]`
//!
//! Every extractor returns `None` when nothing usable is present; the
//! caller decides the fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Leading number of a stat string ("15 (natural armor)" -> 15)
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)").unwrap());

/// Keys checked, in order, when an AC entry is an object
const AC_KEYS: [&str; 3] = ["ac", "value", "armor"];

fn saturate(n: i64) -> i32 {
    n.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Integer value of a JSON number (fractions are floored)
fn number_value(value: &Value) -> Option<i32> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64()
        .map(saturate)
        .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i32))
}

/// Integer value of a numeric (or number-prefixed) string
fn string_value(s: &str) -> Option<i32> {
    let caps = LEADING_NUMBER.captures(s)?;
    let number: f64 = caps[1].parse().ok()?;
    Some(number.floor() as i32)
}

/// Extract maximum hit points.
///
/// Tried in order: `average`, `max`, the first numeric property of an
/// object, a bare number, a numeric string.
pub fn max_hp(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Object(map) => map
            .get("average")
            .and_then(number_value)
            .or_else(|| map.get("max").and_then(number_value))
            .or_else(|| map.values().find_map(number_value)),
        v @ Value::Number(_) => number_value(v),
        Value::String(s) => string_value(s),
        _ => None,
    }
}

/// Extract armor class.
///
/// Accepts a number, a numeric string, an array (first element,
/// resolved recursively) or an object exposing `ac`/`value`/`armor`.
pub fn armor_class(value: Option<&Value>) -> Option<i32> {
    match value? {
        v @ Value::Number(_) => number_value(v),
        Value::String(s) => string_value(s),
        Value::Array(items) => armor_class(items.first()),
        Value::Object(map) => AC_KEYS.iter().find_map(|key| armor_class(map.get(*key))),
        _ => None,
    }
}

/// Extract the initiative bonus: an explicit field, else the Dexterity
/// modifier, else 0.
pub fn initiative_bonus(record: &Value) -> i32 {
    let Some(map) = record.as_object() else {
        return 0;
    };

    if let Some(bonus) = field(map, &["initiativeBonus", "initiative_bonus"]).and_then(number_value)
    {
        return bonus;
    }

    map.get("dex")
        .and_then(number_value)
        .map(|dex| dex.saturating_sub(10).div_euclid(2))
        .unwrap_or(0)
}

/// First present value among alternative key spellings
pub fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

/// First non-empty string among alternative key spellings
pub fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    let map = record.as_object()?;
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
