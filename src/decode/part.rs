//! Part (volume) number resolution.
//!
//! Pages carry their part under a `part` key whose shape varies between
//! books: absent, null, an object with a `name`, or an array of such
//! objects. Resolution never fails; anything unusable yields `None` and the
//! caller substitutes [`DEFAULT_PART`](crate::model::DEFAULT_PART).

use serde_json::Value;

/// Resolve the JSON value found under a page's `part` key.
///
/// 1. absent or null: `None`
/// 2. object: its `name`, if that is an integer or a string holding one
/// 3. array: rule 2 applied to the first element only
/// 4. anything else: `None`
pub fn resolve_part(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    match value {
        Value::Object(_) => part_from_object(value),
        Value::Array(items) => items.first().and_then(part_from_object),
        _ => None,
    }
}

fn part_from_object(value: &Value) -> Option<u32> {
    let name = value.as_object()?.get("name")?;
    parse_part_number(name)
}

/// An integer, or a string that holds one. Used for `name` and for the
/// index's `part_name`.
pub(crate) fn parse_part_number(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    }
}
