//! JSON merge patch (RFC 7396) computation
//!
//! [`merge_diff`] is the inverse of merge-patch application: applying
//! `merge_diff(before, after)` to `before` yields `after`.

use serde_json::{Map, Value};

/// Compute the merge patch that turns `before` into `after`
///
/// Keys present in `before` but absent from `after` become `null`. Arrays
/// and scalars are replaced wholesale. Identical documents produce `{}`.
pub fn merge_diff(before: &Value, after: &Value) -> Value {
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => Value::Object(object_diff(before, after)),
        _ if before == after => Value::Object(Map::new()),
        _ => after.clone(),
    }
}

fn object_diff(before: &Map<String, Value>, after: &Map<String, Value>) -> Map<String, Value> {
    let mut delta = Map::new();

    for (key, old) in before {
        match after.get(key) {
            None => {
                delta.insert(key.clone(), Value::Null);
            }
            Some(new) if new == old => {}
            Some(Value::Object(new)) => match old {
                Value::Object(old) => {
                    let nested = object_diff(old, new);
                    if !nested.is_empty() {
                        delta.insert(key.clone(), Value::Object(nested));
                    }
                }
                _ => {
                    delta.insert(key.clone(), Value::Object(new.clone()));
                }
            },
            Some(new) => {
                delta.insert(key.clone(), new.clone());
            }
        }
    }

    for (key, new) in after {
        if !before.contains_key(key) {
            delta.insert(key.clone(), new.clone());
        }
    }

    delta
}

/// Whether a merge patch changes nothing
pub fn is_noop(patch: &Value) -> bool {
    match patch {
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
