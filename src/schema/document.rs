//! Document representation and dot-path helpers
//!
//! Documents are ordered JSON objects. Field paths use dot notation
//! (`address.city`); arrays of sub-documents are traversed element-wise.

use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored document: an ordered mapping of field name to value
pub type Document = Map<String, Value>;

/// Length of an ObjectId in hex characters
const OBJECT_ID_LEN: usize = 24;

/// Generate a fresh 24-hex-character ObjectId
pub fn new_object_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(OBJECT_ID_LEN);
    id
}

/// Check whether a string is a well-formed ObjectId
pub fn is_object_id(value: &str) -> bool {
    value.len() == OBJECT_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Resolve a dot-path inside a value.
///
/// Numeric segments index into arrays.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Assign `value` at a dot-path, creating intermediate objects as needed.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_in_value(child, rest, value);
        }
    }
}

fn set_in_value(target: &mut Value, path: &str, value: Value) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    if let Value::Array(items) = target {
        if let Some(slot) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            match rest {
                Some(rest) => set_in_value(slot, rest, value),
                None => *slot = value,
            }
            return;
        }
    }

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        match rest {
            Some(rest) => {
                let child = map
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                set_in_value(child, rest, value);
            }
            None => {
                map.insert(head.to_string(), value);
            }
        }
    }
}

/// Remove the field at a dot-path.
///
/// Arrays met along the way are traversed element-wise, so
/// `comments.secret` strips `secret` from every comment. Returns whether
/// anything was removed; an absent path is a no-op.
pub fn remove_path(value: &mut Value, path: &str) -> bool {
    match value {
        Value::Object(map) => match path.split_once('.') {
            None => map.shift_remove(path).is_some(),
            Some((head, rest)) => map
                .get_mut(head)
                .map(|child| remove_path(child, rest))
                .unwrap_or(false),
        },
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |removed, item| remove_path(item, path) || removed),
        _ => false,
    }
}
