//! # Update Payload Transform
//!
//! Turns a nested update body into flat dot-path assignments:
//! populated relation values are first replaced by their identifiers
//! (depopulate), then the result is flattened. The store applies the flat
//! set as a partial update, so unspecified fields are never clobbered.

use serde_json::Value;

use crate::schema::{Document, ModelSchema};

/// Replace populated relation values with their identifiers.
///
/// Relation fields are recognised by their full dot-path, so an already
/// flattened payload is handled the same way as a nested one.
pub fn depopulate(doc: &Document, schema: &ModelSchema) -> Document {
    depopulate_object(doc, "", schema)
}

fn depopulate_object(doc: &Document, prefix: &str, schema: &ModelSchema) -> Document {
    doc.iter()
        .map(|(key, value)| {
            let path = join(prefix, key);
            let value = if schema.is_relation(&path) {
                identifier_of(value)
            } else {
                match value {
                    Value::Object(nested) => Value::Object(depopulate_object(nested, &path, schema)),
                    other => other.clone(),
                }
            };
            (key.clone(), value)
        })
        .collect()
}

/// `{_id, ...}` → `_id`, element-wise for arrays; anything else unchanged.
/// Applied until a fixed point, so a second pass never changes the result.
fn identifier_of(value: &Value) -> Value {
    match value {
        Value::Object(map) => map
            .get(ModelSchema::ID_FIELD)
            .map(identifier_of)
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(identifier_of).collect()),
        other => other.clone(),
    }
}

/// Flatten nested objects into dot-path keys. Arrays are leaves; empty
/// objects contribute nothing.
pub fn flatten(doc: &Document) -> Document {
    let mut flat = Document::new();
    flatten_into(doc, "", &mut flat);
    flat
}

fn flatten_into(doc: &Document, prefix: &str, flat: &mut Document) {
    for (key, value) in doc {
        let path = join(prefix, key);
        match value {
            Value::Object(nested) => flatten_into(nested, &path, flat),
            other => {
                flat.insert(path, other.clone());
            }
        }
    }
}

/// Depopulate then flatten
pub fn prepare_update(body: &Document, schema: &ModelSchema) -> Document {
    flatten(&depopulate(body, schema))
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
