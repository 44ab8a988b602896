//! # Access Filter
//!
//! Field-level visibility. Each exposed model registers its private and
//! protected paths once; the registry is then frozen and shared read-only
//! by every request. Populated relations are filtered with the keys of the
//! model they point to.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::access::AccessLevel;
use crate::schema::{remove_path, Document, ModelSchema};
use crate::store::PopulateSpec;

/// Private and protected field paths of one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredKeys {
    pub private: Vec<String>,
    pub protected: Vec<String>,
}

impl FilteredKeys {
    pub fn new(private: Vec<String>, protected: Vec<String>) -> Self {
        Self { private, protected }
    }

    /// Paths hidden from a caller at `access`
    pub fn excluded(&self, access: AccessLevel) -> impl Iterator<Item = &str> {
        let private = self.private.iter().filter(move |_| access.hides_private());
        let protected = self.protected.iter().filter(move |_| access.hides_protected());
        private.chain(protected).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
struct ModelFilter {
    keys: FilteredKeys,
    /// Relation path to target model
    relations: HashMap<String, String>,
}

/// Filter definitions of every exposed model, keyed by model name
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    models: HashMap<String, ModelFilter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the keys of a model. Later registrations of the same model replace earlier ones.
    pub fn register(&mut self, schema: &ModelSchema, keys: FilteredKeys) {
        let relations = schema
            .fields
            .iter()
            .filter_map(|f| Some((f.name.clone(), f.relation_target()?.to_string())))
            .collect();
        self.models
            .insert(schema.name.clone(), ModelFilter { keys, relations });
    }

    pub fn keys(&self, model: &str) -> Option<&FilteredKeys> {
        self.models.get(model).map(|m| &m.keys)
    }

    /// Freeze into a shared, read-only registry
    pub fn freeze(self) -> Arc<FilterRegistry> {
        Arc::new(self)
    }
}

/// Strips fields a caller may not see
#[derive(Debug, Clone)]
pub struct AccessFilter {
    model: String,
    registry: Arc<FilterRegistry>,
}

impl AccessFilter {
    pub fn new(model: impl Into<String>, registry: Arc<FilterRegistry>) -> Self {
        Self {
            model: model.into(),
            registry,
        }
    }

    /// Filter a document, an array of documents or any nested value
    pub fn filter_object(&self, value: Value, access: AccessLevel, populate: &[PopulateSpec]) -> Value {
        filter_value(&self.registry, &self.model, value, access, populate)
    }

    pub fn filter_document(
        &self,
        doc: Document,
        access: AccessLevel,
        populate: &[PopulateSpec],
    ) -> Document {
        match self.filter_object(Value::Object(doc), access, populate) {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    /// Whether `path` (or an ancestor of it) is hidden at `access`
    pub fn is_hidden(&self, path: &str, access: AccessLevel) -> bool {
        match self.registry.keys(&self.model) {
            Some(keys) => keys
                .excluded(access)
                .any(|key| path == key || path.starts_with(&format!("{}.", key))),
            None => false,
        }
    }
}

fn filter_value(
    registry: &FilterRegistry,
    model: &str,
    value: Value,
    access: AccessLevel,
    populate: &[PopulateSpec],
) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| filter_value(registry, model, item, access, populate))
                .collect(),
        ),
        Value::Object(_) => {
            let filter = match registry.models.get(model) {
                Some(filter) => filter,
                None => return value,
            };

            let mut value = value;
            for key in filter.keys.excluded(access) {
                remove_path(&mut value, key);
            }

            for spec in populate {
                let target = match filter.relations.get(&spec.path) {
                    Some(target) => target,
                    None => continue,
                };
                if let Some(slot) = object_path_mut(&mut value, &spec.path) {
                    let populated = std::mem::take(slot);
                    *slot = match populated {
                        Value::Object(_) | Value::Array(_) => {
                            filter_value(registry, target, populated, access, &spec.populate)
                        }
                        other => other,
                    };
                }
            }
            value
        }
        other => other,
    }
}

fn object_path_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object_mut()?.get_mut(segment))
}
