//! Schema type definitions
//!
//! Supported field types:
//! - string, number, boolean, date (RFC 3339 string)
//! - objectid: 24-hex identifier, optionally a relation via `ref`
//! - mixed: any JSON value
//! - array: homogeneous array with element type
//!
//! Nested sub-document fields are declared by their dot-path
//! (`address.city`), the same way the store enumerates schema paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{get_path, is_object_id, Document};
use crate::rest_api::access::AccessLevel;

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Any JSON number
    Number,
    /// Boolean
    Boolean,
    /// RFC 3339 timestamp string
    Date,
    /// 24-hex-character identifier
    ObjectId,
    /// Untyped value
    Mixed,
    /// Homogeneous array with single element type
    Array {
        /// Element type (boxed to allow recursive types)
        #[serde(rename = "element_type")]
        element_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::ObjectId => "objectid",
            FieldType::Mixed => "mixed",
            FieldType::Array { .. } => "array",
        }
    }

    /// Validate a JSON value against this field type
    pub fn validate(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            FieldType::ObjectId => value.as_str().map(is_object_id).unwrap_or(false),
            FieldType::Mixed => true,
            FieldType::Array { element_type } => value
                .as_array()
                .map(|items| items.iter().all(|item| element_type.validate(item)))
                .unwrap_or(false),
        }
    }

    /// Whether values of this type are ObjectIds (or arrays of them)
    pub fn holds_object_ids(&self) -> bool {
        match self {
            FieldType::ObjectId => true,
            FieldType::Array { element_type } => element_type.holds_object_ids(),
            _ => false,
        }
    }
}

/// A declared field path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Dot-path of the field
    pub name: String,

    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,

    /// Whether the field must be present on create
    #[serde(default)]
    pub required: bool,

    /// Referenced model, for relation fields
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Field-level visibility annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessLevel>,

    /// Default value applied on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create an optional field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            reference: None,
            access: None,
            default: None,
        }
    }

    /// Optional string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Optional number field
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Relation to a single document of `model`
    pub fn reference(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            reference: Some(model.into()),
            ..Self::new(name, FieldType::ObjectId)
        }
    }

    /// Relation to many documents of `model`
    pub fn references(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            reference: Some(model.into()),
            ..Self::new(
                name,
                FieldType::Array {
                    element_type: Box::new(FieldType::ObjectId),
                },
            )
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach an access annotation
    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = Some(access);
        self
    }

    /// Attach a default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The referenced model if this field holds relation identifiers
    pub fn relation_target(&self) -> Option<&str> {
        if self.field_type.holds_object_ids() {
            self.reference.as_deref()
        } else {
            None
        }
    }
}

/// Schema definition for a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name
    pub name: String,

    /// Declared field paths
    #[serde(default)]
    pub fields: Vec<FieldDef>,

    /// Whether the store assigns `_id` on create
    #[serde(default = "default_auto_id")]
    pub auto_id: bool,

    /// Document version field, `None` disables versioning
    #[serde(default = "default_version_key")]
    pub version_key: Option<String>,
}

fn default_auto_id() -> bool {
    true
}

fn default_version_key() -> Option<String> {
    Some("__v".to_string())
}

impl ModelSchema {
    /// Identifier field assigned by the store
    pub const ID_FIELD: &'static str = "_id";

    /// Create a schema with the default id and version settings
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
            auto_id: default_auto_id(),
            version_key: default_version_key(),
        }
    }

    /// Look up a declared field by its dot-path
    pub fn field(&self, path: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == path)
    }

    /// The referenced model if `path` is a relation field
    pub fn relation_target(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(FieldDef::relation_target)
    }

    /// Whether `path` holds relation identifiers
    pub fn is_relation(&self, path: &str) -> bool {
        self.relation_target(path).is_some()
    }

    /// Fields carrying an access annotation
    pub fn access_annotations(&self) -> impl Iterator<Item = (&str, AccessLevel)> {
        self.fields
            .iter()
            .filter_map(|f| f.access.map(|level| (f.name.as_str(), level)))
    }

    /// Get required fields
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Validate a full document against this schema
    pub fn validate(&self, doc: &Document) -> Result<(), String> {
        let root = Value::Object(doc.clone());

        for field in self.required_fields() {
            match get_path(&root, &field.name) {
                None | Some(Value::Null) => {
                    return Err(format!("Path `{}` is required.", field.name));
                }
                Some(_) => {}
            }
        }

        for field in &self.fields {
            if let Some(value) = get_path(&root, &field.name) {
                self.check_type(field, value)?;
            }
        }

        Ok(())
    }

    /// Validate individual flat-path assignments (partial update)
    pub fn validate_paths(&self, updates: &Document) -> Result<(), String> {
        for (path, value) in updates {
            if let Some(field) = self.field(path) {
                if field.required && value.is_null() {
                    return Err(format!("Path `{}` is required.", field.name));
                }
                self.check_type(field, value)?;
            }
        }
        Ok(())
    }

    fn check_type(&self, field: &FieldDef, value: &Value) -> Result<(), String> {
        if value.is_null() || field.field_type.validate(value) {
            Ok(())
        } else {
            Err(format!(
                "Cast to {} failed for value {} at path `{}`",
                field.field_type.type_name(),
                value,
                field.name
            ))
        }
    }
}
