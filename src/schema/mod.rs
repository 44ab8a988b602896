//! Model schema metadata
//!
//! Describes the documents a collection holds: declared field paths, their
//! types, relation references and access annotations. The REST layer only
//! reads this metadata; it never depends on how a store represents schemas.

mod document;
mod types;

pub use document::{
    get_path, is_object_id, new_object_id, remove_path, set_path, Document,
};
pub use types::{FieldDef, FieldType, ModelSchema};
