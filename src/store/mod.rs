//! # Collection Capability
//!
//! The document store consumed by the REST layer. Query execution,
//! persistence and validation belong to the store; the REST layer only
//! builds [`Query`] values and hands over documents.

pub mod memory;
pub mod predicate;
pub mod query;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{Document, ModelSchema};

pub use memory::{InMemoryCollection, InMemoryStore};
pub use predicate::{FilterExpr, FilterOperator, Predicate};
pub use query::{PopulateSpec, Projection, Query, ReadPreference, SortKey};

/// Boxed future returned by collection operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Document failed schema validation
    #[error("{0}")]
    Validation(String),

    /// A predicate value could not be cast to the field's type
    #[error("Cast to ObjectId failed for value \"{value}\" at path \"{path}\"")]
    Cast { path: String, value: String },

    /// Referenced collection does not exist
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Any other backend failure, with the status it should surface as
    #[error("{message}")]
    Backend { status: u16, message: String },
}

impl StoreError {
    /// Generic backend failure (500)
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            status: 500,
            message: message.into(),
        }
    }

    /// HTTP status this error surfaces as
    pub fn status(&self) -> u16 {
        match self {
            StoreError::Validation(_) | StoreError::Cast { .. } => 400,
            StoreError::UnknownCollection(_) => 500,
            StoreError::Backend { status, .. } => *status,
        }
    }
}

/// Options for atomic updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Return the document after the update instead of before
    pub new: bool,
    /// Validate the assigned paths against the schema
    pub run_validators: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            new: true,
            run_validators: false,
        }
    }
}

/// A queryable collection of documents
///
/// `Query::lean` and `Query::read_preference` are hints. A store without
/// model instances or replicas ignores them, as [`InMemoryStore`] does.
pub trait Collection: Send + Sync {
    /// Model name
    fn name(&self) -> &str;

    /// Schema metadata for the documents held
    fn schema(&self) -> &ModelSchema;

    /// All documents matching the query, after sort, pagination, selection and population
    fn find<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Document>>>;

    /// First document matching the query
    fn find_one<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Option<Document>>>;

    /// Number of documents matching the query predicate, within `skip` and `limit`
    fn count<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<u64>>;

    /// Distinct values of `query.distinct` across matching documents
    fn distinct<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Value>>>;

    /// Insert a new document, returning it as stored
    fn create(&self, doc: Document) -> BoxFuture<'_, StoreResult<Document>>;

    /// Apply flat dot-path assignments to the first match in one round trip
    fn find_one_and_update<'a>(
        &'a self,
        query: &'a Query,
        update: &'a Document,
        options: UpdateOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Document>>>;

    /// Remove the first match in one round trip, returning it
    fn find_one_and_remove<'a>(
        &'a self,
        query: &'a Query,
    ) -> BoxFuture<'a, StoreResult<Option<Document>>>;

    /// Persist a full, previously fetched document
    fn save(&self, doc: Document) -> BoxFuture<'_, StoreResult<Document>>;

    /// Remove every document matching the query predicate
    fn remove<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<u64>>;

    /// Replace relation identifiers with the referenced documents
    fn populate<'a>(
        &'a self,
        docs: Vec<Document>,
        paths: &'a [PopulateSpec],
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>>;
}
