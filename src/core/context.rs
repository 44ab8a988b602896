//! Request Context
//!
//! Per-request state carried through the middleware chain.
//! Owned by exactly one in-flight request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use super::request::RestResponse;
use crate::rest_api::access::AccessLevel;
use crate::rest_api::errors::{RestError, RestResult};
use crate::rest_api::parser::QueryOptions;
use crate::schema::Document;
use crate::store::Collection;

/// Context carried through the middleware chain
pub struct RequestContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Target collection, fixed for the request
    pub collection: Arc<dyn Collection>,

    /// Caller's access level (set by the access-check stage)
    pub access: AccessLevel,

    /// Parsed query options (set by the query-preparation stage)
    pub query: QueryOptions,

    /// Decoded JSON body (create/update)
    pub body: Option<Value>,

    /// Pre-fetched target document (non-atomic update/delete)
    pub document: Option<Document>,

    /// Full match count for the pagination header
    pub total_count: Option<u64>,

    /// Extra response headers
    pub headers: HeaderMap,

    /// Response emitted by the output stage
    pub response: Option<RestResponse>,

    /// Free-form values shared between hooks
    pub metadata: HashMap<String, Value>,

    result: Option<Value>,
    status: Option<StatusCode>,
    started_at: Instant,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            collection,
            access: AccessLevel::Public,
            query: QueryOptions::default(),
            body: None,
            document: None,
            total_count: None,
            headers: HeaderMap::new(),
            response: None,
            metadata: HashMap::new(),
            result: None,
            status: None,
            started_at: Instant::now(),
        }
    }

    /// Record the operation outcome. Allowed once per request.
    pub fn set_result(&mut self, result: Option<Value>, status: StatusCode) -> RestResult<()> {
        if self.status.is_some() {
            return Err(RestError::Internal(
                "operation result already written".to_string(),
            ));
        }
        self.result = result;
        self.status = Some(status);
        Ok(())
    }

    /// Payload written by the operation
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Status written by the operation
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Add metadata for hooks
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("collection", &self.collection.name())
            .field("access", &self.access)
            .field("status", &self.status)
            .field("total_count", &self.total_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, ModelSchema};
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn context() -> RequestContext {
        let store = InMemoryStore::new();
        let collection = store
            .define(ModelSchema::new("Customer", vec![FieldDef::string("name")]))
            .unwrap();
        RequestContext::new(collection)
    }

    #[test]
    fn test_defaults() {
        let ctx = context();
        assert_eq!(ctx.access, AccessLevel::Public);
        assert!(ctx.result().is_none());
        assert!(ctx.status_code().is_none());
    }

    #[test]
    fn test_result_written_once() {
        let mut ctx = context();
        ctx.set_result(Some(json!([])), StatusCode::OK).unwrap();
        assert!(ctx.set_result(None, StatusCode::NO_CONTENT).is_err());
        assert_eq!(ctx.status_code(), Some(StatusCode::OK));
        assert_eq!(ctx.result(), Some(&json!([])));
    }

    #[test]
    fn test_metadata() {
        let ctx = context().with_metadata("tenant", json!("acme"));
        assert_eq!(ctx.metadata.get("tenant"), Some(&json!("acme")));
    }
}
