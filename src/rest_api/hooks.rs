//! Resource hooks
//!
//! User-supplied behavior plugged into a resource's routes: the context
//! filter narrowing every query, the pre/post middleware lists, the output
//! function and the error reporter. Anything left unset is an identity step.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;

use super::errors::{ErrorResponse, RestError, RestResult};
use crate::core::middleware::Middleware;
use crate::core::{RequestContext, RestRequest, RestResponse};
use crate::store::Query;

type ContextFilterFn = dyn Fn(&RestRequest, Query) -> RestResult<Query> + Send + Sync;

/// Narrows every query issued for a request
#[derive(Clone)]
pub struct ContextFilter(Option<Arc<ContextFilterFn>>);

impl ContextFilter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RestRequest, Query) -> RestResult<Query> + Send + Sync + 'static,
    {
        Self(Some(Arc::new(f)))
    }

    /// Pass-through filter
    pub fn identity() -> Self {
        Self(None)
    }

    pub fn apply(&self, req: &RestRequest, query: Query) -> RestResult<Query> {
        match &self.0 {
            Some(f) => f(req, query),
            None => Ok(query),
        }
    }
}

impl Default for ContextFilter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for ContextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ContextFilter(..)"),
            None => f.write_str("ContextFilter(identity)"),
        }
    }
}

/// Turns the operation outcome into a response
pub trait OutputFn: Send + Sync {
    fn emit(&self, req: &RestRequest, ctx: &RequestContext) -> RestResponse;
}

impl<F> OutputFn for F
where
    F: Fn(&RestRequest, &RequestContext) -> RestResponse + Send + Sync,
{
    fn emit(&self, req: &RestRequest, ctx: &RequestContext) -> RestResponse {
        self(req, ctx)
    }
}

/// Body is the result when present; status is the operation's status code
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOutput;

impl OutputFn for DefaultOutput {
    fn emit(&self, _req: &RestRequest, ctx: &RequestContext) -> RestResponse {
        RestResponse::new(
            ctx.status_code().unwrap_or(StatusCode::OK),
            ctx.result().cloned(),
        )
        .with_headers(ctx.headers.clone())
    }
}

/// Turns a failed request into a response
pub trait ErrorReporter: Send + Sync {
    fn report(&self, req: &RestRequest, err: &RestError) -> RestResponse;
}

impl<F> ErrorReporter for F
where
    F: Fn(&RestRequest, &RestError) -> RestResponse + Send + Sync,
{
    fn report(&self, req: &RestRequest, err: &RestError) -> RestResponse {
        self(req, err)
    }
}

/// `{"error": <description>, "code": <status>}` with the error's status
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorReporter;

impl ErrorReporter for DefaultErrorReporter {
    fn report(&self, _req: &RestRequest, err: &RestError) -> RestResponse {
        let body = serde_json::to_value(ErrorResponse::from(err)).unwrap_or(Value::Null);
        RestResponse::new(err.status_code(), Some(body))
    }
}

/// Middleware lists run around the operation
#[derive(Clone, Default)]
pub struct Hooks {
    /// Before id resolution and every operation
    pub pre_middleware: Vec<Arc<dyn Middleware>>,
    pub pre_create: Vec<Arc<dyn Middleware>>,
    pub pre_read: Vec<Arc<dyn Middleware>>,
    pub pre_update: Vec<Arc<dyn Middleware>>,
    pub pre_delete: Vec<Arc<dyn Middleware>>,
    pub post_create: Vec<Arc<dyn Middleware>>,
    pub post_read: Vec<Arc<dyn Middleware>>,
    pub post_update: Vec<Arc<dyn Middleware>>,
    pub post_delete: Vec<Arc<dyn Middleware>>,
    /// After every post hook, skipped when one fails
    pub post_process: Vec<Arc<dyn Middleware>>,
}

impl Hooks {
    /// Hook lists of `self`, falling back per list to `defaults` when empty
    pub fn or(self, defaults: &Hooks) -> Hooks {
        fn pick(own: Vec<Arc<dyn Middleware>>, fallback: &[Arc<dyn Middleware>]) -> Vec<Arc<dyn Middleware>> {
            if own.is_empty() {
                fallback.to_vec()
            } else {
                own
            }
        }

        Hooks {
            pre_middleware: pick(self.pre_middleware, &defaults.pre_middleware),
            pre_create: pick(self.pre_create, &defaults.pre_create),
            pre_read: pick(self.pre_read, &defaults.pre_read),
            pre_update: pick(self.pre_update, &defaults.pre_update),
            pre_delete: pick(self.pre_delete, &defaults.pre_delete),
            post_create: pick(self.post_create, &defaults.post_create),
            post_read: pick(self.post_read, &defaults.post_read),
            post_update: pick(self.post_update, &defaults.post_update),
            post_delete: pick(self.post_delete, &defaults.post_delete),
            post_process: pick(self.post_process, &defaults.post_process),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_middleware", &self.pre_middleware.len())
            .field("pre_create", &self.pre_create.len())
            .field("pre_read", &self.pre_read.len())
            .field("pre_update", &self.pre_update.len())
            .field("pre_delete", &self.pre_delete.len())
            .field("post_create", &self.post_create.len())
            .field("post_read", &self.post_read.len())
            .field("post_update", &self.post_update.len())
            .field("post_delete", &self.post_delete.len())
            .field("post_process", &self.post_process.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::middleware::from_fn;
    use crate::schema::{FieldDef, ModelSchema};
    use crate::store::InMemoryStore;
    use serde_json::json;

    #[test]
    fn test_identity_context_filter() {
        let req = RestRequest::builder().build();
        let query = Query::new().limit(3);
        assert_eq!(ContextFilter::default().apply(&req, query.clone()).unwrap(), query);
    }

    #[test]
    fn test_context_filter_narrows() {
        let filter = ContextFilter::new(|req, query| {
            Ok(query.where_eq("tenant", json!(req.header("x-tenant").unwrap_or("none"))))
        });
        let req = RestRequest::builder().header("x-tenant", "acme").build();
        let query = filter.apply(&req, Query::new()).unwrap();
        assert!(query.predicate.matches(&json!({"tenant": "acme"})));
        assert!(!query.predicate.matches(&json!({"tenant": "other"})));
    }

    #[test]
    fn test_default_output() {
        let store = InMemoryStore::new();
        let collection = store
            .define(ModelSchema::new("Customer", vec![FieldDef::string("name")]))
            .unwrap();
        let mut ctx = RequestContext::new(collection);
        ctx.set_result(Some(json!({"name": "Bob"})), StatusCode::CREATED)
            .unwrap();

        let response = DefaultOutput.emit(&RestRequest::builder().build(), &ctx);
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, Some(json!({"name": "Bob"})));
    }

    #[test]
    fn test_default_error_reporter() {
        let response =
            DefaultErrorReporter.report(&RestRequest::builder().build(), &RestError::NotFound);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, Some(json!({"error": "Not Found", "code": 404})));
    }

    #[test]
    fn test_hooks_fall_back_per_list() {
        let defaults = Hooks {
            pre_read: vec![from_fn(|_, _| Ok(()))],
            post_read: vec![from_fn(|_, _| Ok(()))],
            ..Hooks::default()
        };
        let own = Hooks {
            pre_read: vec![from_fn(|_, _| Ok(())), from_fn(|_, _| Ok(()))],
            ..Hooks::default()
        };
        let merged = own.or(&defaults);
        assert_eq!(merged.pre_read.len(), 2);
        assert_eq!(merged.post_read.len(), 1);
        assert!(merged.pre_create.is_empty());
    }
}
