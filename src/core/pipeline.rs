//! Execution Pipeline
//!
//! Ordered middleware chain run once per request. Every stage either
//! short-circuits with an error or hands the request to the next stage.

use std::sync::Arc;

use super::context::RequestContext;
use super::middleware::Middleware;
use super::request::RestRequest;
use crate::rest_api::errors::RestResult;
use crate::store::BoxFuture;

/// Result of a pipeline stage
pub type StageResult = RestResult<()>;

/// Remaining stages of the chain
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn Middleware>]) -> Self {
        Self { middleware }
    }

    /// Run the remaining stages. An exhausted chain succeeds.
    pub fn run<'b>(
        self,
        req: &'b RestRequest,
        ctx: &'b mut RequestContext,
    ) -> BoxFuture<'b, StageResult>
    where
        'a: 'b,
    {
        Box::pin(async move {
            match self.middleware.split_first() {
                Some((first, rest)) => first.process(req, ctx, Next::new(rest)).await,
                None => Ok(()),
            }
        })
    }
}

/// An assembled middleware chain
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware to the pipeline
    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(m));
        self
    }

    /// Run a request through every stage
    pub async fn execute(&self, req: &RestRequest, ctx: &mut RequestContext) -> StageResult {
        Next::new(&self.middleware).run(req, ctx).await
    }

    /// Get the number of middleware stages
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

/// Builder for pipeline construction
#[derive(Default)]
pub struct PipelineBuilder {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware
    pub fn with(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(m));
        self
    }

    /// Add already shared middleware, in order
    pub fn with_all(mut self, stages: &[Arc<dyn Middleware>]) -> Self {
        self.middleware.extend(stages.iter().cloned());
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            middleware: self.middleware,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::middleware::from_fn;
    use crate::rest_api::errors::RestError;
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

    fn mark(label: &'static str) -> Arc<dyn Middleware> {
        from_fn(move |_req, ctx| {
            let seen = ctx
                .metadata
                .entry("seen".to_string())
                .or_insert_with(|| json!([]));
            if let Some(items) = seen.as_array_mut() {
                items.push(json!(label));
            }
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_pipeline_with_no_middleware() {
        let pipeline = Pipeline::new();
        let mut ctx = context();
        let req = RestRequest::builder().build();

        assert!(pipeline.execute(&req, &mut ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let pipeline = PipelineBuilder::new()
            .with_all(&[mark("a"), mark("b"), mark("c")])
            .build();
        let mut ctx = context();
        let req = RestRequest::builder().build();

        pipeline.execute(&req, &mut ctx).await.unwrap();
        assert_eq!(ctx.metadata["seen"], json!(["a", "b", "c"]));
        assert_eq!(pipeline.middleware_count(), 3);
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let fail = from_fn(|_req, _ctx| Err(RestError::NotFound));
        let pipeline = PipelineBuilder::new()
            .with_all(&[mark("a"), fail, mark("c")])
            .build();
        let mut ctx = context();
        let req = RestRequest::builder().build();

        let result = pipeline.execute(&req, &mut ctx).await;
        assert!(matches!(result, Err(RestError::NotFound)));
        assert_eq!(ctx.metadata["seen"], json!(["a"]));
    }
}
