//! Query Preparation
//!
//! Parses the query string into the context's query options.

use crate::core::context::RequestContext;
use crate::core::pipeline::{Next, StageResult};
use crate::core::request::RestRequest;
use crate::rest_api::parser::QueryOptions;
use crate::store::BoxFuture;

use super::Middleware;

/// First stage of every route
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareQuery;

impl Middleware for PrepareQuery {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            ctx.query = QueryOptions::parse(req.query())?;
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "prepare_query"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::Pipeline;
    use crate::rest_api::errors::RestError;
    use crate::schema::{FieldDef, ModelSchema};
    use crate::store::{InMemoryStore, SortKey};

    fn context() -> RequestContext {
        let store = InMemoryStore::new();
        let collection = store
            .define(ModelSchema::new("Customer", vec![FieldDef::string("name")]))
            .unwrap();
        RequestContext::new(collection)
    }

    #[tokio::test]
    async fn test_options_parsed_into_context() {
        let pipeline = Pipeline::new().with_middleware(PrepareQuery);
        let req = RestRequest::builder()
            .query_param("sort", "-name")
            .query_param("limit", "2")
            .build();
        let mut ctx = context();

        pipeline.execute(&req, &mut ctx).await.unwrap();
        assert_eq!(ctx.query.sort, vec![SortKey::desc("name")]);
        assert_eq!(ctx.query.limit, Some(2));
    }

    #[tokio::test]
    async fn test_invalid_option_rejected() {
        let pipeline = Pipeline::new().with_middleware(PrepareQuery);
        let req = RestRequest::builder().query_param("skip", "many").build();
        let mut ctx = context();

        let err = pipeline.execute(&req, &mut ctx).await.unwrap_err();
        assert!(matches!(err, RestError::Validation { .. }));
    }
}
