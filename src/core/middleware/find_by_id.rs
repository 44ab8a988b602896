//! Id Resolution
//!
//! Fetches the document addressed by `:id` into the context, for
//! operations that mutate an in-memory instance instead of issuing an
//! atomic store update.

use serde_json::Value;

use crate::core::context::RequestContext;
use crate::core::pipeline::{Next, StageResult};
use crate::core::request::RestRequest;
use crate::rest_api::errors::RestError;
use crate::rest_api::hooks::ContextFilter;
use crate::store::{BoxFuture, Query};

use super::Middleware;

/// Loads `ctx.document`, failing with 404 when nothing matches
#[derive(Debug, Clone)]
pub struct FindById {
    id_property: String,
    context_filter: ContextFilter,
}

impl FindById {
    pub fn new(id_property: impl Into<String>, context_filter: ContextFilter) -> Self {
        Self {
            id_property: id_property.into(),
            context_filter,
        }
    }
}

impl Middleware for FindById {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let id = req.id().ok_or(RestError::NotFound)?;
            let query = self.context_filter.apply(
                req,
                Query::new().where_eq(self.id_property.clone(), Value::String(id.to_string())),
            )?;

            let document = ctx
                .collection
                .find_one(&query)
                .await?
                .ok_or(RestError::NotFound)?;
            ctx.document = Some(document);

            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "find_by_id"
    }
}
