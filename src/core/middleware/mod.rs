//! Middleware Traits and Implementations
//!
//! Middleware stages for the request pipeline.

use std::sync::Arc;

use super::context::RequestContext;
use super::pipeline::{Next, StageResult};
use super::request::RestRequest;
use crate::rest_api::errors::RestResult;
use crate::store::BoxFuture;

/// Middleware trait for pipeline stages
pub trait Middleware: Send + Sync {
    /// Process the request, optionally modifying context, then continue with `next`
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult>;

    /// Stage name for diagnostics
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware from a synchronous function that runs before the rest of the chain
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&RestRequest, &mut RequestContext) -> RestResult<()> + Send + Sync,
{
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            (self.f)(req, ctx)?;
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "hook"
    }
}

/// Wrap a function as shared middleware
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&RestRequest, &mut RequestContext) -> RestResult<()> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { f })
}

/// Pipeline stages
pub mod access;
pub mod content_type;
pub mod deprecation;
pub mod find_by_id;
pub mod output;
pub mod prepare_query;

pub use access::AccessCheck;
pub use content_type::ContentTypeGuard;
pub use deprecation::DeprecationNotice;
pub use find_by_id::FindById;
pub use output::{Output, TotalCountHeader};
pub use prepare_query::PrepareQuery;
