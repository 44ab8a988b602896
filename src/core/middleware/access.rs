//! Access Check
//!
//! Resolves the caller's access level into the context.

use crate::core::context::RequestContext;
use crate::core::pipeline::{Next, StageResult};
use crate::core::request::RestRequest;
use crate::rest_api::access::Access;
use crate::store::BoxFuture;

use super::Middleware;

/// Sets `ctx.access` from the resource's access setting
#[derive(Debug, Clone, Default)]
pub struct AccessCheck {
    access: Access,
}

impl AccessCheck {
    pub fn new(access: Access) -> Self {
        Self { access }
    }
}

impl Middleware for AccessCheck {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            ctx.access = self.access.resolve(req);
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "access"
    }
}
