//! Output Emission
//!
//! Writes the pagination header and turns the operation outcome into the
//! pending response. Post hooks run after these stages and may still
//! replace the response with an error.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};

use crate::core::context::RequestContext;
use crate::core::pipeline::{Next, StageResult};
use crate::core::request::RestRequest;
use crate::rest_api::hooks::OutputFn;
use crate::store::BoxFuture;

use super::Middleware;

/// Copies `ctx.total_count` into a response header
#[derive(Debug, Clone)]
pub struct TotalCountHeader {
    header: HeaderName,
}

impl TotalCountHeader {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Middleware for TotalCountHeader {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            if let Some(count) = ctx.total_count {
                ctx.headers
                    .insert(self.header.clone(), HeaderValue::from(count));
            }
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "total_count_header"
    }
}

/// Builds `ctx.response` with the resource's output function
#[derive(Clone)]
pub struct Output {
    output: Arc<dyn OutputFn>,
}

impl Output {
    pub fn new(output: Arc<dyn OutputFn>) -> Self {
        Self { output }
    }
}

impl Middleware for Output {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            ctx.response = Some(self.output.emit(req, ctx));
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "output"
    }
}
