//! # Pipeline Assembly
//!
//! Builds the ordered middleware chain of each route:
//!
//! ```text
//! prepare-query → content-type → deprecation → preMiddleware → id-resolution
//!   → pre<Op> → access-check → operation → total-count → output
//!   → post<Op> → postProcess
//! ```
//!
//! Content-type applies to create/update only, id-resolution to non-atomic
//! update/delete only. Any stage error stops the chain; [`RouteChain`] then
//! hands it to the resource's error reporter.

use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{debug, warn};

use super::hooks::ErrorReporter;
use super::operations::{OperationKind, OperationSet};
use super::routes::RouteSpec;
use crate::core::middleware::{
    self, AccessCheck, ContentTypeGuard, DeprecationNotice, FindById, Middleware, Output,
    PrepareQuery,
};
use crate::core::{Pipeline, PipelineBuilder, RequestContext, RestRequest, RestResponse};
use crate::store::Collection;

/// Assembles route chains for one resource
pub struct PipelineAssembler {
    operations: Arc<OperationSet>,
    collection: Arc<dyn Collection>,
}

impl PipelineAssembler {
    pub fn new(operations: Arc<OperationSet>, collection: Arc<dyn Collection>) -> Self {
        Self {
            operations,
            collection,
        }
    }

    /// Chain for one route
    pub fn assemble(&self, route: &RouteSpec) -> RouteChain {
        let options = self.operations.options();
        let hooks = &options.hooks;
        let kind = route.operation;

        let mut builder = PipelineBuilder::new().with(PrepareQuery);
        if kind.has_body() {
            builder = builder.with(ContentTypeGuard);
        }
        if route.deprecated {
            builder = builder.with(DeprecationNotice::new(
                format!("{} {}", route.method, route.path),
                route.replacement(),
            ));
        }
        builder = builder.with_all(&hooks.pre_middleware);
        if self.resolves_id(kind) {
            builder = builder.with(FindById::new(
                options.id_property.clone(),
                options.context_filter.clone(),
            ));
        }
        builder = builder
            .with_all(self.pre_hooks(kind))
            .with(AccessCheck::new(options.access.clone()))
            .with_all(&[self.operations.stage(kind)]);
        if let (OperationKind::List, Some(header)) = (kind, &options.total_count_header) {
            builder = builder.with(middleware::TotalCountHeader::new(header.clone()));
        }
        let pipeline = builder
            .with(Output::new(Arc::clone(&options.output_fn)))
            .with_all(self.post_hooks(kind))
            .with_all(&hooks.post_process)
            .build();

        RouteChain {
            route: format!("{} {}", route.method, route.path),
            pipeline,
            collection: Arc::clone(&self.collection),
            on_error: Arc::clone(&options.on_error),
        }
    }

    /// Non-atomic updates and deletes work on a fetched instance
    fn resolves_id(&self, kind: OperationKind) -> bool {
        let options = self.operations.options();
        match kind {
            OperationKind::Update => !options.find_one_and_update,
            OperationKind::DeleteOne => !options.find_one_and_remove,
            _ => false,
        }
    }

    fn pre_hooks(&self, kind: OperationKind) -> &[Arc<dyn Middleware>] {
        let hooks = &self.operations.options().hooks;
        match kind {
            OperationKind::Create => &hooks.pre_create,
            OperationKind::Update => &hooks.pre_update,
            OperationKind::DeleteOne | OperationKind::DeleteMany => &hooks.pre_delete,
            OperationKind::List
            | OperationKind::Count
            | OperationKind::GetOne
            | OperationKind::GetShallow => &hooks.pre_read,
        }
    }

    fn post_hooks(&self, kind: OperationKind) -> &[Arc<dyn Middleware>] {
        let hooks = &self.operations.options().hooks;
        match kind {
            OperationKind::Create => &hooks.post_create,
            OperationKind::Update => &hooks.post_update,
            OperationKind::DeleteOne | OperationKind::DeleteMany => &hooks.post_delete,
            OperationKind::List
            | OperationKind::Count
            | OperationKind::GetOne
            | OperationKind::GetShallow => &hooks.post_read,
        }
    }
}

/// An assembled route: the chain plus what it needs per request
pub struct RouteChain {
    route: String,
    pipeline: Pipeline,
    collection: Arc<dyn Collection>,
    on_error: Arc<dyn ErrorReporter>,
}

impl RouteChain {
    /// `METHOD path` this chain serves
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.pipeline.stage_names()
    }

    /// Run a request through the chain
    pub async fn handle(&self, req: RestRequest) -> RestResponse {
        let mut ctx = RequestContext::new(Arc::clone(&self.collection));
        debug!(
            request_id = %ctx.request_id,
            method = %req.method(),
            path = %req.path(),
            route = %self.route,
            "dispatching request"
        );

        match self.pipeline.execute(&req, &mut ctx).await {
            Ok(()) => {
                debug!(
                    request_id = %ctx.request_id,
                    elapsed_ms = ctx.elapsed_ms() as u64,
                    "request complete"
                );
                match ctx.response.take() {
                    Some(response) => response,
                    None => RestResponse::new(
                        ctx.status_code().unwrap_or(StatusCode::OK),
                        ctx.result().cloned(),
                    ),
                }
            }
            Err(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    warn!(request_id = %ctx.request_id, %status, error = %err, "request failed");
                } else {
                    debug!(request_id = %ctx.request_id, %status, error = %err, "request rejected");
                }
                self.on_error.report(&req, &err)
            }
        }
    }
}
