//! Deprecated Route Notice
//!
//! Logs a warning the first time a deprecated route is used.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::core::context::RequestContext;
use crate::core::pipeline::{Next, StageResult};
use crate::core::request::RestRequest;
use crate::store::BoxFuture;

use super::Middleware;

/// Warns once per route, then passes through
#[derive(Debug)]
pub struct DeprecationNotice {
    route: String,
    replacement: String,
    warned: AtomicBool,
}

impl DeprecationNotice {
    pub fn new(route: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            replacement: replacement.into(),
            warned: AtomicBool::new(false),
        }
    }

    /// Whether the warning has already been emitted
    pub fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Relaxed)
    }
}

impl Middleware for DeprecationNotice {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            if !self.warned.swap(true, Ordering::Relaxed) {
                warn!(
                    route = %self.route,
                    replacement = %self.replacement,
                    "deprecated route used, switch to the replacement"
                );
            }
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "deprecation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::pipeline::PipelineBuilder;
    use crate::schema::{FieldDef, ModelSchema};
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_passes_through_and_warns_once() {
        let notice = Arc::new(DeprecationNotice::new(
            "POST /api/v1/Customer/:id",
            "PATCH /api/v1/Customer/:id",
        ));
        let stage: Arc<dyn Middleware> = notice.clone();
        let pipeline = PipelineBuilder::new().with_all(&[stage]).build();

        let store = InMemoryStore::new();
        let collection = store
            .define(ModelSchema::new("Customer", vec![FieldDef::string("name")]))
            .unwrap();
        let req = RestRequest::builder().build();

        assert!(!notice.has_warned());
        for _ in 0..2 {
            let mut ctx = RequestContext::new(collection.clone());
            pipeline.execute(&req, &mut ctx).await.unwrap();
        }
        assert!(notice.has_warned());
    }
}
