//! Content-Type Guard
//!
//! Create and update require a JSON body. The guard runs before any hook
//! or store access, so a rejected request has no side effects.

use serde_json::Value;

use crate::core::context::RequestContext;
use crate::core::pipeline::{Next, StageResult};
use crate::core::request::RestRequest;
use crate::rest_api::errors::RestError;
use crate::store::BoxFuture;

use super::Middleware;

/// Rejects bodies that are not JSON objects
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeGuard;

impl ContentTypeGuard {
    /// `application/json` or any `application/*+json`
    pub fn is_json(content_type: &str) -> bool {
        let content_type = content_type.to_ascii_lowercase();
        content_type == "application/json"
            || (content_type.starts_with("application/") && content_type.ends_with("+json"))
    }

    fn decode(req: &RestRequest) -> Result<Value, RestError> {
        let content_type = req
            .content_type()
            .ok_or_else(|| RestError::validation("missing_content_type"))?;
        if !Self::is_json(content_type) {
            return Err(RestError::validation("invalid_content_type"));
        }

        match serde_json::from_slice::<Value>(req.body()) {
            Ok(body @ Value::Object(_)) => Ok(body),
            Ok(_) | Err(_) => Err(RestError::validation("invalid_json_body")),
        }
    }
}

impl Middleware for ContentTypeGuard {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            ctx.body = Some(Self::decode(req)?);
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "content_type"
    }
}
