//! # Request Pipeline Core
//!
//! Per-request context, the middleware chain that threads it and the
//! stages every generated route is assembled from.
//!
//! ## Design Principles
//!
//! - One context per request, owned by that request only
//! - Stages run strictly in order; the first error ends the chain
//! - The operation writes the outcome once; later stages only read it

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod request;

pub use context::RequestContext;
pub use middleware::{from_fn, Middleware};
pub use pipeline::{Next, Pipeline, PipelineBuilder, StageResult};
pub use request::{RestRequest, RestRequestBuilder, RestResponse};
