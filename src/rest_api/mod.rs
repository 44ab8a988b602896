//! # REST Resource API
//!
//! Generates list/count/get/create/update/delete routes for document
//! collections. Each route is a middleware chain (see [`assembler`]) that
//! parses query options, checks the body, resolves the caller's access
//! level, runs the operation and filters the result.

pub mod access;
pub mod assembler;
pub mod builder;
pub mod errors;
pub mod filter;
pub mod hooks;
pub mod mutation;
pub mod naming;
pub mod operations;
pub mod options;
pub mod parser;
pub mod restify;
pub mod routes;

pub use access::{Access, AccessLevel};
pub use assembler::{PipelineAssembler, RouteChain};
pub use builder::QueryBuilder;
pub use errors::{ErrorResponse, RestError, RestResult};
pub use filter::{AccessFilter, FilterRegistry, FilteredKeys};
pub use hooks::{ContextFilter, DefaultErrorReporter, DefaultOutput, ErrorReporter, Hooks, OutputFn};
pub use mutation::{depopulate, flatten, prepare_update};
pub use operations::{OperationKind, OperationSet};
pub use options::{ResolvedOptions, ResourceDefaults, ResourceOptions, TotalCountHeader};
pub use parser::QueryOptions;
pub use restify::Restify;
pub use routes::{route_table, AxumRegistrar, RouteInfo, RouteRegistrar, RouteSpec};
