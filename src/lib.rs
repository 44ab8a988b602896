//! restify - REST resource APIs generated from model schemas
//!
//! Serves list/count/get/create/update/delete routes for document
//! collections, each route a middleware chain with field-level access
//! filtering.

pub mod cli;
pub mod core;
pub mod http_server;
pub mod rest_api;
pub mod schema;
pub mod store;

pub use rest_api::{ResourceDefaults, ResourceOptions, RestError, RestResult, Restify};
