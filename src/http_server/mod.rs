//! # HTTP Server Module
//!
//! Binds the generated resource routes to a TCP listener.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `{prefix}{version}/{name}/*` - Generated resource routes

pub mod config;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
