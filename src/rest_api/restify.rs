//! # Resource Registry
//!
//! Collects exposed collections with their options, then mounts the
//! generated routes. Options are resolved when a collection is served, so a
//! bad configuration fails at setup. The field filter registry is built at
//! mount time, once every resource is known, and shared read-only by all
//! routes afterwards.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use tracing::info;

use super::assembler::PipelineAssembler;
use super::errors::{RestError, RestResult};
use super::filter::{AccessFilter, FilterRegistry, FilteredKeys};
use super::operations::OperationSet;
use super::options::{ResolvedOptions, ResourceDefaults, ResourceOptions};
use super::routes::{route_table, AxumRegistrar, RouteRegistrar, RouteSpec};
use crate::store::Collection;

struct Resource {
    collection: Arc<dyn Collection>,
    options: Arc<ResolvedOptions>,
    base_path: String,
}

/// Registry of REST resources
#[derive(Default)]
pub struct Restify {
    defaults: ResourceDefaults,
    resources: Vec<Resource>,
}

impl fmt::Debug for Restify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restify")
            .field("resources", &self.resources.iter().map(|r| &r.base_path).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Restify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose resources fall back to `defaults` for unset options
    pub fn with_defaults(defaults: ResourceDefaults) -> Self {
        Self {
            defaults,
            resources: Vec::new(),
        }
    }

    /// Expose a collection, returning the base path of its routes
    pub fn serve(
        &mut self,
        collection: Arc<dyn Collection>,
        options: ResourceOptions,
    ) -> RestResult<String> {
        let resolved = ResolvedOptions::resolve(options, &self.defaults, collection.schema())?;
        let base_path = resolved.base_path();
        if self.resources.iter().any(|r| r.base_path == base_path) {
            return Err(RestError::configuration(format!(
                "Resource already served at {}",
                base_path
            )));
        }

        info!(
            model = %collection.schema().name,
            base_path = %base_path,
            access = ?resolved.access,
            "resource registered"
        );
        self.resources.push(Resource {
            collection,
            options: Arc::new(resolved),
            base_path: base_path.clone(),
        });
        Ok(base_path)
    }

    /// Every generated route, in registration order
    pub fn routes(&self) -> Vec<RouteSpec> {
        self.resources
            .iter()
            .flat_map(|r| route_table(&r.base_path))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Assemble every route chain and hand it to `registrar`
    pub fn mount<R: RouteRegistrar>(self, registrar: &mut R) -> RestResult<()> {
        let mut registry = FilterRegistry::new();
        for resource in &self.resources {
            registry.register(
                resource.collection.schema(),
                FilteredKeys::new(
                    resource.options.private.clone(),
                    resource.options.protected.clone(),
                ),
            );
        }
        let registry = registry.freeze();

        for resource in self.resources {
            let filter = AccessFilter::new(
                resource.collection.schema().name.clone(),
                Arc::clone(&registry),
            );
            let operations = Arc::new(OperationSet::new(resource.options, filter));
            let assembler = PipelineAssembler::new(operations, resource.collection);

            for route in route_table(&resource.base_path) {
                let chain = Arc::new(assembler.assemble(&route));
                registrar.register(route.method.clone(), &route.path, chain)?;
            }
        }
        Ok(())
    }

    /// Mount every resource on a fresh axum router
    pub fn into_router(self) -> RestResult<Router> {
        let mut registrar = AxumRegistrar::new();
        self.mount(&mut registrar)?;
        Ok(registrar.into_router())
    }
}
