//! # Route Table
//!
//! The ten routes generated per resource, and the registrar capability the
//! assembled chains are handed to. [`AxumRegistrar`] collects them into an
//! axum `Router`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, Method};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use serde::Serialize;
use tracing::info;

use super::assembler::RouteChain;
use super::errors::{RestError, RestResult};
use super::operations::OperationKind;
use crate::core::RestRequest;

/// One generated route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub operation: OperationKind,
    /// Superseded path; the replacement is `PATCH` on the same path
    pub deprecated: bool,
}

impl RouteSpec {
    fn new(method: Method, path: String, operation: OperationKind) -> Self {
        Self {
            method,
            path,
            operation,
            deprecated: false,
        }
    }

    fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Route a client should use instead of a deprecated one
    pub fn replacement(&self) -> String {
        format!("{} {}", Method::PATCH, self.path)
    }
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7}{:<45}{}", self.method.as_str(), self.path, self.operation)?;
        if self.deprecated {
            f.write_str(" (deprecated)")?;
        }
        Ok(())
    }
}

/// Serializable row of [`RouteSpec`], for route listings
#[derive(Debug, Clone, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub operation: &'static str,
    pub deprecated: bool,
}

impl From<&RouteSpec> for RouteInfo {
    fn from(route: &RouteSpec) -> Self {
        Self {
            method: route.method.to_string(),
            path: route.path.clone(),
            operation: route.operation.as_str(),
            deprecated: route.deprecated,
        }
    }
}

/// Routes of a resource mounted at `base`, in registration order.
///
/// `count` precedes `:id` so the static segment is never read as an id.
pub fn route_table(base: &str) -> Vec<RouteSpec> {
    let item = format!("{}/:id", base);
    vec![
        RouteSpec::new(Method::GET, base.to_string(), OperationKind::List),
        RouteSpec::new(Method::GET, format!("{}/count", base), OperationKind::Count),
        RouteSpec::new(Method::GET, item.clone(), OperationKind::GetOne),
        RouteSpec::new(Method::GET, format!("{}/shallow", item), OperationKind::GetShallow),
        RouteSpec::new(Method::POST, base.to_string(), OperationKind::Create),
        RouteSpec::new(Method::POST, item.clone(), OperationKind::Update).deprecated(),
        RouteSpec::new(Method::PUT, item.clone(), OperationKind::Update).deprecated(),
        RouteSpec::new(Method::PATCH, item.clone(), OperationKind::Update),
        RouteSpec::new(Method::DELETE, base.to_string(), OperationKind::DeleteMany),
        RouteSpec::new(Method::DELETE, item, OperationKind::DeleteOne),
    ]
}

/// Accepts assembled route chains
pub trait RouteRegistrar {
    fn register(&mut self, method: Method, path: &str, chain: Arc<RouteChain>) -> RestResult<()>;
}

/// Collects route chains into an axum router
#[derive(Default)]
pub struct AxumRegistrar {
    routes: BTreeMap<String, MethodRouter>,
    registered: BTreeSet<(String, String)>,
}

impl AxumRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered method/path pairs
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(&path, methods))
    }
}

impl RouteRegistrar for AxumRegistrar {
    fn register(&mut self, method: Method, path: &str, chain: Arc<RouteChain>) -> RestResult<()> {
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| RestError::configuration(format!("Unsupported route method: {}", method)))?;
        if !self.registered.insert((path.to_string(), method.to_string())) {
            return Err(RestError::configuration(format!(
                "Route registered twice: {} {}",
                method, path
            )));
        }

        let route_path = path.to_string();
        let handler = move |params: Option<Path<HashMap<String, String>>>,
                            Query(query): Query<HashMap<String, String>>,
                            method: Method,
                            headers: HeaderMap,
                            body: Bytes| {
            let chain = Arc::clone(&chain);
            let path = route_path.clone();
            async move {
                let params = params.map(|Path(params)| params).unwrap_or_default();
                let req = RestRequest::builder()
                    .method(method)
                    .path(path)
                    .params(params)
                    .query(query)
                    .headers(headers)
                    .body(body)
                    .build();
                chain.handle(req).await
            }
        };

        let methods = match self.routes.remove(path) {
            Some(existing) => existing.on(filter, handler),
            None => on(filter, handler),
        };
        self.routes.insert(path.to_string(), methods);
        info!(%method, path, "route registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table_shape() {
        let routes = route_table("/api/v1/Customer");
        let rows: Vec<_> = routes
            .iter()
            .map(|r| (r.method.as_str(), r.path.as_str(), r.operation))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("GET", "/api/v1/Customer", OperationKind::List),
                ("GET", "/api/v1/Customer/count", OperationKind::Count),
                ("GET", "/api/v1/Customer/:id", OperationKind::GetOne),
                ("GET", "/api/v1/Customer/:id/shallow", OperationKind::GetShallow),
                ("POST", "/api/v1/Customer", OperationKind::Create),
                ("POST", "/api/v1/Customer/:id", OperationKind::Update),
                ("PUT", "/api/v1/Customer/:id", OperationKind::Update),
                ("PATCH", "/api/v1/Customer/:id", OperationKind::Update),
                ("DELETE", "/api/v1/Customer", OperationKind::DeleteMany),
                ("DELETE", "/api/v1/Customer/:id", OperationKind::DeleteOne),
            ]
        );
    }

    #[test]
    fn test_only_post_and_put_updates_deprecated() {
        let deprecated: Vec<_> = route_table("/r")
            .into_iter()
            .filter(|r| r.deprecated)
            .map(|r| r.method)
            .collect();
        assert_eq!(deprecated, vec![Method::POST, Method::PUT]);
        assert_eq!(route_table("/r")[5].replacement(), "PATCH /r/:id");
    }

    #[test]
    fn test_route_info() {
        let info = RouteInfo::from(&route_table("/r")[1]);
        assert_eq!(info.method, "GET");
        assert_eq!(info.operation, "count");
        assert!(!info.deprecated);
    }
}
