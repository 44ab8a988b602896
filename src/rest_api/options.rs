//! # Resource Options
//!
//! `ResourceOptions` is what callers (or the JSON config) supply; every
//! field is optional. It is merged over the registry defaults and resolved
//! once, at registration, into an immutable [`ResolvedOptions`].

use std::sync::Arc;

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};

use super::access::{Access, AccessLevel};
use super::errors::{RestError, RestResult};
use super::hooks::{ContextFilter, DefaultErrorReporter, DefaultOutput, ErrorReporter, Hooks, OutputFn};
use super::naming::pluralize;
use crate::core::middleware::Middleware;
use crate::core::RestRequest;
use crate::schema::ModelSchema;
use crate::store::{Query, ReadPreference};

/// Default header carrying the total match count
pub const DEFAULT_TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// `totalCountHeader`: `true`, `false` or a header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalCountHeader {
    Enabled(bool),
    Named(String),
}

impl TotalCountHeader {
    fn header_name(&self) -> RestResult<Option<HeaderName>> {
        let name = match self {
            TotalCountHeader::Enabled(false) => return Ok(None),
            TotalCountHeader::Enabled(true) => DEFAULT_TOTAL_COUNT_HEADER,
            TotalCountHeader::Named(name) => name.as_str(),
        };
        HeaderName::from_bytes(name.as_bytes())
            .map(Some)
            .map_err(|_| RestError::configuration(format!("Invalid totalCountHeader: {}", name)))
    }
}

/// Per-resource options
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOptions {
    pub prefix: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub id_property: Option<String>,
    pub find_one_and_update: Option<bool>,
    pub find_one_and_remove: Option<bool>,
    pub lean: Option<bool>,
    pub plural: Option<bool>,
    pub run_validators: Option<bool>,
    pub private: Option<Vec<String>>,
    pub protected: Option<Vec<String>>,
    /// `"public"`, `"protected"` or `"private"`
    pub access: Option<String>,
    pub read_preference: Option<ReadPreference>,
    pub total_count_header: Option<TotalCountHeader>,

    #[serde(skip)]
    pub access_fn: Option<Access>,
    #[serde(skip)]
    pub context_filter: Option<ContextFilter>,
    #[serde(skip)]
    pub on_error: Option<Arc<dyn ErrorReporter>>,
    #[serde(skip)]
    pub output_fn: Option<Arc<dyn OutputFn>>,
    #[serde(skip)]
    pub hooks: Hooks,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id_property(mut self, id_property: impl Into<String>) -> Self {
        self.id_property = Some(id_property.into());
        self
    }

    pub fn find_one_and_update(mut self, enabled: bool) -> Self {
        self.find_one_and_update = Some(enabled);
        self
    }

    pub fn find_one_and_remove(mut self, enabled: bool) -> Self {
        self.find_one_and_remove = Some(enabled);
        self
    }

    pub fn lean(mut self, lean: bool) -> Self {
        self.lean = Some(lean);
        self
    }

    pub fn plural(mut self, plural: bool) -> Self {
        self.plural = Some(plural);
        self
    }

    pub fn run_validators(mut self, enabled: bool) -> Self {
        self.run_validators = Some(enabled);
        self
    }

    pub fn private_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.private = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn protected_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Fixed access level by name
    pub fn access(mut self, level: impl Into<String>) -> Self {
        self.access = Some(level.into());
        self
    }

    /// Per-request access level
    pub fn access_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RestRequest) -> AccessLevel + Send + Sync + 'static,
    {
        self.access_fn = Some(Access::dynamic(f));
        self
    }

    pub fn read_preference(mut self, preference: ReadPreference) -> Self {
        self.read_preference = Some(preference);
        self
    }

    pub fn total_count_header(mut self, header: TotalCountHeader) -> Self {
        self.total_count_header = Some(header);
        self
    }

    pub fn context_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&RestRequest, Query) -> RestResult<Query> + Send + Sync + 'static,
    {
        self.context_filter = Some(ContextFilter::new(f));
        self
    }

    pub fn on_error(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.on_error = Some(Arc::new(reporter));
        self
    }

    pub fn output_fn(mut self, output: impl OutputFn + 'static) -> Self {
        self.output_fn = Some(Arc::new(output));
        self
    }

    pub fn pre_middleware(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.pre_middleware.push(m);
        self
    }

    pub fn pre_create(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.pre_create.push(m);
        self
    }

    pub fn pre_read(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.pre_read.push(m);
        self
    }

    pub fn pre_update(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.pre_update.push(m);
        self
    }

    pub fn pre_delete(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.pre_delete.push(m);
        self
    }

    pub fn post_create(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.post_create.push(m);
        self
    }

    pub fn post_read(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.post_read.push(m);
        self
    }

    pub fn post_update(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.post_update.push(m);
        self
    }

    pub fn post_delete(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.post_delete.push(m);
        self
    }

    pub fn post_process(mut self, m: Arc<dyn Middleware>) -> Self {
        self.hooks.post_process.push(m);
        self
    }

    /// Options of `self`, falling back field by field to `defaults`
    pub fn or(self, defaults: &ResourceOptions) -> ResourceOptions {
        ResourceOptions {
            prefix: self.prefix.or_else(|| defaults.prefix.clone()),
            version: self.version.or_else(|| defaults.version.clone()),
            name: self.name.or_else(|| defaults.name.clone()),
            id_property: self.id_property.or_else(|| defaults.id_property.clone()),
            find_one_and_update: self.find_one_and_update.or(defaults.find_one_and_update),
            find_one_and_remove: self.find_one_and_remove.or(defaults.find_one_and_remove),
            lean: self.lean.or(defaults.lean),
            plural: self.plural.or(defaults.plural),
            run_validators: self.run_validators.or(defaults.run_validators),
            private: self.private.or_else(|| defaults.private.clone()),
            protected: self.protected.or_else(|| defaults.protected.clone()),
            access: self.access.or_else(|| defaults.access.clone()),
            read_preference: self.read_preference.or(defaults.read_preference),
            total_count_header: self
                .total_count_header
                .or_else(|| defaults.total_count_header.clone()),
            access_fn: self.access_fn.or_else(|| defaults.access_fn.clone()),
            context_filter: self.context_filter.or_else(|| defaults.context_filter.clone()),
            on_error: self.on_error.or_else(|| defaults.on_error.clone()),
            output_fn: self.output_fn.or_else(|| defaults.output_fn.clone()),
            hooks: self.hooks.or(&defaults.hooks),
        }
    }
}

/// Registry-wide defaults, applied under every resource's own options
pub type ResourceDefaults = ResourceOptions;

/// Fully resolved, immutable resource options
#[derive(Clone)]
pub struct ResolvedOptions {
    pub name: String,
    pub prefix: String,
    pub version: String,
    pub id_property: String,
    pub find_one_and_update: bool,
    pub find_one_and_remove: bool,
    pub lean: bool,
    pub plural: bool,
    pub run_validators: bool,
    pub private: Vec<String>,
    pub protected: Vec<String>,
    pub access: Access,
    pub read_preference: Option<ReadPreference>,
    pub total_count_header: Option<HeaderName>,
    pub context_filter: ContextFilter,
    pub on_error: Arc<dyn ErrorReporter>,
    pub output_fn: Arc<dyn OutputFn>,
    pub hooks: Hooks,
}

impl ResolvedOptions {
    /// Merge `options` over `defaults` and resolve against the model schema.
    ///
    /// Schema fields annotated `private`/`protected` join the configured lists.
    pub fn resolve(
        options: ResourceOptions,
        defaults: &ResourceDefaults,
        schema: &ModelSchema,
    ) -> RestResult<Self> {
        let merged = options.or(defaults);

        let plural = merged.plural.unwrap_or(false);
        let base_name = merged.name.unwrap_or_else(|| schema.name.clone());
        if base_name.is_empty() || base_name.contains('/') {
            return Err(RestError::configuration(format!(
                "Invalid resource name: {:?}",
                base_name
            )));
        }
        let name = if plural { pluralize(&base_name) } else { base_name };

        let access = match (merged.access_fn, merged.access) {
            (Some(access), _) => access,
            (None, Some(level)) => Access::Fixed(level.parse()?),
            (None, None) => Access::default(),
        };

        let mut private = merged.private.unwrap_or_default();
        let mut protected = merged.protected.unwrap_or_default();
        for (path, level) in schema.access_annotations() {
            let list = match level {
                AccessLevel::Private => &mut private,
                AccessLevel::Protected => &mut protected,
                AccessLevel::Public => continue,
            };
            if !list.iter().any(|p| p == path) {
                list.push(path.to_string());
            }
        }

        let total_count_header = match &merged.total_count_header {
            Some(header) => header.header_name()?,
            None => None,
        };

        let resolved = Self {
            name,
            prefix: merged.prefix.unwrap_or_else(|| "/api".to_string()),
            version: merged.version.unwrap_or_else(|| "/v1".to_string()),
            id_property: merged
                .id_property
                .unwrap_or_else(|| ModelSchema::ID_FIELD.to_string()),
            find_one_and_update: merged.find_one_and_update.unwrap_or(true),
            find_one_and_remove: merged.find_one_and_remove.unwrap_or(true),
            lean: merged.lean.unwrap_or(true),
            plural,
            run_validators: merged.run_validators.unwrap_or(false),
            private,
            protected,
            access,
            read_preference: merged.read_preference,
            total_count_header,
            context_filter: merged.context_filter.unwrap_or_default(),
            on_error: merged
                .on_error
                .unwrap_or_else(|| Arc::new(DefaultErrorReporter)),
            output_fn: merged.output_fn.unwrap_or_else(|| Arc::new(DefaultOutput)),
            hooks: merged.hooks,
        };
        check_base_path(&resolved.base_path())?;
        Ok(resolved)
    }

    /// `{prefix}{version}/{name}`
    pub fn base_path(&self) -> String {
        format!("{}{}/{}", self.prefix, self.version, self.name)
    }
}

/// Routes are mounted under the base path, so it must be a literal absolute path
fn check_base_path(path: &str) -> RestResult<()> {
    let invalid = |reason: &str| {
        Err(RestError::configuration(format!(
            "Invalid base path {:?}: {}",
            path, reason
        )))
    };

    let rest = match path.strip_prefix('/') {
        Some(rest) => rest,
        None => return invalid("must start with '/'"),
    };
    for segment in rest.split('/') {
        if segment.is_empty() {
            return invalid("empty path segment");
        }
        if segment.starts_with(':') || segment.starts_with('*') {
            return invalid("path parameters are not allowed");
        }
        if segment.contains(|c: char| c == '{' || c == '}') {
            return invalid("braces are not allowed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use serde_json::json;

    fn schema() -> ModelSchema {
        ModelSchema::new(
            "Customer",
            vec![
                FieldDef::string("name"),
                FieldDef::string("ssn").with_access(AccessLevel::Private),
                FieldDef::string("phone").with_access(AccessLevel::Protected),
            ],
        )
    }

    #[test]
    fn test_defaults() {
        let resolved =
            ResolvedOptions::resolve(ResourceOptions::new(), &ResourceDefaults::default(), &schema())
                .unwrap();
        assert_eq!(resolved.base_path(), "/api/v1/Customer");
        assert_eq!(resolved.id_property, "_id");
        assert!(resolved.find_one_and_update);
        assert!(resolved.find_one_and_remove);
        assert!(resolved.lean);
        assert!(!resolved.plural);
        assert!(!resolved.run_validators);
        assert!(resolved.total_count_header.is_none());
        assert!(matches!(resolved.access, Access::Fixed(AccessLevel::Public)));
    }

    #[test]
    fn test_plural_name() {
        let resolved = ResolvedOptions::resolve(
            ResourceOptions::new().plural(true),
            &ResourceDefaults::default(),
            &schema(),
        )
        .unwrap();
        assert_eq!(resolved.name, "Customers");
    }

    #[test]
    fn test_defaults_underlay_options() {
        let defaults = ResourceOptions::new().prefix("/rest").version("/v2").lean(false);
        let resolved =
            ResolvedOptions::resolve(ResourceOptions::new().version("/v3"), &defaults, &schema())
                .unwrap();
        assert_eq!(resolved.base_path(), "/rest/v3/Customer");
        assert!(!resolved.lean);
    }

    #[test]
    fn test_schema_annotations_join_lists() {
        let resolved = ResolvedOptions::resolve(
            ResourceOptions::new().private_fields(["ssn", "secret"]),
            &ResourceDefaults::default(),
            &schema(),
        )
        .unwrap();
        assert_eq!(resolved.private, vec!["ssn", "secret"]);
        assert_eq!(resolved.protected, vec!["phone"]);
    }

    #[test]
    fn test_unknown_access_is_configuration_error() {
        let err = ResolvedOptions::resolve(
            ResourceOptions::new().access("admin"),
            &ResourceDefaults::default(),
            &schema(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, RestError::Configuration(_)));
    }

    #[test]
    fn test_malformed_base_path_is_configuration_error() {
        let cases = [
            ResourceOptions::new().prefix("api"),
            ResourceOptions::new().prefix("").version("v1"),
            ResourceOptions::new().prefix("/api/"),
            ResourceOptions::new().prefix("/:tenant"),
            ResourceOptions::new().version("/*rest"),
            ResourceOptions::new().prefix("/api/{x}"),
        ];
        for options in cases {
            let err = ResolvedOptions::resolve(options, &ResourceDefaults::default(), &schema())
                .err()
                .unwrap();
            assert!(matches!(err, RestError::Configuration(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_empty_prefix_and_version_allowed() {
        let resolved = ResolvedOptions::resolve(
            ResourceOptions::new().prefix("").version(""),
            &ResourceDefaults::default(),
            &schema(),
        )
        .unwrap();
        assert_eq!(resolved.base_path(), "/Customer");
    }

    #[test]
    fn test_total_count_header_forms() {
        let options: ResourceOptions =
            serde_json::from_value(json!({"totalCountHeader": true})).unwrap();
        let resolved =
            ResolvedOptions::resolve(options, &ResourceDefaults::default(), &schema()).unwrap();
        assert_eq!(
            resolved.total_count_header.map(|h| h.to_string()),
            Some("x-total-count".to_string())
        );

        let options: ResourceOptions =
            serde_json::from_value(json!({"totalCountHeader": "X-Matches"})).unwrap();
        let resolved =
            ResolvedOptions::resolve(options, &ResourceDefaults::default(), &schema()).unwrap();
        assert_eq!(
            resolved.total_count_header.map(|h| h.to_string()),
            Some("x-matches".to_string())
        );
    }

    #[test]
    fn test_options_from_json() {
        let options: ResourceOptions = serde_json::from_value(json!({
            "prefix": "/rest",
            "idProperty": "code",
            "findOneAndUpdate": false,
            "readPreference": "secondaryPreferred",
            "protected": ["phone"]
        }))
        .unwrap();
        assert_eq!(options.id_property.as_deref(), Some("code"));
        assert_eq!(options.find_one_and_update, Some(false));
        assert_eq!(options.read_preference, Some(ReadPreference::SecondaryPreferred));
    }
}
