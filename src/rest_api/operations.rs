//! # Resource Operations
//!
//! The eight request handlers of a resource. Each writes the outcome into
//! the context exactly once; failures propagate to the route's error
//! reporter.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use super::builder::QueryBuilder;
use super::errors::{RestError, RestResult};
use super::filter::AccessFilter;
use super::mutation::prepare_update;
use super::options::ResolvedOptions;
use crate::core::middleware::Middleware;
use crate::core::{Next, RequestContext, RestRequest, StageResult};
use crate::schema::{set_path, Document, ModelSchema};
use crate::store::{BoxFuture, Query, UpdateOptions};

/// Operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    List,
    Count,
    GetOne,
    GetShallow,
    Create,
    Update,
    DeleteOne,
    DeleteMany,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "list",
            OperationKind::Count => "count",
            OperationKind::GetOne => "get-one",
            OperationKind::GetShallow => "get-shallow",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::DeleteOne => "delete-one",
            OperationKind::DeleteMany => "delete-many",
        }
    }

    /// Whether the operation addresses a single document by `:id`
    pub fn is_id_scoped(&self) -> bool {
        matches!(
            self,
            OperationKind::GetOne
                | OperationKind::GetShallow
                | OperationKind::Update
                | OperationKind::DeleteOne
        )
    }

    /// Whether the operation consumes a JSON body
    pub fn has_body(&self) -> bool {
        matches!(self, OperationKind::Create | OperationKind::Update)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations of one resource
pub struct OperationSet {
    options: Arc<ResolvedOptions>,
    filter: AccessFilter,
    builder: QueryBuilder,
}

impl OperationSet {
    pub fn new(options: Arc<ResolvedOptions>, filter: AccessFilter) -> Self {
        let builder = QueryBuilder::new(options.lean, options.read_preference);
        Self {
            options,
            filter,
            builder,
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Pipeline stage running `kind`
    pub fn stage(self: &Arc<Self>, kind: OperationKind) -> Arc<dyn Middleware> {
        Arc::new(OperationStage {
            kind,
            operations: Arc::clone(self),
        })
    }

    /// Run one operation against the context
    pub async fn run(
        &self,
        kind: OperationKind,
        req: &RestRequest,
        ctx: &mut RequestContext,
    ) -> RestResult<()> {
        match kind {
            OperationKind::List => self.list(req, ctx).await,
            OperationKind::Count => self.count(req, ctx).await,
            OperationKind::GetOne => self.get_one(req, ctx).await,
            OperationKind::GetShallow => self.get_shallow(req, ctx).await,
            OperationKind::Create => self.create(req, ctx).await,
            OperationKind::Update => self.update(req, ctx).await,
            OperationKind::DeleteOne => self.delete_one(req, ctx).await,
            OperationKind::DeleteMany => self.delete_many(req, ctx).await,
        }
    }

    fn base_query(&self, req: &RestRequest) -> RestResult<Query> {
        self.options.context_filter.apply(req, Query::new())
    }

    fn id_query(&self, req: &RestRequest) -> RestResult<Query> {
        let id = req.id().ok_or(RestError::NotFound)?;
        self.options.context_filter.apply(
            req,
            Query::new().where_eq(self.options.id_property.clone(), Value::String(id.to_string())),
        )
    }

    /// Matching documents, filtered for the caller; distinct values when requested
    pub async fn list(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let query = self.builder.build(self.base_query(req)?, &ctx.query);

        if let Some(field) = &query.distinct {
            let values = if self.filter.is_hidden(field, ctx.access) {
                Vec::new()
            } else {
                ctx.collection.distinct(&query).await?
            };
            return ctx.set_result(Some(Value::Array(values)), StatusCode::OK);
        }

        let docs = ctx.collection.find(&query).await?;
        let items = docs
            .into_iter()
            .map(|doc| Value::Object(self.filter.filter_document(doc, ctx.access, &ctx.query.populate)))
            .collect();

        if self.options.total_count_header.is_some() {
            let count_query = self.builder.build_count(self.base_query(req)?, &ctx.query);
            ctx.total_count = Some(ctx.collection.count(&count_query).await?);
        }

        ctx.set_result(Some(Value::Array(items)), StatusCode::OK)
    }

    /// `{"count": n}` of matching documents within the requested page
    pub async fn count(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let query = self.builder.build_page_count(self.base_query(req)?, &ctx.query);
        let count = ctx.collection.count(&query).await?;
        ctx.set_result(Some(json!({ "count": count })), StatusCode::OK)
    }

    async fn fetch_one(&self, req: &RestRequest, ctx: &RequestContext) -> RestResult<Document> {
        let query = self.builder.build_one(self.id_query(req)?, &ctx.query);
        let doc = ctx
            .collection
            .find_one(&query)
            .await?
            .ok_or(RestError::NotFound)?;
        Ok(self.filter.filter_document(doc, ctx.access, &ctx.query.populate))
    }

    pub async fn get_one(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let doc = self.fetch_one(req, ctx).await?;
        ctx.set_result(Some(Value::Object(doc)), StatusCode::OK)
    }

    /// Like get-one, with nested values replaced by `true`
    pub async fn get_shallow(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let doc = self.fetch_one(req, ctx).await?;
        let shallow = shallow(doc, &self.options.id_property);
        ctx.set_result(Some(Value::Object(shallow)), StatusCode::OK)
    }

    /// Body stripped of fields the caller may not write, id and version key
    fn writable_body(&self, ctx: &mut RequestContext) -> RestResult<Document> {
        let body = match ctx.body.take() {
            Some(Value::Object(body)) => body,
            _ => return Err(RestError::validation("invalid_json_body")),
        };
        let mut body = self.filter.filter_document(body, ctx.access, &[]);

        let schema = ctx.collection.schema();
        body.shift_remove(ModelSchema::ID_FIELD);
        if let Some(version_key) = &schema.version_key {
            body.shift_remove(version_key);
        }
        Ok(body)
    }

    async fn populate_and_filter(&self, doc: Document, ctx: &RequestContext) -> RestResult<Document> {
        let populated = ctx
            .collection
            .populate(vec![doc], &ctx.query.populate)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RestError::Internal("population returned no document".to_string()))?;
        Ok(self.filter.filter_document(populated, ctx.access, &ctx.query.populate))
    }

    pub async fn create(&self, _req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let body = self.writable_body(ctx)?;
        let created = ctx.collection.create(body).await?;
        let created = self.populate_and_filter(created, ctx).await?;
        ctx.set_result(Some(Value::Object(created)), StatusCode::CREATED)
    }

    pub async fn update(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let body = self.writable_body(ctx)?;
        let updates = prepare_update(&body, ctx.collection.schema());

        let updated = if self.options.find_one_and_update {
            let query = self.builder.build_one(self.id_query(req)?, &ctx.query);
            let options = UpdateOptions {
                new: true,
                run_validators: self.options.run_validators,
            };
            let doc = ctx
                .collection
                .find_one_and_update(&query, &updates, options)
                .await?
                .ok_or(RestError::NotFound)?;
            self.filter.filter_document(doc, ctx.access, &ctx.query.populate)
        } else {
            let mut doc = ctx.document.take().ok_or(RestError::NotFound)?;
            for (path, value) in updates {
                set_path(&mut doc, &path, value);
            }
            let mut saved = ctx.collection.save(doc).await?;
            if let Some(select) = &ctx.query.select {
                saved = select.apply(saved);
            }
            self.populate_and_filter(saved, ctx).await?
        };

        ctx.set_result(Some(Value::Object(updated)), StatusCode::OK)
    }

    pub async fn delete_one(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        if self.options.find_one_and_remove {
            let query = self.id_query(req)?;
            ctx.collection
                .find_one_and_remove(&query)
                .await?
                .ok_or(RestError::NotFound)?;
        } else {
            let doc = ctx.document.take().ok_or(RestError::NotFound)?;
            let id = doc
                .get(&self.options.id_property)
                .cloned()
                .ok_or(RestError::NotFound)?;
            let query = Query::new().where_eq(self.options.id_property.clone(), id);
            ctx.collection.remove(&query).await?;
        }
        ctx.set_result(None, StatusCode::NO_CONTENT)
    }

    pub async fn delete_many(&self, req: &RestRequest, ctx: &mut RequestContext) -> RestResult<()> {
        let query = self.builder.build_count(self.base_query(req)?, &ctx.query);
        let removed = ctx.collection.remove(&query).await?;
        debug!(request_id = %ctx.request_id, removed, "documents removed");
        ctx.set_result(None, StatusCode::NO_CONTENT)
    }
}

/// Replace object and array values (other than the id) with `true`
fn shallow(doc: Document, id_property: &str) -> Document {
    doc.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Object(_) | Value::Array(_) if key != id_property => Value::Bool(true),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Pipeline stage wrapping one operation
struct OperationStage {
    kind: OperationKind,
    operations: Arc<OperationSet>,
}

impl Middleware for OperationStage {
    fn process<'a>(
        &'a self,
        req: &'a RestRequest,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            self.operations.run(self.kind, req, ctx).await?;
            debug!(
                request_id = %ctx.request_id,
                operation = %self.kind,
                status = ?ctx.status_code(),
                "operation complete"
            );
            next.run(req, ctx).await
        })
    }

    fn name(&self) -> &'static str {
        "operation"
    }
}
