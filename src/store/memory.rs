//! # In-Memory Store
//!
//! Reference implementation of the [`Collection`] capability. Documents
//! live in insertion order behind a shared `RwLock`; every collection
//! handle defined on the same store can populate relations from the others.

use std::collections::HashMap;
use std::future::ready;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::predicate::compare_values;
use super::query::{PopulateSpec, Query, SortKey};
use super::{BoxFuture, Collection, StoreError, StoreResult, UpdateOptions};
use crate::schema::{get_path, is_object_id, new_object_id, set_path, Document, ModelSchema};

/// Collection data store
#[derive(Debug, Clone)]
struct CollectionData {
    schema: ModelSchema,
    /// Documents in insertion order, each a JSON object
    documents: Vec<Value>,
}

/// Shared in-memory document store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, CollectionData>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model and return a handle to its collection.
    ///
    /// Redefining an existing model replaces its schema and keeps its documents.
    pub fn define(&self, schema: ModelSchema) -> StoreResult<Arc<InMemoryCollection>> {
        let mut collections = self.write()?;
        collections
            .entry(schema.name.clone())
            .and_modify(|data| data.schema = schema.clone())
            .or_insert_with(|| CollectionData {
                schema: schema.clone(),
                documents: Vec::new(),
            });

        Ok(Arc::new(InMemoryCollection {
            schema,
            store: self.clone(),
        }))
    }

    /// Handle to a previously defined collection
    pub fn collection(&self, name: &str) -> StoreResult<Arc<InMemoryCollection>> {
        let collections = self.read()?;
        let data = collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;

        Ok(Arc::new(InMemoryCollection {
            schema: data.schema.clone(),
            store: self.clone(),
        }))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, CollectionData>>> {
        self.collections
            .read()
            .map_err(|_| StoreError::backend("store lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, CollectionData>>> {
        self.collections
            .write()
            .map_err(|_| StoreError::backend("store lock poisoned"))
    }
}

/// A collection handle on an [`InMemoryStore`]
#[derive(Debug, Clone)]
pub struct InMemoryCollection {
    schema: ModelSchema,
    store: InMemoryStore,
}

impl InMemoryCollection {
    /// Snapshot of the stored documents
    fn snapshot(&self) -> StoreResult<Vec<Value>> {
        let collections = self.store.read()?;
        collections
            .get(&self.schema.name)
            .map(|data| data.documents.clone())
            .ok_or_else(|| StoreError::UnknownCollection(self.schema.name.clone()))
    }

    fn with_documents<T>(&self, f: impl FnOnce(&mut Vec<Value>) -> T) -> StoreResult<T> {
        let mut collections = self.store.write()?;
        let data = collections
            .get_mut(&self.schema.name)
            .ok_or_else(|| StoreError::UnknownCollection(self.schema.name.clone()))?;
        Ok(f(&mut data.documents))
    }

    /// Reject predicate operands that cannot be ObjectIds on id-typed paths
    fn check_casts(&self, query: &Query) -> StoreResult<()> {
        for expr in &query.predicate.filters {
            let holds_ids = expr.field == ModelSchema::ID_FIELD
                || self
                    .schema
                    .field(&expr.field)
                    .map(|f| f.field_type.holds_object_ids())
                    .unwrap_or(false);
            if !holds_ids {
                continue;
            }

            for operand in expr.operands() {
                let valid = match operand {
                    Value::String(s) => is_object_id(s),
                    Value::Null => true,
                    _ => false,
                };
                if !valid {
                    return Err(StoreError::Cast {
                        path: expr.field.clone(),
                        value: operand.as_str().map(str::to_string).unwrap_or_else(|| operand.to_string()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Matching documents in sort order, before pagination
    fn matching(&self, query: &Query) -> StoreResult<Vec<Value>> {
        self.check_casts(query)?;
        let mut matched: Vec<Value> = self
            .snapshot()?
            .into_iter()
            .filter(|doc| query.predicate.matches(doc))
            .collect();
        sort_documents(&mut matched, &query.sort);
        Ok(matched)
    }

    /// Selection and population applied to documents leaving the store
    fn shape(&self, docs: Vec<Value>, query: &Query) -> StoreResult<Vec<Document>> {
        let docs: Vec<Document> = docs
            .into_iter()
            .map(into_document)
            .map(|doc| match &query.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .collect();
        self.populate_documents(docs, &query.populate)
    }

    fn find_documents(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let matched = self.matching(query)?;
        let page: Vec<Value> = matched
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        self.shape(page, query)
    }

    fn distinct_values(&self, query: &Query) -> StoreResult<Vec<Value>> {
        let field = match &query.distinct {
            Some(field) => field,
            None => return Ok(Vec::new()),
        };

        let mut values: Vec<Value> = Vec::new();
        for doc in self.matching(query)? {
            let found = match get_path(&doc, field) {
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => continue,
            };
            for value in found {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        Ok(values)
    }

    fn create_document(&self, doc: Document) -> StoreResult<Document> {
        let mut stored = Document::new();

        match doc.get(ModelSchema::ID_FIELD) {
            Some(id) => {
                stored.insert(ModelSchema::ID_FIELD.to_string(), id.clone());
            }
            None if self.schema.auto_id => {
                stored.insert(
                    ModelSchema::ID_FIELD.to_string(),
                    Value::String(new_object_id()),
                );
            }
            None => {}
        }

        for (key, value) in doc {
            if key != ModelSchema::ID_FIELD {
                stored.insert(key, value);
            }
        }

        let root = Value::Object(stored.clone());
        for field in &self.schema.fields {
            if let Some(default) = &field.default {
                if get_path(&root, &field.name).is_none() {
                    set_path(&mut stored, &field.name, default.clone());
                }
            }
        }

        if let Some(version_key) = &self.schema.version_key {
            stored.insert(version_key.clone(), Value::from(0));
        }

        self.schema.validate(&stored).map_err(StoreError::Validation)?;

        let id = stored.get(ModelSchema::ID_FIELD).cloned();
        self.with_documents(|documents| {
            if id.is_some() && documents.iter().any(|d| d.get(ModelSchema::ID_FIELD) == id.as_ref()) {
                return Err(StoreError::Backend {
                    status: 409,
                    message: format!("Duplicate key for `{}`", ModelSchema::ID_FIELD),
                });
            }
            documents.push(Value::Object(stored.clone()));
            Ok(())
        })??;

        Ok(stored)
    }

    fn update_document(
        &self,
        query: &Query,
        update: &Document,
        options: UpdateOptions,
    ) -> StoreResult<Option<Document>> {
        self.check_casts(query)?;
        if options.run_validators {
            self.schema.validate_paths(update).map_err(StoreError::Validation)?;
        }

        let updated = self.with_documents(|documents| {
            let target = documents.iter_mut().find(|doc| query.predicate.matches(doc))?;
            let before = target.clone();
            if let Value::Object(map) = target {
                for (path, value) in update {
                    if path != ModelSchema::ID_FIELD {
                        set_path(map, path, value.clone());
                    }
                }
            }
            Some(if options.new { target.clone() } else { before })
        })?;

        match updated {
            Some(doc) => Ok(self.shape(vec![doc], query)?.into_iter().next()),
            None => Ok(None),
        }
    }

    fn remove_first(&self, query: &Query) -> StoreResult<Option<Document>> {
        self.check_casts(query)?;
        self.with_documents(|documents| {
            let index = documents.iter().position(|doc| query.predicate.matches(doc))?;
            Some(into_document(documents.remove(index)))
        })
    }

    fn save_document(&self, doc: Document) -> StoreResult<Document> {
        let id = doc
            .get(ModelSchema::ID_FIELD)
            .cloned()
            .ok_or_else(|| StoreError::Validation("Document must have an _id before saving".to_string()))?;

        self.schema.validate(&doc).map_err(StoreError::Validation)?;

        self.with_documents(|documents| {
            match documents
                .iter_mut()
                .find(|d| d.get(ModelSchema::ID_FIELD) == Some(&id))
            {
                Some(slot) => {
                    *slot = Value::Object(doc.clone());
                    Ok(doc)
                }
                None => Err(StoreError::Backend {
                    status: 404,
                    message: format!("No document found for {} {}", ModelSchema::ID_FIELD, id),
                }),
            }
        })?
    }

    fn remove_matching(&self, query: &Query) -> StoreResult<u64> {
        self.check_casts(query)?;
        self.with_documents(|documents| {
            let before = documents.len();
            documents.retain(|doc| !query.predicate.matches(doc));
            (before - documents.len()) as u64
        })
    }

    /// Replace relation identifiers with the referenced documents
    fn populate_documents(
        &self,
        mut docs: Vec<Document>,
        specs: &[PopulateSpec],
    ) -> StoreResult<Vec<Document>> {
        for spec in specs {
            let target = match self.schema.relation_target(&spec.path) {
                Some(target) => self.store.collection(target)?,
                None => continue,
            };

            let roots: Vec<Value> = docs.iter().cloned().map(Value::Object).collect();
            let mut wanted: Vec<&str> = Vec::new();
            for root in &roots {
                match get_path(root, &spec.path) {
                    Some(Value::String(id)) => wanted.push(id),
                    Some(Value::Array(items)) => wanted.extend(items.iter().filter_map(Value::as_str)),
                    _ => {}
                }
            }
            if wanted.is_empty() {
                continue;
            }

            let related = target.snapshot()?.into_iter().filter(|doc| {
                doc.get(ModelSchema::ID_FIELD)
                    .and_then(Value::as_str)
                    .map(|id| wanted.contains(&id))
                    .unwrap_or(false)
            });
            let related: Vec<Document> = related
                .map(into_document)
                .map(|doc| match &spec.select {
                    Some(select) => select.apply(doc),
                    None => doc,
                })
                .collect();
            let related = target.populate_documents(related, &spec.populate)?;
            let by_id: HashMap<String, Document> = related
                .into_iter()
                .filter_map(|doc| {
                    let id = doc.get(ModelSchema::ID_FIELD)?.as_str()?.to_string();
                    Some((id, doc))
                })
                .collect();

            for (doc, root) in docs.iter_mut().zip(roots.iter()) {
                let populated = match get_path(root, &spec.path) {
                    Some(Value::String(id)) => by_id
                        .get(id)
                        .cloned()
                        .map(Value::Object)
                        .unwrap_or(Value::Null),
                    Some(Value::Array(items)) => Value::Array(
                        items
                            .iter()
                            .filter_map(|item| match item.as_str() {
                                Some(id) => by_id.get(id).cloned().map(Value::Object),
                                None => Some(item.clone()),
                            })
                            .collect(),
                    ),
                    _ => continue,
                };
                set_path(doc, &spec.path, populated);
            }
        }
        Ok(docs)
    }
}

fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn sort_documents(docs: &mut [Value], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for key in keys {
            let va = get_path(a, &key.field).unwrap_or(&Value::Null);
            let vb = get_path(b, &key.field).unwrap_or(&Value::Null);
            let cmp = compare_values(va, vb);
            let cmp = if key.ascending { cmp } else { cmp.reverse() };
            if cmp.is_ne() {
                return cmp;
            }
        }
        std::cmp::Ordering::Equal
    });
}

impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn find<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        Box::pin(ready(self.find_documents(query)))
    }

    fn find_one<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        let first = self.matching(query).and_then(|matched| {
            let first: Vec<Value> = matched.into_iter().take(1).collect();
            self.shape(first, query)
        });
        Box::pin(ready(first.map(|docs| docs.into_iter().next())))
    }

    fn count<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<u64>> {
        let counted = self.matching(query).map(|matched| {
            let after_skip = matched.len().saturating_sub(query.skip.unwrap_or(0));
            after_skip.min(query.limit.unwrap_or(usize::MAX)) as u64
        });
        Box::pin(ready(counted))
    }

    fn distinct<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(ready(self.distinct_values(query)))
    }

    fn create(&self, doc: Document) -> BoxFuture<'_, StoreResult<Document>> {
        Box::pin(ready(self.create_document(doc)))
    }

    fn find_one_and_update<'a>(
        &'a self,
        query: &'a Query,
        update: &'a Document,
        options: UpdateOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        Box::pin(ready(self.update_document(query, update, options)))
    }

    fn find_one_and_remove<'a>(
        &'a self,
        query: &'a Query,
    ) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        Box::pin(ready(self.remove_first(query)))
    }

    fn save(&self, doc: Document) -> BoxFuture<'_, StoreResult<Document>> {
        Box::pin(ready(self.save_document(doc)))
    }

    fn remove<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<u64>> {
        Box::pin(ready(self.remove_matching(query)))
    }

    fn populate<'a>(
        &'a self,
        docs: Vec<Document>,
        paths: &'a [PopulateSpec],
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        Box::pin(ready(self.populate_documents(docs, paths)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use crate::store::{Predicate, Projection};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (InMemoryStore, Arc<InMemoryCollection>, Arc<InMemoryCollection>) {
        let store = InMemoryStore::new();
        let accounts = store
            .define(ModelSchema::new(
                "Account",
                vec![FieldDef::string("accountNumber"), FieldDef::number("points")],
            ))
            .unwrap();
        let customers = store
            .define(ModelSchema::new(
                "Customer",
                vec![
                    FieldDef::string("name").required(),
                    FieldDef::string("comment").with_default(json!("none")),
                    FieldDef::reference("account", "Account"),
                ],
            ))
            .unwrap();
        (store, accounts, customers)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_version() {
        let (_, _, customers) = setup();
        let created = customers.create(doc(json!({"name": "Bob"}))).await.unwrap();

        let keys: Vec<_> = created.keys().cloned().collect();
        assert_eq!(keys, vec!["_id", "name", "comment", "__v"]);
        assert!(is_object_id(created["_id"].as_str().unwrap()));
        assert_eq!(created["comment"], json!("none"));
        assert_eq!(created["__v"], json!(0));
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let (_, _, customers) = setup();
        let err = customers.create(doc(json!({"comment": "x"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(customers.count(&Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_id_is_cast_error() {
        let (_, _, customers) = setup();
        let query = Query::new().where_eq("_id", json!("invalid-id"));
        let err = customers.find_one(&query).await.unwrap_err();
        assert!(matches!(err, StoreError::Cast { .. }));
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_find_sort_paginate_select() {
        let (_, _, customers) = setup();
        for name in ["Carol", "Alice", "Bob"] {
            customers.create(doc(json!({"name": name}))).await.unwrap();
        }

        let query = Query::new()
            .select(Projection::parse("name").unwrap())
            .sort(vec![SortKey::asc("name")])
            .skip(1)
            .limit(1);
        let found = customers.find(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], json!("Bob"));
        assert!(found[0].get("comment").is_none());
        assert!(found[0].get("_id").is_some());
    }

    #[tokio::test]
    async fn test_count_within_page() {
        let (_, _, customers) = setup();
        for name in ["A", "B", "C"] {
            customers.create(doc(json!({"name": name}))).await.unwrap();
        }

        assert_eq!(customers.count(&Query::new()).await.unwrap(), 3);
        assert_eq!(customers.count(&Query::new().skip(1).limit(1)).await.unwrap(), 1);
        assert_eq!(customers.count(&Query::new().skip(2)).await.unwrap(), 1);
        assert_eq!(customers.count(&Query::new().skip(5)).await.unwrap(), 0);
        assert_eq!(customers.count(&Query::new().limit(10)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_populate_across_collections() {
        let (_, accounts, customers) = setup();
        let account = accounts
            .create(doc(json!({"accountNumber": "A1", "points": 5})))
            .await
            .unwrap();
        customers
            .create(doc(json!({"name": "Bob", "account": account["_id"]})))
            .await
            .unwrap();

        let query = Query::new().populate(
            PopulateSpec::new("account").with_select(Projection::parse("accountNumber").unwrap()),
        );
        let found = customers.find(&query).await.unwrap();
        assert_eq!(
            found[0]["account"],
            json!({"_id": account["_id"], "accountNumber": "A1"})
        );
    }

    #[tokio::test]
    async fn test_find_one_and_update_sets_paths() {
        let (_, _, customers) = setup();
        let created = customers.create(doc(json!({"name": "Bob"}))).await.unwrap();
        let query = Query::new().where_eq("_id", created["_id"].clone());

        let updated = customers
            .find_one_and_update(
                &query,
                &doc(json!({"comment": "Bar", "address.city": "Oslo"})),
                UpdateOptions::default(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["comment"], json!("Bar"));
        assert_eq!(updated["address"], json!({"city": "Oslo"}));
        assert_eq!(updated["__v"], json!(0));
    }

    #[tokio::test]
    async fn test_run_validators_on_update() {
        let (_, _, customers) = setup();
        customers.create(doc(json!({"name": "Bob"}))).await.unwrap();
        let options = UpdateOptions {
            run_validators: true,
            ..UpdateOptions::default()
        };
        let err = customers
            .find_one_and_update(&Query::new(), &doc(json!({"name": null})), options)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_ignores_pagination() {
        let (_, _, customers) = setup();
        for name in ["A", "B", "C"] {
            customers.create(doc(json!({"name": name}))).await.unwrap();
        }
        let removed = customers.remove(&Query::new().limit(1)).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(customers.count(&Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_distinct_values() {
        let (_, _, customers) = setup();
        for (name, comment) in [("A", "x"), ("B", "y"), ("C", "x")] {
            customers
                .create(doc(json!({"name": name, "comment": comment})))
                .await
                .unwrap();
        }
        let query = Query::new().distinct("comment");
        assert_eq!(
            customers.distinct(&query).await.unwrap(),
            vec![json!("x"), json!("y")]
        );

        let narrowed = query.and(Predicate::from_json(&json!({"name": "B"})).unwrap());
        assert_eq!(customers.distinct(&narrowed).await.unwrap(), vec![json!("y")]);
    }

    #[tokio::test]
    async fn test_save_replaces_document() {
        let (_, _, customers) = setup();
        let mut created = customers.create(doc(json!({"name": "Bob"}))).await.unwrap();
        created.insert("comment".to_string(), json!("saved"));
        customers.save(created.clone()).await.unwrap();

        let query = Query::new().where_eq("_id", created["_id"].clone());
        let found = customers.find_one(&query).await.unwrap().unwrap();
        assert_eq!(found["comment"], json!("saved"));
    }

    #[test]
    fn test_unknown_collection() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.collection("Ghost"),
            Err(StoreError::UnknownCollection(_))
        ));
    }
}
