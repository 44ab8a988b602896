//! # Query Builder
//!
//! Applies parsed query options to a base query in a fixed order:
//! predicate, selection, sort, population, skip, limit, distinct.

use super::parser::QueryOptions;
use crate::store::{Query, ReadPreference};

/// Composes store queries from request options
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    lean: bool,
    read_preference: Option<ReadPreference>,
}

impl QueryBuilder {
    pub fn new(lean: bool, read_preference: Option<ReadPreference>) -> Self {
        Self {
            lean,
            read_preference,
        }
    }

    /// Full query for list
    pub fn build(&self, base: Query, options: &QueryOptions) -> Query {
        let mut query = self.narrow(base, options);
        if let Some(select) = &options.select {
            query = query.select(select.clone());
        }
        query = query.sort(options.sort.clone());
        for spec in &options.populate {
            query = query.populate(spec.clone());
        }
        if let Some(skip) = options.skip {
            query = query.skip(skip);
        }
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }
        if let Some(field) = &options.distinct {
            query = query.distinct(field.clone());
        }
        query
    }

    /// Single-document query: predicate, selection and population only
    pub fn build_one(&self, base: Query, options: &QueryOptions) -> Query {
        let mut query = self.narrow(base, options);
        if let Some(select) = &options.select {
            query = query.select(select.clone());
        }
        for spec in &options.populate {
            query = query.populate(spec.clone());
        }
        query
    }

    /// Counting query: predicate and pagination, no selection or population
    pub fn build_page_count(&self, base: Query, options: &QueryOptions) -> Query {
        let mut query = self.narrow(base, options);
        if let Some(skip) = options.skip {
            query = query.skip(skip);
        }
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }
        query
    }

    /// Predicate-only query, for every match regardless of pagination
    pub fn build_count(&self, base: Query, options: &QueryOptions) -> Query {
        self.narrow(base, options)
    }

    fn narrow(&self, base: Query, options: &QueryOptions) -> Query {
        base.lean(self.lean)
            .read(self.read_preference)
            .and(options.query.clone())
    }
}
