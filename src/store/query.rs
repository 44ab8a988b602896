//! Query value object
//!
//! A `Query` accumulates directives (predicate, selection, sort, population,
//! pagination, distinct). It is plain data: the collection interprets it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::{FilterExpr, Predicate};
use crate::schema::{get_path, remove_path, set_path, Document, ModelSchema};

/// Field selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Keep only these paths (plus `_id`)
    Include(Vec<String>),
    /// Drop these paths
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse `a,b` / `a b` (inclusive) or `-a,-b` (exclusive)
    pub fn parse(spec: &str) -> Result<Self, String> {
        let tokens: Vec<&str> = spec
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err("select cannot be empty".to_string());
        }

        let excluded: Vec<String> = tokens
            .iter()
            .filter_map(|t| t.strip_prefix('-'))
            .map(str::to_string)
            .collect();

        if excluded.is_empty() {
            Ok(Projection::Include(tokens.iter().map(|t| t.to_string()).collect()))
        } else if excluded.len() == tokens.len() {
            Ok(Projection::Exclude(excluded))
        } else {
            Err("select cannot mix inclusion and exclusion".to_string())
        }
    }

    /// Whether a top-level or nested path survives this selection
    pub fn keeps(&self, path: &str) -> bool {
        match self {
            Projection::Include(fields) => {
                path == ModelSchema::ID_FIELD
                    || fields.iter().any(|f| {
                        f == path
                            || f.starts_with(&format!("{}.", path))
                            || path.starts_with(&format!("{}.", f))
                    })
            }
            Projection::Exclude(fields) => !fields
                .iter()
                .any(|f| f == path || path.starts_with(&format!("{}.", f))),
        }
    }

    /// Apply the selection to a document
    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Projection::Include(fields) => {
                let root = Value::Object(doc);
                let mut selected = Document::new();
                if let Some(id) = get_path(&root, ModelSchema::ID_FIELD) {
                    selected.insert(ModelSchema::ID_FIELD.to_string(), id.clone());
                }
                for field in fields {
                    if let Some(value) = get_path(&root, field) {
                        set_path(&mut selected, field, value.clone());
                    }
                }
                selected
            }
            Projection::Exclude(fields) => {
                let mut root = Value::Object(doc);
                for field in fields {
                    remove_path(&mut root, field);
                }
                match root {
                    Value::Object(map) => map,
                    _ => Document::new(),
                }
            }
        }
    }
}

/// Sort clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// One relation path to populate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateSpec {
    /// Relation field path
    pub path: String,
    /// Selection applied to the populated documents
    pub select: Option<Projection>,
    /// Relations of the populated documents to populate in turn
    pub populate: Vec<PopulateSpec>,
}

impl PopulateSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            select: None,
            populate: Vec::new(),
        }
    }

    pub fn with_select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }

    pub fn with_populate(mut self, nested: PopulateSpec) -> Self {
        self.populate.push(nested);
        self
    }
}

/// Replica read preference, a hint for replicated stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreference {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl FromStr for ReadPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("Unknown read preference: {}", s))
    }
}

/// A composed query against a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub predicate: Predicate,
    pub projection: Option<Projection>,
    pub sort: Vec<SortKey>,
    pub populate: Vec<PopulateSpec>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub distinct: Option<String>,
    /// Plain documents rather than store model instances; a hint only
    pub lean: bool,
    /// Replica routing hint
    pub read_preference: Option<ReadPreference>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            predicate: Predicate::default(),
            projection: None,
            sort: Vec::new(),
            populate: Vec::new(),
            skip: None,
            limit: None,
            distinct: None,
            lean: true,
            read_preference: None,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrow the query with additional conditions (AND)
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate.merge(predicate);
        self
    }

    /// Narrow the query to `field == value`
    pub fn where_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.and(Predicate::new().and(FilterExpr::eq(field, value)))
    }

    pub fn select(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, keys: Vec<SortKey>) -> Self {
        self.sort.extend(keys);
        self
    }

    /// Append a population directive; earlier directives are kept
    pub fn populate(mut self, spec: PopulateSpec) -> Self {
        self.populate.push(spec);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = (skip > 0).then_some(skip);
        self
    }

    /// A zero limit means unlimited
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn distinct(mut self, field: impl Into<String>) -> Self {
        self.distinct = Some(field.into());
        self
    }

    pub fn lean(mut self, lean: bool) -> Self {
        self.lean = lean;
        self
    }

    pub fn read(mut self, preference: Option<ReadPreference>) -> Self {
        self.read_preference = preference;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_projection() {
        assert_eq!(
            Projection::parse("name,email").unwrap(),
            Projection::Include(vec!["name".to_string(), "email".to_string()])
        );
        assert_eq!(
            Projection::parse("-ssn -age").unwrap(),
            Projection::Exclude(vec!["ssn".to_string(), "age".to_string()])
        );
        assert!(Projection::parse("name,-age").is_err());
        assert!(Projection::parse(" , ").is_err());
    }

    #[test]
    fn test_include_keeps_id() {
        let selected = Projection::parse("name")
            .unwrap()
            .apply(doc(json!({"_id": "x", "name": "Bob", "age": 3})));
        assert_eq!(Value::Object(selected), json!({"_id": "x", "name": "Bob"}));
    }

    #[test]
    fn test_exclude_nested() {
        let selected = Projection::parse("-address.zip")
            .unwrap()
            .apply(doc(json!({"address": {"city": "Oslo", "zip": "0150"}})));
        assert_eq!(Value::Object(selected), json!({"address": {"city": "Oslo"}}));
    }

    #[test]
    fn test_keeps_paths() {
        let include = Projection::parse("account.name").unwrap();
        assert!(include.keeps("account"));
        assert!(!include.keeps("purchases"));

        let exclude = Projection::parse("-account").unwrap();
        assert!(!exclude.keeps("account"));
        assert!(!exclude.keeps("account.name"));
        assert!(exclude.keeps("name"));
    }

    #[test]
    fn test_populate_appends() {
        let query = Query::new()
            .populate(PopulateSpec::new("account"))
            .populate(PopulateSpec::new("purchases"));
        let paths: Vec<_> = query.populate.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["account", "purchases"]);
    }

    #[test]
    fn test_zero_pagination_is_unbounded() {
        let query = Query::new().skip(10).limit(5).skip(0).limit(0);
        assert_eq!(query.skip, None);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_read_preference_parse() {
        assert_eq!(
            "secondaryPreferred".parse::<ReadPreference>().unwrap(),
            ReadPreference::SecondaryPreferred
        );
        assert!("fastest".parse::<ReadPreference>().is_err());
    }
}
