//! # Query Parameter Parser
//!
//! Parses REST API query parameters into [`QueryOptions`].
//!
//! | Parameter | Form |
//! |---|---|
//! | `query` | JSON predicate |
//! | `sort` | `name,-age` or `{"name": 1, "age": -1}` |
//! | `skip`, `limit` | non-negative integers |
//! | `select` | `a,b` or `-a,-b` |
//! | `populate` | `a,b` or JSON `{path, select, populate}` (or an array of them) |
//! | `distinct` | field name |
//!
//! Other parameters are ignored.

use std::collections::HashMap;

use serde_json::Value;

use super::errors::{RestError, RestResult};
use crate::store::{PopulateSpec, Predicate, Projection, SortKey};

/// Parsed query options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Filter predicate
    pub query: Predicate,

    /// Order by clauses
    pub sort: Vec<SortKey>,

    /// Number of records to skip
    pub skip: Option<usize>,

    /// Number of records to return
    pub limit: Option<usize>,

    /// Fields to select (None = all)
    pub select: Option<Projection>,

    /// Relations to populate, in order
    pub populate: Vec<PopulateSpec>,

    /// Field to collect distinct values of
    pub distinct: Option<String>,
}

impl QueryOptions {
    /// Parse query parameters from a HashMap
    pub fn parse(params: &HashMap<String, String>) -> RestResult<Self> {
        let mut result = QueryOptions::default();

        for (key, value) in params {
            match key.as_str() {
                "query" => result.query = parse_query(value)?,
                "sort" => result.sort = parse_sort(value)?,
                "skip" => result.skip = Some(parse_count("skip", value)?),
                "limit" => result.limit = Some(parse_count("limit", value)?),
                "select" => result.select = Some(Projection::parse(value).map_err(invalid)?),
                "populate" => result.populate = parse_populate(value)?,
                "distinct" => {
                    let field = value.trim();
                    if field.is_empty() {
                        return Err(invalid("distinct cannot be empty"));
                    }
                    result.distinct = Some(field.to_string());
                }
                _ => {}
            }
        }

        Ok(result)
    }
}

fn invalid(detail: impl Into<String>) -> RestError {
    let detail: String = detail.into();
    tracing::debug!(%detail, "rejected query option");
    RestError::validation("invalid_query_option")
}

fn parse_json(name: &str, value: &str) -> RestResult<Value> {
    serde_json::from_str(value).map_err(|e| invalid(format!("{} is not valid JSON: {}", name, e)))
}

fn parse_query(value: &str) -> RestResult<Predicate> {
    Predicate::from_json(&parse_json("query", value)?).map_err(invalid)
}

fn parse_count(name: &str, value: &str) -> RestResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid {}: {}", name, value)))
}

/// Parse sort (comma- or space-separated, `-` prefix for descending, or a JSON object)
fn parse_sort(value: &str) -> RestResult<Vec<SortKey>> {
    let trimmed = value.trim();
    if trimmed.starts_with('{') {
        let spec = parse_json("sort", trimmed)?;
        let map = spec
            .as_object()
            .ok_or_else(|| invalid("sort must be an object"))?;
        return map
            .iter()
            .map(|(field, direction)| {
                let ascending = match direction {
                    Value::Number(n) if n.as_i64() == Some(1) => true,
                    Value::Number(n) if n.as_i64() == Some(-1) => false,
                    Value::String(s) if matches!(s.as_str(), "asc" | "ascending") => true,
                    Value::String(s) if matches!(s.as_str(), "desc" | "descending") => false,
                    other => {
                        return Err(invalid(format!(
                            "Invalid sort direction for {}: {}",
                            field, other
                        )))
                    }
                };
                Ok(SortKey {
                    field: field.clone(),
                    ascending,
                })
            })
            .collect();
    }

    Ok(trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|part| match part.strip_prefix('-') {
            Some(field) => SortKey::desc(field),
            None => SortKey::asc(part.trim_start_matches('+')),
        })
        .collect())
}

fn parse_populate(value: &str) -> RestResult<Vec<PopulateSpec>> {
    let trimmed = value.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        populate_from_json(&parse_json("populate", trimmed)?)
    } else {
        Ok(populate_from_paths(trimmed))
    }
}

fn populate_from_paths(paths: &str) -> Vec<PopulateSpec> {
    paths
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(PopulateSpec::new)
        .collect()
}

fn populate_from_json(value: &Value) -> RestResult<Vec<PopulateSpec>> {
    match value {
        Value::String(paths) => Ok(populate_from_paths(paths)),
        Value::Array(items) => {
            let mut specs = Vec::new();
            for item in items {
                specs.extend(populate_from_json(item)?);
            }
            Ok(specs)
        }
        Value::Object(map) => {
            let path = map
                .get("path")
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| invalid("populate entries need a path"))?;
            let mut spec = PopulateSpec::new(path);
            match map.get("select") {
                Some(Value::String(select)) => {
                    spec = spec.with_select(Projection::parse(select).map_err(invalid)?);
                }
                Some(Value::Null) | None => {}
                Some(other) => return Err(invalid(format!("Invalid populate select: {}", other))),
            }
            if let Some(nested) = map.get("populate") {
                spec.populate = populate_from_json(nested)?;
            }
            Ok(vec![spec])
        }
        other => Err(invalid(format!("Invalid populate: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_empty() {
        let options = QueryOptions::parse(&HashMap::new()).unwrap();
        assert_eq!(options, QueryOptions::default());
    }

    #[test]
    fn test_parse_sort_forms() {
        let options = QueryOptions::parse(&params(&[("sort", "name,-age")])).unwrap();
        assert_eq!(options.sort, vec![SortKey::asc("name"), SortKey::desc("age")]);

        let options = QueryOptions::parse(&params(&[("sort", r#"{"age": -1, "name": "asc"}"#)]))
            .unwrap();
        assert_eq!(options.sort, vec![SortKey::desc("age"), SortKey::asc("name")]);

        assert!(QueryOptions::parse(&params(&[("sort", r#"{"age": 2}"#)])).is_err());
    }

    #[test]
    fn test_parse_pagination() {
        let options = QueryOptions::parse(&params(&[("skip", "10"), ("limit", "5")])).unwrap();
        assert_eq!(options.skip, Some(10));
        assert_eq!(options.limit, Some(5));

        let err = QueryOptions::parse(&params(&[("limit", "-1")])).unwrap_err();
        assert_eq!(err.description(), "invalid_query_option");
    }

    #[test]
    fn test_parse_query_predicate() {
        let options =
            QueryOptions::parse(&params(&[("query", r#"{"name": {"$regex": "^B"}}"#)])).unwrap();
        assert!(options.query.matches(&json!({"name": "Bob"})));
        assert!(QueryOptions::parse(&params(&[("query", "{not json")])).is_err());
    }

    #[test]
    fn test_parse_populate_forms() {
        let options = QueryOptions::parse(&params(&[("populate", "account,purchases")])).unwrap();
        let paths: Vec<_> = options.populate.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["account", "purchases"]);

        let options = QueryOptions::parse(&params(&[(
            "populate",
            r#"[{"path": "purchases", "select": "name", "populate": "item"}]"#,
        )]))
        .unwrap();
        assert_eq!(
            options.populate,
            vec![PopulateSpec::new("purchases")
                .with_select(Projection::Include(vec!["name".to_string()]))
                .with_populate(PopulateSpec::new("item"))]
        );

        assert!(QueryOptions::parse(&params(&[("populate", r#"{"select": "a"}"#)])).is_err());
    }

    #[test]
    fn test_mixed_select_rejected() {
        assert!(QueryOptions::parse(&params(&[("select", "name,-age")])).is_err());
    }

    #[test]
    fn test_unknown_params_ignored() {
        let options = QueryOptions::parse(&params(&[("foo", "bar"), ("distinct", "name")])).unwrap();
        assert_eq!(options.distinct.as_deref(), Some("name"));
    }
}
