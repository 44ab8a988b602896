//! # Predicate Expressions
//!
//! Document-style JSON predicates: `{field: value}` equality and
//! `{field: {"$op": value}}` comparisons over dot-paths. Array-valued
//! fields match when any element matches.

use std::cmp::Ordering;
use std::str::FromStr;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equals (arrays: contains)
    #[serde(rename = "$eq")]
    Eq,

    /// Not equals
    #[serde(rename = "$ne")]
    Ne,

    /// Greater than
    #[serde(rename = "$gt")]
    Gt,

    /// Greater than or equal
    #[serde(rename = "$gte")]
    Gte,

    /// Less than
    #[serde(rename = "$lt")]
    Lt,

    /// Less than or equal
    #[serde(rename = "$lte")]
    Lte,

    /// Value in list
    #[serde(rename = "$in")]
    In,

    /// Value not in list
    #[serde(rename = "$nin")]
    Nin,

    /// Regular expression match
    #[serde(rename = "$regex")]
    Regex,

    /// Field presence
    #[serde(rename = "$exists")]
    Exists,
}

impl FilterOperator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "$eq",
            FilterOperator::Ne => "$ne",
            FilterOperator::Gt => "$gt",
            FilterOperator::Gte => "$gte",
            FilterOperator::Lt => "$lt",
            FilterOperator::Lte => "$lte",
            FilterOperator::In => "$in",
            FilterOperator::Nin => "$nin",
            FilterOperator::Regex => "$regex",
            FilterOperator::Exists => "$exists",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("Unsupported operator: {}", s))
    }
}

/// A filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field path to filter on
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,

    /// Regex flags (`i`, `m`, `s`, `x`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl FilterExpr {
    /// Create a new filter expression
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            options: None,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a greater than filter
    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Gt, value)
    }

    /// Create an "in list" filter
    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    /// Scalar operands of this expression (list operators are expanded)
    pub fn operands(&self) -> Vec<&Value> {
        match (&self.operator, &self.value) {
            (FilterOperator::In | FilterOperator::Nin, Value::Array(items)) => {
                items.iter().collect()
            }
            (FilterOperator::Exists | FilterOperator::Regex, _) => Vec::new(),
            (_, value) => vec![value],
        }
    }

    /// Check if a document matches this filter
    pub fn matches(&self, doc: &Value) -> bool {
        let resolved = resolve(doc, &self.field);
        let candidates = expand(&resolved);

        match self.operator {
            FilterOperator::Eq => equals(&resolved, &candidates, &self.value),
            FilterOperator::Ne => !equals(&resolved, &candidates, &self.value),
            FilterOperator::Gt => ordered(&candidates, &self.value, |o| o == Ordering::Greater),
            FilterOperator::Gte => ordered(&candidates, &self.value, |o| o != Ordering::Less),
            FilterOperator::Lt => ordered(&candidates, &self.value, |o| o == Ordering::Less),
            FilterOperator::Lte => ordered(&candidates, &self.value, |o| o != Ordering::Greater),
            FilterOperator::In => in_list(&resolved, &candidates, &self.value),
            FilterOperator::Nin => !in_list(&resolved, &candidates, &self.value),
            FilterOperator::Regex => {
                let pattern = match self.value.as_str() {
                    Some(p) => p,
                    None => return false,
                };
                let regex = match build_regex(pattern, self.options.as_deref()) {
                    Ok(r) => r,
                    Err(_) => return false,
                };
                candidates
                    .iter()
                    .filter_map(|v| v.as_str())
                    .any(|s| regex.is_match(s))
            }
            FilterOperator::Exists => {
                let wanted = self.value.as_bool().unwrap_or(true);
                resolved.is_empty() != wanted
            }
        }
    }
}

fn build_regex(pattern: &str, options: Option<&str>) -> Result<regex::Regex, regex::Error> {
    let flags = options.unwrap_or("");
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
}

/// Values reached by a dot-path, fanning out over arrays of sub-documents
fn resolve<'a>(value: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![value];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => match segment.parse::<usize>() {
                    Ok(index) => next.extend(items.get(index)),
                    Err(_) => next.extend(items.iter().filter_map(|item| item.get(segment))),
                },
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// Resolved values plus the elements of any array among them
fn expand<'a>(resolved: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(resolved.len());
    for value in resolved {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn equals(resolved: &[&Value], candidates: &[&Value], target: &Value) -> bool {
    if target.is_null() && resolved.is_empty() {
        return true;
    }
    candidates.iter().any(|v| *v == target)
}

fn in_list(resolved: &[&Value], candidates: &[&Value], list: &Value) -> bool {
    match list.as_array() {
        Some(items) => items.iter().any(|item| equals(resolved, candidates, item)),
        None => false,
    }
}

fn ordered(candidates: &[&Value], target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates
        .iter()
        .filter(|v| type_rank(v) == type_rank(target))
        .any(|v| accept(compare_values(v, target)))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values: by type first, then by value
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                match compare_values(x, y) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// A set of filters combined with AND logic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub filters: Vec<FilterExpr>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Combine two predicates with AND
    pub fn merge(mut self, other: Predicate) -> Self {
        self.filters.extend(other.filters);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Check if a document matches all filters
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Parse a JSON predicate object
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let map = value
            .as_object()
            .ok_or_else(|| "query must be a JSON object".to_string())?;

        let mut predicate = Predicate::new();
        for (field, condition) in map {
            if field.starts_with('$') {
                return Err(format!("Unsupported top-level operator: {}", field));
            }
            predicate.filters.extend(parse_condition(field, condition)?);
        }
        Ok(predicate)
    }
}

fn parse_condition(field: &str, condition: &Value) -> Result<Vec<FilterExpr>, String> {
    let operators = match condition {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
        other => return Ok(vec![FilterExpr::eq(field, other.clone())]),
    };

    let options = operators
        .get("$options")
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| "$options must be a string".to_string())
        })
        .transpose()?;

    let mut filters = Vec::new();
    for (op, operand) in operators {
        if op == "$options" {
            continue;
        }
        let operator: FilterOperator = op.parse()?;
        check_operand(field, operator, operand, options.as_deref())?;

        let mut expr = FilterExpr::new(field, operator, operand.clone());
        if operator == FilterOperator::Regex {
            expr.options = options.clone();
        }
        filters.push(expr);
    }
    Ok(filters)
}

fn check_operand(
    field: &str,
    operator: FilterOperator,
    operand: &Value,
    options: Option<&str>,
) -> Result<(), String> {
    match operator {
        FilterOperator::In | FilterOperator::Nin if !operand.is_array() => Err(format!(
            "{} on `{}` requires an array",
            operator.as_str(),
            field
        )),
        FilterOperator::Regex => {
            let pattern = operand
                .as_str()
                .ok_or_else(|| format!("$regex on `{}` requires a string", field))?;
            build_regex(pattern, options)
                .map(|_| ())
                .map_err(|e| format!("Invalid $regex on `{}`: {}", field, e))
        }
        _ => Ok(()),
    }
}

/// Build an equality predicate from a flat map of field to value
impl From<Map<String, Value>> for Predicate {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter()
            .fold(Predicate::new(), |p, (field, value)| p.and(FilterExpr::eq(field, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eq_filter() {
        let filter = FilterExpr::eq("name", json!("Alice"));

        assert!(filter.matches(&json!({"name": "Alice"})));
        assert!(!filter.matches(&json!({"name": "Bob"})));
    }

    #[test]
    fn test_gt_filter() {
        let filter = FilterExpr::gt("age", json!(18));

        assert!(filter.matches(&json!({"age": 21})));
        assert!(!filter.matches(&json!({"age": 18})));
        assert!(!filter.matches(&json!({"age": 15})));
        assert!(!filter.matches(&json!({"age": "21"})));
    }

    #[test]
    fn test_in_filter() {
        let filter = FilterExpr::in_list("status", vec![json!("active"), json!("pending")]);

        assert!(filter.matches(&json!({"status": "active"})));
        assert!(filter.matches(&json!({"status": "pending"})));
        assert!(!filter.matches(&json!({"status": "inactive"})));
    }

    #[test]
    fn test_array_containment() {
        let filter = FilterExpr::eq("tags", json!("red"));
        assert!(filter.matches(&json!({"tags": ["blue", "red"]})));
        assert!(!filter.matches(&json!({"tags": ["blue"]})));
    }

    #[test]
    fn test_nested_paths() {
        let predicate = Predicate::from_json(&json!({"address.city": "Oslo"})).unwrap();
        assert!(predicate.matches(&json!({"address": {"city": "Oslo"}})));

        let predicate = Predicate::from_json(&json!({"items.qty": {"$gte": 5}})).unwrap();
        assert!(predicate.matches(&json!({"items": [{"qty": 1}, {"qty": 7}]})));
        assert!(!predicate.matches(&json!({"items": [{"qty": 1}]})));
    }

    #[test]
    fn test_regex_with_options() {
        let predicate =
            Predicate::from_json(&json!({"name": {"$regex": "^jo", "$options": "i"}})).unwrap();
        assert!(predicate.matches(&json!({"name": "John"})));
        assert!(!predicate.matches(&json!({"name": "Bill"})));
    }

    #[test]
    fn test_exists_and_null() {
        let exists = Predicate::from_json(&json!({"comment": {"$exists": true}})).unwrap();
        assert!(exists.matches(&json!({"comment": null})));
        assert!(!exists.matches(&json!({"name": "x"})));

        let null = Predicate::from_json(&json!({"comment": null})).unwrap();
        assert!(null.matches(&json!({"name": "x"})));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Predicate::from_json(&json!("name")).is_err());
        assert!(Predicate::from_json(&json!({"$or": []})).is_err());
        assert!(Predicate::from_json(&json!({"age": {"$near": 1}})).is_err());
        assert!(Predicate::from_json(&json!({"age": {"$in": 1}})).is_err());
        assert!(Predicate::from_json(&json!({"name": {"$regex": "("}})).is_err());
    }

    #[test]
    fn test_multiple_operators_and() {
        let predicate = Predicate::from_json(&json!({"age": {"$gt": 10, "$lt": 20}})).unwrap();
        assert_eq!(predicate.filters.len(), 2);
        assert!(predicate.matches(&json!({"age": 15})));
        assert!(!predicate.matches(&json!({"age": 25})));
    }

    #[test]
    fn test_compare_values_orders_types() {
        assert_eq!(compare_values(&json!(1), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&Value::Null, &json!(0)), Ordering::Less);
    }
}
