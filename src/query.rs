//! Query model and evaluation
//!
//! Queries form a small tagged tree: a full-text leaf (`$text`), boolean
//! combinators (`$and`/`$or`), or a conjunction of per-field operator
//! clauses. [`Query::parse`] builds the tree from the JSON query form and
//! rejects anything that matches no recognized shape, so the evaluator only
//! ever sees valid nodes.
//!
//! Evaluation applies set algebra over the input record set: every branch
//! of a combinator is evaluated against the *full* input, then `$and`
//! intersects the result lists and `$or` unions them (first-seen order,
//! deduplicated). Leaf queries preserve input order.

use serde_json::{Number, Value};

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::value::FieldValue;

/// Operator applicable to a single record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Strict equality
    Eq(FieldValue),
    /// Membership in a candidate list, equality by value
    In(Vec<FieldValue>),
    /// Numeric less-than; a non-numeric record value never matches
    Lt(Number),
    /// Numeric greater-than; a non-numeric record value never matches
    Gt(Number),
}

/// One field/operator pair inside a field query
#[derive(Debug, Clone, PartialEq)]
pub struct FieldClause {
    pub field: String,
    pub op: FieldOp,
}

/// A query tree
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Whole-token match against the configured full-text fields
    Text(String),
    /// Intersection of the sub-query results
    And(Vec<Query>),
    /// Deduplicated union of the sub-query results
    Or(Vec<Query>),
    /// Implicit conjunction of field clauses; empty matches every record
    Fields(Vec<FieldClause>),
}

impl Query {
    /// The match-all query (an empty field conjunction)
    pub fn all() -> Self {
        Query::Fields(Vec::new())
    }

    pub fn text(needle: impl Into<String>) -> Self {
        Query::Text(needle.into())
    }

    pub fn and(queries: Vec<Query>) -> Self {
        Query::And(queries)
    }

    pub fn or(queries: Vec<Query>) -> Self {
        Query::Or(queries)
    }

    /// Single-clause field query: `field == value`
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Query::Fields(vec![FieldClause {
            field: field.to_string(),
            op: FieldOp::Eq(value.into()),
        }])
    }

    /// Single-clause field query: `field` is one of `values`
    pub fn is_in(field: &str, values: Vec<FieldValue>) -> Self {
        Query::Fields(vec![FieldClause {
            field: field.to_string(),
            op: FieldOp::In(values),
        }])
    }

    /// Single-clause field query: `field < bound` (numeric only)
    pub fn lt(field: &str, bound: impl Into<Number>) -> Self {
        Query::Fields(vec![FieldClause {
            field: field.to_string(),
            op: FieldOp::Lt(bound.into()),
        }])
    }

    /// Single-clause field query: `field > bound` (numeric only)
    pub fn gt(field: &str, bound: impl Into<Number>) -> Self {
        Query::Fields(vec![FieldClause {
            field: field.to_string(),
            op: FieldOp::Gt(bound.into()),
        }])
    }

    /// Build a query from its JSON form
    ///
    /// Shape is discriminated by reserved key: `{"$text": s}`,
    /// `{"$and": [...]}`, `{"$or": [...]}`, or a plain field map whose
    /// values are single-operator objects (`$eq`/`$in`/`$lt`/`$gt`). The
    /// empty object parses to the match-all query. Mixed reserved keys,
    /// unknown operators, and ill-typed operands are `QueryShape` errors
    /// rather than silent non-matches.
    pub fn parse(value: &Value) -> Result<Query> {
        let map = match value.as_object() {
            Some(m) => m,
            None => return Err(shape_err("query must be a JSON object")),
        };

        let reserved = ["$text", "$and", "$or"]
            .iter()
            .filter(|k| map.contains_key(**k))
            .count();
        if reserved > 1 || (reserved == 1 && map.len() > 1) {
            return Err(shape_err("a reserved key must be the only key"));
        }

        if let Some(needle) = map.get("$text") {
            let needle = match needle.as_str() {
                Some(s) => s,
                None => return Err(shape_err("$text takes a string")),
            };
            return Ok(Query::Text(needle.to_string()));
        }
        if let Some(subs) = map.get("$and") {
            return Ok(Query::And(parse_branches(subs, "$and")?));
        }
        if let Some(subs) = map.get("$or") {
            return Ok(Query::Or(parse_branches(subs, "$or")?));
        }

        // No reserved key: a field conjunction ({} matches everything)
        let mut clauses = Vec::with_capacity(map.len());
        for (field, operator) in map {
            if field.starts_with('$') {
                return Err(shape_err(&format!("unknown combinator {}", field)));
            }
            clauses.push(FieldClause {
                field: field.clone(),
                op: parse_op(field, operator)?,
            });
        }
        Ok(Query::Fields(clauses))
    }

    /// Evaluate against a record set, returning the matching subset
    ///
    /// Set membership for `$and`/`$or` is by row identity, so structurally
    /// identical rows stay distinct in union results.
    pub fn evaluate<'a>(
        &self,
        records: &[&'a Record],
        full_text_fields: &[String],
    ) -> Vec<&'a Record> {
        match self {
            Query::Text(needle) => {
                let needle = needle.to_lowercase();
                records
                    .iter()
                    .copied()
                    .filter(|r| text_matches(r, &needle, full_text_fields))
                    .collect()
            }
            Query::And(branches) => {
                let mut iter = branches.iter();
                let first = match iter.next() {
                    Some(q) => q,
                    // Intersection of zero lists: no universal set
                    None => return Vec::new(),
                };
                let mut result = first.evaluate(records, full_text_fields);
                for branch in iter {
                    let hits = branch.evaluate(records, full_text_fields);
                    result.retain(|r| hits.iter().any(|h| std::ptr::eq(*h, *r)));
                }
                result
            }
            Query::Or(branches) => {
                let mut result: Vec<&Record> = Vec::new();
                for branch in branches {
                    for hit in branch.evaluate(records, full_text_fields) {
                        if !result.iter().any(|r| std::ptr::eq(*r, hit)) {
                            result.push(hit);
                        }
                    }
                }
                result
            }
            Query::Fields(clauses) => records
                .iter()
                .copied()
                .filter(|r| clauses.iter().all(|c| clause_matches(r, c)))
                .collect(),
        }
    }
}

fn parse_branches(value: &Value, combinator: &str) -> Result<Vec<Query>> {
    let items = match value.as_array() {
        Some(items) => items,
        None => return Err(shape_err(&format!("{} takes an array", combinator))),
    };
    items.iter().map(Query::parse).collect()
}

fn parse_op(field: &str, operator: &Value) -> Result<FieldOp> {
    let map = match operator.as_object() {
        Some(m) => m,
        None => {
            return Err(shape_err(&format!(
                "field {} needs an operator object",
                field
            )))
        }
    };
    let (op, operand) = match map.iter().next() {
        Some(entry) if map.len() == 1 => entry,
        _ => {
            return Err(shape_err(&format!(
                "field {} needs exactly one operator",
                field
            )))
        }
    };

    match op.as_str() {
        "$eq" => Ok(FieldOp::Eq(parse_operand(operand)?)),
        "$in" => {
            let items = match operand.as_array() {
                Some(items) => items,
                None => return Err(shape_err("$in takes an array")),
            };
            let values = items.iter().map(parse_operand).collect::<Result<_>>()?;
            Ok(FieldOp::In(values))
        }
        "$lt" => Ok(FieldOp::Lt(parse_numeric_operand(operand, "$lt")?)),
        "$gt" => Ok(FieldOp::Gt(parse_numeric_operand(operand, "$gt")?)),
        other => Err(shape_err(&format!(
            "unknown operator {} on field {}",
            other, field
        ))),
    }
}

fn parse_operand(value: &Value) -> Result<FieldValue> {
    serde_json::from_value(value.clone())
        .map_err(|_| shape_err("operand must be a string, number, or array thereof"))
}

fn parse_numeric_operand(value: &Value, op: &str) -> Result<Number> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(shape_err(&format!("{} takes a number", op))),
    }
}

fn shape_err(reason: &str) -> StoreError {
    StoreError::QueryShape(reason.to_string())
}

/// True if any configured full-text field is a string containing the
/// lower-cased needle as a whole whitespace-delimited token
fn text_matches(record: &Record, needle_lower: &str, fields: &[String]) -> bool {
    fields.iter().any(|field| match record.get(field) {
        Some(FieldValue::Str(text)) => text
            .split_whitespace()
            .any(|token| token.to_lowercase() == needle_lower),
        _ => false,
    })
}

fn clause_matches(record: &Record, clause: &FieldClause) -> bool {
    let value = match record.get(&clause.field) {
        Some(v) => v,
        None => return false,
    };
    match &clause.op {
        FieldOp::Eq(expected) => value == expected,
        FieldOp::In(candidates) => candidates.contains(value),
        FieldOp::Lt(bound) => match (value.as_f64(), bound.as_f64()) {
            (Some(v), Some(b)) => v < b,
            _ => false,
        },
        FieldOp::Gt(bound) => match (value.as_f64(), bound.as_f64()) {
            (Some(v), Some(b)) => v > b,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    fn people() -> Vec<Record> {
        vec![
            record(json!({"name": "Ann", "age": 30, "bio": "fast and curious"})),
            record(json!({"name": "Bob", "age": 40, "bio": "slow but steady"})),
            record(json!({"name": "Cal", "age": 35, "bio": "Fast talker"})),
        ]
    }

    fn eval<'a>(query: &Query, records: &'a [Record]) -> Vec<&'a Record> {
        let refs: Vec<&Record> = records.iter().collect();
        query.evaluate(&refs, &["bio".to_string()])
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(Query::parse(&json!({})).unwrap(), Query::all());
        assert_eq!(
            Query::parse(&json!({"$text": "fast"})).unwrap(),
            Query::text("fast")
        );
        assert_eq!(
            Query::parse(&json!({"$and": [{"age": {"$gt": 30}}, {"age": {"$lt": 40}}]})).unwrap(),
            Query::and(vec![Query::gt("age", 30), Query::lt("age", 40)])
        );
        assert_eq!(
            Query::parse(&json!({"name": {"$in": ["Ann", "Bob"]}})).unwrap(),
            Query::is_in("name", vec!["Ann".into(), "Bob".into()])
        );
    }

    #[test]
    fn test_parse_multi_field_conjunction() {
        let query = Query::parse(&json!({"name": {"$eq": "Ann"}, "age": {"$eq": 30}})).unwrap();
        match query {
            Query::Fields(clauses) => assert_eq!(clauses.len(), 2),
            other => panic!("expected field query, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unrecognized_shapes() {
        assert!(Query::parse(&json!("text")).is_err());
        assert!(Query::parse(&json!({"$text": 7})).is_err());
        assert!(Query::parse(&json!({"$and": {}})).is_err());
        assert!(Query::parse(&json!({"$not": []})).is_err());
        assert!(Query::parse(&json!({"$text": "x", "$or": []})).is_err());
        assert!(Query::parse(&json!({"$text": "x", "name": {"$eq": "Ann"}})).is_err());
        assert!(Query::parse(&json!({"name": "Ann"})).is_err());
        assert!(Query::parse(&json!({"name": {"$like": "A%"}})).is_err());
        assert!(Query::parse(&json!({"age": {"$lt": "10"}})).is_err());
        assert!(Query::parse(&json!({"age": {"$lt": 10, "$gt": 5}})).is_err());
        assert!(Query::parse(&json!({"name": {"$in": "Ann"}})).is_err());
        assert!(Query::parse(&json!({"name": {"$eq": null}})).is_err());
    }

    #[test]
    fn test_match_all() {
        let records = people();
        assert_eq!(eval(&Query::all(), &records).len(), 3);
    }

    #[test]
    fn test_eq_and_in() {
        let records = people();
        let hits = eval(&Query::eq("name", "Ann"), &records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get("name"), Some(&FieldValue::from("Ann")));

        let hits = eval(&Query::is_in("name", vec!["Ann".into(), "Cal".into()]), &records);
        assert_eq!(hits.len(), 2);

        assert!(eval(&Query::eq("name", "Zed"), &records).is_empty());
        assert!(eval(&Query::eq("missing", 1), &records).is_empty());
    }

    #[test]
    fn test_numeric_comparators_exclude_boundary() {
        let records = vec![
            record(json!({"v": 5})),
            record(json!({"v": 10})),
            record(json!({"v": 15})),
        ];
        let below = eval(&Query::lt("v", 10), &records);
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].get("v").and_then(FieldValue::as_f64), Some(5.0));

        let above = eval(&Query::gt("v", 10), &records);
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].get("v").and_then(FieldValue::as_f64), Some(15.0));
    }

    #[test]
    fn test_comparators_never_match_non_numeric_values() {
        let records = vec![record(json!({"v": "9"})), record(json!({"v": [1, 2]}))];
        assert!(eval(&Query::lt("v", 10), &records).is_empty());
        assert!(eval(&Query::gt("v", 0), &records).is_empty());
    }

    #[test]
    fn test_and_intersects() {
        let records = people();
        let query = Query::and(vec![Query::gt("age", 30), Query::lt("age", 40)]);
        let hits = eval(&query, &records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get("name"), Some(&FieldValue::from("Cal")));
    }

    #[test]
    fn test_or_unions_without_duplicates() {
        let records = people();
        // "Ann" matches both branches; she must appear once
        let query = Query::or(vec![Query::eq("name", "Ann"), Query::lt("age", 36)]);
        let hits = eval(&query, &records);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].get("name"), Some(&FieldValue::from("Ann")));
        assert_eq!(hits[1].get("name"), Some(&FieldValue::from("Cal")));
    }

    #[test]
    fn test_or_keeps_structurally_identical_rows_distinct() {
        let records = vec![record(json!({"n": 1})), record(json!({"n": 1}))];
        let hits = eval(&Query::or(vec![Query::all(), Query::eq("n", 1)]), &records);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_empty_combinators_match_nothing() {
        let records = people();
        assert!(eval(&Query::and(vec![]), &records).is_empty());
        assert!(eval(&Query::or(vec![]), &records).is_empty());
    }

    #[test]
    fn test_text_whole_token_case_insensitive() {
        let records = people();
        // Matches "fast" in Ann's bio and "Fast" in Cal's
        assert_eq!(eval(&Query::text("fast"), &records).len(), 2);
        assert_eq!(eval(&Query::text("FAST"), &records).len(), 2);
        // Substrings are not tokens
        assert!(eval(&Query::text("fas"), &records).is_empty());
        // Only configured fields are searched
        assert!(eval(&Query::text("Ann"), &records).is_empty());
    }

    #[test]
    fn test_text_ignores_non_string_fields() {
        let records = vec![record(json!({"bio": 42}))];
        assert!(eval(&Query::text("42"), &records).is_empty());
    }

    #[test]
    fn test_nested_combinators() {
        let records = people();
        let query = Query::and(vec![
            Query::or(vec![Query::eq("name", "Ann"), Query::eq("name", "Bob")]),
            Query::text("fast"),
        ]);
        let hits = eval(&query, &records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get("name"), Some(&FieldValue::from("Ann")));
    }
}
