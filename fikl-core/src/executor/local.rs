//! Local evaluation engine.
//!
//! Runs after the remote phase, in this order: local filter, local sort,
//! projection, grouping, aggregation. Rendering lives in `render`.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{json, Map, Value};

use super::helpers::*;
use super::store::DocumentSnapshot;
use crate::ast::{Direction, Fields, Function, Literal, Operator, OrderBy, WhereClause};
use crate::error::{PlanError, PlanResult};

/// Outcome of the local phase.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalResult {
    Records(Vec<Value>),
    /// Buckets in first-occurrence order
    Grouped(Vec<(String, Vec<Value>)>),
    Count(usize),
}

impl LocalResult {
    pub fn to_value(&self) -> Value {
        match self {
            LocalResult::Records(records) => Value::Array(records.clone()),
            LocalResult::Grouped(buckets) => Value::Object(
                buckets
                    .iter()
                    .map(|(key, records)| (key.clone(), Value::Array(records.clone())))
                    .collect(),
            ),
            LocalResult::Count(n) => json!({ "count": n }),
        }
    }

    /// Flat row sequence, buckets concatenated in bucket order.
    pub fn rows(&self) -> Vec<Value> {
        match self {
            LocalResult::Records(records) => records.clone(),
            LocalResult::Grouped(buckets) => buckets
                .iter()
                .flat_map(|(_, records)| records.iter().cloned())
                .collect(),
            LocalResult::Count(n) => vec![json!({ "count": n })],
        }
    }
}

/// A local where clause ready to test against flattened records.
struct LocalPredicate<'a> {
    clause: &'a WhereClause,
    expected: Value,
    pattern: Option<Regex>,
}

impl<'a> LocalPredicate<'a> {
    fn new(clause: &'a WhereClause) -> PlanResult<Self> {
        let invalid = |reason: String| PlanError::InvalidPattern {
            property: clause.property.clone(),
            reason,
        };
        let pattern = match (&clause.operator, &clause.value) {
            (Operator::Like, Literal::String(p)) => {
                Some(like_regex(p).map_err(|e| invalid(e.to_string()))?)
            }
            (Operator::Like, other) => {
                return Err(invalid(format!("expected a string, found {}", other)))
            }
            _ => None,
        };
        Ok(Self {
            clause,
            expected: clause.value.to_value(),
            pattern,
        })
    }

    fn holds(&self, flat: &Map<String, Value>) -> bool {
        let Some(actual) = flat.get(&self.clause.property) else {
            return false;
        };
        let expected = &self.expected;

        match self.clause.operator {
            Operator::Equal => values_equal(actual, expected),
            Operator::NotEqual => !values_equal(actual, expected),
            Operator::GreaterThan => compare_same_type(actual, expected) == Some(Ordering::Greater),
            Operator::GreaterThanOrEqual => matches!(
                compare_same_type(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::LessThan => compare_same_type(actual, expected) == Some(Ordering::Less),
            Operator::LessThanOrEqual => matches!(
                compare_same_type(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::In => expected
                .as_array()
                .is_some_and(|options| array_contains(options, actual)),
            Operator::NotIn => !expected
                .as_array()
                .is_some_and(|options| array_contains(options, actual)),
            Operator::ArrayContains => actual
                .as_array()
                .is_some_and(|items| array_contains(items, expected)),
            // Every listed value must be present
            Operator::ArrayContainsAny => match (actual.as_array(), expected.as_array()) {
                (Some(items), Some(wanted)) => wanted.iter().all(|w| array_contains(items, w)),
                _ => false,
            },
            Operator::Like => match (actual.as_str(), &self.pattern) {
                (Some(text), Some(re)) => re.is_match(text),
                _ => false,
            },
        }
    }
}

/// Local where clauses, compiled before anything is fetched.
pub struct LocalFilter<'a> {
    predicates: Vec<LocalPredicate<'a>>,
}

impl<'a> LocalFilter<'a> {
    pub fn new(clauses: &[&'a WhereClause]) -> PlanResult<Self> {
        let predicates = clauses
            .iter()
            .map(|clause| LocalPredicate::new(*clause))
            .collect::<PlanResult<Vec<_>>>()?;
        Ok(Self { predicates })
    }

    /// Keep the records for which every clause holds.
    pub fn apply(&self, records: Vec<DocumentSnapshot>) -> Vec<DocumentSnapshot> {
        if self.predicates.is_empty() {
            return records;
        }

        records
            .into_iter()
            .filter(|record| {
                let flat = flatten(&record.data);
                self.predicates.iter().all(|p| p.holds(&flat))
            })
            .collect()
    }
}

/// Stable multi-key sort; the first key that differs decides.
pub fn sort_records(records: &mut [DocumentSnapshot], orders: &[&OrderBy]) {
    if orders.is_empty() {
        return;
    }

    records.sort_by(|left, right| {
        orders
            .iter()
            .map(|order| {
                let a = get_in_map(&left.data, &order.property).unwrap_or(&Value::Null);
                let b = get_in_map(&right.data, &order.property).unwrap_or(&Value::Null);
                let ordering = compare_values(a, b);
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Shape a record for output. Requested fields are emitted under the name
/// they were requested by; absent ones are null.
pub fn project(record: &DocumentSnapshot, fields: &Fields) -> Value {
    let document = record.to_value();
    match fields {
        Fields::All => document,
        Fields::List(names) => Value::Object(
            names
                .iter()
                .map(|name| {
                    let value = get_field(&document, name).cloned().unwrap_or(Value::Null);
                    (name.clone(), value)
                })
                .collect(),
        ),
    }
}

fn group_label(key: Option<&Value>) -> String {
    match key {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

/// Bucket projected records by the group property of their source document.
///
/// Buckets are keyed by value; a missing property and an explicit null share
/// the `null` bucket. A string whose label clashes with another bucket's
/// (the string `"null"` next to the null bucket, `"1"` next to `1`) is
/// labelled with its quoted JSON form.
pub fn group_records(
    records: &[DocumentSnapshot],
    projected: Vec<Value>,
    property: &str,
) -> Vec<(String, Vec<Value>)> {
    let mut buckets: Vec<(Option<Value>, Vec<Value>)> = Vec::new();

    for (record, value) in records.iter().zip(projected) {
        let document = record.to_value();
        let key = get_field(&document, property)
            .filter(|v| !v.is_null())
            .cloned();
        let existing = buckets.iter_mut().find(|(k, _)| match (k, &key) {
            (Some(a), Some(b)) => values_equal(a, b),
            (None, None) => true,
            _ => false,
        });
        match existing {
            Some((_, bucket)) => bucket.push(value),
            None => buckets.push((key, vec![value])),
        }
    }

    let labels: Vec<String> = buckets.iter().map(|(k, _)| group_label(k.as_ref())).collect();

    buckets
        .into_iter()
        .enumerate()
        .map(|(i, (key, rows))| {
            let clashes = labels
                .iter()
                .enumerate()
                .any(|(j, label)| j != i && *label == labels[i]);
            let label = match &key {
                Some(quoted @ Value::String(_)) if clashes => quoted.to_string(),
                _ => labels[i].clone(),
            };
            (label, rows)
        })
        .collect()
}

/// Order-preserving de-duplication by full value.
pub fn distinct(values: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.iter().any(|seen| values_equal(seen, &value)) {
            unique.push(value);
        }
    }
    unique
}

/// The select-specific part of the local phase, after filtering and sorting.
pub fn shape(
    records: &[DocumentSnapshot],
    fields: &Fields,
    group: Option<&str>,
    function: Option<Function>,
) -> LocalResult {
    let projected: Vec<Value> = records.iter().map(|r| project(r, fields)).collect();

    let result = match group {
        Some(property) => LocalResult::Grouped(group_records(records, projected, property)),
        None => LocalResult::Records(projected),
    };

    match function {
        None => result,
        Some(Function::Count) => LocalResult::Count(match &result {
            LocalResult::Records(records) => records.len(),
            LocalResult::Grouped(buckets) => buckets.len(),
            LocalResult::Count(n) => *n,
        }),
        Some(Function::Distinct) => match result {
            LocalResult::Records(records) => LocalResult::Records(distinct(records)),
            LocalResult::Grouped(buckets) => LocalResult::Grouped(
                buckets
                    .into_iter()
                    .map(|(key, records)| (key, distinct(records)))
                    .collect(),
            ),
            count => count,
        },
    }
}
