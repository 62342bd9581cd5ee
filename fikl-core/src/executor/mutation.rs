//! Mutation path: update, delete and insert.
//!
//! Update and delete write each selected record in order. A failed write is
//! logged and recorded in [`MutationOutcome::failed`]; the remaining records
//! are still processed.

use serde::Serialize;
use serde_json::{Map, Value};

use super::helpers::{deep_merge, expand_key};
use super::store::{DocumentSnapshot, DocumentStore};
use crate::ast::{InsertQuery, Setter};
use crate::error::StoreResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// Documents written successfully
    pub count: usize,
    /// Paths whose write failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

/// Merge setters (later wins), expand dotted keys into nested maps and
/// deep-merge the expansions into one document.
pub fn build_patch(setters: &[Setter]) -> Map<String, Value> {
    let mut merged = Map::new();
    for setter in setters {
        merged.insert(setter.property.clone(), setter.value.to_value());
    }

    let mut patch = Map::new();
    for (key, value) in merged {
        deep_merge(&mut patch, expand_key(&key, value));
    }
    patch
}

fn apply_each<F>(records: &[DocumentSnapshot], action: &str, mut write: F) -> MutationOutcome
where
    F: FnMut(&str) -> StoreResult<()>,
{
    let mut outcome = MutationOutcome::default();

    for record in records {
        match write(&record.path) {
            Ok(()) => outcome.count += 1,
            Err(e) => {
                tracing::warn!(path = %record.path, error = %e, "{} failed", action);
                outcome.failed.push(record.path.clone());
            }
        }
    }

    outcome
}

pub fn apply_update<S: DocumentStore>(
    store: &S,
    records: &[DocumentSnapshot],
    patch: &Map<String, Value>,
) -> MutationOutcome {
    apply_each(records, "update", |path| store.update(path, patch))
}

pub fn apply_delete<S: DocumentStore>(store: &S, records: &[DocumentSnapshot]) -> MutationOutcome {
    apply_each(records, "delete", |path| store.delete(path))
}

/// Create one document; returns its path. Failures propagate.
pub fn insert<S: DocumentStore>(store: &S, query: &InsertQuery) -> StoreResult<String> {
    let document = build_patch(&query.set);
    store.create(&query.collection, query.identifier.as_deref(), document)
}
