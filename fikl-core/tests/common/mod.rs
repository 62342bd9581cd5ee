//! Common test utilities for FIKL tests
//!
//! Provides shared helpers for:
//! - Seeding in-memory stores
//! - Executing queries and unwrapping their outputs

#![allow(dead_code)]

use fikl_core::{InMemoryStore, QueryError, QueryExecutor, QueryOutput};
use serde_json::{json, Value};

pub fn create_seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert(
            "users/alice",
            json!({"name": "Alice", "age": 30, "dept": "eng", "tags": ["admin", "ops"]}),
        )
        .unwrap();
    store
        .insert(
            "users/bob",
            json!({"name": "Bob", "age": 25, "dept": "eng", "tags": ["dev"]}),
        )
        .unwrap();
    store
        .insert(
            "users/charlie",
            json!({"name": "Charlie", "age": 35, "dept": "sales", "tags": []}),
        )
        .unwrap();
    store
        .insert(
            "users/diana",
            json!({"name": "Diana", "age": 28, "dept": "marketing", "tags": ["ops"]}),
        )
        .unwrap();

    store
        .insert("users/alice/posts/p1", json!({"title": "Hello", "likes": 3}))
        .unwrap();
    store
        .insert("users/bob/posts/p2", json!({"title": "World", "likes": 7}))
        .unwrap();
    store
}

/// Five records in collection `c`, ids doc0000..doc0004.
pub fn create_numbered_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .add_collection("c", (1..=5).map(|n| json!({"n": n})).collect())
        .unwrap();
    store
}

pub fn execute(executor: &QueryExecutor<InMemoryStore>, text: &str) -> QueryOutput {
    executor
        .execute(text)
        .unwrap_or_else(|e| panic!("Query failed: {}: {}", text, e))
}

pub fn execute_documents(executor: &QueryExecutor<InMemoryStore>, text: &str) -> Vec<Value> {
    match execute(executor, text) {
        QueryOutput::Documents(Value::Array(items)) => items,
        other => panic!("Expected a document list for {}, got {:?}", text, other),
    }
}

pub fn execute_expect_err(executor: &QueryExecutor<InMemoryStore>, text: &str) -> QueryError {
    executor
        .execute(text)
        .expect_err(&format!("Expected failure: {}", text))
}

pub fn names(records: &[Value]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r["name"].as_str().unwrap_or_default())
        .collect()
}
