//! FIKL Mutation Tests
//!
//! Tests for update, delete and insert statements.

mod common;

use common::*;
use fikl_core::{
    InMemoryStore, MutationOutcome, PlanError, QueryError, QueryExecutor, QueryOutput, StoreError,
};
use serde_json::json;

fn mutated(count: usize) -> QueryOutput {
    QueryOutput::Mutated(MutationOutcome {
        count,
        failed: Vec::new(),
    })
}

#[test]
fn test_update_creates_nested_map() {
    let executor = QueryExecutor::new(create_numbered_store());
    let output = execute(&executor, "update from c set a.b = 1, \"a.c\" = 2 where n == 1");
    assert_eq!(output, mutated(1));
    assert_eq!(
        executor.store().document("c/doc0000").unwrap(),
        json!({"n": 1, "a": {"b": 1, "c": 2}})
    );
    assert_eq!(
        executor.store().document("c/doc0001").unwrap(),
        json!({"n": 2})
    );
}

#[test]
fn test_update_keeps_sibling_fields() {
    let store = InMemoryStore::new();
    store
        .insert("c/x", json!({"a": {"z": 9}, "keep": true}))
        .unwrap();
    let executor = QueryExecutor::new(store);

    execute(&executor, "update at \"c/x\" set a.b = \"new\"");
    assert_eq!(
        executor.store().document("c/x").unwrap(),
        json!({"a": {"z": 9, "b": "new"}, "keep": true})
    );
}

#[test]
fn test_update_every_matching_record() {
    let executor = QueryExecutor::new(create_seeded_store());
    let output = execute(&executor, "update from users set active = false where dept == \"eng\"");
    assert_eq!(output, mutated(2));
    assert_eq!(executor.store().stats().updates(), 2);
    assert_eq!(executor.store().document("users/bob").unwrap()["active"], false);
    assert!(executor.store().document("users/charlie").unwrap()["active"].is_null());
}

#[test]
fn test_update_without_where_is_rejected_before_store() {
    let executor = QueryExecutor::new(create_numbered_store());
    let err = execute_expect_err(&executor, "update from \"C\" set x = 1");
    assert!(matches!(err, QueryError::Syntax(_)));

    let stats = executor.store().stats();
    assert_eq!(stats.fetches(), 0);
    assert_eq!(stats.gets(), 0);
    assert_eq!(stats.updates(), 0);
}

#[test]
fn test_update_document_with_where_is_local() {
    let executor = QueryExecutor::new(create_numbered_store());
    let output = execute(&executor, "update at \"c/doc0000\" set x = 1 where n == 2");
    assert_eq!(output, mutated(0));
    assert_eq!(executor.store().stats().updates(), 0);

    let output = execute(&executor, "update at \"c/doc0000\" set x = 1 where n == 1");
    assert_eq!(output, mutated(1));
}

#[test]
fn test_delete_with_no_matches() {
    let executor = QueryExecutor::new(create_numbered_store());
    let output = execute(&executor, "delete from c where n > 100");
    assert_eq!(output, mutated(0));
    assert_eq!(executor.store().stats().deletes(), 0);
    assert_eq!(executor.store().len(), 5);
}

#[test]
fn test_delete_matching_records() {
    let executor = QueryExecutor::new(create_numbered_store());
    let output = execute(&executor, "delete from c where n^ >= 4");
    assert_eq!(output, mutated(2));
    assert_eq!(executor.store().len(), 3);

    let output = execute(&executor, "delete at \"c/doc0000\"");
    assert_eq!(output, mutated(1));
    assert!(executor.store().document("c/doc0000").is_none());
}

#[test]
fn test_delete_requires_where_on_collection() {
    let executor = QueryExecutor::new(create_numbered_store());
    let err = execute_expect_err(&executor, "delete from c");
    assert!(matches!(err, QueryError::Syntax(_)));
    assert_eq!(executor.store().len(), 5);
}

#[test]
fn test_failed_writes_are_reported() {
    let store = create_numbered_store();
    store.fail_writes_to("c/doc0001");
    let executor = QueryExecutor::new(store);

    let output = execute(&executor, "delete from c where n > 0");
    assert_eq!(
        output,
        QueryOutput::Mutated(MutationOutcome {
            count: 4,
            failed: vec!["c/doc0001".to_string()],
        })
    );
    assert_eq!(executor.store().len(), 1);
}

#[test]
fn test_insert_with_identifier() {
    let executor = QueryExecutor::new(create_seeded_store());
    let output = execute(
        &executor,
        "insert into users set name = \"Eve\", address.city = \"Oslo\" identified by \"eve\"",
    );
    assert_eq!(output, mutated(1));
    assert_eq!(
        executor.store().document("users/eve").unwrap(),
        json!({"name": "Eve", "address": {"city": "Oslo"}})
    );

    let err = execute_expect_err(
        &executor,
        "insert into users set name = \"Eve\" identified by \"eve\"",
    );
    assert!(matches!(err, QueryError::Store(StoreError::AlreadyExists(_))));
}

#[test]
fn test_insert_generates_identifier() {
    let executor = QueryExecutor::new(InMemoryStore::new());
    execute(&executor, "insert into users set name = \"Ann\"");
    execute(&executor, "insert into users set name = \"Ann\"");
    assert_eq!(executor.store().len(), 2);

    let records = execute_documents(&executor, "select name from users");
    assert_eq!(names(&records), vec!["Ann", "Ann"]);
}

#[test]
fn test_insert_into_sub_collection_and_numeric_id() {
    let executor = QueryExecutor::new(create_seeded_store());
    execute(
        &executor,
        "insert into \"users/bob/posts\" set title = \"Again\" identified by 42",
    );
    assert!(executor.store().document("users/bob/posts/42").is_some());
}

#[test]
fn test_insert_into_document_path_is_rejected() {
    let executor = QueryExecutor::new(create_seeded_store());
    let err = execute_expect_err(&executor, "insert into \"users/bob\" set x = 1");
    assert!(matches!(err, QueryError::Plan(PlanError::UnsupportedSubject(_))));
    assert_eq!(executor.store().stats().creates(), 0);
}
