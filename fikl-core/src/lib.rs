//! FIKL Core - Storage-independent FIKL query language parser and executor.
//!
//! FIKL queries a hierarchical document store (collections, sub-collections,
//! documents). This crate parses query text into a canonical [`Query`],
//! plans which predicates and orderings are pushed to the store, and
//! evaluates the rest locally. The store itself is reached only through the
//! [`DocumentStore`] trait.
//!
//! # Main Components
//!
//! - **Lexer / Parser**: query text to a positioned parse tree
//! - **Transformer**: parse tree to the canonical [`Query`], enforcing the
//!   statement rules
//! - **Executor**: remote phase (pushdown, cursor pagination) and local phase
//!   (filter, sort, projection, grouping, aggregation, rendering)
//!
//! # Example
//!
//! ```rust
//! use fikl_core::{InMemoryStore, QueryExecutor, QueryOutput};
//! use serde_json::json;
//!
//! let store = InMemoryStore::new();
//! store.insert("users/ann", json!({"name": "Ann", "age": 31})).unwrap();
//! store.insert("users/bob", json!({"name": "Bob", "age": 25})).unwrap();
//!
//! let executor = QueryExecutor::new(store);
//! let output = executor.execute("select name from users where age > 26").unwrap();
//! assert_eq!(output, QueryOutput::Documents(json!([{"name": "Ann"}])));
//! ```

pub mod ast;
pub mod error;
pub mod executor;
pub mod lexer;
mod literal;
pub mod parser;
mod transformer;
pub mod tree;

// Re-export main types for convenience
pub use ast::{
    Direction, Fields, Format, Function, Literal, Operator, OrderBy, OutputKind, OutputSpec,
    Query, SelectQuery, Setter, Subject, SubjectType, WhereClause,
};
pub use error::{
    FiklResult, PlanError, Position, QueryError, SinkError, StoreError, StoreResult, SyntaxError,
    SyntaxResult,
};
pub use executor::{
    DocumentSnapshot, DocumentStore, InMemoryStore, MemorySink, MutationOutcome, OutputSink,
    QueryExecutor, QueryExplain, QueryLimits, QueryOutput, RemoteOperator, RemoteQuery, SinkTarget,
};
pub use lexer::{Lexer, Token};
pub use parser::{parse, Parser};
pub use transformer::transform;
