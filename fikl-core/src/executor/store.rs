//! Document store capability.
//!
//! The executor talks to the remote store only through [`DocumentStore`].
//! Remote queries are described by [`RemoteQuery`], which carries the scope,
//! pushed-down filters and orderings, an optional limit and an optional
//! start-after cursor.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ast::{segment_count, Direction, Operator};
use crate::error::StoreResult;

/// A document as returned by the store: its full path and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub path: String,
    pub data: Map<String, Value>,
}

impl DocumentSnapshot {
    pub fn new(path: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// The document fields plus `_path`.
    pub fn to_value(&self) -> Value {
        let mut doc = self.data.clone();
        doc.insert("_path".to_string(), Value::String(self.path.clone()));
        Value::Object(doc)
    }
}

/// Filter operators understood by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemoteOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
}

impl RemoteOperator {
    /// Store wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteOperator::Equal => "==",
            RemoteOperator::NotEqual => "!=",
            RemoteOperator::LessThan => "<",
            RemoteOperator::LessThanOrEqual => "<=",
            RemoteOperator::GreaterThan => ">",
            RemoteOperator::GreaterThanOrEqual => ">=",
            RemoteOperator::In => "in",
            RemoteOperator::NotIn => "not-in",
            RemoteOperator::ArrayContains => "array_contains",
            RemoteOperator::ArrayContainsAny => "array_contains_any",
        }
    }

    /// Remote counterpart of a query operator; `None` for local-only ones.
    pub fn from_operator(operator: Operator) -> Option<Self> {
        Some(match operator {
            Operator::Equal => RemoteOperator::Equal,
            Operator::NotEqual => RemoteOperator::NotEqual,
            Operator::LessThan => RemoteOperator::LessThan,
            Operator::LessThanOrEqual => RemoteOperator::LessThanOrEqual,
            Operator::GreaterThan => RemoteOperator::GreaterThan,
            Operator::GreaterThanOrEqual => RemoteOperator::GreaterThanOrEqual,
            Operator::In => RemoteOperator::In,
            Operator::NotIn => RemoteOperator::NotIn,
            Operator::ArrayContains => RemoteOperator::ArrayContains,
            Operator::ArrayContainsAny => RemoteOperator::ArrayContainsAny,
            Operator::Like => return None,
        })
    }
}

impl fmt::Display for RemoteOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteFilter {
    pub field: String,
    pub operator: RemoteOperator,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteOrder {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    /// Documents directly inside the collection at this path
    Collection(String),
    /// Documents in every collection with this name, at any depth
    CollectionGroup(String),
}

impl QueryScope {
    pub fn name(&self) -> &str {
        match self {
            QueryScope::Collection(path) | QueryScope::CollectionGroup(path) => path,
        }
    }

    /// Whether a document path falls inside this scope.
    pub fn contains(&self, document_path: &str) -> bool {
        let Some((parent, _)) = document_path.rsplit_once('/') else {
            return false;
        };
        match self {
            QueryScope::Collection(path) => parent == path.trim_matches('/'),
            QueryScope::CollectionGroup(name) => {
                parent.rsplit('/').next() == Some(name.as_str())
                    && segment_count(document_path) % 2 == 0
            }
        }
    }
}

/// A query the remote store evaluates: scope, filters, orderings, limit and
/// a start-after cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteQuery {
    pub scope: QueryScope,
    pub filters: Vec<RemoteFilter>,
    pub orders: Vec<RemoteOrder>,
    pub limit: Option<usize>,
    pub start_after: Option<DocumentSnapshot>,
}

impl RemoteQuery {
    pub fn collection(path: impl Into<String>) -> Self {
        Self::scoped(QueryScope::Collection(path.into()))
    }

    pub fn collection_group(name: impl Into<String>) -> Self {
        Self::scoped(QueryScope::CollectionGroup(name.into()))
    }

    fn scoped(scope: QueryScope) -> Self {
        Self {
            scope,
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            start_after: None,
        }
    }

    pub fn where_field(
        mut self,
        field: impl Into<String>,
        operator: RemoteOperator,
        value: Value,
    ) -> Self {
        self.filters.push(RemoteFilter {
            field: field.into(),
            operator,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(RemoteOrder {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: DocumentSnapshot) -> Self {
        self.start_after = Some(cursor);
        self
    }
}

/// Capability the executor needs from a hierarchical document store.
///
/// Calls are blocking and issued one at a time. Implementations report
/// failures as [`StoreError`](crate::error::StoreError).
pub trait DocumentStore {
    /// Run a collection or collection-group query.
    fn fetch(&self, query: &RemoteQuery) -> StoreResult<Vec<DocumentSnapshot>>;

    /// Fetch one document by its full path. A missing document is `Ok(None)`.
    fn get_document(&self, path: &str) -> StoreResult<Option<DocumentSnapshot>>;

    /// Apply a partial update to an existing document.
    fn update(&self, path: &str, patch: &Map<String, Value>) -> StoreResult<()>;

    fn delete(&self, path: &str) -> StoreResult<()>;

    /// Create a document in a collection, returning its full path. Without an
    /// id the store generates one.
    fn create(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Map<String, Value>,
    ) -> StoreResult<String>;

    /// Names of the collections directly under a document, or at the root.
    fn list_collections(&self, parent: Option<&str>) -> StoreResult<Vec<String>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn fetch(&self, query: &RemoteQuery) -> StoreResult<Vec<DocumentSnapshot>> {
        (**self).fetch(query)
    }

    fn get_document(&self, path: &str) -> StoreResult<Option<DocumentSnapshot>> {
        (**self).get_document(path)
    }

    fn update(&self, path: &str, patch: &Map<String, Value>) -> StoreResult<()> {
        (**self).update(path, patch)
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        (**self).delete(path)
    }

    fn create(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Map<String, Value>,
    ) -> StoreResult<String> {
        (**self).create(collection, id, data)
    }

    fn list_collections(&self, parent: Option<&str>) -> StoreResult<Vec<String>> {
        (**self).list_collections(parent)
    }
}
