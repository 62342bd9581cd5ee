//! In-process [`DocumentStore`].
//!
//! Documents live in a path-ordered map. Queries follow the remote store's
//! rules: documents missing a filtered or ordered field are excluded,
//! `array_contains_any` matches any listed value, results are ordered by the
//! requested fields then by path, and a start-after cursor resumes strictly
//! after the cursor's position in that order.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::helpers::{
    array_contains, compare_same_type, compare_values, deep_merge, get_in_map, values_equal,
};
use super::store::{
    DocumentSnapshot, DocumentStore, RemoteFilter, RemoteOperator, RemoteOrder, RemoteQuery,
};
use crate::ast::{segment_count, Direction};
use crate::error::{StoreError, StoreResult};

/// Call counters, for asserting how the executor used the store.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub fetches: AtomicUsize,
    pub gets: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub creates: AtomicUsize,
}

impl StoreStats {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

/// One `fetch` call: the query as received and how many documents it returned.
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub query: RemoteQuery,
    pub returned: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<String, Map<String, Value>>>,
    failing_paths: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    history: Mutex<Vec<FetchRecord>>,
    stats: StoreStats,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document at a full path, replacing any existing one.
    pub fn insert(&self, path: &str, document: Value) -> StoreResult<()> {
        let path = path.trim_matches('/');
        if segment_count(path) % 2 != 0 {
            return Err(StoreError::Rejected(format!(
                "'{}' is not a document path",
                path
            )));
        }
        let Value::Object(data) = document else {
            return Err(StoreError::Rejected(format!(
                "document at '{}' must be an object",
                path
            )));
        };
        self.documents.write().insert(path.to_string(), data);
        Ok(())
    }

    /// Seed a collection. Document ids are `doc0000`, `doc0001`, ... in
    /// the given order.
    pub fn add_collection(&self, collection: &str, documents: Vec<Value>) -> StoreResult<()> {
        let collection = collection.trim_matches('/');
        for (i, document) in documents.into_iter().enumerate() {
            self.insert(&format!("{}/doc{:04}", collection, i), document)?;
        }
        Ok(())
    }

    /// Current contents of a document, without `_path`.
    pub fn document(&self, path: &str) -> Option<Value> {
        self.documents
            .read()
            .get(path.trim_matches('/'))
            .cloned()
            .map(Value::Object)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Make writes to `path` fail with [`StoreError::Unavailable`].
    pub fn fail_writes_to(&self, path: &str) {
        self.failing_paths
            .write()
            .insert(path.trim_matches('/').to_string());
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn fetch_history(&self) -> Vec<FetchRecord> {
        self.history.lock().clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, path: &str) -> StoreResult<()> {
        self.check_available()?;
        if self.failing_paths.read().contains(path) {
            return Err(StoreError::Unavailable(format!("write to '{}' failed", path)));
        }
        Ok(())
    }
}

fn matches_filter(data: &Map<String, Value>, filter: &RemoteFilter) -> bool {
    let Some(actual) = get_in_map(data, &filter.field) else {
        return false;
    };
    let expected = &filter.value;

    match filter.operator {
        RemoteOperator::Equal => values_equal(actual, expected),
        RemoteOperator::NotEqual => !values_equal(actual, expected),
        RemoteOperator::LessThan => compare_same_type(actual, expected) == Some(CmpOrdering::Less),
        RemoteOperator::LessThanOrEqual => matches!(
            compare_same_type(actual, expected),
            Some(CmpOrdering::Less | CmpOrdering::Equal)
        ),
        RemoteOperator::GreaterThan => {
            compare_same_type(actual, expected) == Some(CmpOrdering::Greater)
        }
        RemoteOperator::GreaterThanOrEqual => matches!(
            compare_same_type(actual, expected),
            Some(CmpOrdering::Greater | CmpOrdering::Equal)
        ),
        RemoteOperator::In => expected
            .as_array()
            .is_some_and(|options| array_contains(options, actual)),
        RemoteOperator::NotIn => expected
            .as_array()
            .is_some_and(|options| !array_contains(options, actual)),
        RemoteOperator::ArrayContains => actual
            .as_array()
            .is_some_and(|items| array_contains(items, expected)),
        RemoteOperator::ArrayContainsAny => match (actual.as_array(), expected.as_array()) {
            (Some(items), Some(wanted)) => wanted.iter().any(|w| array_contains(items, w)),
            _ => false,
        },
    }
}

fn compare_positions(
    orders: &[RemoteOrder],
    left: (&str, &Map<String, Value>),
    right: (&str, &Map<String, Value>),
) -> CmpOrdering {
    for order in orders {
        let a = get_in_map(left.1, &order.field).unwrap_or(&Value::Null);
        let b = get_in_map(right.1, &order.field).unwrap_or(&Value::Null);
        let ordering = match order.direction {
            Direction::Asc => compare_values(a, b),
            Direction::Desc => compare_values(b, a),
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    left.0.cmp(right.0)
}

impl DocumentStore for InMemoryStore {
    fn fetch(&self, query: &RemoteQuery) -> StoreResult<Vec<DocumentSnapshot>> {
        self.stats.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let documents = self.documents.read();
        let mut matched: Vec<(&String, &Map<String, Value>)> = documents
            .iter()
            .filter(|(path, _)| query.scope.contains(path))
            .filter(|(_, data)| query.filters.iter().all(|f| matches_filter(data, f)))
            .filter(|(_, data)| {
                query
                    .orders
                    .iter()
                    .all(|o| get_in_map(data, &o.field).is_some())
            })
            .collect();

        matched.sort_by(|a, b| compare_positions(&query.orders, (a.0, a.1), (b.0, b.1)));

        if let Some(cursor) = &query.start_after {
            let cursor_position = (cursor.path.as_str(), &cursor.data);
            matched.retain(|(path, data)| {
                compare_positions(&query.orders, (path.as_str(), data), cursor_position)
                    == CmpOrdering::Greater
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        let snapshots: Vec<DocumentSnapshot> = matched
            .into_iter()
            .map(|(path, data)| DocumentSnapshot::new(path.clone(), data.clone()))
            .collect();

        tracing::trace!(
            scope = query.scope.name(),
            returned = snapshots.len(),
            "in-memory fetch"
        );

        self.history.lock().push(FetchRecord {
            query: query.clone(),
            returned: snapshots.len(),
        });

        Ok(snapshots)
    }

    fn get_document(&self, path: &str) -> StoreResult<Option<DocumentSnapshot>> {
        self.stats.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let path = path.trim_matches('/');
        Ok(self
            .documents
            .read()
            .get(path)
            .map(|data| DocumentSnapshot::new(path, data.clone())))
    }

    fn update(&self, path: &str, patch: &Map<String, Value>) -> StoreResult<()> {
        self.stats.updates.fetch_add(1, Ordering::SeqCst);
        let path = path.trim_matches('/');
        self.check_writable(path)?;

        let mut documents = self.documents.write();
        let document = documents
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        deep_merge(document, patch.clone());
        Ok(())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        self.stats.deletes.fetch_add(1, Ordering::SeqCst);
        let path = path.trim_matches('/');
        self.check_writable(path)?;

        self.documents.write().remove(path);
        Ok(())
    }

    fn create(
        &self,
        collection: &str,
        id: Option<&str>,
        data: Map<String, Value>,
    ) -> StoreResult<String> {
        self.stats.creates.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let collection = collection.trim_matches('/');
        if collection.is_empty() || segment_count(collection) % 2 == 0 {
            return Err(StoreError::Rejected(format!(
                "'{}' is not a collection path",
                collection
            )));
        }

        let id = match id {
            Some(id) if id.is_empty() || id.contains('/') => {
                return Err(StoreError::Rejected(format!("invalid document id '{}'", id)))
            }
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };
        let path = format!("{}/{}", collection, id);
        self.check_writable(&path)?;

        let mut documents = self.documents.write();
        if documents.contains_key(&path) {
            return Err(StoreError::AlreadyExists(path));
        }
        documents.insert(path.clone(), data);
        Ok(path)
    }

    fn list_collections(&self, parent: Option<&str>) -> StoreResult<Vec<String>> {
        self.check_available()?;

        let prefix = parent
            .map(|p| format!("{}/", p.trim_matches('/')))
            .unwrap_or_default();

        let names: BTreeSet<String> = self
            .documents
            .read()
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .add_collection(
                "users",
                vec![
                    json!({"name": "Ann", "age": 31, "tags": ["a", "b"]}),
                    json!({"name": "Bob", "age": 25, "tags": ["a"]}),
                    json!({"name": "Cid", "tags": []}),
                ],
            )
            .unwrap();
        store
            .insert("users/doc0000/posts/p1", json!({"title": "hi"}))
            .unwrap();
        store
    }

    fn names(snapshots: &[DocumentSnapshot]) -> Vec<&str> {
        snapshots
            .iter()
            .map(|s| s.data["name"].as_str().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_fetch_scope_and_filters() {
        let store = seeded();
        let all = store.fetch(&RemoteQuery::collection("users")).unwrap();
        assert_eq!(all.len(), 3);

        let query = RemoteQuery::collection("users").where_field(
            "age",
            RemoteOperator::GreaterThan,
            json!(26),
        );
        assert_eq!(names(&store.fetch(&query).unwrap()), vec!["Ann"]);

        // Missing field excludes the document even for not-equal
        let query =
            RemoteQuery::collection("users").where_field("age", RemoteOperator::NotEqual, json!(1));
        assert_eq!(store.fetch(&query).unwrap().len(), 2);

        let query = RemoteQuery::collection("users").where_field(
            "tags",
            RemoteOperator::ArrayContainsAny,
            json!(["b", "z"]),
        );
        assert_eq!(names(&store.fetch(&query).unwrap()), vec!["Ann"]);
    }

    #[test]
    fn test_fetch_order_limit_and_cursor() {
        let store = seeded();
        let query = RemoteQuery::collection("users")
            .order_by("age", Direction::Asc)
            .limit(1);
        let first = store.fetch(&query).unwrap();
        assert_eq!(names(&first), vec!["Bob"]);

        let next = store
            .fetch(&query.clone().start_after(first[0].clone()))
            .unwrap();
        assert_eq!(names(&next), vec!["Ann"]);

        let last = store.fetch(&query.start_after(next[0].clone())).unwrap();
        assert!(last.is_empty());
        assert_eq!(store.stats().fetches(), 3);
        assert_eq!(store.fetch_history()[0].returned, 1);
    }

    #[test]
    fn test_collection_group() {
        let store = seeded();
        store.insert("groups/g1/posts/p2", json!({"title": "yo"})).unwrap();
        let posts = store.fetch(&RemoteQuery::collection_group("posts")).unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn test_writes() {
        let store = seeded();
        let patch = json!({"address": {"city": "Oslo"}}).as_object().cloned().unwrap();
        store.update("users/doc0001", &patch).unwrap();
        assert_eq!(store.document("users/doc0001").unwrap()["address"]["city"], "Oslo");

        assert_eq!(
            store.update("users/missing", &patch),
            Err(StoreError::NotFound("users/missing".to_string()))
        );

        let path = store.create("users", Some("zed"), Map::new()).unwrap();
        assert_eq!(path, "users/zed");
        assert!(matches!(
            store.create("users", Some("zed"), Map::new()),
            Err(StoreError::AlreadyExists(_))
        ));
        let generated = store.create("users", None, Map::new()).unwrap();
        assert!(generated.starts_with("users/"));

        store.delete("users/zed").unwrap();
        assert!(store.document("users/zed").is_none());

        store.fail_writes_to("users/doc0000");
        assert!(store.delete("users/doc0000").is_err());
        assert!(store.document("users/doc0000").is_some());
    }

    #[test]
    fn test_list_collections() {
        let store = seeded();
        store.insert("groups/g1", json!({})).unwrap();
        assert_eq!(store.list_collections(None).unwrap(), vec!["groups", "users"]);
        assert_eq!(
            store.list_collections(Some("users/doc0000")).unwrap(),
            vec!["posts"]
        );
        assert!(store.list_collections(Some("users/doc0001")).unwrap().is_empty());
    }

    #[test]
    fn test_unavailable() {
        let store = seeded();
        store.set_unavailable(true);
        assert!(matches!(
            store.fetch(&RemoteQuery::collection("users")),
            Err(StoreError::Unavailable(_))
        ));
    }
}
