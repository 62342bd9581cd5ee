//! Selection planning and the remote phase.
//!
//! A [`SelectionPlan`] splits where and order clauses into the part pushed to
//! the store and the part evaluated locally, and picks exactly one fetch
//! strategy. [`SelectionPlan::fetch`] then runs the remote phase.

use serde::Serialize;

use super::store::{DocumentSnapshot, DocumentStore, RemoteOperator, RemoteQuery};
use super::QueryLimits;
use crate::ast::{segment_count, OrderBy, ShowQuery, Subject, SubjectType, WhereClause};
use crate::error::{FiklResult, PlanError, PlanResult, QueryError};

/// How the remote phase retrieves records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "size", rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Direct read of a single document
    Document,
    /// One fetch capped at the limit
    Limited(usize),
    /// Batches of this size, each starting after the previous batch
    Paged(usize),
    /// One fetch with no cap
    Unbounded,
}

#[derive(Debug, Clone)]
pub struct SelectionPlan<'q> {
    pub subject: &'q Subject,
    pub remote_filters: Vec<&'q WhereClause>,
    pub local_filters: Vec<&'q WhereClause>,
    pub remote_orders: Vec<&'q OrderBy>,
    pub local_orders: Vec<&'q OrderBy>,
    pub strategy: FetchStrategy,
}

impl<'q> SelectionPlan<'q> {
    pub fn new(
        subject: &'q Subject,
        where_clauses: &'q [WhereClause],
        order: &'q [OrderBy],
        limit: Option<usize>,
        page: Option<usize>,
    ) -> PlanResult<Self> {
        if subject.kind == SubjectType::Document {
            // A single read cannot be filtered remotely
            return Ok(Self {
                subject,
                remote_filters: Vec::new(),
                local_filters: where_clauses.iter().collect(),
                remote_orders: Vec::new(),
                local_orders: Vec::new(),
                strategy: FetchStrategy::Document,
            });
        }

        if subject.kind == SubjectType::Collection && segment_count(&subject.path) % 2 == 0 {
            return Err(PlanError::UnsupportedSubject(format!(
                "'{}' is a document path, not a collection",
                subject.path
            )));
        }

        let (local_filters, remote_filters): (Vec<_>, Vec<_>) =
            where_clauses.iter().partition(|w| w.local);

        if let Some(clause) = remote_filters
            .iter()
            .find(|w| RemoteOperator::from_operator(w.operator).is_none())
        {
            return Err(PlanError::LocalOnlyOperator {
                property: clause.property.clone(),
                operator: clause.operator.symbol().to_string(),
            });
        }

        let (local_orders, remote_orders): (Vec<&OrderBy>, Vec<&OrderBy>) =
            order.iter().partition(|o| o.local);
        // One local key re-sorts by the whole list so precedence stays left to right
        let local_orders = if local_orders.is_empty() {
            local_orders
        } else {
            order.iter().collect()
        };

        let strategy = match (limit, page) {
            (Some(limit), _) => FetchStrategy::Limited(limit),
            (None, Some(page)) => FetchStrategy::Paged(page),
            (None, None) => FetchStrategy::Unbounded,
        };

        Ok(Self {
            subject,
            remote_filters,
            local_filters,
            remote_orders,
            local_orders,
            strategy,
        })
    }

    /// The base remote query with pushed-down filters and orderings.
    pub fn remote_query(&self) -> PlanResult<RemoteQuery> {
        let mut query = match self.subject.kind {
            SubjectType::Collection => RemoteQuery::collection(self.subject.path.clone()),
            SubjectType::CollectionGroup => {
                RemoteQuery::collection_group(self.subject.path.clone())
            }
            SubjectType::Document => {
                return Err(PlanError::UnsupportedSubject(format!(
                    "'{}' is a document and cannot be queried",
                    self.subject.path
                )))
            }
        };

        for clause in &self.remote_filters {
            let operator = RemoteOperator::from_operator(clause.operator).ok_or_else(|| {
                PlanError::LocalOnlyOperator {
                    property: clause.property.clone(),
                    operator: clause.operator.symbol().to_string(),
                }
            })?;
            query = query.where_field(clause.property.clone(), operator, clause.value.to_value());
        }

        for order in &self.remote_orders {
            query = query.order_by(order.property.clone(), order.direction);
        }

        Ok(query)
    }

    /// Run the remote phase.
    pub fn fetch<S: DocumentStore>(
        &self,
        store: &S,
        limits: &QueryLimits,
    ) -> FiklResult<Vec<DocumentSnapshot>> {
        if self.strategy == FetchStrategy::Document {
            tracing::debug!(path = %self.subject.path, "fetching single document");
            // A missing document is an empty result
            return Ok(store
                .get_document(&self.subject.path)?
                .into_iter()
                .collect());
        }

        let base = self.remote_query()?;
        tracing::debug!(
            scope = base.scope.name(),
            filters = base.filters.len(),
            orders = base.orders.len(),
            strategy = ?self.strategy,
            "running remote query"
        );

        let records = match self.strategy {
            FetchStrategy::Limited(limit) => {
                let records = store.fetch(&base.limit(limit))?;
                check_limit(records.len(), limits)?;
                records
            }
            FetchStrategy::Paged(size) => fetch_pages(store, &base, size, limits)?,
            FetchStrategy::Unbounded | FetchStrategy::Document => {
                let records = store.fetch(&base)?;
                check_limit(records.len(), limits)?;
                records
            }
        };

        Ok(records)
    }
}

/// Collection an insert writes to; a document path is rejected.
pub fn insert_target(collection: &str) -> PlanResult<&str> {
    if collection.is_empty() || segment_count(collection) % 2 == 0 {
        return Err(PlanError::UnsupportedSubject(format!(
            "cannot insert into '{}', it is not a collection path",
            collection
        )));
    }
    Ok(collection)
}

/// Where `show collections` looks for sub-collections.
#[derive(Debug)]
pub enum ShowTarget<'q> {
    /// Top-level collections
    Root,
    /// Sub-collections of one document
    Document(&'q str),
    /// Sub-collections found under every document the plan selects
    Children(SelectionPlan<'q>),
}

pub fn show_target(query: &ShowQuery) -> PlanResult<ShowTarget<'_>> {
    match &query.subject {
        None => Ok(ShowTarget::Root),
        Some(subject) if subject.kind == SubjectType::Document => {
            Ok(ShowTarget::Document(&subject.path))
        }
        Some(subject) => Ok(ShowTarget::Children(SelectionPlan::new(
            subject,
            &[],
            &[],
            None,
            None,
        )?)),
    }
}

fn check_limit(fetched: usize, limits: &QueryLimits) -> FiklResult<()> {
    if fetched > limits.max_documents {
        return Err(QueryError::LimitExceeded {
            fetched,
            max: limits.max_documents,
        });
    }
    Ok(())
}

/// Cursor pagination: each batch starts after the last record of the
/// previous one; a short or empty batch ends the loop.
fn fetch_pages<S: DocumentStore>(
    store: &S,
    base: &RemoteQuery,
    size: usize,
    limits: &QueryLimits,
) -> FiklResult<Vec<DocumentSnapshot>> {
    let mut records = Vec::new();
    let mut cursor: Option<DocumentSnapshot> = None;
    let mut batches = 0usize;

    loop {
        let mut query = base.clone().limit(size);
        if let Some(last) = cursor.take() {
            query = query.start_after(last);
        }

        let batch = store.fetch(&query)?;
        batches += 1;
        let short = batch.len() < size;
        tracing::debug!(batch = batches, returned = batch.len(), "fetched page");

        cursor = batch.last().cloned();
        records.extend(batch);
        check_limit(records.len(), limits)?;

        if short {
            break;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Direction, Literal, Operator};

    fn clause(property: &str, operator: Operator, local: bool) -> WhereClause {
        WhereClause {
            property: property.to_string(),
            operator,
            value: Literal::Integer(1),
            local,
        }
    }

    #[test]
    fn test_partition() {
        let subject = Subject::collection("users");
        let wheres = vec![
            clause("a", Operator::Equal, false),
            clause("b", Operator::GreaterThan, true),
            clause("c", Operator::NotIn, false),
        ];
        let order = vec![
            OrderBy {
                property: "a".to_string(),
                direction: Direction::Desc,
                local: false,
            },
            OrderBy {
                property: "b".to_string(),
                direction: Direction::Asc,
                local: true,
            },
        ];
        let plan = SelectionPlan::new(&subject, &wheres, &order, None, None).unwrap();
        assert_eq!(plan.remote_filters.len(), 2);
        assert_eq!(plan.local_filters.len(), 1);
        assert_eq!(plan.remote_orders.len(), 1);
        assert_eq!(plan.remote_orders[0].property, "a");
        let local: Vec<&str> = plan.local_orders.iter().map(|o| o.property.as_str()).collect();
        assert_eq!(local, vec!["a", "b"]);
        assert_eq!(plan.strategy, FetchStrategy::Unbounded);

        let query = plan.remote_query().unwrap();
        assert_eq!(query.filters[1].operator.as_str(), "not-in");
        assert_eq!(query.orders[0].direction, Direction::Desc);
    }

    #[test]
    fn test_remote_like_is_plan_error() {
        let subject = Subject::collection("users");
        let wheres = vec![clause("name", Operator::Like, false)];
        let err = SelectionPlan::new(&subject, &wheres, &[], None, None).unwrap_err();
        assert!(matches!(err, PlanError::LocalOnlyOperator { .. }));
    }

    #[test]
    fn test_strategy_selection() {
        let subject = Subject::collection("users");
        let plan = SelectionPlan::new(&subject, &[], &[], Some(5), Some(2)).unwrap();
        assert_eq!(plan.strategy, FetchStrategy::Limited(5));
        let plan = SelectionPlan::new(&subject, &[], &[], None, Some(2)).unwrap();
        assert_eq!(plan.strategy, FetchStrategy::Paged(2));

        let doc = Subject::document("users/u1");
        let wheres = vec![clause("a", Operator::Equal, false)];
        let plan = SelectionPlan::new(&doc, &wheres, &[], Some(5), None).unwrap();
        assert_eq!(plan.strategy, FetchStrategy::Document);
        assert_eq!(plan.local_filters.len(), 1);
    }

    #[test]
    fn test_document_path_as_collection_rejected() {
        let subject = Subject::collection("users/u1");
        assert!(matches!(
            SelectionPlan::new(&subject, &[], &[], None, None),
            Err(PlanError::UnsupportedSubject(_))
        ));
    }

    #[test]
    fn test_show_targets() {
        let root = ShowQuery { subject: None };
        assert!(matches!(show_target(&root), Ok(ShowTarget::Root)));

        let doc = ShowQuery {
            subject: Some(Subject::document("users/u1")),
        };
        assert!(matches!(show_target(&doc), Ok(ShowTarget::Document("users/u1"))));

        let group = ShowQuery {
            subject: Some(Subject::collection_group("posts")),
        };
        match show_target(&group) {
            Ok(ShowTarget::Children(plan)) => assert_eq!(plan.strategy, FetchStrategy::Unbounded),
            other => panic!("unexpected {:?}", other),
        }
    }
}
