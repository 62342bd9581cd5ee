//! Query explanation.
//!
//! Reports how a statement would run: which clauses go to the store, which
//! are evaluated locally and how records are fetched. Nothing touches the
//! store.

use serde::{Deserialize, Serialize};

use super::local::LocalFilter;
use super::planner::{insert_target, show_target, FetchStrategy, SelectionPlan, ShowTarget};
use crate::ast::*;
use crate::error::FiklResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterInfo {
    pub property: String,
    pub operator: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortInfo {
    pub property: String,
    pub direction: String,
}

/// Execution plan of one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryExplain {
    pub statement: String,
    pub subject: Option<String>,
    pub subject_type: SubjectType,
    pub remote_filters: Vec<FilterInfo>,
    pub local_filters: Vec<FilterInfo>,
    pub remote_orders: Vec<SortInfo>,
    pub local_orders: Vec<SortInfo>,
    /// `None` for statements that do not select (insert, show)
    pub fetch_strategy: Option<FetchStrategy>,
    pub warnings: Vec<String>,
}

fn filter_info(clause: &WhereClause) -> FilterInfo {
    FilterInfo {
        property: clause.property.clone(),
        operator: clause.operator.symbol().to_string(),
        value: clause.value.to_value(),
    }
}

fn sort_info(order: &OrderBy) -> SortInfo {
    SortInfo {
        property: order.property.clone(),
        direction: order.direction.as_str().to_string(),
    }
}

pub fn explain_query(query: &Query) -> FiklResult<QueryExplain> {
    let mut explain = QueryExplain {
        statement: query.kind().to_string(),
        subject: query.subject().map(str::to_string),
        subject_type: query.subject_type(),
        remote_filters: Vec::new(),
        local_filters: Vec::new(),
        remote_orders: Vec::new(),
        local_orders: Vec::new(),
        fetch_strategy: None,
        warnings: Vec::new(),
    };

    let plan = match query {
        Query::Select(q) => Some(SelectionPlan::new(
            &q.subject,
            &q.where_clauses,
            &q.order,
            q.limit,
            q.page,
        )?),
        Query::Update(q) => Some(SelectionPlan::new(
            &q.subject,
            &q.where_clauses,
            &[],
            None,
            None,
        )?),
        Query::Delete(q) => Some(SelectionPlan::new(
            &q.subject,
            &q.where_clauses,
            &[],
            None,
            None,
        )?),
        Query::Insert(q) => {
            insert_target(&q.collection)?;
            None
        }
        Query::Show(q) => match show_target(q)? {
            ShowTarget::Children(plan) => Some(plan),
            ShowTarget::Root | ShowTarget::Document(_) => None,
        },
    };

    if let Some(plan) = plan {
        LocalFilter::new(&plan.local_filters)?;
        explain.remote_filters = plan.remote_filters.iter().map(|w| filter_info(w)).collect();
        explain.local_filters = plan.local_filters.iter().map(|w| filter_info(w)).collect();
        explain.remote_orders = plan.remote_orders.iter().map(|o| sort_info(o)).collect();
        explain.local_orders = plan.local_orders.iter().map(|o| sort_info(o)).collect();
        explain.fetch_strategy = Some(plan.strategy);

        if let FetchStrategy::Limited(limit) = plan.strategy {
            if !plan.local_filters.is_empty() {
                explain.warnings.push(format!(
                    "limit {} applies before local filtering; fewer records may be returned",
                    limit
                ));
            }
            if !plan.local_orders.is_empty() {
                explain.warnings.push(format!(
                    "limit {} applies before local sorting; only the fetched records are sorted",
                    limit
                ));
            }
        }
        let all_local = !plan.local_filters.is_empty() && plan.remote_filters.is_empty();
        if plan.strategy == FetchStrategy::Unbounded && all_local {
            explain
                .warnings
                .push("every filter is local; the whole scope is fetched".to_string());
        }
    }

    Ok(explain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_explain_select() {
        let query = parse(
            "select * from users where age > 3 and name like \"A%\" \
             order by age, name^ desc limit 10",
        )
        .unwrap();
        let explain = explain_query(&query).unwrap();
        assert_eq!(explain.statement, "select");
        assert_eq!(explain.subject.as_deref(), Some("users"));
        assert_eq!(explain.remote_filters.len(), 1);
        assert_eq!(explain.local_filters[0].operator, "like");
        assert_eq!(explain.remote_orders[0].property, "age");
        assert_eq!(explain.local_orders.len(), 2);
        assert_eq!(explain.local_orders[1].direction, "desc");
        assert_eq!(explain.fetch_strategy, Some(FetchStrategy::Limited(10)));
        assert_eq!(explain.warnings.len(), 2);
    }

    #[test]
    fn test_explain_serializes() {
        let query = parse("select * from users page 50").unwrap();
        let value = serde_json::to_value(explain_query(&query).unwrap()).unwrap();
        assert_eq!(value["fetch_strategy"]["kind"], "paged");
        assert_eq!(value["fetch_strategy"]["size"], 50);
        assert_eq!(value["subject_type"], "collection");
    }

    #[test]
    fn test_explain_show_and_insert() {
        let query = parse("show collections from \"users/u1\"").unwrap();
        assert!(explain_query(&query).is_err());

        let query = parse("show collections within posts").unwrap();
        let explain = explain_query(&query).unwrap();
        assert_eq!(explain.fetch_strategy, Some(FetchStrategy::Unbounded));

        let query = parse("insert into \"users/u1\" set a = 1").unwrap();
        assert!(explain_query(&query).is_err());

        let query = parse("show collections").unwrap();
        let explain = explain_query(&query).unwrap();
        assert_eq!(explain.fetch_strategy, None);
        assert_eq!(explain.subject_type, SubjectType::Document);
    }
}
