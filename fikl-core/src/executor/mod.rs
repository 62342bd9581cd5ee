//! Executor module for FIKL queries.
//!
//! [`QueryExecutor`] runs canonical queries against any [`DocumentStore`]:
//! the planner decides what is pushed to the store, the remote phase fetches
//! records, and the local engine filters, sorts, projects, groups and
//! aggregates them before rendering.

mod explain;
mod helpers;
mod local;
mod memory;
mod mutation;
mod planner;
mod render;
mod sink;
mod store;

pub use explain::{explain_query, FilterInfo, QueryExplain, SortInfo};
pub use helpers::*;
pub use local::{LocalFilter, LocalResult};
pub use memory::{FetchRecord, InMemoryStore, StoreStats};
pub use mutation::{build_patch, MutationOutcome};
pub use planner::{FetchStrategy, SelectionPlan, ShowTarget};
pub use render::{render, render_csv, render_json};
pub use sink::{MemorySink, OutputSink, SinkTarget};
pub use store::{
    DocumentSnapshot, DocumentStore, QueryScope, RemoteFilter, RemoteOperator, RemoteOrder,
    RemoteQuery,
};

use std::collections::BTreeSet;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::ast::*;
use crate::error::{FiklResult, SinkError};
use crate::parser;

/// Configuration for query execution limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum number of documents one selection may fetch (default: 100,000)
    pub max_documents: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_documents: 100_000,
        }
    }
}

impl QueryLimits {
    /// Limits for interactive use against large stores
    pub fn strict() -> Self {
        Self {
            max_documents: 10_000,
        }
    }

    /// Limits for bulk exports
    pub fn relaxed() -> Self {
        Self {
            max_documents: 1_000_000,
        }
    }
}

/// Result of one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// Select result as JSON
    Documents(Value),
    /// Select result rendered as CSV
    Text(String),
    /// Select result written to a sink
    Saved { count: usize, destination: String },
    /// Affected document count of update, delete or insert
    Mutated(MutationOutcome),
    /// Collection names from `show collections`
    Collections(Vec<String>),
}

/// Executor for FIKL queries.
///
/// Executes queries against any DocumentStore implementation.
pub struct QueryExecutor<S: DocumentStore> {
    store: S,
    limits: QueryLimits,
    sink: Option<Box<dyn OutputSink>>,
    default_format: Format,
}

impl<S: DocumentStore> QueryExecutor<S> {
    /// Create a new executor over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            limits: QueryLimits::default(),
            sink: None,
            default_format: Format::default(),
        }
    }

    /// Create a new executor with custom limits.
    pub fn with_limits(store: S, limits: QueryLimits) -> Self {
        Self {
            limits,
            ..Self::new(store)
        }
    }

    /// Sink used by `output` clauses that name a file or the clipboard.
    pub fn with_sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Format used when an `output` clause names none.
    pub fn with_default_format(mut self, format: Format) -> Self {
        self.default_format = format;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    /// Execute a query string.
    pub fn execute(&self, text: &str) -> FiklResult<QueryOutput> {
        let query = parser::parse(text)?;
        self.execute_query(&query)
    }

    /// Describe how a query string would run, without touching the store.
    pub fn explain(&self, text: &str) -> FiklResult<QueryExplain> {
        let query = parser::parse(text)?;
        explain_query(&query)
    }

    /// Execute a parsed query.
    pub fn execute_query(&self, query: &Query) -> FiklResult<QueryOutput> {
        let started = Instant::now();

        let output = match query {
            Query::Select(q) => self.execute_select(q)?,
            Query::Update(q) => QueryOutput::Mutated(self.execute_update(q)?),
            Query::Delete(q) => QueryOutput::Mutated(self.execute_delete(q)?),
            Query::Insert(q) => QueryOutput::Mutated(self.execute_insert(q)?),
            Query::Show(q) => QueryOutput::Collections(self.execute_show(q)?),
        };

        tracing::info!(
            statement = query.kind(),
            subject = query.subject().unwrap_or(""),
            count = output_count(&output),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query complete"
        );

        Ok(output)
    }

    /// Remote phase plus local filtering and sorting.
    fn select_records(&self, plan: &SelectionPlan<'_>) -> FiklResult<Vec<DocumentSnapshot>> {
        let filter = LocalFilter::new(&plan.local_filters)?;
        let records = plan.fetch(&self.store, &self.limits)?;
        let fetched = records.len();

        let mut records = filter.apply(records);
        local::sort_records(&mut records, &plan.local_orders);

        tracing::debug!(fetched, kept = records.len(), "local phase");
        Ok(records)
    }

    fn execute_select(&self, query: &SelectQuery) -> FiklResult<QueryOutput> {
        let plan = SelectionPlan::new(
            &query.subject,
            &query.where_clauses,
            &query.order,
            query.limit,
            query.page,
        )?;
        let records = self.select_records(&plan)?;

        let result = local::shape(
            &records,
            &query.fields,
            query.group.as_deref(),
            query.function,
        );

        let Some(output) = &query.output else {
            return Ok(QueryOutput::Documents(result.to_value()));
        };

        let format = output.format.unwrap_or(self.default_format);
        let target = match output.kind {
            OutputKind::None => {
                return Ok(match format {
                    Format::Json => QueryOutput::Documents(result.to_value()),
                    Format::Csv => QueryOutput::Text(render_csv(&result.rows())?),
                });
            }
            OutputKind::Clipboard => SinkTarget::Clipboard,
            OutputKind::Path => SinkTarget::Path(output.destination.clone().unwrap_or_default()),
        };

        let text = render(&result, format)?;
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| SinkError::Unavailable(format!("no sink configured for {}", target)))?;
        let destination = sink.write(&target, &text)?;

        Ok(QueryOutput::Saved {
            count: records.len(),
            destination,
        })
    }

    fn execute_update(&self, query: &UpdateQuery) -> FiklResult<MutationOutcome> {
        let plan = SelectionPlan::new(&query.subject, &query.where_clauses, &[], None, None)?;
        let records = self.select_records(&plan)?;
        let patch = build_patch(&query.set);
        Ok(mutation::apply_update(&self.store, &records, &patch))
    }

    fn execute_delete(&self, query: &DeleteQuery) -> FiklResult<MutationOutcome> {
        let plan = SelectionPlan::new(&query.subject, &query.where_clauses, &[], None, None)?;
        let records = self.select_records(&plan)?;
        Ok(mutation::apply_delete(&self.store, &records))
    }

    fn execute_insert(&self, query: &InsertQuery) -> FiklResult<MutationOutcome> {
        planner::insert_target(&query.collection)?;
        let path = mutation::insert(&self.store, query)?;
        tracing::debug!(path = %path, "document created");
        Ok(MutationOutcome {
            count: 1,
            failed: Vec::new(),
        })
    }

    fn execute_show(&self, query: &ShowQuery) -> FiklResult<Vec<String>> {
        match planner::show_target(query)? {
            ShowTarget::Root => Ok(self.store.list_collections(None)?),
            ShowTarget::Document(path) => Ok(self.store.list_collections(Some(path))?),
            ShowTarget::Children(plan) => {
                let records = plan.fetch(&self.store, &self.limits)?;
                let mut names = BTreeSet::new();
                for record in &records {
                    names.extend(self.store.list_collections(Some(&record.path))?);
                }
                Ok(names.into_iter().collect())
            }
        }
    }
}

fn output_count(output: &QueryOutput) -> usize {
    match output {
        QueryOutput::Documents(Value::Array(items)) => items.len(),
        QueryOutput::Documents(Value::Object(map)) => map.len(),
        QueryOutput::Documents(_) | QueryOutput::Text(_) => 1,
        QueryOutput::Saved { count, .. } => *count,
        QueryOutput::Mutated(outcome) => outcome.count,
        QueryOutput::Collections(names) => names.len(),
    }
}
