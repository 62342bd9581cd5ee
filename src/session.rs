//! Query session.
//!
//! A [`Session`] wires a store, the configured output devices and the query
//! executor together: `run` takes query text and returns the statement's
//! result, with every failure reported as a [`QueryError`].

use fikl_core::{
    DocumentStore, FiklResult, QueryError, QueryExecutor, QueryExplain, QueryOutput,
};

use crate::config::FiklConfig;
use crate::sink::{ClipboardWriter, DeviceSink, FileSink};

pub struct Session<S: DocumentStore> {
    executor: QueryExecutor<S>,
}

impl<S: DocumentStore> Session<S> {
    /// Session writing file output under the configured directory. Clipboard
    /// output fails until a clipboard is attached with
    /// [`Session::with_clipboard`].
    pub fn new(store: S, config: &FiklConfig) -> Self {
        Self::build(store, config, None)
    }

    pub fn with_clipboard(
        store: S,
        config: &FiklConfig,
        clipboard: impl ClipboardWriter + 'static,
    ) -> Self {
        let clipboard: Box<dyn ClipboardWriter> = Box::new(clipboard);
        Self::build(store, config, Some(clipboard))
    }

    fn build(store: S, config: &FiklConfig, clipboard: Option<Box<dyn ClipboardWriter>>) -> Self {
        let mut devices = DeviceSink::new(FileSink::new(&config.output.directory));
        if let Some(clipboard) = clipboard {
            devices = devices.with_clipboard(clipboard);
        }

        let executor = QueryExecutor::with_limits(store, config.query_limits())
            .with_default_format(config.output.format)
            .with_sink(devices);

        Self { executor }
    }

    pub fn executor(&self) -> &QueryExecutor<S> {
        &self.executor
    }

    pub fn store(&self) -> &S {
        self.executor.store()
    }

    /// Parse, plan and execute one statement.
    pub fn run(&self, text: &str) -> FiklResult<QueryOutput> {
        self.executor.execute(text).map_err(|e| {
            tracing::debug!(error = %e, "query failed");
            e
        })
    }

    /// Run a statement and render its result for display: CSV as-is,
    /// everything else as pretty JSON.
    pub fn run_to_string(&self, text: &str) -> FiklResult<String> {
        let rendered = match self.run(text)? {
            QueryOutput::Text(text) => Ok(text),
            QueryOutput::Documents(value) => serde_json::to_string_pretty(&value),
            other => serde_json::to_string_pretty(&other),
        };
        rendered.map_err(|e| QueryError::Render(e.to_string()))
    }

    pub fn explain(&self, text: &str) -> FiklResult<QueryExplain> {
        self.executor.explain(text)
    }
}
