//! Output sink contract.
//!
//! Select statements with an output destination hand their rendered text to
//! an [`OutputSink`]. Concrete file and clipboard sinks live with the
//! runtime; [`MemorySink`] keeps writes in memory.

use std::fmt;

use parking_lot::Mutex;

use crate::error::SinkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Path(String),
    Clipboard,
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::Path(path) => f.write_str(path),
            SinkTarget::Clipboard => f.write_str("clipboard"),
        }
    }
}

pub trait OutputSink {
    /// Write `text` to `target`, returning a description of where it went.
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError>;
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError> {
        (**self).write(target, text)
    }
}

/// Records every write.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Mutex<Vec<(SinkTarget, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(SinkTarget, String)> {
        self.writes.lock().clone()
    }
}

impl OutputSink for MemorySink {
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError> {
        self.writes.lock().push((target.clone(), text.to_string()));
        Ok(target.to_string())
    }
}

impl<T: OutputSink + ?Sized> OutputSink for std::sync::Arc<T> {
    fn write(&self, target: &SinkTarget, text: &str) -> Result<String, SinkError> {
        (**self).write(target, text)
    }
}
