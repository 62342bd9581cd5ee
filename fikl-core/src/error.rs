//! Error types for fikl-core.
//!
//! One enum per layer, all folded into [`QueryError`] at the executor boundary:
//! - `SyntaxError`: malformed query text or a violated statement rule
//! - `PlanError`: a predicate or subject the remote store cannot serve
//! - `StoreError`: failures reported by a `DocumentStore`
//! - `SinkError`: failures writing rendered output

use std::fmt;

use thiserror::Error;

/// Location of a token in the query text. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Malformed query text, or a statement that breaks a structural rule.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}{}", describe_location(.position, .fragment))]
pub struct SyntaxError {
    pub message: String,
    pub position: Option<Position>,
    pub fragment: Option<String>,
}

fn describe_location(position: &Option<Position>, fragment: &Option<String>) -> String {
    match (position, fragment) {
        (Some(pos), Some(text)) => format!(" at {} near '{}'", pos, text),
        (Some(pos), None) => format!(" at {}", pos),
        (None, Some(text)) => format!(" near '{}'", text),
        (None, None) => String::new(),
    }
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            fragment: None,
        }
    }

    pub fn at(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
            fragment: None,
        }
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }
}

/// A query that cannot be mapped onto the remote store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Operator '{operator}' on '{property}' can only be evaluated locally")]
    LocalOnlyOperator { property: String, operator: String },

    #[error("Unsupported subject: {0}")]
    UnsupportedSubject(String),

    #[error("Invalid 'like' pattern on '{property}': {reason}")]
    InvalidPattern { property: String, reason: String },
}

/// Failure reported by a document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure writing rendered output to its destination.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output destination unavailable: {0}")]
    Unavailable(String),
}

/// Umbrella error returned by the executor.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    #[error("Document limit exceeded: fetched {fetched}, maximum is {max}")]
    LimitExceeded { fetched: usize, max: usize },

    #[error("Render error: {0}")]
    Render(String),
}

pub type SyntaxResult<T> = Result<T, SyntaxError>;
pub type PlanResult<T> = Result<T, PlanError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type FiklResult<T> = Result<T, QueryError>;

impl serde::Serialize for QueryError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_messages() {
        let err = SyntaxError::new("Expected 'from'");
        assert_eq!(err.to_string(), "Expected 'from'");

        let err = SyntaxError::at("Unexpected token", Position::new(7, 1, 8)).with_fragment("frm");
        assert_eq!(
            err.to_string(),
            "Unexpected token at line 1, column 8 near 'frm'"
        );

        let err = SyntaxError::new("Missing where").with_fragment("delete from users");
        assert_eq!(err.to_string(), "Missing where near 'delete from users'");
    }

    #[test]
    fn test_query_error_wraps_cause() {
        let err: QueryError = SyntaxError::new("bad").into();
        assert_eq!(err.to_string(), "Syntax error: bad");

        let err: QueryError = PlanError::LocalOnlyOperator {
            property: "name".to_string(),
            operator: "like".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Plan error: Operator 'like' on 'name' can only be evaluated locally"
        );

        let err: QueryError = StoreError::Unavailable("offline".to_string()).into();
        assert_eq!(err.to_string(), "Store error: Store unavailable: offline");

        let err = QueryError::LimitExceeded {
            fetched: 11,
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "Document limit exceeded: fetched 11, maximum is 10"
        );
    }

    #[test]
    fn test_query_error_serializes_as_string() {
        let err: QueryError = StoreError::NotFound("users/u1".to_string()).into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!("Store error: Document not found: users/u1"));
    }
}
