//! Canonical query model produced by the transformer.
//!
//! Every statement kind is its own variant of [`Query`]; the executor matches
//! on it exhaustively. `Display` renders canonical FIKL text that parses back
//! into an equal value.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed and validated FIKL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Select(SelectQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    Insert(InsertQuery),
    Show(ShowQuery),
}

impl Query {
    /// Path or name of the queried subject, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Query::Select(q) => Some(&q.subject.path),
            Query::Update(q) => Some(&q.subject.path),
            Query::Delete(q) => Some(&q.subject.path),
            Query::Insert(q) => Some(&q.collection),
            Query::Show(q) => q.subject.as_ref().map(|s| s.path.as_str()),
        }
    }

    pub fn subject_type(&self) -> SubjectType {
        match self {
            Query::Select(q) => q.subject.kind,
            Query::Update(q) => q.subject.kind,
            Query::Delete(q) => q.subject.kind,
            Query::Insert(_) => SubjectType::Collection,
            Query::Show(q) => q
                .subject
                .as_ref()
                .map(|s| s.kind)
                .unwrap_or(SubjectType::Document),
        }
    }

    /// Where clauses in declaration order; empty when the statement has none.
    pub fn where_clauses(&self) -> &[WhereClause] {
        match self {
            Query::Select(q) => &q.where_clauses,
            Query::Update(q) => &q.where_clauses,
            Query::Delete(q) => &q.where_clauses,
            Query::Insert(_) | Query::Show(_) => &[],
        }
    }

    /// Statement keyword, used in logs and explain output.
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Select(_) => "select",
            Query::Update(_) => "update",
            Query::Delete(_) => "delete",
            Query::Insert(_) => "insert",
            Query::Show(_) => "show",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Collection,
    CollectionGroup,
    Document,
}

/// The single collection, collection group or document a statement targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub path: String,
    pub kind: SubjectType,
}

impl Subject {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: SubjectType::Collection,
        }
    }

    pub fn collection_group(name: impl Into<String>) -> Self {
        Self {
            path: name.into(),
            kind: SubjectType::CollectionGroup,
        }
    }

    pub fn document(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: SubjectType::Document,
        }
    }
}

/// Number of non-empty segments in a slash-delimited store path.
pub fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
    Like,
}

impl Operator {
    /// Spelling in FIKL source.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::ArrayContains => "array_contains",
            Operator::ArrayContainsAny => "array_contains_any",
            Operator::Like => "like",
        }
    }

    /// Operators the remote store has no equivalent for.
    pub fn is_local_only(&self) -> bool {
        matches!(self, Operator::Like)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub property: String,
    pub operator: Operator,
    pub value: Literal,
    /// Evaluate client-side after fetching instead of pushing to the store.
    pub local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub property: String,
    pub direction: Direction,
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Setter {
    pub property: String,
    pub value: Literal,
}

/// A literal value accepted by the restricted evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Literal>),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Integer(i) => Value::from(*i),
            Literal::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Array(items) => Value::Array(items.iter().map(Literal::to_value).collect()),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        literal.to_value()
    }
}

/// Requested projection of a select.
#[derive(Debug, Clone, PartialEq)]
pub enum Fields {
    All,
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    Count,
    Distinct,
}

impl Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            Function::Count => "count",
            Function::Distinct => "distinct",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Csv,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Rendered in the requested format and returned to the caller.
    None,
    Path,
    Clipboard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub kind: OutputKind,
    /// `None` defers to the executor's default format.
    pub format: Option<Format>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub subject: Subject,
    pub where_clauses: Vec<WhereClause>,
    pub fields: Fields,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub order: Vec<OrderBy>,
    pub group: Option<String>,
    pub function: Option<Function>,
    pub output: Option<OutputSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub subject: Subject,
    pub where_clauses: Vec<WhereClause>,
    pub set: Vec<Setter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub subject: Subject,
    pub where_clauses: Vec<WhereClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub collection: String,
    pub set: Vec<Setter>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowQuery {
    /// `None` lists the root collections.
    pub subject: Option<Subject>,
}

// ---- canonical text rendering ----

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            _ => write!(f, "{}", ch)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            // Debug keeps a fraction or exponent so the text reads back as a float
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::String(s) => write_quoted(f, s),
            Literal::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            SubjectType::Collection => "from",
            SubjectType::CollectionGroup => "within",
            SubjectType::Document => "at",
        };
        write!(f, "{} ", keyword)?;
        write_quoted(f, &self.path)
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.property)?;
        if self.local {
            f.write_str("^")?;
        }
        write!(f, " {} {}", self.operator.symbol(), self.value)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.property)?;
        if self.local {
            f.write_str("^")?;
        }
        write!(f, " {}", self.direction.as_str())
    }
}

impl fmt::Display for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.property)?;
        write!(f, " = {}", self.value)
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_where(f: &mut fmt::Formatter<'_>, clauses: &[WhereClause]) -> fmt::Result {
    if clauses.is_empty() {
        return Ok(());
    }
    f.write_str(" where ")?;
    write_list(f, clauses, " and ")
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("select ")?;
        match &self.fields {
            Fields::All => f.write_str("*")?,
            Fields::List(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, field)?;
                }
            }
        }
        write!(f, " {}", self.subject)?;
        write_where(f, &self.where_clauses)?;
        if !self.order.is_empty() {
            f.write_str(" order by ")?;
            write_list(f, &self.order, ", ")?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        if let Some(page) = self.page {
            write!(f, " page {}", page)?;
        }
        if let Some(group) = &self.group {
            f.write_str(" group by ")?;
            write_quoted(f, group)?;
        }
        if let Some(function) = self.function {
            write!(f, " function({})", function.as_str())?;
        }
        if let Some(output) = &self.output {
            f.write_str(" output")?;
            if let Some(format) = output.format {
                write!(f, " {}", format.as_str())?;
            }
            match output.kind {
                OutputKind::None => {}
                OutputKind::Clipboard => f.write_str(" clipboard")?,
                OutputKind::Path => {
                    f.write_str(" ")?;
                    write_quoted(f, output.destination.as_deref().unwrap_or_default())?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for UpdateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update {} set ", self.subject)?;
        write_list(f, &self.set, ", ")?;
        write_where(f, &self.where_clauses)
    }
}

impl fmt::Display for DeleteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete {}", self.subject)?;
        write_where(f, &self.where_clauses)
    }
}

impl fmt::Display for InsertQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("insert into ")?;
        write_quoted(f, &self.collection)?;
        f.write_str(" set ")?;
        write_list(f, &self.set, ", ")?;
        if let Some(id) = &self.identifier {
            f.write_str(" identified by ")?;
            write_quoted(f, id)?;
        }
        Ok(())
    }
}

impl fmt::Display for ShowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("show collections")?;
        if let Some(subject) = &self.subject {
            write!(f, " {}", subject)?;
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Select(q) => q.fmt(f),
            Query::Update(q) => q.fmt(f),
            Query::Delete(q) => q.fmt(f),
            Query::Insert(q) => q.fmt(f),
            Query::Show(q) => q.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_to_value() {
        let literal = Literal::Array(vec![
            Literal::Integer(1),
            Literal::Float(2.5),
            Literal::String("x".to_string()),
            Literal::Bool(true),
            Literal::Null,
        ]);
        assert_eq!(literal.to_value(), json!([1, 2.5, "x", true, null]));
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::Integer(-3).to_string(), "-3");
        assert_eq!(
            Literal::String("say \"hi\"".to_string()).to_string(),
            "\"say \\\"hi\\\"\""
        );
        assert_eq!(
            Literal::Array(vec![Literal::Integer(1), Literal::Null]).to_string(),
            "[1, null]"
        );
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count("users"), 1);
        assert_eq!(segment_count("users/u1"), 2);
        assert_eq!(segment_count("/users/u1/posts/"), 3);
    }

    #[test]
    fn test_common_accessors() {
        let query = Query::Show(ShowQuery { subject: None });
        assert_eq!(query.subject(), None);
        assert_eq!(query.subject_type(), SubjectType::Document);
        assert!(query.where_clauses().is_empty());

        let query = Query::Delete(DeleteQuery {
            subject: Subject::collection("users"),
            where_clauses: vec![WhereClause {
                property: "age".to_string(),
                operator: Operator::GreaterThan,
                value: Literal::Integer(3),
                local: false,
            }],
        });
        assert_eq!(query.subject(), Some("users"));
        assert_eq!(query.where_clauses().len(), 1);
        assert_eq!(query.to_string(), "delete from \"users\" where \"age\" > 3");
    }
}
