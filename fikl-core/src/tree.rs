//! Parse tree produced by the parser.
//!
//! Nodes keep the positions of the tokens they came from so the transformer
//! can point at the offending fragment. Values are kept unevaluated; the
//! transformer resolves them through the literal evaluator.

use crate::ast::{Direction, Operator};
use crate::error::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectNode),
    Update(UpdateNode),
    Delete(DeleteNode),
    Insert(InsertNode),
    Show(ShowNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKeyword {
    From,
    Within,
    At,
}

impl SubjectKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKeyword::From => "from",
            SubjectKeyword::Within => "within",
            SubjectKeyword::At => "at",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectNode {
    pub keyword: SubjectKeyword,
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub path: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldsNode {
    Star,
    List(Vec<PropertyNode>),
}

/// An unevaluated value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    String(String, Position),
    /// Source text of a numeric literal, sign included
    Number(String, Position),
    Bool(bool, Position),
    Null(Position),
    Array(Vec<ValueNode>, Position),
    /// A bare identifier in value position
    Name(String, Position),
}

impl ValueNode {
    pub fn position(&self) -> Position {
        match self {
            ValueNode::String(_, pos)
            | ValueNode::Number(_, pos)
            | ValueNode::Bool(_, pos)
            | ValueNode::Null(pos)
            | ValueNode::Array(_, pos)
            | ValueNode::Name(_, pos) => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateNode {
    pub property: PropertyNode,
    pub local_marker: bool,
    pub operator: Operator,
    pub value: ValueNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SorterNode {
    pub property: PropertyNode,
    pub local_marker: bool,
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetterNode {
    pub property: PropertyNode,
    pub value: ValueNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    Clipboard,
    Path(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    pub format: Option<(String, Position)>,
    pub target: Option<OutputTarget>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub fields: FieldsNode,
    pub subject: SubjectNode,
    pub predicates: Option<Vec<PredicateNode>>,
    pub sorters: Option<Vec<SorterNode>>,
    pub limit: Option<ValueNode>,
    pub page: Option<ValueNode>,
    pub group: Option<PropertyNode>,
    pub function: Option<FunctionNode>,
    pub output: Option<OutputNode>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNode {
    pub subject: SubjectNode,
    pub setters: Vec<SetterNode>,
    pub predicates: Option<Vec<PredicateNode>>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteNode {
    pub subject: SubjectNode,
    pub predicates: Option<Vec<PredicateNode>>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertNode {
    pub collection: SubjectNode,
    pub setters: Vec<SetterNode>,
    pub identifier: Option<ValueNode>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowNode {
    pub subject: Option<SubjectNode>,
    pub predicates: Option<Vec<PredicateNode>>,
    pub position: Position,
}
