//! Restricted literal evaluation.
//!
//! Only strings, numbers, booleans, null and (nested) arrays evaluate. Bare
//! names are rejected rather than looked up.

use crate::ast::Literal;
use crate::error::{SyntaxError, SyntaxResult};
use crate::tree::ValueNode;

pub fn evaluate(node: &ValueNode) -> SyntaxResult<Literal> {
    match node {
        ValueNode::String(s, _) => Ok(Literal::String(s.clone())),
        ValueNode::Number(raw, pos) => parse_number(raw)
            .map_err(|message| SyntaxError::at(message, *pos).with_fragment(raw.clone())),
        ValueNode::Bool(b, _) => Ok(Literal::Bool(*b)),
        ValueNode::Null(_) => Ok(Literal::Null),
        ValueNode::Array(items, _) => items
            .iter()
            .map(evaluate)
            .collect::<SyntaxResult<Vec<_>>>()
            .map(Literal::Array),
        ValueNode::Name(name, pos) => Err(SyntaxError::at(
            format!("'{}' is not a literal; quote it to use it as a string", name),
            *pos,
        )
        .with_fragment(name.clone())),
    }
}

fn parse_number(raw: &str) -> Result<Literal, String> {
    let is_float = raw.contains(['.', 'e', 'E']);

    if is_float {
        let value: f64 = raw
            .parse()
            .map_err(|_| format!("Invalid number literal '{}'", raw))?;
        if !value.is_finite() {
            return Err(format!("Number literal '{}' is out of range", raw));
        }
        Ok(Literal::Float(value))
    } else {
        raw.parse::<i64>()
            .map(Literal::Integer)
            .map_err(|_| format!("Integer literal '{}' is out of range", raw))
    }
}

/// Evaluate a value that must be a non-negative integer (limit, page).
pub fn evaluate_count(node: &ValueNode, clause: &str) -> SyntaxResult<usize> {
    let invalid = || {
        SyntaxError::at(
            format!("'{}' expects a non-negative integer", clause),
            node.position(),
        )
    };

    match evaluate(node)? {
        Literal::Integer(n) => usize::try_from(n).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Position;

    fn pos() -> Position {
        Position::new(0, 1, 1)
    }

    #[test]
    fn test_numbers() {
        let node = ValueNode::Number("42".to_string(), pos());
        assert_eq!(evaluate(&node).unwrap(), Literal::Integer(42));

        let node = ValueNode::Number("-3.5".to_string(), pos());
        assert_eq!(evaluate(&node).unwrap(), Literal::Float(-3.5));

        let node = ValueNode::Number("1e3".to_string(), pos());
        assert_eq!(evaluate(&node).unwrap(), Literal::Float(1000.0));
    }

    #[test]
    fn test_integer_overflow_rejected() {
        let node = ValueNode::Number("99999999999999999999".to_string(), pos());
        let err = evaluate(&node).unwrap_err();
        assert!(err.message.contains("out of range"));
        assert_eq!(err.fragment.as_deref(), Some("99999999999999999999"));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let node = ValueNode::Number("1e999".to_string(), pos());
        assert!(evaluate(&node).is_err());
    }

    #[test]
    fn test_nested_array() {
        let node = ValueNode::Array(
            vec![
                ValueNode::String("a".to_string(), pos()),
                ValueNode::Array(vec![ValueNode::Null(pos())], pos()),
                ValueNode::Bool(false, pos()),
            ],
            pos(),
        );
        assert_eq!(
            evaluate(&node).unwrap(),
            Literal::Array(vec![
                Literal::String("a".to_string()),
                Literal::Array(vec![Literal::Null]),
                Literal::Bool(false),
            ])
        );
    }

    #[test]
    fn test_bare_name_rejected() {
        let node = ValueNode::Name("active".to_string(), Position::new(30, 1, 31));
        let err = evaluate(&node).unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("active"));
        assert_eq!(err.position.unwrap().column, 31);
    }

    #[test]
    fn test_evaluate_count() {
        let node = ValueNode::Number("10".to_string(), pos());
        assert_eq!(evaluate_count(&node, "limit").unwrap(), 10);

        let node = ValueNode::Number("-1".to_string(), pos());
        assert!(evaluate_count(&node, "limit").is_err());

        let node = ValueNode::Number("2.5".to_string(), pos());
        assert!(evaluate_count(&node, "page").is_err());

        let node = ValueNode::String("10".to_string(), pos());
        assert!(evaluate_count(&node, "limit").is_err());
    }
}
