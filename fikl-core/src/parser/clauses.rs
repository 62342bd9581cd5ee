//! Clause parsing methods for FIKL.
//!
//! One method per production: statements, subject clauses, predicates,
//! sorters, setters, values and the select tail clauses
//! (limit/page/group/function/output).

use super::Parser;
use crate::ast::{Direction, Operator};
use crate::error::SyntaxResult;
use crate::lexer::Token;
use crate::tree::*;

impl Parser {
    pub(crate) fn parse_select(&mut self) -> SyntaxResult<SelectNode> {
        let position = self.expect(Token::Select)?;

        let fields = self.parse_fields()?;
        let subject = self.parse_subject(&[
            SubjectKeyword::From,
            SubjectKeyword::Within,
            SubjectKeyword::At,
        ])?;

        let predicates = self.parse_optional_where()?;

        let sorters = if matches!(self.current_token(), Token::Order) {
            self.advance();
            self.expect(Token::By)?;
            Some(self.parse_sorters()?)
        } else {
            None
        };

        let limit = if matches!(self.current_token(), Token::Limit) {
            self.advance();
            Some(self.parse_value()?)
        } else {
            None
        };

        let page = if matches!(self.current_token(), Token::Page) {
            self.advance();
            Some(self.parse_value()?)
        } else {
            None
        };

        let group = if matches!(self.current_token(), Token::Group) {
            self.advance();
            self.expect(Token::By)?;
            Some(self.parse_property()?)
        } else {
            None
        };

        let function = if matches!(self.current_token(), Token::Function) {
            Some(self.parse_function()?)
        } else {
            None
        };

        let output = if matches!(self.current_token(), Token::Output) {
            Some(self.parse_output()?)
        } else {
            None
        };

        Ok(SelectNode {
            fields,
            subject,
            predicates,
            sorters,
            limit,
            page,
            group,
            function,
            output,
            position,
        })
    }

    pub(crate) fn parse_update(&mut self) -> SyntaxResult<UpdateNode> {
        let position = self.expect(Token::Update)?;
        let subject = self.parse_subject(&[SubjectKeyword::From, SubjectKeyword::At])?;
        self.expect(Token::Set)?;
        let setters = self.parse_setters()?;
        let predicates = self.parse_optional_where()?;

        Ok(UpdateNode {
            subject,
            setters,
            predicates,
            position,
        })
    }

    pub(crate) fn parse_delete(&mut self) -> SyntaxResult<DeleteNode> {
        let position = self.expect(Token::Delete)?;
        let subject = self.parse_subject(&[SubjectKeyword::From, SubjectKeyword::At])?;
        let predicates = self.parse_optional_where()?;

        Ok(DeleteNode {
            subject,
            predicates,
            position,
        })
    }

    pub(crate) fn parse_insert(&mut self) -> SyntaxResult<InsertNode> {
        let position = self.expect(Token::Insert)?;
        self.expect(Token::Into)?;

        let name_position = self.current_position();
        let name = self.parse_name("collection name")?;
        let collection = SubjectNode {
            keyword: SubjectKeyword::From,
            name,
            position: name_position,
        };

        self.expect(Token::Set)?;
        let setters = self.parse_setters()?;

        let identifier = if matches!(self.current_token(), Token::Identified) {
            self.advance();
            self.expect(Token::By)?;
            Some(self.parse_value()?)
        } else {
            None
        };

        Ok(InsertNode {
            collection,
            setters,
            identifier,
            position,
        })
    }

    pub(crate) fn parse_show(&mut self) -> SyntaxResult<ShowNode> {
        let position = self.expect(Token::Show)?;

        match self.current_token() {
            Token::Identifier(word) if word.eq_ignore_ascii_case("collections") => self.advance(),
            other => {
                return Err(self.error(format!("Expected 'collections', found {}", other)));
            }
        }

        let subject = if matches!(
            self.current_token(),
            Token::From | Token::Within | Token::At
        ) {
            Some(self.parse_subject(&[
                SubjectKeyword::From,
                SubjectKeyword::Within,
                SubjectKeyword::At,
            ])?)
        } else {
            None
        };

        let predicates = self.parse_optional_where()?;

        Ok(ShowNode {
            subject,
            predicates,
            position,
        })
    }

    /// `*` or a comma separated list of properties. An empty list is kept for
    /// the transformer to reject.
    fn parse_fields(&mut self) -> SyntaxResult<FieldsNode> {
        if matches!(self.current_token(), Token::Star) {
            self.advance();
            return Ok(FieldsNode::Star);
        }

        let mut fields = Vec::new();
        if matches!(
            self.current_token(),
            Token::From | Token::Within | Token::At
        ) {
            return Ok(FieldsNode::List(fields));
        }

        loop {
            fields.push(self.parse_property()?);
            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(FieldsNode::List(fields))
    }

    fn parse_subject(&mut self, allowed: &[SubjectKeyword]) -> SyntaxResult<SubjectNode> {
        let keyword = match self.current_token() {
            Token::From => SubjectKeyword::From,
            Token::Within => SubjectKeyword::Within,
            Token::At => SubjectKeyword::At,
            other => {
                let expected: Vec<&str> = allowed.iter().map(|k| k.as_str()).collect();
                return Err(self.error(format!(
                    "Expected {}, found {}",
                    expected.join(" or "),
                    other
                )));
            }
        };

        if !allowed.contains(&keyword) {
            return Err(self.error(format!(
                "'{}' is not allowed in this statement",
                keyword.as_str()
            )));
        }
        self.advance();

        let position = self.current_position();
        let name = self.parse_name("subject name")?;

        Ok(SubjectNode {
            keyword,
            name,
            position,
        })
    }

    /// A bare identifier or a quoted string naming a collection or path.
    fn parse_name(&mut self, what: &str) -> SyntaxResult<String> {
        match self.current_token() {
            Token::Identifier(name) | Token::String(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected {}, found {}", what, other))),
        }
    }

    pub(crate) fn parse_property(&mut self) -> SyntaxResult<PropertyNode> {
        let position = self.current_position();
        match self.current_token() {
            Token::Identifier(path) | Token::String(path) => {
                let path = path.clone();
                self.advance();
                Ok(PropertyNode { path, position })
            }
            other => Err(self.error(format!("Expected property name, found {}", other))),
        }
    }

    /// Consume an optional `^` local marker.
    fn parse_local_marker(&mut self) -> bool {
        if matches!(self.current_token(), Token::Caret) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_optional_where(&mut self) -> SyntaxResult<Option<Vec<PredicateNode>>> {
        if !matches!(self.current_token(), Token::Where) {
            return Ok(None);
        }
        self.advance();

        let mut predicates = vec![self.parse_predicate()?];
        while matches!(self.current_token(), Token::And) {
            self.advance();
            predicates.push(self.parse_predicate()?);
        }

        Ok(Some(predicates))
    }

    fn parse_predicate(&mut self) -> SyntaxResult<PredicateNode> {
        let property = self.parse_property()?;
        let local_marker = self.parse_local_marker();

        let operator = match self.current_token() {
            Token::Equal => Operator::Equal,
            Token::NotEqual => Operator::NotEqual,
            Token::GreaterThan => Operator::GreaterThan,
            Token::GreaterThanEq => Operator::GreaterThanOrEqual,
            Token::LessThan => Operator::LessThan,
            Token::LessThanEq => Operator::LessThanOrEqual,
            Token::In => Operator::In,
            Token::NotIn => Operator::NotIn,
            Token::ArrayContains => Operator::ArrayContains,
            Token::ArrayContainsAny => Operator::ArrayContainsAny,
            Token::Like => Operator::Like,
            other => {
                return Err(self.error(format!(
                    "Expected comparison operator, found {}",
                    other
                )))
            }
        };
        self.advance();

        let value = self.parse_value()?;

        Ok(PredicateNode {
            property,
            local_marker,
            operator,
            value,
        })
    }

    fn parse_sorters(&mut self) -> SyntaxResult<Vec<SorterNode>> {
        let mut sorters = Vec::new();

        loop {
            let property = self.parse_property()?;
            let local_marker = self.parse_local_marker();

            let direction = match self.current_token() {
                Token::Asc => {
                    self.advance();
                    Some(Direction::Asc)
                }
                Token::Desc => {
                    self.advance();
                    Some(Direction::Desc)
                }
                _ => None,
            };

            sorters.push(SorterNode {
                property,
                local_marker,
                direction,
            });

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(sorters)
    }

    fn parse_setters(&mut self) -> SyntaxResult<Vec<SetterNode>> {
        let mut setters = Vec::new();

        loop {
            let property = self.parse_property()?;
            self.expect(Token::Assign)?;
            let value = self.parse_value()?;
            setters.push(SetterNode { property, value });

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(setters)
    }

    /// Parse a value without evaluating it.
    pub(crate) fn parse_value(&mut self) -> SyntaxResult<ValueNode> {
        let position = self.current_position();

        let value = match self.current_token() {
            Token::String(s) => ValueNode::String(s.clone(), position),
            Token::Number(raw) => ValueNode::Number(raw.clone(), position),
            Token::Minus => {
                self.advance();
                match self.current_token() {
                    Token::Number(raw) => ValueNode::Number(format!("-{}", raw), position),
                    other => {
                        return Err(self.error(format!(
                            "Expected number after '-', found {}",
                            other
                        )))
                    }
                }
            }
            Token::True => ValueNode::Bool(true, position),
            Token::False => ValueNode::Bool(false, position),
            Token::Null => ValueNode::Null(position),
            Token::Identifier(name) => ValueNode::Name(name.clone(), position),
            Token::LeftBracket => return self.parse_array(),
            other => return Err(self.error(format!("Expected value, found {}", other))),
        };
        self.advance();

        Ok(value)
    }

    fn parse_array(&mut self) -> SyntaxResult<ValueNode> {
        let position = self.expect(Token::LeftBracket)?;
        let mut items = Vec::new();

        if !matches!(self.current_token(), Token::RightBracket) {
            loop {
                items.push(self.parse_value()?);
                if matches!(self.current_token(), Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::RightBracket)?;
        Ok(ValueNode::Array(items, position))
    }

    fn parse_function(&mut self) -> SyntaxResult<FunctionNode> {
        self.expect(Token::Function)?;
        self.expect(Token::LeftParen)?;

        let position = self.current_position();
        let name = match self.current_token() {
            Token::Identifier(name) => name.clone(),
            other => return Err(self.error(format!("Expected function name, found {}", other))),
        };
        self.advance();

        self.expect(Token::RightParen)?;
        Ok(FunctionNode { name, position })
    }

    /// `output [format] [clipboard | "path"]`, at least one part present.
    fn parse_output(&mut self) -> SyntaxResult<OutputNode> {
        let position = self.expect(Token::Output)?;

        let format = match self.current_token() {
            Token::Identifier(word) if !word.eq_ignore_ascii_case("clipboard") => {
                let format = (word.clone(), self.current_position());
                self.advance();
                Some(format)
            }
            _ => None,
        };

        let target = match self.current_token() {
            Token::Identifier(word) if word.eq_ignore_ascii_case("clipboard") => {
                self.advance();
                Some(OutputTarget::Clipboard)
            }
            Token::String(path) => {
                let path = path.clone();
                self.advance();
                Some(OutputTarget::Path(path))
            }
            _ => None,
        };

        if format.is_none() && target.is_none() {
            return Err(self.error(format!(
                "Expected output format, 'clipboard' or a file path, found {}",
                self.current_token()
            )));
        }

        Ok(OutputNode {
            format,
            target,
            position,
        })
    }
}
