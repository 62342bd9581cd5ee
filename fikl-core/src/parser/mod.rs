//! Parser for FIKL statements.
//!
//! Converts the token stream into a [`Statement`] parse tree. The parser is
//! deliberately permissive about values, field lists and function names; the
//! transformer validates those and builds the canonical [`Query`].

mod clauses;

use crate::ast::Query;
use crate::error::{Position, SyntaxError, SyntaxResult};
use crate::lexer::{Lexer, SpannedToken, Token};
use crate::transformer::transform;
use crate::tree::Statement;

/// Parser for FIKL statements
pub struct Parser {
    pub(crate) tokens: Vec<SpannedToken>,
    pub(crate) position: usize,
}

static EOF: Token = Token::Eof;

impl Parser {
    /// Create a new parser from an input string
    pub fn new(input: &str) -> SyntaxResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Get the current token
    pub(crate) fn current_token(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|t| &t.token)
            .unwrap_or(&EOF)
    }

    /// Position of the current token (end of input when exhausted)
    pub(crate) fn current_position(&self) -> Position {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or_default()
    }

    /// Advance to the next token
    pub(crate) fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Error pointing at the current token
    pub(crate) fn error(&self, message: impl Into<String>) -> SyntaxError {
        let err = SyntaxError::at(message, self.current_position());
        match self.tokens.get(self.position) {
            Some(spanned) if spanned.token != Token::Eof => err.with_fragment(spanned.text.clone()),
            _ => err,
        }
    }

    /// Expect a specific token and advance, or return an error
    pub(crate) fn expect(&mut self, expected: Token) -> SyntaxResult<Position> {
        if self.current_token() == &expected {
            let position = self.current_position();
            self.advance();
            Ok(position)
        } else {
            Err(self.error(format!(
                "Expected {}, found {}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Parse one complete statement, tolerating a single trailing `;`
    pub fn parse(&mut self) -> SyntaxResult<Statement> {
        let statement = match self.current_token() {
            Token::Select => Statement::Select(self.parse_select()?),
            Token::Update => Statement::Update(self.parse_update()?),
            Token::Delete => Statement::Delete(self.parse_delete()?),
            Token::Insert => Statement::Insert(self.parse_insert()?),
            Token::Show => Statement::Show(self.parse_show()?),
            other => {
                return Err(self.error(format!(
                    "Expected select, update, delete, insert or show, found {}",
                    other
                )))
            }
        };

        if matches!(self.current_token(), Token::Semicolon) {
            self.advance();
        }

        if !matches!(self.current_token(), Token::Eof) {
            return Err(self.error(format!(
                "Unexpected {} after end of statement",
                self.current_token()
            )));
        }

        Ok(statement)
    }
}

/// Parse query text into its parse tree without validating it.
pub fn parse_tree(input: &str) -> SyntaxResult<Statement> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}

/// Parse and validate query text into a canonical [`Query`].
pub fn parse(input: &str) -> SyntaxResult<Query> {
    let statement = parse_tree(input)?;
    transform(statement)
}
