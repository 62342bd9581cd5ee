//! Lexer for FIKL query text.
//!
//! Keywords are case-insensitive. Words that only have meaning in one spot of
//! the grammar (`collections`, `count`, `json`, ...) stay identifiers and are
//! matched by the parser, so they remain usable as property names.

use std::fmt;

use crate::error::{Position, SyntaxError, SyntaxResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Statement keywords
    Select,
    Update,
    Delete,
    Insert,
    Show,

    // Clause keywords
    From,
    Within,
    At,
    Where,
    And,
    Order,
    By,
    Limit,
    Page,
    Group,
    Set,
    Into,
    Identified,
    Function,
    Output,
    Asc,
    Desc,

    // Literal keywords
    True,
    False,
    Null,

    // Word operators
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
    Like,

    // Identifiers and literals
    Identifier(String),
    /// Numeric literal, kept as source text until the transformer evaluates it
    Number(String),
    String(String),

    // Symbol operators
    Equal,         // ==
    Assign,        // =
    NotEqual,      // !=
    LessThan,      // <
    LessThanEq,    // <=
    GreaterThan,   // >
    GreaterThanEq, // >=

    // Delimiters
    Star,         // *
    Caret,        // ^
    Comma,        // ,
    Minus,        // -
    Semicolon,    // ;
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Number(text) => write!(f, "number {}", text),
            Token::String(text) => write!(f, "string \"{}\"", text),
            Token::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", other.symbol()),
        }
    }
}

impl Token {
    /// Source spelling of fixed tokens.
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Select => "select",
            Token::Update => "update",
            Token::Delete => "delete",
            Token::Insert => "insert",
            Token::Show => "show",
            Token::From => "from",
            Token::Within => "within",
            Token::At => "at",
            Token::Where => "where",
            Token::And => "and",
            Token::Order => "order",
            Token::By => "by",
            Token::Limit => "limit",
            Token::Page => "page",
            Token::Group => "group",
            Token::Set => "set",
            Token::Into => "into",
            Token::Identified => "identified",
            Token::Function => "function",
            Token::Output => "output",
            Token::Asc => "asc",
            Token::Desc => "desc",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::In => "in",
            Token::NotIn => "not_in",
            Token::ArrayContains => "array_contains",
            Token::ArrayContainsAny => "array_contains_any",
            Token::Like => "like",
            Token::Equal => "==",
            Token::Assign => "=",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::LessThanEq => "<=",
            Token::GreaterThan => ">",
            Token::GreaterThanEq => ">=",
            Token::Star => "*",
            Token::Caret => "^",
            Token::Comma => ",",
            Token::Minus => "-",
            Token::Semicolon => ";",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::Identifier(_) | Token::Number(_) | Token::String(_) | Token::Eof => "",
        }
    }
}

/// A token together with where it starts and the exact text it spans.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub position: Position,
    pub text: String,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            line: 1,
            column: 1,
            current_char,
        }
    }

    fn advance(&mut self) {
        if self.current_char == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn here(&self) -> Position {
        Position::new(self.position, self.line, self.column)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '-' && self.peek_char() == Some('-') {
                while let Some(c) = self.current_char {
                    self.advance();
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let mut num_str = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Fraction only when a digit follows the dot
        if self.current_char == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            num_str.push('.');
            self.advance();
            while let Some(ch) = self.current_char {
                if ch.is_ascii_digit() {
                    num_str.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current_char, Some('e') | Some('E')) {
            let next = self.peek_char();
            let signed = matches!(next, Some('+') | Some('-'))
                && self
                    .input
                    .get(self.position + 2)
                    .is_some_and(|c| c.is_ascii_digit());
            if signed || next.is_some_and(|c| c.is_ascii_digit()) {
                num_str.push('e');
                self.advance();
                if signed {
                    num_str.push(self.current_char.unwrap_or('+'));
                    self.advance();
                }
                while let Some(ch) = self.current_char {
                    if ch.is_ascii_digit() {
                        num_str.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        Token::Number(num_str)
    }

    fn read_string(&mut self, quote: char) -> SyntaxResult<Token> {
        let start = self.here();
        self.advance(); // Skip opening quote

        let mut string = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                return Ok(Token::String(string));
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    string.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        _ => escaped,
                    });
                    self.advance();
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(SyntaxError::at("Unterminated string", start))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            let continues_path = ch == '.'
                && !ident.is_empty()
                && self
                    .peek_char()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
            if ch.is_alphanumeric() || ch == '_' || continues_path {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.to_lowercase().as_str() {
            "select" => Token::Select,
            "update" => Token::Update,
            "delete" => Token::Delete,
            "insert" => Token::Insert,
            "show" => Token::Show,
            "from" => Token::From,
            "within" => Token::Within,
            "at" => Token::At,
            "where" => Token::Where,
            "and" => Token::And,
            "order" => Token::Order,
            "by" => Token::By,
            "limit" => Token::Limit,
            "page" => Token::Page,
            "group" => Token::Group,
            "set" => Token::Set,
            "into" => Token::Into,
            "identified" => Token::Identified,
            "function" => Token::Function,
            "output" => Token::Output,
            "asc" => Token::Asc,
            "desc" => Token::Desc,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "in" => Token::In,
            "not_in" => Token::NotIn,
            "array_contains" => Token::ArrayContains,
            "array_contains_any" => Token::ArrayContainsAny,
            "like" => Token::Like,
            _ => Token::Identifier(ident),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Consume `first`, then `second` as well when it follows.
    fn one_or_two(&mut self, second: char, one: Token, two: Token) -> Token {
        self.advance();
        if self.current_char == Some(second) {
            self.advance();
            two
        } else {
            one
        }
    }

    pub fn next_token(&mut self) -> SyntaxResult<SpannedToken> {
        self.skip_whitespace_and_comments();

        let start = self.here();

        let token = match self.current_char {
            None => Token::Eof,
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(quote @ ('"' | '\'')) => self.read_string(quote)?,
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_identifier(),
            Some('=') => self.one_or_two('=', Token::Assign, Token::Equal),
            Some('<') => self.one_or_two('=', Token::LessThan, Token::LessThanEq),
            Some('>') => self.one_or_two('=', Token::GreaterThan, Token::GreaterThanEq),
            Some('!') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else {
                    return Err(SyntaxError::at("Expected '=' after '!'", start)
                        .with_fragment("!"));
                }
            }
            Some('*') => self.single(Token::Star),
            Some('^') => self.single(Token::Caret),
            Some(',') => self.single(Token::Comma),
            Some('-') => self.single(Token::Minus),
            Some(';') => self.single(Token::Semicolon),
            Some('[') => self.single(Token::LeftBracket),
            Some(']') => self.single(Token::RightBracket),
            Some('(') => self.single(Token::LeftParen),
            Some(')') => self.single(Token::RightParen),
            Some(ch) => {
                return Err(SyntaxError::at(format!("Unexpected character '{}'", ch), start)
                    .with_fragment(ch.to_string()));
            }
        };

        let text: String = self.input[start.offset..self.position].iter().collect();

        Ok(SpannedToken {
            token,
            position: start,
            text,
        })
    }

    pub fn tokenize(&mut self) -> SyntaxResult<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_statement_keywords() {
        let tokens = tokenize("select update delete insert show");
        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Update,
                Token::Delete,
                Token::Insert,
                Token::Show,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(tokenize("select")[0], Token::Select);
        assert_eq!(tokenize("SELECT")[0], Token::Select);
        assert_eq!(tokenize("Within")[0], Token::Within);
        assert_eq!(tokenize("ARRAY_CONTAINS_ANY")[0], Token::ArrayContainsAny);
    }

    #[test]
    fn test_contextual_words_stay_identifiers() {
        assert_eq!(
            tokenize("collections")[0],
            Token::Identifier("collections".to_string())
        );
        assert_eq!(tokenize("count")[0], Token::Identifier("count".to_string()));
        assert_eq!(tokenize("csv")[0], Token::Identifier("csv".to_string()));
    }

    #[test]
    fn test_dotted_identifier() {
        assert_eq!(
            tokenize("address.city")[0],
            Token::Identifier("address.city".to_string())
        );
        // A trailing dot is not part of the path
        assert!(Lexer::new("address.").tokenize().is_err());
    }

    #[test]
    fn test_numbers_keep_source_text() {
        assert_eq!(tokenize("123")[0], Token::Number("123".to_string()));
        assert_eq!(tokenize("3.14")[0], Token::Number("3.14".to_string()));
        assert_eq!(tokenize("1e21")[0], Token::Number("1e21".to_string()));
        assert_eq!(tokenize("2.5E-3")[0], Token::Number("2.5e-3".to_string()));
        assert_eq!(
            tokenize("-7"),
            vec![Token::Minus, Token::Number("7".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokenize("\"hello\"")[0], Token::String("hello".to_string()));
        assert_eq!(tokenize("'world'")[0], Token::String("world".to_string()));
        assert_eq!(
            tokenize("\"quote\\\"here\"")[0],
            Token::String("quote\"here".to_string())
        );
        assert_eq!(
            tokenize("\"users/u1/posts\"")[0],
            Token::String("users/u1/posts".to_string())
        );
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("== = != < <= > >= ^ *");
        assert_eq!(
            tokens,
            vec![
                Token::Equal,
                Token::Assign,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanEq,
                Token::GreaterThan,
                Token::GreaterThanEq,
                Token::Caret,
                Token::Star,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_local_marker_attaches_after_property() {
        let tokens = tokenize("age^ > 10");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("age".to_string()),
                Token::Caret,
                Token::GreaterThan,
                Token::Number("10".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("select * -- everything\nfrom users");
        assert_eq!(tokens[0], Token::Select);
        assert_eq!(tokens[1], Token::Star);
        assert_eq!(tokens[2], Token::From);
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = Lexer::new("select *\n  from users").tokenize().unwrap();
        assert_eq!(tokens[2].token, Token::From);
        assert_eq!(tokens[2].position.line, 2);
        assert_eq!(tokens[2].position.column, 3);
        assert_eq!(tokens[2].text, "from");
    }

    #[test]
    fn test_error_unterminated_string() {
        let err = Lexer::new("select * from \"users").tokenize().unwrap_err();
        assert_eq!(err.message, "Unterminated string");
        assert_eq!(err.position.unwrap().column, 15);
    }

    #[test]
    fn test_error_unexpected_char() {
        assert!(Lexer::new("select # from x").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
    }
}
