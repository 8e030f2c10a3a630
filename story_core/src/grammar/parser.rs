//! Recursive-descent parser for statement lines.
//!
//! Ordered choice, highest priority first:
//!
//! ```text
//! line      := rule | multi | claim
//! rule      := statement "if" statement+ end
//! multi     := statement statement+ end
//! claim     := statement end
//! statement := "!"? (word ":" simple | simple)
//! simple    := (word | "(" name ")" | '"' text '"' | "'" text "'")+ ("," | "\n")?
//! end       := ("." | "," | "\n" | " ")* EOF
//! ```
//!
//! A bareword is letters, digits and spaces, trimmed. It never starts with
//! the keyword `if` and stops before a standalone `if`. So `iffy (x)` is
//! a claim while `sunny if summer` is a rule; a bareword never swallows a
//! standalone `if` that could introduce a rule body.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{ParsedLine, Statement, Token};

/// Something the parser would have accepted at the failure position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Expected {
    Literal(String),
    Class(String),
    EndOfInput,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Literal(text) => write!(f, "{:?}", text),
            Expected::Class(class) => write!(f, "{}", class),
            Expected::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// Statement text that matches none of the grammar's alternatives.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Expected {} but {} found at line {line}, column {column}",
    describe_expected(.expected),
    describe_found(.found)
)]
pub struct GrammarError {
    /// Byte offset of the failure.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// Sorted, de-duplicated alternatives.
    pub expected: Vec<Expected>,
    /// Character at the failure position, `None` at end of input.
    pub found: Option<char>,
}

fn describe_expected(expected: &[Expected]) -> String {
    let descriptions: Vec<String> = expected.iter().map(|e| e.to_string()).collect();
    match descriptions.as_slice() {
        [] => "nothing".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

fn describe_found(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("{:?}", c.to_string()),
        None => "end of input".to_string(),
    }
}

const WORD_CLASS: &str = "[a-zA-Z0-9 ]";
const KEYWORD_IF: &str = "if";

/// Parse one line of statement text.
pub fn parse(input: &str) -> Result<ParsedLine, GrammarError> {
    Parser::new(input).line()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    fail_pos: usize,
    expected: Vec<Expected>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            fail_pos: 0,
            expected: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    /// Record an expectation at the current position, keeping only the farthest.
    fn fail(&mut self, expected: Expected) {
        if self.pos < self.fail_pos {
            return;
        }
        if self.pos > self.fail_pos {
            self.fail_pos = self.pos;
            self.expected.clear();
        }
        self.expected.push(expected);
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump(c);
            true
        } else {
            self.fail(Expected::Literal(c.to_string()));
            false
        }
    }

    fn skip_spaces(&mut self) {
        while let Some(c @ (' ' | '\t')) = self.peek() {
            self.bump(c);
        }
    }

    fn skip_separators(&mut self) {
        while let Some(c @ (' ' | '\t' | '\r' | '\n' | ',')) = self.peek() {
            self.bump(c);
        }
    }

    /// Check for the `if` keyword after optional spaces, without consuming.
    fn at_keyword(&self) -> bool {
        let rest = self.rest().trim_start_matches([' ', '\t']);
        rest.starts_with(KEYWORD_IF)
            && !rest[KEYWORD_IF.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric())
    }

    fn keyword(&mut self) -> bool {
        self.skip_spaces();
        if self.at_keyword() {
            self.pos += KEYWORD_IF.len();
            true
        } else {
            self.fail(Expected::Literal(KEYWORD_IF.to_string()));
            false
        }
    }

    fn word(&mut self) -> Option<String> {
        if self.at_keyword() {
            return None;
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == ' ') {
                break;
            }
            if c == ' ' && self.pos > start && self.at_keyword() {
                break;
            }
            self.bump(c);
        }
        if self.pos == start {
            self.fail(Expected::Class(WORD_CLASS.to_string()));
            return None;
        }
        Some(self.input[start..self.pos].trim().to_string())
    }

    /// Text between `open` and `close`, trimmed. Restores position on failure.
    fn delimited(&mut self, open: char, close: char, forbidden: &[char]) -> Option<String> {
        let start = self.pos;
        if !self.eat(open) {
            return None;
        }
        let content_start = self.pos;
        while let Some(c) = self.peek() {
            if c == close || forbidden.contains(&c) {
                break;
            }
            self.bump(c);
        }
        let content = self.input[content_start..self.pos].trim().to_string();
        if !self.eat(close) {
            self.pos = start;
            return None;
        }
        Some(content)
    }

    fn variable(&mut self) -> Option<String> {
        self.delimited('(', ')', &['('])
    }

    fn constant(&mut self) -> Option<String> {
        self.delimited('"', '"', &[])
            .or_else(|| self.delimited('\'', '\'', &[]))
    }

    fn simple(&mut self) -> Option<Statement> {
        let mut statement = Statement::default();
        loop {
            if let Some(word) = self.word() {
                if !word.is_empty() {
                    statement.push_word(word);
                }
            } else if let Some(name) = self.variable() {
                statement.push_token(Token::variable(name));
                self.skip_spaces();
            } else if let Some(value) = self.constant() {
                statement.push_token(Token::constant(value));
                self.skip_spaces();
            } else {
                break;
            }
        }

        if statement.is_empty() {
            return None;
        }
        if matches!(self.peek(), Some(',' | '\n')) {
            self.pos += 1;
        }
        Some(statement)
    }

    fn statement(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.skip_spaces();
        let negated = self.peek() == Some('!');
        if negated {
            self.pos += 1;
            self.skip_spaces();
        } else {
            self.fail(Expected::Literal("!".to_string()));
        }

        let body_start = self.pos;
        if let Some(command) = self.word().filter(|w| !w.is_empty()) {
            if self.eat(':') {
                if let Some(target) = self.simple() {
                    return Some(target.with_negated(negated).into_meta(command));
                }
            }
        }
        self.pos = body_start;

        match self.simple() {
            Some(statement) => Some(statement.with_negated(negated)),
            None => {
                self.pos = start;
                None
            }
        }
    }

    fn end(&mut self) -> Result<(), GrammarError> {
        while let Some(c @ ('.' | ',' | '\n' | '\r' | ' ' | '\t')) = self.peek() {
            self.bump(c);
        }
        if self.pos < self.input.len() {
            self.fail(Expected::EndOfInput);
            return Err(self.error());
        }
        Ok(())
    }

    fn line(mut self) -> Result<ParsedLine, GrammarError> {
        let Some(head) = self.statement() else {
            return Err(self.error());
        };
        self.skip_separators();

        let checkpoint = self.pos;
        if self.keyword() {
            let mut body = Vec::new();
            loop {
                self.skip_separators();
                match self.statement() {
                    Some(statement) => body.push(statement),
                    None => break,
                }
            }
            if !body.is_empty() {
                self.end()?;
                return Ok(ParsedLine::Rule { head, body });
            }
            self.pos = checkpoint;
        }

        let mut statements = vec![head];
        loop {
            self.skip_separators();
            match self.statement() {
                Some(statement) => statements.push(statement),
                None => break,
            }
        }
        self.end()?;

        if statements.len() > 1 {
            Ok(ParsedLine::MultiStatement { statements })
        } else {
            let statement = statements.remove(0);
            Ok(ParsedLine::Claim { statement })
        }
    }

    fn error(&mut self) -> GrammarError {
        let mut expected = std::mem::take(&mut self.expected);
        expected.sort();
        expected.dedup();

        let consumed = &self.input[..self.fail_pos];
        let line = consumed.matches('\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(newline) => consumed[newline + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };

        GrammarError {
            offset: self.fail_pos,
            line,
            column,
            expected,
            found: self.input[self.fail_pos..].chars().next(),
        }
    }
}
