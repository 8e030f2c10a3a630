//! Statement AST produced by the line grammar.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker standing in for a term position inside `predicate_words`.
pub const PLACEHOLDER: &str = "%";

/// Leading word of statements produced from `command: statement` lines.
pub const META_WORD: &str = "meta";

/// A term in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Token {
    Const { value: String },
    /// An empty name denotes an anonymous variable.
    Variable { name: String },
}

impl Token {
    /// Create a constant token.
    pub fn constant(value: impl Into<String>) -> Self {
        Token::Const {
            value: value.into(),
        }
    }

    /// Create a variable token.
    pub fn variable(name: impl Into<String>) -> Self {
        Token::Variable { name: name.into() }
    }

    /// Check if this is an anonymous variable.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Token::Variable { name } if name.is_empty())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Variable { name } => write!(f, "({})", name),
            Token::Const { value } if value.contains('"') => write!(f, "'{}'", value),
            Token::Const { value } => write!(f, "\"{}\"", value),
        }
    }
}

/// A single logic atom: predicate words plus ordered terms.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statement {
    /// Barewords with one `PLACEHOLDER` per term, in source order.
    pub predicate_words: Vec<String>,
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub negated: bool,
}

impl Statement {
    /// Create a statement from words and tokens.
    pub fn new(predicate_words: Vec<String>, tokens: Vec<Token>) -> Self {
        Self {
            predicate_words,
            tokens,
            negated: false,
        }
    }

    /// Equality constraint `(name) = "value"` for the engine's built-in `=`.
    pub fn unify(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            vec![PLACEHOLDER.into(), "=".into(), PLACEHOLDER.into()],
            vec![Token::variable(name), Token::constant(value)],
        )
    }

    /// Set the negation flag.
    pub fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    /// Append a bareword.
    pub(crate) fn push_word(&mut self, word: String) {
        self.predicate_words.push(word);
    }

    /// Append a term along with its placeholder.
    pub(crate) fn push_token(&mut self, token: Token) {
        self.predicate_words.push(PLACEHOLDER.to_string());
        self.tokens.push(token);
    }

    /// Rewrite `command: statement` into the uniform meta shape.
    ///
    /// The command word and this statement's predicate become the two
    /// leading constants.
    pub(crate) fn into_meta(self, command: String) -> Statement {
        let mut tokens = vec![Token::constant(command), Token::constant(self.predicate())];
        tokens.extend(self.tokens);

        let mut words = vec![META_WORD.to_string()];
        words.extend(std::iter::repeat(PLACEHOLDER.to_string()).take(tokens.len()));

        Statement {
            predicate_words: words,
            tokens,
            negated: self.negated,
        }
    }

    /// The predicate name: words joined with single spaces.
    pub fn predicate(&self) -> String {
        self.predicate_words.join(" ").trim().to_string()
    }

    /// Number of terms.
    pub fn arity(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the statement has neither words nor terms.
    pub fn is_empty(&self) -> bool {
        self.predicate_words.is_empty() && self.tokens.is_empty()
    }

    /// Named variables in order of first occurrence, anonymous ones excluded.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for token in &self.tokens {
            if let Token::Variable { name } = token {
                if !name.is_empty() && !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        let mut tokens = self.tokens.iter();
        let mut first = true;
        for word in &self.predicate_words {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if word == PLACEHOLDER {
                match tokens.next() {
                    Some(token) => write!(f, "{}", token)?,
                    None => write!(f, "()")?,
                }
            } else {
                write!(f, "{}", word)?;
            }
        }
        Ok(())
    }
}

/// One parsed line of statement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParsedLine {
    /// A single statement; a fact when asserted, a goal when asked.
    Claim { statement: Statement },
    /// A head that holds whenever every body statement holds.
    Rule { head: Statement, body: Vec<Statement> },
    /// Two or more statements taken together as a conjunction.
    #[serde(rename = "multistatement")]
    MultiStatement { statements: Vec<Statement> },
}

impl ParsedLine {
    /// All statements in source order.
    pub fn statements(&self) -> Vec<&Statement> {
        match self {
            ParsedLine::Claim { statement } => vec![statement],
            ParsedLine::Rule { head, body } => std::iter::once(head).chain(body).collect(),
            ParsedLine::MultiStatement { statements } => statements.iter().collect(),
        }
    }
}
