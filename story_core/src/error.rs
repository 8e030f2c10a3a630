//! Error types for the story core.

use story_logic::EngineError;
use thiserror::Error;

use crate::grammar::GrammarError;
use crate::template::TemplateError;

/// A specialized `Result` type for story core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, querying, or rendering.
#[derive(Error, Debug)]
pub enum Error {
    /// Statement text does not match the grammar.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// Template structure is malformed (strict parsing only).
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The logic backend reported a runtime failure.
    #[error("Engine error: {0}")]
    Engine(EngineError),

    /// The answer set was truncated by the backend; it is not empty, it is unknown.
    #[error("Query exceeded answer limit of {limit}: {query}")]
    AnswerLimitExceeded { query: String, limit: usize },

    /// A collected meta directive has no side-effect handler.
    #[error("{command} is not a meta command")]
    UnknownDirective { command: String },

    /// No passage matched a display target.
    #[error("Passage not found: {name}")]
    PassageNotFound { name: String },

    /// Rule text was used where a query was expected.
    #[error("Not a query: {text}")]
    NotAQuery { text: String },

    /// A clause head was negated.
    #[error("Cannot assert or retract a negated statement: {text}")]
    NegatedClause { text: String },

    /// Nested displays went deeper than the configured bound.
    #[error("Display nesting exceeded depth {depth}")]
    DisplayDepthExceeded { depth: usize },

    /// A configuration file could not be read.
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A passage document could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Convert a backend error, keeping answer-limit failures distinct.
    pub fn from_engine(err: EngineError, query: &str) -> Self {
        match err {
            EngineError::AnswerLimitExceeded { limit } => Error::AnswerLimitExceeded {
                query: query.to_string(),
                limit,
            },
            other => Error::Engine(other),
        }
    }
}
