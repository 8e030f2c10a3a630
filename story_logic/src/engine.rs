//! The logic engine boundary: submit a query, stream answers, assert and retract clauses.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Bindings, Clause, Literal};

/// A specialized `Result` type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Answers to a single query.
///
/// The end of the stream is the end-of-answers signal. An `Err` item is an
/// error signal and is distinct from having zero answers.
pub type AnswerStream = BoxStream<'static, EngineResult<Bindings>>;

/// Errors reported by a logic backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The query produced more answers than the engine is willing to enumerate.
    #[error("Query exceeded answer limit of {limit}")]
    AnswerLimitExceeded { limit: usize },

    /// Resolution went deeper than the configured bound.
    #[error("Resolution exceeded depth {depth}")]
    DepthExceeded { depth: usize },

    /// A clause head may not be negated.
    #[error("Cannot store a negated clause head: {predicate}")]
    NegatedHead { predicate: String },

    /// Any other failure reported by the backend.
    #[error("Engine failure: {0}")]
    Backend(String),
}

/// Limits applied by an engine session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum resolution depth before a query fails.
    pub max_depth: usize,

    /// Maximum number of answers a single query may enumerate.
    pub max_answers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_answers: 10_000,
        }
    }
}

/// A session of a unification/resolution engine.
///
/// Sessions are shared mutable state: every asserted clause is visible to
/// every later query until retracted.
#[async_trait]
pub trait LogicEngine: Send + Sync {
    /// Add a clause to the session.
    async fn assert_clause(&self, clause: Clause) -> EngineResult<()>;

    /// Remove a clause matching `clause` up to variable renaming.
    ///
    /// Returns whether a clause was removed.
    async fn retract_clause(&self, clause: &Clause) -> EngineResult<bool>;

    /// Start a query for a single literal.
    async fn query(&self, literal: &Literal) -> EngineResult<AnswerStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::AnswerLimitExceeded { limit: 5 };
        assert!(err.to_string().contains("5"));
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 256);
        assert_eq!(config.max_answers, 10_000);
    }
}
