//! In-memory engine session.
//!
//! The session owns an insertion-ordered list of clauses and answers
//! queries by depth-first resolution, so answer order follows clause order.

mod resolve;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::engine::{AnswerStream, EngineConfig, EngineError, EngineResult, LogicEngine};
use crate::{Bindings, Clause, Literal};
use resolve::{project, Solver, Substitution};

/// Unique identifier for an engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An owned, in-memory logic session.
///
/// Independent sessions never share clauses.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    id: SessionId,
    config: EngineConfig,
    clauses: RwLock<Vec<Clause>>,
}

impl MemoryEngine {
    /// Create an empty session with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session with the given limits.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the session limits.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of all stored clauses in insertion order.
    pub async fn clauses(&self) -> Vec<Clause> {
        self.clauses.read().await.clone()
    }

    /// Get the number of stored clauses.
    pub async fn clause_count(&self) -> usize {
        self.clauses.read().await.len()
    }
}

#[async_trait]
impl LogicEngine for MemoryEngine {
    async fn assert_clause(&self, clause: Clause) -> EngineResult<()> {
        if clause.head.negated {
            return Err(EngineError::NegatedHead {
                predicate: clause.head.predicate.clone(),
            });
        }

        let mut clauses = self.clauses.write().await;
        let canonical = clause.canonical();
        if clauses.iter().any(|c| c.canonical() == canonical) {
            trace!(session = %self.id, predicate = %clause.head.predicate, "clause already present");
            return Ok(());
        }

        debug!(session = %self.id, predicate = %clause.head.predicate, fact = clause.is_fact(), "assert");
        clauses.push(clause);
        Ok(())
    }

    async fn retract_clause(&self, clause: &Clause) -> EngineResult<bool> {
        let mut clauses = self.clauses.write().await;
        let canonical = clause.canonical();
        match clauses.iter().position(|c| c.canonical() == canonical) {
            Some(index) => {
                debug!(session = %self.id, predicate = %clause.head.predicate, "retract");
                clauses.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn query(&self, literal: &Literal) -> EngineResult<AnswerStream> {
        let clauses = self.clauses.read().await;
        let limit = self.config.max_answers;

        let mut solver = Solver::new(&clauses, &self.config);
        let mut found = Vec::new();
        let outcome = solver.solve(
            vec![literal.clone()],
            Substitution::new(),
            0,
            &mut found,
            limit.saturating_add(1),
        );

        debug!(
            session = %self.id,
            predicate = %literal.predicate,
            answers = found.len(),
            "query"
        );

        let mut items: Vec<EngineResult<Bindings>> = found
            .iter()
            .take(limit)
            .map(|subst| Ok(project(literal, subst)))
            .collect();

        match outcome {
            Err(err) => items.push(Err(err)),
            Ok(()) if found.len() > limit => {
                items.push(Err(EngineError::AnswerLimitExceeded { limit }))
            }
            Ok(()) => {}
        }

        Ok(stream::iter(items).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Term, Value};
    use futures::TryStreamExt;

    fn hungry(name: &str) -> Clause {
        Clause::fact(Literal::new("hungry %", vec![Term::constant(name)]))
    }

    async fn collect(engine: &MemoryEngine, literal: &Literal) -> EngineResult<Vec<Bindings>> {
        engine.query(literal).await?.try_collect().await
    }

    #[tokio::test]
    async fn test_assert_and_query() {
        let engine = MemoryEngine::new();
        engine.assert_clause(hungry("sam")).await.unwrap();

        let answers = collect(&engine, &Literal::new("hungry %", vec![Term::var("x")]))
            .await
            .unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].get("x"), Some(&Value::text("sam")));
    }

    #[tokio::test]
    async fn test_assert_is_idempotent() {
        let engine = MemoryEngine::new();
        engine.assert_clause(hungry("sam")).await.unwrap();
        engine.assert_clause(hungry("sam")).await.unwrap();
        assert_eq!(engine.clause_count().await, 1);
    }

    #[tokio::test]
    async fn test_retract_matches_renamed_rule() {
        let engine = MemoryEngine::new();
        let rule = |v: &str| {
            Clause::rule(
                Literal::new("fed %", vec![Term::var(v)]),
                vec![Literal::new("hungry %", vec![Term::var(v)])],
            )
        };
        engine.assert_clause(rule("x")).await.unwrap();

        assert!(engine.retract_clause(&rule("y")).await.unwrap());
        assert_eq!(engine.clause_count().await, 0);
        assert!(!engine.retract_clause(&rule("y")).await.unwrap());
    }

    #[tokio::test]
    async fn test_negated_head_rejected() {
        let engine = MemoryEngine::new();
        let clause = Clause::fact(Literal::new("hungry %", vec![Term::constant("sam")]).with_negated(true));
        let result = engine.assert_clause(clause).await;
        assert!(matches!(result, Err(EngineError::NegatedHead { .. })));
    }

    #[tokio::test]
    async fn test_answer_limit_reported_after_answers() {
        let engine = MemoryEngine::with_config(EngineConfig {
            max_answers: 2,
            ..EngineConfig::default()
        });
        for name in ["a", "b", "c"] {
            engine.assert_clause(hungry(name)).await.unwrap();
        }

        let items: Vec<_> = engine
            .query(&Literal::new("hungry %", vec![Term::var("x")]))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert_eq!(items[2], Err(EngineError::AnswerLimitExceeded { limit: 2 }));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let first = MemoryEngine::new();
        let second = MemoryEngine::new();
        first.assert_clause(hungry("sam")).await.unwrap();

        assert_ne!(first.id(), second.id());
        let answers = collect(&second, &Literal::new("hungry %", vec![Term::var("x")]))
            .await
            .unwrap();
        assert!(answers.is_empty());
    }
}
