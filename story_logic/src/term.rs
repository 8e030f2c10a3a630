//! Term definitions - the values, literals, and clauses the engine stores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Predicate name of the built-in equality goal `(x) = "value"`.
pub const EQUALS_PREDICATE: &str = "% = %";

/// An engine-native scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Borrow the text of a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// A term is either a logic variable or a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    Var(String),
    Const(Value),
}

impl Term {
    /// Create a variable term.
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    /// Create a constant term.
    pub fn constant(value: impl Into<Value>) -> Self {
        Term::Const(value.into())
    }

    /// Check if this term is a variable.
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }
}

/// A predicate applied to an ordered list of terms.
///
/// Predicate identity is the `(predicate, arity)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub predicate: String,
    pub terms: Vec<Term>,
    /// Negated goals succeed only when their positive form has no solution.
    #[serde(default)]
    pub negated: bool,
}

impl Literal {
    /// Create a positive literal.
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            terms,
            negated: false,
        }
    }

    /// Create the built-in equality goal between two terms.
    pub fn equals(left: Term, right: Term) -> Self {
        Self::new(EQUALS_PREDICATE, vec![left, right])
    }

    /// Set the negation flag.
    pub fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    /// Number of terms.
    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// Check whether two literals name the same predicate.
    pub fn same_predicate(&self, other: &Literal) -> bool {
        self.predicate == other.predicate && self.arity() == other.arity()
    }

    /// Check if this literal is the built-in equality goal.
    pub fn is_equality(&self) -> bool {
        self.predicate == EQUALS_PREDICATE && self.arity() == 2
    }

    /// Distinct variable names in order of first occurrence.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for term in &self.terms {
            if let Term::Var(name) = term {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// A fact (empty body) or rule stored in the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<Literal>,
}

impl Clause {
    /// Create a fact.
    pub fn fact(head: Literal) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }

    /// Create a rule.
    pub fn rule(head: Literal, body: Vec<Literal>) -> Self {
        Self { head, body }
    }

    /// Check if this clause is a fact.
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Rename every variable by order of first occurrence.
    ///
    /// Two clauses that differ only in variable names have equal canonical forms.
    pub fn canonical(&self) -> Clause {
        let mut renames: HashMap<String, String> = HashMap::new();
        let mut rename = |literal: &Literal| Literal {
            predicate: literal.predicate.clone(),
            negated: literal.negated,
            terms: literal
                .terms
                .iter()
                .map(|term| match term {
                    Term::Var(name) => {
                        let next = renames.len();
                        let renamed = renames
                            .entry(name.clone())
                            .or_insert_with(|| format!("_{}", next));
                        Term::Var(renamed.clone())
                    }
                    Term::Const(value) => Term::Const(value.clone()),
                })
                .collect(),
        };

        let head = rename(&self.head);
        let body = self.body.iter().map(&mut rename).collect();
        Clause { head, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::text("sam").to_string(), "sam");
        assert_eq!(Value::Integer(10).to_string(), "10");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_literal_variables_in_order() {
        let literal = Literal::new(
            "% likes % %",
            vec![Term::var("y"), Term::constant("pizza"), Term::var("x")],
        );
        assert_eq!(literal.variables(), vec!["y", "x"]);
        assert_eq!(literal.arity(), 3);
    }

    #[test]
    fn test_same_predicate_respects_arity() {
        let a = Literal::new("likes % %", vec![Term::var("x"), Term::var("y")]);
        let b = Literal::new("likes % %", vec![Term::var("x")]);
        assert!(!a.same_predicate(&b));
    }

    #[test]
    fn test_canonical_clauses_ignore_variable_names() {
        let a = Clause::rule(
            Literal::new("likes % %", vec![Term::var("x"), Term::constant("pizza")]),
            vec![Literal::new("hungry %", vec![Term::var("x")])],
        );
        let b = Clause::rule(
            Literal::new("likes % %", vec![Term::var("who"), Term::constant("pizza")]),
            vec![Literal::new("hungry %", vec![Term::var("who")])],
        );
        assert_ne!(a, b);
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_equality_literal() {
        let literal = Literal::equals(Term::var("x"), Term::constant("sam"));
        assert!(literal.is_equality());
        assert!(!Literal::new("x", vec![]).is_equality());
    }
}
