//! Depth-first SLD resolution over an in-memory clause list.

use std::collections::HashMap;

use crate::engine::{EngineConfig, EngineError, EngineResult};
use crate::{Bindings, Clause, Literal, Term};

/// Variable bindings accumulated along one resolution branch.
pub(crate) type Substitution = HashMap<String, Term>;

/// Follow variable bindings until reaching a constant or an unbound variable.
fn walk(term: &Term, subst: &Substitution) -> Term {
    let mut current = term;
    loop {
        match current {
            Term::Var(name) => match subst.get(name) {
                Some(next) => current = next,
                None => return current.clone(),
            },
            Term::Const(_) => return current.clone(),
        }
    }
}

fn unify(a: &Term, b: &Term, subst: &mut Substitution) -> bool {
    match (walk(a, subst), walk(b, subst)) {
        (Term::Var(x), Term::Var(y)) if x == y => true,
        (Term::Var(name), term) | (term, Term::Var(name)) => {
            subst.insert(name, term);
            true
        }
        (Term::Const(x), Term::Const(y)) => x == y,
    }
}

fn unify_all(left: &[Term], right: &[Term], subst: &mut Substitution) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| unify(a, b, subst))
}

/// Project a substitution onto the variables of the query literal.
///
/// Variables left unbound by the answer are omitted.
pub(crate) fn project(literal: &Literal, subst: &Substitution) -> Bindings {
    let mut bindings = Bindings::new();
    for name in literal.variables() {
        if let Term::Const(value) = walk(&Term::var(name), subst) {
            bindings.insert(name, value);
        }
    }
    bindings
}

/// One query's worth of resolution state.
pub(crate) struct Solver<'a> {
    clauses: &'a [Clause],
    config: &'a EngineConfig,
    renames: usize,
}

impl<'a> Solver<'a> {
    pub(crate) fn new(clauses: &'a [Clause], config: &'a EngineConfig) -> Self {
        Self {
            clauses,
            config,
            renames: 0,
        }
    }

    /// Give every variable in a stored clause a name unique to this use.
    fn rename(&mut self, clause: &Clause) -> Clause {
        self.renames += 1;
        let suffix = self.renames;
        let rename = |literal: &Literal| Literal {
            predicate: literal.predicate.clone(),
            negated: literal.negated,
            terms: literal
                .terms
                .iter()
                .map(|term| match term {
                    Term::Var(name) => Term::Var(format!("{}#{}", name, suffix)),
                    constant => constant.clone(),
                })
                .collect(),
        };
        Clause {
            head: rename(&clause.head),
            body: clause.body.iter().map(rename).collect(),
        }
    }

    /// Solve `goals` left to right, pushing each complete substitution to `out`.
    ///
    /// Stops early once `out` holds `want` answers.
    pub(crate) fn solve(
        &mut self,
        goals: Vec<Literal>,
        subst: Substitution,
        depth: usize,
        out: &mut Vec<Substitution>,
        want: usize,
    ) -> EngineResult<()> {
        if out.len() >= want {
            return Ok(());
        }

        let Some((goal, rest)) = goals.split_first() else {
            out.push(subst);
            return Ok(());
        };

        if depth > self.config.max_depth {
            return Err(EngineError::DepthExceeded {
                depth: self.config.max_depth,
            });
        }

        // Negation as failure
        if goal.negated {
            let positive = goal.clone().with_negated(false);
            let mut probe = Vec::new();
            self.solve(vec![positive], subst.clone(), depth + 1, &mut probe, 1)?;
            if probe.is_empty() {
                self.solve(rest.to_vec(), subst, depth, out, want)?;
            }
            return Ok(());
        }

        if goal.is_equality() {
            let mut next = subst;
            if unify(&goal.terms[0], &goal.terms[1], &mut next) {
                self.solve(rest.to_vec(), next, depth, out, want)?;
            }
            return Ok(());
        }

        let clauses = self.clauses;
        for clause in clauses.iter().filter(|c| c.head.same_predicate(goal)) {
            let renamed = self.rename(clause);
            let mut next = subst.clone();
            if !unify_all(&goal.terms, &renamed.head.terms, &mut next) {
                continue;
            }

            let mut subgoals = renamed.body;
            subgoals.extend_from_slice(rest);
            self.solve(subgoals, next, depth + 1, out, want)?;

            if out.len() >= want {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn fact(predicate: &str, args: &[&str]) -> Clause {
        Clause::fact(Literal::new(
            predicate,
            args.iter().map(|a| Term::constant(*a)).collect(),
        ))
    }

    fn solve_all(clauses: &[Clause], goal: Literal) -> EngineResult<Vec<Bindings>> {
        let config = EngineConfig::default();
        let mut solver = Solver::new(clauses, &config);
        let mut out = Vec::new();
        solver.solve(vec![goal.clone()], Substitution::new(), 0, &mut out, usize::MAX)?;
        Ok(out.iter().map(|s| project(&goal, s)).collect())
    }

    #[test]
    fn test_unify_binds_variable() {
        let mut subst = Substitution::new();
        assert!(unify(&Term::var("x"), &Term::constant("sam"), &mut subst));
        assert_eq!(walk(&Term::var("x"), &subst), Term::Const(Value::text("sam")));
        assert!(!unify(&Term::var("x"), &Term::constant("alex"), &mut subst));
    }

    #[test]
    fn test_facts_in_insertion_order() {
        let clauses = vec![
            fact("hungry %", &["sam"]),
            fact("hungry %", &["alex"]),
        ];
        let answers = solve_all(&clauses, Literal::new("hungry %", vec![Term::var("who")])).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].get("who"), Some(&Value::text("sam")));
        assert_eq!(answers[1].get("who"), Some(&Value::text("alex")));
    }

    #[test]
    fn test_rule_resolution() {
        let clauses = vec![
            Clause::rule(
                Literal::new("likes % %", vec![Term::var("x"), Term::constant("pizza")]),
                vec![Literal::new("hungry %", vec![Term::var("x")])],
            ),
            fact("hungry %", &["sam"]),
        ];
        let answers = solve_all(
            &clauses,
            Literal::new("likes % %", vec![Term::var("who"), Term::constant("pizza")]),
        )
        .unwrap();
        assert_eq!(answers, vec![Bindings::new().with("who", "sam")]);
    }

    #[test]
    fn test_negation_as_failure() {
        let clauses = vec![
            fact("person %", &["sam"]),
            fact("person %", &["alex"]),
            fact("full %", &["alex"]),
            Clause::rule(
                Literal::new("hungry %", vec![Term::var("x")]),
                vec![
                    Literal::new("person %", vec![Term::var("x")]),
                    Literal::new("full %", vec![Term::var("x")]).with_negated(true),
                ],
            ),
        ];
        let answers = solve_all(&clauses, Literal::new("hungry %", vec![Term::var("x")])).unwrap();
        assert_eq!(answers, vec![Bindings::new().with("x", "sam")]);
    }

    #[test]
    fn test_equality_goal() {
        let answers = solve_all(&[], Literal::equals(Term::var("x"), Term::constant("sam"))).unwrap();
        assert_eq!(answers, vec![Bindings::new().with("x", "sam")]);
    }

    #[test]
    fn test_left_recursion_hits_depth_bound() {
        let clauses = vec![Clause::rule(
            Literal::new("loop %", vec![Term::var("x")]),
            vec![Literal::new("loop %", vec![Term::var("x")])],
        )];
        let result = solve_all(&clauses, Literal::new("loop %", vec![Term::var("x")]));
        assert!(matches!(result, Err(EngineError::DepthExceeded { .. })));
    }
}
