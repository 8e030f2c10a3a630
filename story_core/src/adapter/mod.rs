//! Logic adapter - turns statement text into engine clauses and queries.
//!
//! The adapter is the only place that knows how parsed lines map onto the
//! engine's literals and clauses. Answers come back as records keyed by the
//! visible variable names of the query, de-duplicated in engine order.

mod directive;

pub use directive::*;

use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use story_logic::{Bindings, Clause, Literal, LogicEngine, Term, Value};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::grammar::{parse, ParsedLine, Statement, Token, PLACEHOLDER};
use crate::{Error, Result};

use directive::{arg_var, meta_predicate, COMMAND_VAR, PREDICATE_VAR};

/// Leading word of the synthetic rule used to ask a conjunction.
const ASK_WORD: &str = "__ask";

/// Bridges statement text to a [`LogicEngine`].
pub struct LogicAdapter<E: ?Sized> {
    engine: Arc<E>,
    fresh: AtomicUsize,
}

impl<E: LogicEngine + ?Sized> LogicAdapter<E> {
    /// Create an adapter over a shared engine session.
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            fresh: AtomicUsize::new(0),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Store every clause the text describes.
    ///
    /// A claim is one fact, a rule is one rule, and a multistatement is one
    /// fact per statement. Nothing is stored if the text fails to parse.
    pub async fn assert_text(&self, text: &str) -> Result<()> {
        let clauses = self.clauses(&parse(text)?, text)?;
        for clause in clauses {
            debug!(clause = %text, "assert");
            self.engine
                .assert_clause(clause)
                .await
                .map_err(|e| Error::from_engine(e, text))?;
        }
        Ok(())
    }

    /// Remove every clause the text describes. Missing clauses are ignored.
    pub async fn retract_text(&self, text: &str) -> Result<()> {
        let clauses = self.clauses(&parse(text)?, text)?;
        for clause in &clauses {
            let removed = self
                .engine
                .retract_clause(clause)
                .await
                .map_err(|e| Error::from_engine(e, text))?;
            debug!(clause = %text, removed, "retract");
        }
        Ok(())
    }

    /// Ask a query, returning at most `limit` distinct answers.
    pub async fn ask(&self, text: &str, limit: Option<usize>) -> Result<Vec<Bindings>> {
        let parsed = parse(text)?;
        self.ask_parsed(&parsed, limit).await
    }

    /// Ask an already parsed query.
    pub async fn ask_parsed(
        &self,
        parsed: &ParsedLine,
        limit: Option<usize>,
    ) -> Result<Vec<Bindings>> {
        match parsed {
            ParsedLine::Claim { statement } => {
                let text = statement.to_string();
                let literal = self.literal(statement);
                self.collect(&literal, &statement.variables(), limit, &text)
                    .await
            }
            ParsedLine::MultiStatement { statements } => {
                self.ask_conjunction(statements, limit).await
            }
            ParsedLine::Rule { head, body } => Err(Error::NotAQuery {
                text: rule_text(head, body),
            }),
        }
    }

    /// Run a query for its side effects, discarding the answers.
    pub async fn drain(&self, parsed: &ParsedLine) -> Result<usize> {
        Ok(self.ask_parsed(parsed, None).await?.len())
    }

    /// Every currently derivable meta directive, arity by arity.
    pub async fn collect_meta(&self) -> Result<Vec<MetaDirective>> {
        let mut directives = Vec::new();
        for arg_count in 0..=MAX_META_ARGS {
            let arg_names: Vec<String> = (0..arg_count).map(arg_var).collect();
            let mut terms = vec![Term::var(COMMAND_VAR), Term::var(PREDICATE_VAR)];
            terms.extend(arg_names.iter().map(Term::var));
            let literal = Literal::new(meta_predicate(arg_count), terms);

            let mut visible = vec![COMMAND_VAR, PREDICATE_VAR];
            visible.extend(arg_names.iter().map(String::as_str));

            for answer in self
                .collect(&literal, &visible, None, &literal.predicate)
                .await?
            {
                if let Some(directive) = MetaDirective::from_bindings(&answer, arg_count) {
                    directives.push(directive);
                }
            }
        }
        trace!(count = directives.len(), "collected meta directives");
        Ok(directives)
    }

    /// Assert an action, dispatch the directives it newly makes derivable,
    /// then retract the action.
    ///
    /// Dispatch stops at the first unknown command. Side effects applied
    /// before the failure stay in place; the action is retracted either way.
    pub async fn perform(&self, text: &str) -> Result<Vec<MetaDirective>> {
        let clauses = self.clauses(&parse(text)?, text)?;
        let baseline = self.collect_meta().await?;

        let mut asserted = Ok(());
        for clause in &clauses {
            asserted = self.engine.assert_clause(clause.clone()).await;
            if asserted.is_err() {
                break;
            }
        }

        let outcome = match asserted {
            Ok(()) => self.dispatch_new(&baseline).await,
            Err(e) => Err(Error::from_engine(e, text)),
        };

        for clause in &clauses {
            self.engine
                .retract_clause(clause)
                .await
                .map_err(|e| Error::from_engine(e, text))?;
        }
        outcome
    }

    async fn dispatch_new(&self, baseline: &[MetaDirective]) -> Result<Vec<MetaDirective>> {
        let directives: Vec<MetaDirective> = self
            .collect_meta()
            .await?
            .into_iter()
            .filter(|d| !baseline.contains(d))
            .collect();

        for directive in &directives {
            let effect = SideEffect::from_command(&directive.command)?;
            let fact = Clause::fact(Literal::new(
                directive.predicate.clone(),
                directive.args.iter().cloned().map(Term::Const).collect(),
            ));
            info!(command = %directive.command, predicate = %directive.predicate, "dispatch directive");
            let applied = match effect {
                SideEffect::Assert => self.engine.assert_clause(fact).await,
                SideEffect::Retract => self.engine.retract_clause(&fact).await.map(|_| ()),
            };
            applied.map_err(|e| Error::from_engine(e, &directive.predicate))?;
        }
        Ok(directives)
    }

    async fn ask_conjunction(
        &self,
        statements: &[Statement],
        limit: Option<usize>,
    ) -> Result<Vec<Bindings>> {
        let mut visible: Vec<&str> = Vec::new();
        for statement in statements {
            for name in statement.variables() {
                if !visible.contains(&name) {
                    visible.push(name);
                }
            }
        }

        let mut words = vec![format!("{}{}", ASK_WORD, Uuid::new_v4().simple())];
        words.extend(std::iter::repeat(PLACEHOLDER.to_string()).take(visible.len()));
        let head = Literal::new(words.join(" "), visible.iter().map(|v| Term::var(*v)).collect());
        let body = statements.iter().map(|s| self.literal(s)).collect();
        let rule = Clause::rule(head.clone(), body);
        let text = statements
            .iter()
            .map(Statement::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        self.engine
            .assert_clause(rule.clone())
            .await
            .map_err(|e| Error::from_engine(e, &text))?;
        let answers = self.collect(&head, &visible, limit, &text).await;
        let retracted = self.engine.retract_clause(&rule).await;

        let answers = answers?;
        retracted.map_err(|e| Error::from_engine(e, &text))?;
        Ok(answers)
    }

    async fn collect(
        &self,
        literal: &Literal,
        visible: &[&str],
        limit: Option<usize>,
        text: &str,
    ) -> Result<Vec<Bindings>> {
        let mut stream = self
            .engine
            .query(literal)
            .await
            .map_err(|e| Error::from_engine(e, text))?;

        let mut answers: Vec<Bindings> = Vec::new();
        while limit.map_or(true, |l| answers.len() < l) {
            let Some(item) = stream.next().await else {
                break;
            };
            let mut record = item.map_err(|e| Error::from_engine(e, text))?;
            record.retain(|name| visible.contains(&name));
            if !answers.contains(&record) {
                answers.push(record);
            }
        }
        debug!(query = %text, answers = answers.len(), "ask");
        Ok(answers)
    }

    fn clauses(&self, parsed: &ParsedLine, text: &str) -> Result<Vec<Clause>> {
        let negated = || Error::NegatedClause {
            text: text.to_string(),
        };
        match parsed {
            ParsedLine::Claim { statement } => {
                if statement.negated {
                    return Err(negated());
                }
                Ok(vec![Clause::fact(self.literal(statement))])
            }
            ParsedLine::Rule { head, body } => {
                if head.negated {
                    return Err(negated());
                }
                let body = body.iter().map(|s| self.literal(s)).collect();
                Ok(vec![Clause::rule(self.literal(head), body)])
            }
            ParsedLine::MultiStatement { statements } => {
                if statements.iter().any(|s| s.negated) {
                    return Err(negated());
                }
                Ok(statements
                    .iter()
                    .map(|s| Clause::fact(self.literal(s)))
                    .collect())
            }
        }
    }

    fn literal(&self, statement: &Statement) -> Literal {
        let terms = statement
            .tokens
            .iter()
            .map(|token| match token {
                Token::Const { value } => Term::Const(Value::text(value.clone())),
                Token::Variable { name } if name.is_empty() => Term::Var(self.fresh_var()),
                Token::Variable { name } => Term::var(name.clone()),
            })
            .collect();
        Literal::new(statement.predicate(), terms).with_negated(statement.negated)
    }

    /// A variable name no source text can produce: variable names never contain `(`.
    fn fresh_var(&self) -> String {
        format!("(anon{})", self.fresh.fetch_add(1, Ordering::Relaxed))
    }
}

fn rule_text(head: &Statement, body: &[Statement]) -> String {
    let body = body
        .iter()
        .map(Statement::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} if {}", head, body)
}
