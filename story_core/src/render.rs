//! Async renderer - walks a block tree against a logic session.
//!
//! Rendering is sequential: every query and passage lookup completes before
//! the next sibling node is rendered, so output follows source order and
//! `each` iterations see the side effects of earlier iterations.
//!
//! A propagating error aborts the whole render; partial output is dropped.

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use story_logic::{Bindings, LogicEngine};
use tracing::{debug, warn};

use crate::adapter::LogicAdapter;
use crate::config::RenderConfig;
use crate::grammar::{parse, ParsedLine, Statement};
use crate::passage::PassageResolver;
use crate::template::{render_line, substitute_params, BlockNode, TemplateParser};
use crate::{Error, Result};

/// Per-render state shared by every node of one passage body.
struct Frame<'a> {
    /// Values for `(name)` parameters on command lines.
    params: &'a Bindings,
    /// Number of enclosing `display` directives.
    depth: usize,
}

/// Renders templates against a logic engine and a passage resolver.
pub struct Renderer<E: ?Sized, P: ?Sized> {
    adapter: LogicAdapter<E>,
    passages: Arc<P>,
    config: RenderConfig,
}

impl<E, P> Renderer<E, P>
where
    E: LogicEngine + ?Sized,
    P: PassageResolver + ?Sized,
{
    /// Create a renderer with the default configuration.
    pub fn new(engine: Arc<E>, passages: Arc<P>) -> Self {
        Self {
            adapter: LogicAdapter::new(engine),
            passages,
            config: RenderConfig::default(),
        }
    }

    /// Set the render configuration.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// The adapter used for every query this renderer issues.
    pub fn adapter(&self) -> &LogicAdapter<E> {
        &self.adapter
    }

    /// Get the render configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a template body. `params` seed the root context.
    pub async fn render(&self, body: &str, params: &Bindings) -> Result<String> {
        self.render_body(body, params, 0).await
    }

    /// Resolve a passage by name and render its body.
    pub async fn render_passage(&self, name: &str, params: &Bindings) -> Result<String> {
        let resolved = self.passages.resolve(name, params).await?;
        debug!(passage = %resolved.name, "render passage");
        self.render_body(&resolved.body, &resolved.context, 0).await
    }

    fn render_body<'a>(
        &'a self,
        body: &'a str,
        params: &'a Bindings,
        depth: usize,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let nodes = TemplateParser::new(&self.config).parse(body)?;
            let frame = Frame { params, depth };
            self.render_nodes(&nodes, params, &frame).await
        }
        .boxed()
    }

    fn render_nodes<'a>(
        &'a self,
        nodes: &'a [BlockNode],
        context: &'a Bindings,
        frame: &'a Frame<'a>,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let mut output = String::new();
            for node in nodes {
                output.push_str(&self.render_node(node, context, frame).await?);
            }
            Ok(output)
        }
        .boxed()
    }

    async fn render_node(
        &self,
        node: &BlockNode,
        context: &Bindings,
        frame: &Frame<'_>,
    ) -> Result<String> {
        match node {
            BlockNode::Print { text } => Ok(render_line(text, context) + "\n"),

            BlockNode::If {
                query,
                body,
                else_body,
            } => {
                let query = substitute_params(query, frame.params);
                let answers = self.adapter.ask(&query, Some(self.config.if_limit)).await?;
                match answers.first() {
                    Some(answer) => {
                        let child = context.overlay(answer);
                        self.render_nodes(body, &child, frame).await
                    }
                    None => self.render_else(else_body, context, frame).await,
                }
            }

            BlockNode::Each {
                query,
                body,
                else_body,
            } => {
                let query = substitute_params(query, frame.params);
                let limit = self.config.each_limit;
                let answers = self
                    .adapter
                    .ask(&query, Some(limit.saturating_add(1)))
                    .await?;
                if answers.len() > limit {
                    return Err(Error::AnswerLimitExceeded { query, limit });
                }
                if answers.is_empty() {
                    return self.render_else(else_body, context, frame).await;
                }
                let mut output = String::new();
                for answer in &answers {
                    let child = context.overlay(answer);
                    output.push_str(&self.render_nodes(body, &child, frame).await?);
                }
                Ok(output)
            }

            BlockNode::Do { query } => {
                let query = substitute_params(query, frame.params);
                let parsed = with_context_constraints(parse(&query)?, context);
                let drained = self.adapter.drain(&parsed).await?;
                debug!(query = %query, answers = drained, "do");
                Ok(String::new())
            }

            BlockNode::Display { query, optional } => {
                match self.display(query, context, frame).await {
                    Ok(text) => Ok(text),
                    Err(err) if *optional => {
                        warn!(target_passage = %query, error = %err, "optional display failed");
                        Ok(String::new())
                    }
                    Err(err) => Err(err),
                }
            }

            BlockNode::Assert { text } => {
                let text = substitute_params(text, frame.params);
                self.adapter.assert_text(&text).await?;
                Ok(String::new())
            }

            BlockNode::Retract { text } => {
                let text = substitute_params(text, frame.params);
                self.adapter.retract_text(&text).await?;
                Ok(String::new())
            }

            BlockNode::Perform { text } => {
                let text = substitute_params(text, frame.params);
                let dispatched = self.adapter.perform(&text).await?;
                debug!(action = %text, directives = dispatched.len(), "perform");
                Ok(String::new())
            }
        }
    }

    async fn render_else(
        &self,
        else_body: &Option<Vec<BlockNode>>,
        context: &Bindings,
        frame: &Frame<'_>,
    ) -> Result<String> {
        match else_body {
            Some(nodes) => self.render_nodes(nodes, context, frame).await,
            None => Ok(String::new()),
        }
    }

    async fn display(&self, query: &str, context: &Bindings, frame: &Frame<'_>) -> Result<String> {
        if frame.depth >= self.config.max_display_depth {
            return Err(Error::DisplayDepthExceeded {
                depth: self.config.max_display_depth,
            });
        }
        let name = substitute_params(query, frame.params);
        let resolved = self.passages.resolve(&name, context).await?;
        debug!(passage = %resolved.name, depth = frame.depth + 1, "display");
        self.render_body(&resolved.body, &resolved.context, frame.depth + 1)
            .await
    }
}

/// Prefix a query with `(name) = "value"` constraints for every context binding.
fn with_context_constraints(parsed: ParsedLine, context: &Bindings) -> ParsedLine {
    if context.is_empty() {
        return parsed;
    }
    let mut statements: Vec<Statement> = context
        .iter()
        .map(|(name, value)| Statement::unify(name.clone(), value.to_string()))
        .collect();
    match parsed {
        ParsedLine::Claim { statement } => statements.push(statement),
        ParsedLine::MultiStatement { statements: rest } => statements.extend(rest),
        rule @ ParsedLine::Rule { .. } => return rule,
    }
    ParsedLine::MultiStatement { statements }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passage::PassageStore;
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use std::sync::Mutex;
    use story_logic::{
        AnswerStream, Clause, EngineError, EngineResult, Literal, MemoryEngine, Term,
    };

    /// Records every clause and query; `item %` answers `x = "1"`.
    #[derive(Default)]
    struct RecordingEngine {
        asserted: Mutex<Vec<Clause>>,
        queried: Mutex<Vec<String>>,
        fail_queries: bool,
    }

    #[async_trait]
    impl LogicEngine for RecordingEngine {
        async fn assert_clause(&self, clause: Clause) -> EngineResult<()> {
            self.asserted.lock().unwrap().push(clause);
            Ok(())
        }

        async fn retract_clause(&self, _clause: &Clause) -> EngineResult<bool> {
            Ok(true)
        }

        async fn query(&self, literal: &Literal) -> EngineResult<AnswerStream> {
            self.queried.lock().unwrap().push(literal.predicate.clone());
            let answers = if self.fail_queries {
                vec![Err(EngineError::Backend("type error".to_string()))]
            } else if literal.predicate == "item %" {
                vec![Ok(Bindings::new().with("x", "1"))]
            } else {
                Vec::new()
            };
            Ok(stream::iter(answers).boxed())
        }
    }

    fn renderer(passages: PassageStore) -> Renderer<MemoryEngine, PassageStore> {
        Renderer::new(Arc::new(MemoryEngine::new()), Arc::new(passages))
    }

    #[tokio::test]
    async fn test_print_with_params() {
        let renderer = renderer(PassageStore::new());
        let params = Bindings::new().with("name", "sam");
        let output = renderer.render("hello {name}\nbye", &params).await.unwrap();
        assert_eq!(output, "hello sam\nbye\n");
    }

    #[tokio::test]
    async fn test_each_renders_in_answer_order() {
        let renderer = renderer(PassageStore::new());
        for item in ["lamp", "rope", "key"] {
            renderer
                .adapter()
                .assert_text(&format!("carries \"sam\" \"{}\"", item))
                .await
                .unwrap();
        }
        let output = renderer
            .render("\\each carries \"sam\" (thing)\n- {thing}\n\\end", &Bindings::new())
            .await
            .unwrap();
        assert_eq!(output, "- lamp\n- rope\n- key\n");
    }

    #[tokio::test]
    async fn test_each_limit() {
        let config = RenderConfig {
            each_limit: 2,
            ..RenderConfig::default()
        };
        let renderer = renderer(PassageStore::new()).with_config(config);
        for n in ["1", "2"] {
            renderer.adapter().assert_text(&format!("num \"{}\"", n)).await.unwrap();
        }
        let template = "\\each num (n)\n{n}\n\\end";
        let output = renderer.render(template, &Bindings::new()).await.unwrap();
        assert_eq!(output, "1\n2\n");

        renderer.adapter().assert_text("num \"3\"").await.unwrap();
        let result = renderer.render(template, &Bindings::new()).await;
        assert!(matches!(result, Err(Error::AnswerLimitExceeded { limit: 2, .. })));
    }

    #[tokio::test]
    async fn test_params_substitute_into_queries() {
        let renderer = renderer(PassageStore::new());
        renderer.adapter().assert_text("in \"sam\" \"hall\"").await.unwrap();
        renderer.adapter().assert_text("in \"ana\" \"yard\"").await.unwrap();

        let params = Bindings::new().with("room", "yard");
        let output = renderer
            .render("\\each in (who) (room)\n{who} is in the {room}\n\\end", &params)
            .await
            .unwrap();
        assert_eq!(output, "ana is in the yard\n");
    }

    #[tokio::test]
    async fn test_do_constrains_query_with_context() {
        let engine = Arc::new(RecordingEngine::default());
        let renderer = Renderer::new(engine.clone(), Arc::new(PassageStore::new()));

        let output = renderer
            .render("\\each item (x)\n\\do bump (x)\n\\end", &Bindings::new())
            .await
            .unwrap();
        assert_eq!(output, "");

        let asserted = engine.asserted.lock().unwrap();
        let rule = asserted
            .iter()
            .find(|c| c.head.predicate.starts_with("__ask"))
            .expect("do asks through a conjunction");
        assert_eq!(
            rule.body,
            vec![
                Literal::equals(Term::var("x"), Term::constant("1")),
                Literal::new("bump %", vec![Term::var("x")]),
            ]
        );
        assert!(engine
            .queried
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.starts_with("__ask")));
    }

    #[tokio::test]
    async fn test_do_propagates_engine_error() {
        let engine = Arc::new(RecordingEngine {
            fail_queries: true,
            ..RecordingEngine::default()
        });
        let renderer = Renderer::new(engine, Arc::new(PassageStore::new()));

        let result = renderer
            .render("before\n\\do bump (x)\nafter", &Bindings::new())
            .await;
        assert!(matches!(result, Err(Error::Engine(EngineError::Backend(_)))));
    }

    #[tokio::test]
    async fn test_assert_and_retract_lines() {
        let renderer = renderer(PassageStore::new());
        let output = renderer
            .render(
                "\\assert door is open\n\\if door is open\nopen\n\\end\n\\retract door is open\n\\if door is open\nstill open\n\\else\nclosed\n\\end",
                &Bindings::new(),
            )
            .await
            .unwrap();
        assert_eq!(output, "open\nclosed\n");
    }

    #[tokio::test]
    async fn test_display_renders_passage_in_place() {
        let passages = PassageStore::new().with_passage("footer", "-- {who} --");
        let renderer = renderer(passages);
        let params = Bindings::new().with("who", "sam");
        let output = renderer
            .render("top\n\\display footer\nbottom", &params)
            .await
            .unwrap();
        assert_eq!(output, "top\n-- sam --\nbottom\n");
    }

    #[tokio::test]
    async fn test_display_missing_passage() {
        let renderer = renderer(PassageStore::new());
        let result = renderer.render("\\display nowhere", &Bindings::new()).await;
        assert!(matches!(result, Err(Error::PassageNotFound { .. })));

        let output = renderer
            .render("a\n\\display? nowhere\nb", &Bindings::new())
            .await
            .unwrap();
        assert_eq!(output, "a\nb\n");
    }

    #[tokio::test]
    async fn test_display_depth_bound() {
        let passages = PassageStore::new().with_passage("loop", "\\display loop");
        let renderer = renderer(passages);
        let result = renderer.render_passage("loop", &Bindings::new()).await;
        assert!(matches!(result, Err(Error::DisplayDepthExceeded { depth: 16 })));
    }

    #[tokio::test]
    async fn test_error_discards_partial_output() {
        let renderer = renderer(PassageStore::new());
        let result = renderer
            .render("before\n\\if likes \"sam\n\\end", &Bindings::new())
            .await;
        assert!(matches!(result, Err(Error::Grammar(_))));
    }

    #[test]
    fn test_context_constraints_prefix_query() {
        let parsed = parse("bump (x)").unwrap();
        let context = Bindings::new().with("x", "1");
        match with_context_constraints(parsed, &context) {
            ParsedLine::MultiStatement { statements } => {
                assert_eq!(statements.len(), 2);
                assert_eq!(statements[0].to_string(), "(x) = \"1\"");
            }
            other => panic!("expected multistatement, got {:?}", other),
        }
    }
}
