//! Block parser - turns a template body into a tree of block nodes.
//!
//! Lines starting with the command escape (`\` by default) are commands;
//! every other line is printed. `if` and `each` open a block that is
//! closed by `end`, optionally split by `else`.

mod placeholder;

pub use placeholder::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::RenderConfig;

/// A node of the parsed template tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BlockNode {
    /// A line of text with `{name}` placeholders.
    Print { text: String },
    /// Render `body` with the first answer, or `else_body` when there is none.
    If {
        query: String,
        body: Vec<BlockNode>,
        else_body: Option<Vec<BlockNode>>,
    },
    /// Render `body` once per answer, or `else_body` when there is none.
    Each {
        query: String,
        body: Vec<BlockNode>,
        else_body: Option<Vec<BlockNode>>,
    },
    /// Run a query for its side effects.
    Do { query: String },
    /// Render another passage in place. Optional displays swallow failures.
    Display { query: String, optional: bool },
    /// Store the clauses described by `text`.
    Assert { text: String },
    /// Remove the clauses described by `text`.
    Retract { text: String },
    /// Fire `text` as a transient action.
    Perform { text: String },
}

/// Structural problems found while parsing a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("line {line}: `{command}` has no open block")]
    Stray { line: usize, command: String },

    #[error("line {line}: block already has an `else`")]
    DuplicateElse { line: usize },

    #[error("line {line}: `{command}` block is never closed")]
    Unclosed { line: usize, command: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Each,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Each => "each",
        }
    }
}

/// An open `if`/`each` collecting its children.
#[derive(Debug)]
struct Frame {
    kind: BlockKind,
    query: String,
    line: usize,
    body: Vec<BlockNode>,
    else_body: Option<Vec<BlockNode>>,
}

impl Frame {
    fn new(kind: BlockKind, query: String, line: usize) -> Self {
        Self {
            kind,
            query,
            line,
            body: Vec::new(),
            else_body: None,
        }
    }

    fn push(&mut self, node: BlockNode) {
        match &mut self.else_body {
            Some(else_body) => else_body.push(node),
            None => self.body.push(node),
        }
    }

    fn close(self) -> BlockNode {
        match self.kind {
            BlockKind::If => BlockNode::If {
                query: self.query,
                body: self.body,
                else_body: self.else_body,
            },
            BlockKind::Each => BlockNode::Each {
                query: self.query,
                body: self.body,
                else_body: self.else_body,
            },
        }
    }
}

/// Stack of open blocks over the root node list.
#[derive(Debug, Default)]
struct Builder {
    root: Vec<BlockNode>,
    open: Vec<Frame>,
    problems: Vec<TemplateError>,
}

impl Builder {
    fn push(&mut self, node: BlockNode) {
        match self.open.last_mut() {
            Some(frame) => frame.push(node),
            None => self.root.push(node),
        }
    }

    fn open(&mut self, kind: BlockKind, query: String, line: usize) {
        self.open.push(Frame::new(kind, query, line));
    }

    fn split_else(&mut self, line: usize) {
        match self.open.last_mut() {
            Some(frame) if frame.else_body.is_some() => {
                self.problems.push(TemplateError::DuplicateElse { line });
            }
            Some(frame) => frame.else_body = Some(Vec::new()),
            None => self.problems.push(TemplateError::Stray {
                line,
                command: "else".to_string(),
            }),
        }
    }

    fn close(&mut self, line: usize) {
        match self.open.pop() {
            Some(frame) => {
                let node = frame.close();
                self.push(node);
            }
            None => self.problems.push(TemplateError::Stray {
                line,
                command: "end".to_string(),
            }),
        }
    }

    fn finish(mut self) -> (Vec<BlockNode>, Vec<TemplateError>) {
        while let Some(frame) = self.open.pop() {
            self.problems.push(TemplateError::Unclosed {
                line: frame.line,
                command: frame.kind.keyword().to_string(),
            });
            let node = frame.close();
            self.push(node);
        }
        (self.root, self.problems)
    }
}

/// Line-oriented template parser.
#[derive(Debug, Clone)]
pub struct TemplateParser {
    escape: char,
    strict: bool,
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self::new(&RenderConfig::default())
    }
}

impl TemplateParser {
    /// Create a parser using the escape character and strictness from `config`.
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            escape: config.command_escape,
            strict: config.strict_blocks,
        }
    }

    /// Set strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse a template body.
    ///
    /// In strict mode the first structural problem is returned as an error.
    /// Otherwise stray `else`/`end` lines are ignored and unclosed blocks
    /// are closed at the end of input.
    pub fn parse(&self, body: &str) -> Result<Vec<BlockNode>, TemplateError> {
        let (nodes, mut problems) = self.build(body);
        if self.strict && !problems.is_empty() {
            return Err(problems.remove(0));
        }
        for problem in &problems {
            warn!(%problem, "recovered malformed template");
        }
        Ok(nodes)
    }

    fn build(&self, body: &str) -> (Vec<BlockNode>, Vec<TemplateError>) {
        let mut builder = Builder::default();
        for (index, line) in body.lines().enumerate() {
            let number = index + 1;
            let Some(command) = line.strip_prefix(self.escape) else {
                builder.push(BlockNode::Print {
                    text: line.to_string(),
                });
                continue;
            };

            let (word, rest) = match command.split_once(char::is_whitespace) {
                Some((word, rest)) => (word, rest.trim().to_string()),
                None => (command.trim_end(), String::new()),
            };
            match word {
                "if" => builder.open(BlockKind::If, rest, number),
                "each" => builder.open(BlockKind::Each, rest, number),
                "else" => builder.split_else(number),
                "end" => builder.close(number),
                "do" => builder.push(BlockNode::Do { query: rest }),
                "display" => builder.push(BlockNode::Display {
                    query: rest,
                    optional: false,
                }),
                "display?" => builder.push(BlockNode::Display {
                    query: rest,
                    optional: true,
                }),
                "assert" => builder.push(BlockNode::Assert { text: rest }),
                "retract" => builder.push(BlockNode::Retract { text: rest }),
                "perform" => builder.push(BlockNode::Perform { text: rest }),
                _ => builder.push(BlockNode::Print {
                    text: line.to_string(),
                }),
            }
        }
        builder.finish()
    }
}

/// Parse a template leniently with the default escape character.
pub fn parse_template(body: &str) -> Vec<BlockNode> {
    let (nodes, problems) = TemplateParser::default().build(body);
    for problem in &problems {
        warn!(%problem, "recovered malformed template");
    }
    nodes
}
