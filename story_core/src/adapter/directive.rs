//! Meta directives - side effects requested by facts derived during `perform`.

use serde::{Deserialize, Serialize};
use story_logic::{Bindings, Value};

use crate::grammar::{META_WORD, PLACEHOLDER};
use crate::{Error, Result};

/// Largest number of arguments a meta directive may carry.
pub const MAX_META_ARGS: usize = 8;

/// Variable names used when probing the meta predicate.
pub(crate) const COMMAND_VAR: &str = "command";
pub(crate) const PREDICATE_VAR: &str = "predicate";

/// A derived `meta(command, predicate, args...)` fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaDirective {
    pub command: String,
    pub predicate: String,
    pub args: Vec<Value>,
}

impl MetaDirective {
    /// Read a directive out of one answer to the meta probe with `arg_count` arguments.
    ///
    /// Returns `None` if any position was left unbound.
    pub(crate) fn from_bindings(bindings: &Bindings, arg_count: usize) -> Option<Self> {
        let command = bindings.get(COMMAND_VAR)?.to_string();
        let predicate = bindings.get(PREDICATE_VAR)?.to_string();
        let args = (0..arg_count)
            .map(|i| bindings.get(&arg_var(i)).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            command,
            predicate,
            args,
        })
    }
}

/// Variable name for the `index`-th directive argument.
pub(crate) fn arg_var(index: usize) -> String {
    index.to_string()
}

/// Predicate name of the meta sentinel carrying `arg_count` arguments.
pub(crate) fn meta_predicate(arg_count: usize) -> String {
    std::iter::once(META_WORD)
        .chain(std::iter::repeat(PLACEHOLDER).take(arg_count + 2))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The side-effect table for meta directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Store `predicate(args...)` as a fact.
    Assert,
    /// Remove the fact `predicate(args...)`.
    Retract,
}

impl SideEffect {
    /// Look up the handler for a directive command.
    pub fn from_command(command: &str) -> Result<Self> {
        match command {
            "assert" => Ok(SideEffect::Assert),
            "retract" => Ok(SideEffect::Retract),
            other => Err(Error::UnknownDirective {
                command: other.to_string(),
            }),
        }
    }
}
