//! Placeholder substitution for print lines and command lines.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use story_logic::{Bindings, Value};

use crate::grammar::Token;

static PRINT_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid print placeholder pattern"));

static QUERY_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\w+)\)").expect("valid query parameter pattern"));

/// Replace every `{name}` with its value from `context`.
///
/// Names missing from the context render as empty text.
pub fn render_line(line: &str, context: &Bindings) -> String {
    PRINT_PLACEHOLDER
        .replace_all(line, |caps: &Captures| {
            context
                .get(&caps[1])
                .map(Value::to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Replace every `(name)` whose name is in `params` with the quoted value.
///
/// Other variables are left untouched so they stay query variables.
pub fn substitute_params(text: &str, params: &Bindings) -> String {
    if params.is_empty() {
        return text.to_string();
    }
    QUERY_PARAMETER
        .replace_all(text, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => Token::constant(value.to_string()).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
