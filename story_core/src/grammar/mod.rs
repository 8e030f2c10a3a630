//! Statement grammar - turns one line of text into a statement AST.
//!
//! Lines are facts (`hungry "sam".`), rules
//! (`likes (x) "pizza" if hungry (x).`), conjunctions of statements
//! separated by commas or newlines, or meta lines (`assert: likes (x) (y)`)
//! that are rewritten into a uniform `meta` statement.

mod parser;
mod statement;

pub use parser::*;
pub use statement::*;
