//! # Story Logic
//!
//! The logic backend boundary for story templates. This crate defines the
//! terms, literals, and clauses exchanged with a unification/resolution
//! engine, the `LogicEngine` trait the template core talks to, and an
//! in-memory session that implements it.
//!
//! The template core never sees how answers are computed: it submits a
//! query, consumes an answer stream, and asserts or retracts clauses.

pub mod bindings;
pub mod engine;
pub mod memory;
pub mod term;

pub use bindings::*;
pub use engine::*;
pub use memory::*;
pub use term::*;
