//! # Story Core
//!
//! A logic-driven hypertext templating engine. Passages embed conditionals,
//! iteration, and side-effecting actions that are resolved against a logic
//! session at render time.
//!
//! ## Core Components
//!
//! - **grammar**: Parses one line of statement text into facts, rules, or conjunctions
//! - **adapter**: Turns parsed lines into engine clauses and queries, collects answers
//! - **template**: Line-oriented block parser producing the control-flow tree
//! - **render**: Sequential async renderer walking the tree against a session
//! - **passage**: Resolution of `display` targets
//!
//! ## Example
//!
//! ```ignore
//! let engine = Arc::new(MemoryEngine::new());
//! let renderer = Renderer::new(engine, Arc::new(PassageStore::new()));
//! renderer.adapter().assert_text("hungry \"sam\".").await?;
//! let text = renderer.render("\\each hungry (who)\n{who} is hungry\n\\end", &Context::new()).await?;
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod grammar;
pub mod passage;
pub mod render;
pub mod template;

pub use adapter::*;
pub use config::*;
pub use error::*;
pub use grammar::*;
pub use passage::*;
pub use render::*;
pub use template::*;

/// Bindings visible at a point in the template tree.
pub type Context = story_logic::Bindings;
