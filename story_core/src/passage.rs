//! Passage resolution - looking up the body a `display` directive renders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use story_logic::Bindings;
use tracing::debug;

use crate::template::substitute_params;
use crate::{Error, Result};

/// A named template body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub name: String,
    pub body: String,
}

impl Passage {
    /// Create a passage.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// A passage picked for rendering, with the bindings it renders against.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPassage {
    pub name: String,
    pub body: String,
    pub context: Bindings,
}

/// Resolves a display target to a passage body.
#[async_trait]
pub trait PassageResolver: Send + Sync {
    /// Resolve `name` under `context`, failing with `PassageNotFound` on a miss.
    async fn resolve(&self, name: &str, context: &Bindings) -> Result<ResolvedPassage>;
}

/// In-memory passage store keyed by exact name.
#[derive(Debug, Clone, Default)]
pub struct PassageStore {
    passages: HashMap<String, Passage>,
}

impl PassageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a passage, builder style.
    pub fn with_passage(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(Passage::new(name, body));
        self
    }

    /// Add or replace a passage.
    pub fn insert(&mut self, passage: Passage) {
        self.passages.insert(passage.name.clone(), passage);
    }

    /// Look up a passage by exact name.
    pub fn get(&self, name: &str) -> Option<&Passage> {
        self.passages.get(name)
    }

    /// Number of stored passages.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Load passages from a JSON array of `{ "name": ..., "body": ... }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let passages: Vec<Passage> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for passage in passages {
            store.insert(passage);
        }
        Ok(store)
    }
}

#[async_trait]
impl PassageResolver for PassageStore {
    async fn resolve(&self, name: &str, context: &Bindings) -> Result<ResolvedPassage> {
        let name = substitute_params(name.trim(), context);
        let passage = self
            .get(&name)
            .ok_or_else(|| Error::PassageNotFound { name: name.clone() })?;
        debug!(passage = %name, "resolved passage");
        Ok(ResolvedPassage {
            name,
            body: passage.body.clone(),
            context: context.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_exact_name() {
        let store = PassageStore::new().with_passage("intro", "Welcome.");
        let resolved = store.resolve(" intro ", &Bindings::new()).await.unwrap();
        assert_eq!(resolved.body, "Welcome.");
    }

    #[tokio::test]
    async fn test_resolve_substitutes_context() {
        let store = PassageStore::new().with_passage("\"hall\" desc", "A long hall.");
        let context = Bindings::new().with("room", "hall");
        let resolved = store.resolve("(room) desc", &context).await.unwrap();
        assert_eq!(resolved.name, "\"hall\" desc");
        assert_eq!(resolved.context, context);
    }

    #[tokio::test]
    async fn test_missing_passage() {
        let result = PassageStore::new().resolve("nowhere", &Bindings::new()).await;
        assert!(matches!(result, Err(Error::PassageNotFound { name }) if name == "nowhere"));
    }

    #[test]
    fn test_from_json() {
        let store = PassageStore::from_json(r#"[{"name": "a", "body": "one"}, {"name": "b", "body": "two"}]"#)
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b").unwrap().body, "two");
        assert!(matches!(PassageStore::from_json("{"), Err(Error::Serialization(_))));
    }
}
