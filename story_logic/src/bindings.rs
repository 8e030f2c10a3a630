//! Binding records - variable name to value maps produced by query answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Value;

/// A mapping from variable name to resolved value.
///
/// One record is produced per query answer. Records compare structurally,
/// so two answers binding the same names to the same values are equal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, Value>);

impl Bindings {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind a name to a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a bound value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Check if a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Produce a new record with `other` laid over this one.
    ///
    /// Neither input is modified; on conflicting names `other` wins.
    pub fn overlay(&self, other: &Bindings) -> Bindings {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Bindings(merged)
    }

    /// Keep only the names accepted by the filter.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|name, _| keep(name));
    }

    /// Iterate over bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Bindings(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Bindings {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_does_not_mutate() {
        let parent = Bindings::new().with("who", "sam").with("food", "pizza");
        let answer = Bindings::new().with("who", "alex");

        let child = parent.overlay(&answer);

        assert_eq!(child.get("who"), Some(&Value::text("alex")));
        assert_eq!(child.get("food"), Some(&Value::text("pizza")));
        assert_eq!(parent.get("who"), Some(&Value::text("sam")));
    }

    #[test]
    fn test_structural_equality() {
        let a = Bindings::new().with("x", "1").with("y", "2");
        let b: Bindings = vec![("y", "2"), ("x", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let bindings = Bindings::new().with("who", "sam").with("score", 10i64);
        let json = serde_json::to_string(&bindings).unwrap();
        assert_eq!(json, r#"{"score":10,"who":"sam"}"#);

        let back: Bindings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bindings);
    }
}
