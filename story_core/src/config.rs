//! Render configuration.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Configuration for template parsing and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Answers requested for an `if` condition.
    pub if_limit: usize,

    /// Maximum answers iterated by an `each` block.
    ///
    /// A query with more answers fails with `AnswerLimitExceeded` rather
    /// than rendering a truncated list.
    pub each_limit: usize,

    /// Maximum nesting of `display` directives.
    pub max_display_depth: usize,

    /// Reject stray `else`/`end` and unclosed blocks instead of recovering.
    pub strict_blocks: bool,

    /// Character that marks a command line.
    pub command_escape: char,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            if_limit: 1,
            each_limit: 100,
            max_display_depth: 16,
            strict_blocks: false,
            command_escape: '\\',
        }
    }
}

impl RenderConfig {
    /// Load a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.if_limit, 1);
        assert_eq!(config.each_limit, 100);
        assert!(!config.strict_blocks);
        assert_eq!(config.command_escape, '\\');
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RenderConfig::from_toml_str("each_limit = 5\nstrict_blocks = true\n").unwrap();
        assert_eq!(config.each_limit, 5);
        assert!(config.strict_blocks);
        assert_eq!(config.max_display_depth, 16);
    }

    #[test]
    fn test_invalid_toml() {
        let result = RenderConfig::from_toml_str("each_limit = \"many\"");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
