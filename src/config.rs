//! Engine configuration.
//!
//! Loaded from TOML, or assembled with [`crate::builders::EngineConfigBuilder`].

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::pure::DEFAULT_BIG_STEP;
use crate::types::SortKey;

/// Tunables of the state engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spacing between sort keys when a sibling group is respaced.
    pub big_step: SortKey,

    /// Prefix of generated names, as in `Page 4`.
    pub default_name_prefix: String,

    /// Appended to the name of a duplicated page.
    pub copy_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            big_step: DEFAULT_BIG_STEP,
            default_name_prefix: "Page".to_string(),
            copy_suffix: " Copy".to_string(),
        }
    }
}

impl EngineConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.big_step >= 2,
            "big_step must be at least 2 to leave room between keys, got {}",
            self.big_step
        );
        ensure!(
            !self.default_name_prefix.trim().is_empty(),
            "default_name_prefix cannot be empty"
        );
        ensure!(!self.copy_suffix.is_empty(), "copy_suffix cannot be empty");
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("Failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Generated name for the page at position `group_size + 1`.
    pub fn default_page_name(&self, group_size: usize) -> String {
        format!("{} {}", self.default_name_prefix.trim(), group_size + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.big_step, 1000);
        assert_eq!(config.default_page_name(3), "Page 4");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let config = EngineConfig::from_toml_str("big_step = 64\n")?;
        assert_eq!(config.big_step, 64);
        assert_eq!(config.copy_suffix, " Copy");
        Ok(())
    }

    #[test]
    fn test_rejects_tiny_big_step() {
        let err = EngineConfig::from_toml_str("big_step = 1\n").unwrap_err();
        assert!(format!("{err:#}").contains("big_step"));
    }
}
