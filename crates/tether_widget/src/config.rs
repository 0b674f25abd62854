//! Registry configuration
//!
//! Read from the `[registry]` table of a `tether.toml` file:
//!
//! ```toml
//! [registry]
//! strict_names = true
//! prune_on_init = false
//! ```
//!
//! Missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{WidgetError, WidgetResult};

/// Behavior switches for [`WidgetRegistry`](crate::WidgetRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Reject a widget type whose `NAME` is already used by another type
    pub strict_names: bool,
    /// Drop instances of removed elements before every `init_all` pass
    pub prune_on_init: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_names: true,
            prune_on_init: false,
        }
    }
}

/// Layout of a `tether.toml` file
#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    registry: RegistryConfig,
}

impl RegistryConfig {
    /// Parse the `[registry]` table out of TOML text
    pub fn from_toml_str(source: &str) -> WidgetResult<Self> {
        let file: ConfigFile = toml::from_str(source)?;
        Ok(file.registry)
    }

    /// Load from a `tether.toml` file
    pub fn load(path: impl AsRef<Path>) -> WidgetResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| WidgetError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("loaded registry config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert!(config.strict_names);
        assert!(!config.prune_on_init);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        assert_eq!(
            RegistryConfig::from_toml_str("").unwrap(),
            RegistryConfig::default()
        );
    }

    #[test]
    fn test_partial_table() {
        let config = RegistryConfig::from_toml_str("[registry]\nprune_on_init = true\n").unwrap();
        assert!(config.strict_names);
        assert!(config.prune_on_init);
    }

    #[test]
    fn test_invalid_toml() {
        let err = RegistryConfig::from_toml_str("[registry]\nstrict_names = \"yes\"\n").unwrap_err();
        assert!(matches!(err, WidgetError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RegistryConfig::load("/nonexistent/tether.toml").unwrap_err();
        assert!(matches!(err, WidgetError::ConfigRead { .. }));
    }
}
