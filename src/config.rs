//! Operational configuration: knobs that tune runtime behavior
//! without affecting the on-disk format, loadable from TOML and
//! environment variables via `figment`.
//!
//! Nothing here feeds [`crate::index::IndexOptions`] automatically —
//! a `RuntimeConfig` is a convenience for callers who want file/env
//! driven defaults; it is never required to open an index.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading or validating a [`RuntimeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `figment` failed to merge or deserialize a source.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// A loaded value was outside its accepted range.
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Dotted path of the offending field.
        key: String,
        /// Human-readable description of the violation.
        message: String,
    },
}

/// Search-related runtime defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRuntimeConfig {
    /// Default `expansion_search` used when a caller does not override
    /// it per-call.
    pub default_expansion_search: usize,
}

impl Default for SearchRuntimeConfig {
    fn default() -> Self {
        Self {
            default_expansion_search: 64,
        }
    }
}

/// Prefetch behavior during graph traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchRuntimeConfig {
    /// Whether the search/insert hot path issues `prefetch` hints for
    /// upcoming neighbor vectors.
    pub enabled: bool,
}

impl Default for PrefetchRuntimeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Thresholds for the always-on safety counters (`crate::safety`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyRuntimeConfig {
    /// Counter value at or above which a `warn`-level `tracing` event
    /// is emitted when [`crate::safety::SafetyCounters::snapshot`] is
    /// inspected by the caller's own monitoring loop.
    pub log_threshold: u64,
}

impl Default for SafetyRuntimeConfig {
    fn default() -> Self {
        Self { log_threshold: 1 }
    }
}

/// The full set of operational knobs, merged from defaults, an
/// optional TOML file, and `HNSW_CORE_*`-prefixed environment
/// variables, in that priority order (env overrides file overrides
/// defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Search-related defaults.
    pub search: SearchRuntimeConfig,
    /// Prefetch behavior.
    pub prefetch: PrefetchRuntimeConfig,
    /// Safety-counter logging thresholds.
    pub safety: SafetyRuntimeConfig,
}

impl RuntimeConfig {
    /// Loads configuration from `hnsw-core.toml` in the current
    /// directory, if present, merged with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("hnsw-core.toml")
    }

    /// Loads configuration from a specific TOML file, if present,
    /// merged with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("HNSW_CORE_").split("_"));

        let config: Self = figment.extract().map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration directly from a TOML string, useful for
    /// tests that want to avoid touching the filesystem.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));
        let config: Self = figment.extract().map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.default_expansion_search == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.default_expansion_search".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_string_overrides_defaults() {
        let config = RuntimeConfig::from_toml(
            r#"
            [search]
            default_expansion_search = 256

            [prefetch]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.search.default_expansion_search, 256);
        assert!(!config.prefetch.enabled);
        assert_eq!(config.safety.log_threshold, 1);
    }

    #[test]
    fn rejects_zero_expansion_search() {
        let err = RuntimeConfig::from_toml("[search]\ndefault_expansion_search = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
