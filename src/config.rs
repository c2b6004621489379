//! Service configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! originals_dir = "dist/images"        # One file per asset: <id>.<ext>
//! cache_dir = "dist/images/cache"      # Transformed results
//! # seed_cache_dir = "seeds/images/cache"  # Optional mirror of every cache write
//!
//! [logging]
//! level = "info"     # trace | debug | info | warn | error (RUST_LOG wins)
//! json = false       # One JSON object per line instead of human-readable text
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where originals and cached results live.
    pub storage: StorageConfig,
    /// Log verbosity and format.
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.originals_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.originals_dir must not be empty".into(),
            ));
        }
        if self.storage.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.cache_dir must not be empty".into(),
            ));
        }
        if let Some(seed) = &self.storage.seed_cache_dir
            && seed.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "storage.seed_cache_dir must not be empty when set".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Storage directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Flat directory of originals, one file per asset id.
    pub originals_dir: PathBuf,
    /// Flat directory of transformed results, keyed by request.
    pub cache_dir: PathBuf,
    /// When set, every cache write is mirrored here as well.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_cache_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            originals_dir: PathBuf::from("dist/images"),
            cache_dir: PathBuf::from("dist/images/cache"),
            seed_cache_dir: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// A missing file means stock defaults. A present file is merged over the
/// defaults, checked for unknown keys, and validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let overlay = if path.exists() {
        let content = fs::read_to_string(path)?;
        Some(toml::from_str::<toml::Value>(&content)?)
    } else {
        None
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-img configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Flat directory of originals. Each file is named <asset id>.<extension>;
# the extension is the stored format (avif, webp, png, jpeg, jpg).
originals_dir = "dist/images"

# Flat directory of transformed results. Entries are named
# <asset id>?<sorted params>.<format>, e.g. "3f2a?width=50.webp".
# Safe to delete at any time; entries are rebuilt on demand.
cache_dir = "dist/images/cache"

# Mirror every cache write into this directory too, e.g. to ship a warm
# cache with a fresh deployment. Disabled when absent.
# seed_cache_dir = "seeds/images/cache"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# Default log level: trace, debug, info, warn, error.
# The RUST_LOG environment variable takes precedence.
level = "info"

# Emit one JSON object per line instead of human-readable text.
json = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_storage_dirs() {
        let config = Config::default();
        assert_eq!(config.storage.originals_dir, PathBuf::from("dist/images"));
        assert_eq!(config.storage.cache_dir, PathBuf::from("dist/images/cache"));
        assert_eq!(config.storage.seed_cache_dir, None);
    }

    #[test]
    fn default_config_passes_validation() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_merges_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[storage]
cache_dir = "/var/cache/img"
seed_cache_dir = "seeds"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.cache_dir, PathBuf::from("/var/cache/img"));
        assert_eq!(config.storage.seed_cache_dir, Some(PathBuf::from("seeds")));
        // untouched keys keep their defaults
        assert_eq!(config.storage.originals_dir, PathBuf::from("dist/images"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[storage\ncache_dir = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[storage]\ncache_directory = \"x\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<Config, _> = toml::from_str("[images]\nquality = 90\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_empty_cache_dir() {
        let mut config = Config::default();
        config.storage.cache_dir = PathBuf::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("cache_dir")
        ));
    }

    #[test]
    fn validate_rejects_empty_seed_dir() {
        let mut config = Config::default();
        config.storage.seed_cache_dir = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(msg)) if msg.contains("logging.level")
        ));
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(resolve_config(stock_defaults_value(), Some(overlay)).is_err());
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\nz = 4\n").unwrap();
        let merged = merge_toml(base, overlay);
        let a = merged.get("a").unwrap();
        assert_eq!(a.get("x").unwrap().as_integer(), Some(1));
        assert_eq!(a.get("y").unwrap().as_integer(), Some(3));
        assert_eq!(a.get("z").unwrap().as_integer(), Some(4));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let merged = merge_toml(toml::Value::Integer(1), toml::Value::Integer(2));
        assert_eq!(merged.as_integer(), Some(2));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        let table = value.as_table().unwrap();
        assert!(table.contains_key("storage"));
        assert!(table.contains_key("logging"));
    }
}
