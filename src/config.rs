//! Configuration loading for Netforge.
//!
//! Handles loading configuration from multiple sources, first match wins:
//! - An explicit `--config` path
//! - Project configuration (./netforge.toml)
//! - User configuration (~/.netforge.toml)
//! - Built-in defaults

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default settings
    pub defaults: Defaults,

    /// Colors and output settings
    pub colors: ColorsConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Free-form tags stamped onto synthesized documents
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            colors: ColorsConfig::default(),
            logging: LoggingConfig::default(),
            tags: HashMap::new(),
        }
    }
}

/// Default values for command arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Directory deployment state is stored in
    pub state_dir: PathBuf,

    /// Default deployment name when none is given
    pub deployment: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".netforge/state"),
            deployment: None,
        }
    }
}

/// Color output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Whether colored output is enabled
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter used when no verbosity flags are passed
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: None }
    }
}

impl Config {
    /// Loads configuration, trying the explicit path first, then the
    /// project and user configuration files.
    pub fn load(explicit: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::FileNotFound(path.clone()));
            }
            return Self::from_file(path);
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read '{}': {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from("netforge.toml")];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".netforge.toml"));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.defaults.state_dir, PathBuf::from(".netforge/state"));
        assert!(config.colors.enabled);
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
[defaults]
state_dir = "/var/lib/netforge"

[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.state_dir, PathBuf::from("/var/lib/netforge"));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert!(config.colors.enabled);
    }
}
