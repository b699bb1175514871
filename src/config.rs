//! Configuration for the input listeners binary.
//!
//! Read-only: configuration is loaded from a JSON file when present and
//! never written back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which input sources to listen to
    pub sources: SourceConfig,

    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourceConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// The file a load would read: `explicit` if given, otherwise the default location.
    pub fn effective_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path)
    }

    /// Get the path to the default configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("input-listeners")
            .join("config.json")
    }
}

/// Configuration for which input sources to listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub mouse: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            mouse: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            mouse: sources.iter().any(|s| s == "mouse" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.mouse
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("keyboard,mouse");
        assert!(config.keyboard);
        assert!(config.mouse);

        let config = SourceConfig::from_csv(" Keyboard ");
        assert!(config.keyboard);
        assert!(!config.mouse);

        let config = SourceConfig::from_csv("all");
        assert!(config.any_enabled());

        let config = SourceConfig::from_csv("touchpad");
        assert!(!config.any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.sources.keyboard);
        assert!(config.sources.mouse);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_load_from_file_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sources": {{"keyboard": false, "mouse": true}}}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();

        assert!(!config.sources.keyboard);
        assert!(config.sources.mouse);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_effective_path_prefers_explicit() {
        let explicit = Path::new("/tmp/custom.json");
        assert_eq!(Config::effective_path(Some(explicit)), explicit);
        assert_eq!(Config::effective_path(None), Config::config_path());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
