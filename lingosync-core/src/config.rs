//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/lingosync/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/lingosync/` (~/.config/lingosync/)
//! - Data: `$XDG_DATA_HOME/lingosync/` (~/.local/share/lingosync/)
//! - State/Logs: `$XDG_STATE_HOME/lingosync/` (~/.local/state/lingosync/)

use crate::error::{Error, Result};
use crate::model::AiModel;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest accepted suggestion chunk
pub const MAX_CHUNK_SIZE: usize = 100;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Defaults for AI suggestions
    #[serde(default)]
    pub suggestions: SuggestionConfig,

    /// Snapshot storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Suggestion defaults, seeded into the persisted settings
#[derive(Debug, Deserialize, Clone)]
pub struct SuggestionConfig {
    /// Model identifier (e.g. "gemini-2.5-flash")
    #[serde(default)]
    pub model: AiModel,

    /// API key (can also use env var)
    pub api_key: Option<String>,

    /// Rows per request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Appended to every prompt
    #[serde(default)]
    pub extra_instructions: String,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            model: AiModel::default(),
            api_key: None,
            chunk_size: default_chunk_size(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            extra_instructions: String::new(),
        }
    }
}

impl SuggestionConfig {
    /// Configured API key, falling back to `GEMINI_API_KEY`
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.is_empty())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "suggestions.chunk_size must be between 1 and {}",
                MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }
}

fn default_chunk_size() -> usize {
    20
}

fn default_source_lang() -> String {
    "English".to_string()
}

fn default_target_lang() -> String {
    "French".to_string()
}

/// Snapshot storage configuration
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the SQLite snapshot database
    pub database_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.suggestions.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/lingosync/config.toml` (~/.config/lingosync/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("lingosync").join("config.toml")
    }

    /// Returns the data directory path (for the snapshot database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("lingosync")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("lingosync")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/lingosync/state.db` (~/.local/share/lingosync/state.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("state.db")
    }

    /// Directory holding the rolling log files
    ///
    /// Files are named `lingosync.log.YYYY-MM-DD`, one per day.
    pub fn log_dir() -> PathBuf {
        Self::state_dir()
    }

    /// Database path honoring the `[storage]` override
    pub fn resolved_database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(Self::database_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.suggestions.chunk_size, 20);
        assert_eq!(config.suggestions.model, AiModel::Gemini25Flash);
        assert_eq!(config.logging.level, "info");
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[suggestions]
model = "gemini-2.5-pro"
chunk_size = 50
target_lang = "German"
extra_instructions = "Use informal tone."

[storage]
database_path = "/tmp/lingosync-test.db"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.suggestions.model, AiModel::Gemini25Pro);
        assert_eq!(config.suggestions.chunk_size, 50);
        assert_eq!(config.suggestions.source_lang, "English");
        assert_eq!(config.suggestions.target_lang, "German");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.resolved_database_path(),
            PathBuf::from("/tmp/lingosync-test.db")
        );
    }

    #[test]
    fn test_unknown_model_fails_to_parse() {
        let toml = r#"
[suggestions]
model = "gpt-9"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_chunk_size_validation() {
        let mut config = SuggestionConfig::default();
        assert!(config.validate().is_ok());

        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_bad_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[suggestions]\nchunk_size = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let config = SuggestionConfig {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("from-config"));
    }
}
