//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::logs::DEFAULT_TOP;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub backfill: BackfillConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Log bandwidth report defaults
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_top")]
    pub top: usize,

    #[serde(default)]
    pub utc: bool,

    #[serde(default = "default_report_format")]
    pub format: String,
}

fn default_top() -> usize {
    DEFAULT_TOP
}

fn default_report_format() -> String {
    "table".to_string()
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            utc: false,
            format: default_report_format(),
        }
    }
}

/// Backfill target configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("mailroom").join("users.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./mailroom_data/users.db".to_string())
}

impl BackfillConfig {
    /// Database path with a leading `~/` expanded to the home directory
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.database)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load an explicit file, or fall back to the default locations
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_with_env(path),
            None => Self::load_default(),
        }
    }

    /// Load from default locations or environment
    ///
    /// A file that exists but cannot be read or parsed is an error rather
    /// than a silent fallback to defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("mailroom").join("config.toml")),
            Some(PathBuf::from("/etc/mailroom/config.toml")),
            Some(PathBuf::from("./mailroom.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        match Self::load_first(&config_paths)? {
            Some(config) => Ok(config),
            None => Self::from_env(),
        }
    }

    /// Load the first of `paths` that exists
    fn load_first(paths: &[PathBuf]) -> Result<Option<Self>, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => Self::load_with_env(path).map(Some),
            None => Ok(None),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // Report overrides
        if let Some(top) = lookup("MAILROOM_LOG_TOP") {
            match top.parse::<usize>() {
                Ok(n) if n > 0 => self.logs.top = n,
                _ => {
                    return Err(ConfigError::Env {
                        key: "MAILROOM_LOG_TOP",
                        value: top,
                    })
                }
            }
        }
        if let Some(utc) = lookup("MAILROOM_LOG_UTC") {
            self.logs.utc = matches!(utc.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(format) = lookup("MAILROOM_LOG_FORMAT") {
            self.logs.format = format;
        }

        // Backfill overrides
        if let Some(database) = lookup("MAILROOM_DATABASE") {
            self.backfill.database = database;
        }

        // Logging overrides
        if let Some(level) = lookup("MAILROOM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(style) = lookup("MAILROOM_LOG_STYLE") {
            self.logging.format = style;
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Mailroom Configuration
#
# Environment variables override these settings:
# - MAILROOM_LOG_TOP
# - MAILROOM_LOG_UTC
# - MAILROOM_LOG_FORMAT
# - MAILROOM_DATABASE
# - MAILROOM_LOG_LEVEL
# - MAILROOM_LOG_STYLE

[logs]
# Functions listed per hour in bandwidth reports
top = 10

# Bucket hours in UTC instead of local time
utc = false

# Report format: table, json or csv
format = "table"

[backfill]
# SQLite database holding the users table
database = "~/.local/share/mailroom/users.db"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for terminals) or json (for collectors)
format = "pretty"
"#
    .to_string()
}
