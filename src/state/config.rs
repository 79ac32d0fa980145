/// Application configuration
///
/// Read from `config.json` in the application data directory:
/// - Linux: ~/.local/share/criminal-intent/config.json
/// - macOS: ~/Library/Application Support/criminal-intent/config.json
/// - Windows: %APPDATA%\criminal-intent\config.json
///
/// Every field is optional. `CRIMINAL_INTENT_DB` overrides the database path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

const APP_DIR: &str = "criminal-intent";
const CONFIG_FILE: &str = "config.json";
const DATABASE_NAME: &str = "crime-database.db";
const DATABASE_ENV: &str = "CRIMINAL_INTENT_DB";
const DEFAULT_LOG_FILTER: &str = "info,criminal_intent=debug";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Location of the SQLite database file
    pub database_path: PathBuf,
    /// `tracing` filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        let dir = app_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            database_path: dir.join(DATABASE_NAME),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load the configuration: defaults, then config file, then environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = app_dir()?.join(CONFIG_FILE);

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        if let Some(db) = std::env::var_os(DATABASE_ENV) {
            config.database_path = PathBuf::from(db);
        }

        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configuration with a specific database file and default logging
    #[cfg(test)]
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Directory holding the database and config file
fn app_dir() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or(ConfigError::NoDataDir)?;

    path.push(APP_DIR);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "database_path": "/tmp/crimes.db" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/crimes.db"));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_empty_object_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{}").unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_default_database_name() {
        let config = Config::default();

        assert!(config.database_path.ends_with("criminal-intent/crime-database.db"));
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::from_file(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { path: p, .. } if p == path));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = Config::from_file(&dir.path().join("absent.json")).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
