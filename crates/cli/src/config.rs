//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Agent address used when neither the flag, the environment nor the file sets one
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Telemetry file used by `collect` and `stats` by default
pub const DEFAULT_TELEMETRY_PATH: &str = "data/data.csv";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Telemetry CSV file
    pub telemetry_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("hostwatch").join("config.json"))
    }

    /// Command line value, then the file, then the built-in default
    pub fn api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn telemetry_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.telemetry_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TELEMETRY_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.api_url(None), DEFAULT_API_URL);
        assert_eq!(config.telemetry_path(None), PathBuf::from(DEFAULT_TELEMETRY_PATH));
    }

    #[test]
    fn test_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_url": "http://monitor:9000", "telemetry_path": "/var/lib/hostwatch/t.csv"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_url(None), "http://monitor:9000");
        assert_eq!(
            config.api_url(Some("http://override:1".into())),
            "http://override:1"
        );
        assert_eq!(
            config.telemetry_path(None),
            PathBuf::from("/var/lib/hostwatch/t.csv")
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
