//! Agent configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use hostwatch_lib::anomaly::NotifierKind;
use serde::Deserialize;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "HOSTWATCH_CONFIG";

const ENV_PREFIX: &str = "HOSTWATCH";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Seconds to wait between cycles, measurement window excluded
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Outlier model (ONNX)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Column order the model was trained with
    #[serde(default = "default_feature_names_path")]
    pub feature_names_path: PathBuf,

    /// Expected SHA-256 of the model file, hex encoded
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Minimum seconds between two alerts
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown_secs: u64,

    #[serde(default)]
    pub notifier: NotifierKind,

    /// Append every sample to this CSV file when set
    #[serde(default)]
    pub telemetry_path: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_interval() -> u64 {
    5
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/hostwatch_model.onnx")
}

fn default_feature_names_path() -> PathBuf {
    PathBuf::from("model/feature_names.json")
}

fn default_api_port() -> u16 {
    8080
}

fn default_alert_cooldown() -> u64 {
    60
}

impl AgentConfig {
    /// Load configuration from the optional file and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
        Self::build(file.as_deref(), config::Environment::with_prefix(ENV_PREFIX))
    }

    fn build(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: AgentConfig = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        if let Some(digest) = &self.model_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                bail!("model_sha256 must be a 64 character hex digest");
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::build(None, env(&[])).unwrap();

        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.model_path, PathBuf::from("model/hostwatch_model.onnx"));
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.alert_cooldown(), Duration::from_secs(60));
        assert_eq!(config.notifier, NotifierKind::Desktop);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.telemetry_path.is_none());
        assert!(config.model_sha256.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AgentConfig::build(
            None,
            env(&[
                ("HOSTWATCH_INTERVAL_SECS", "2"),
                ("HOSTWATCH_NOTIFIER", "log"),
                ("HOSTWATCH_LOG_FORMAT", "pretty"),
                ("HOSTWATCH_TELEMETRY_PATH", "/tmp/telemetry.csv"),
            ]),
        )
        .unwrap();

        assert_eq!(config.interval_secs, 2);
        assert_eq!(config.notifier, NotifierKind::Log);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.telemetry_path, Some(PathBuf::from("/tmp/telemetry.csv")));
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "api_port = 9100\nalert_cooldown_secs = 120").unwrap();

        let config = AgentConfig::build(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.alert_cooldown_secs, 120);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let unknown_notifier = env(&[("HOSTWATCH_NOTIFIER", "carrier-pigeon")]);
        assert!(AgentConfig::build(None, unknown_notifier).is_err());
        assert!(AgentConfig::build(None, env(&[("HOSTWATCH_INTERVAL_SECS", "0")])).is_err());
        assert!(AgentConfig::build(None, env(&[("HOSTWATCH_MODEL_SHA256", "abc")])).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = AgentConfig::build(Some(Path::new("/nonexistent/hostwatch.toml")), env(&[]));
        assert!(result.is_err());
    }
}
