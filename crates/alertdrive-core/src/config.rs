//! Configuration parsing and management.
//!
//! Both binaries read a single TOML file (`alertdrive.toml` by default).
//! Every field has a default matching the constants of the original
//! deployment, so a missing file yields a fully usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::PolicyConfig;
use crate::reporter::ReporterConfig;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized back to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level AlertDrive configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertDriveConfig {
    /// Daemon settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Alert policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Location reporter settings.
    #[serde(default)]
    pub reporter: ReporterConfig,
}

impl AlertDriveConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration, falling back to defaults if the file does not
    /// exist. Parse errors in an existing file are still surfaced.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path to the audit log database.
    #[serde(default = "default_audit_db")]
    pub audit_db: PathBuf,

    /// Path to the hazard zones file.
    #[serde(default = "default_zones_file")]
    pub zones_file: PathBuf,
}

fn default_bind() -> String {
    // The original backend listened on port 5000.
    "127.0.0.1:5000".to_string()
}

fn default_audit_db() -> PathBuf {
    PathBuf::from("alerts.db")
}

fn default_zones_file() -> PathBuf {
    PathBuf::from("zones.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            audit_db: default_audit_db(),
            zones_file: default_zones_file(),
        }
    }
}

/// Serde adapter for humantime duration strings ("5s", "2m").
pub(crate) mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AlertDriveConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.policy.repeat_interval, Duration::from_secs(60));
        assert_eq!(config.reporter.sample_interval, Duration::from_secs(5));
        assert_eq!(config.reporter.probe_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_overrides() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:8080"
            audit_db = "/var/lib/alertdrive/alerts.db"

            [policy]
            repeat_interval = "2m"

            [reporter]
            sample_interval = "10s"
            endpoint = "http://10.0.0.2:8080"
        "#;

        let config = AlertDriveConfig::from_toml(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.policy.repeat_interval, Duration::from_secs(120));
        assert_eq!(config.reporter.sample_interval, Duration::from_secs(10));
        assert_eq!(config.reporter.endpoint, "http://10.0.0.2:8080");
        // Untouched sections keep defaults.
        assert_eq!(config.server.zones_file, PathBuf::from("zones.json"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AlertDriveConfig::default();
        let serialized = config.to_toml().unwrap();
        let parsed = AlertDriveConfig::from_toml(&serialized).unwrap();
        assert_eq!(parsed.server.bind, config.server.bind);
        assert_eq!(parsed.reporter.probe_interval, config.reporter.probe_interval);
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let toml = r#"
            [policy]
            repeat_interval = "soon"
        "#;
        assert!(AlertDriveConfig::from_toml(toml).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            AlertDriveConfig::load_or_default(Path::new("/nonexistent/alertdrive.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }
}
