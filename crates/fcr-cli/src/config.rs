//! Configuration file handling for fcr

use anyhow::{Context, Result};
use fcr_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default telemetry backend URL
pub const DEFAULT_SERVER: &str = "http://localhost:8081";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default backend URL
    pub server: Option<String>,
    /// Default serial port for live sessions
    pub port: Option<String>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Session timing
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("fcr");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        server: Option<&str>,
        port: Option<&str>,
        no_color: bool,
    ) -> MergedConfig {
        MergedConfig {
            server: server
                .map(String::from)
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            port: port.map(String::from).or_else(|| self.port.clone()),
            no_color: no_color || self.no_color.unwrap_or(false),
            session: self.session.clone(),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub port: Option<String>,
    pub no_color: bool,
    pub session: SessionConfig,
}

impl MergedConfig {
    /// Serial port to use, or an error telling the user how to pick one
    pub fn require_port(&self) -> Result<&str> {
        self.port
            .as_deref()
            .context("No serial port given; pass --port or set `port` in the config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server = "http://10.0.0.5:8081"
port = "/dev/ttyUSB0"
no_color = true

[session]
poll_interval_ms = 500
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.as_deref(), Some("http://10.0.0.5:8081"));
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.session.poll_interval_ms, 500);
        assert_eq!(config.session.heartbeat_interval_ms, 2000);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server = [").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_args_override_config() {
        let config = Config {
            server: Some("http://config:8081".into()),
            port: Some("COM1".into()),
            no_color: Some(true),
            ..Default::default()
        };

        let merged = config.merge_with_args(Some("http://cli:8081"), None, false);
        assert_eq!(merged.server, "http://cli:8081");
        assert_eq!(merged.port.as_deref(), Some("COM1"));
        assert!(merged.no_color);

        let merged = Config::default().merge_with_args(None, Some("COM3"), false);
        assert_eq!(merged.server, DEFAULT_SERVER);
        assert_eq!(merged.require_port().unwrap(), "COM3");
        assert!(Config::default()
            .merge_with_args(None, None, false)
            .require_port()
            .is_err());
    }
}
