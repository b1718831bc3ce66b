//! Configuration Management
//!
//! Handles persistent configuration storage for vcmac.
//! SECURITY: the password is never part of the stored configuration.

use crate::report::OutputFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Last used vCenter host
    #[serde(default)]
    pub host: Option<String>,
    /// Last used username
    #[serde(default)]
    pub username: Option<String>,
    /// Maximum requests in flight
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Overall run deadline in seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    /// Skip TLS verification
    #[serde(default)]
    pub insecure: Option<bool>,
    /// PEM trust anchor for the vCenter certificate
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// Report file
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// HTML template file
    #[serde(default)]
    pub template: Option<PathBuf>,
    /// Report format
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vcmac").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a file; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective format (CLI > config > HTML)
    pub fn effective_format(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.format).unwrap_or_default()
    }

    /// Get effective report path (CLI > config > format default in the working directory)
    pub fn effective_output(&self, cli: Option<PathBuf>, format: OutputFormat) -> PathBuf {
        cli.or_else(|| self.output.clone())
            .unwrap_or_else(|| PathBuf::from(format.default_file_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            host: Some("vcenter.lab.local".into()),
            username: Some("administrator@vsphere.local".into()),
            concurrency: Some(4),
            format: Some(OutputFormat::Json),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"format\": \"json\""));
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_effective_values() {
        let config = Config {
            format: Some(OutputFormat::Yaml),
            ..Config::default()
        };
        assert_eq!(config.effective_format(None), OutputFormat::Yaml);
        assert_eq!(config.effective_format(Some(OutputFormat::Html)), OutputFormat::Html);
        assert_eq!(
            config.effective_output(None, OutputFormat::Yaml),
            PathBuf::from("vm_mac_report.yaml")
        );
        assert_eq!(
            config.effective_output(Some("out.html".into()), OutputFormat::Html),
            PathBuf::from("out.html")
        );
    }
}
