// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for svctl
//!
//! Stores user preferences like the default context and namespace.
//! All svctl data is stored under ~/.svctl/:
//! - ~/.svctl/config.json - user configuration
//! - ~/.svctl/log/ - rotated log files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the base svctl directory (~/.svctl/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".svctl"))
        .context("Could not determine home directory")
}

/// svctl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default cluster context (kubeconfig current context when unset)
    #[serde(default)]
    pub context: Option<String>,
    /// Default namespace for all commands
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.svctl/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.context.is_none());
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_config_serialize() {
        let config = Config {
            context: Some("prod".to_string()),
            namespace: Some("serving".to_string()),
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("prod"));
        assert!(json.contains("serving"));
    }

    #[test]
    fn test_config_deserialize_empty() {
        let json = "{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.context.is_none());
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let original = Config {
            context: Some("staging".to_string()),
            namespace: None,
        };
        let json = serde_json::to_string_pretty(&original).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(original.context, parsed.context);
        assert_eq!(original.namespace, parsed.namespace);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let config = Config {
            context: Some("test-cluster".to_string()),
            namespace: Some("default".to_string()),
        };
        let content = serde_json::to_string_pretty(&config).unwrap();
        fs::write(&config_path, content).unwrap();

        let loaded_content = fs::read_to_string(&config_path).unwrap();
        let loaded: Config = serde_json::from_str(&loaded_content).unwrap();
        assert_eq!(loaded.context.as_deref(), Some("test-cluster"));
    }
}
