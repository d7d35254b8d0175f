use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::kubernetes::DEFAULT_COPY_TOOL;

/// Errors that can occur during config operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Kubeconfig {0:?} not found")]
    KubeconfigNotFound(PathBuf),
}

/// Settings consumed by the executor and copier.
///
/// Passed explicitly into every entry point; nothing here is read from
/// process-wide state after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Explicit kubeconfig path. When unset, default discovery applies.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[serde(default)]
    pub context: Option<String>,

    /// External tool used for `cp` into the pod
    #[serde(default = "default_copy_tool")]
    pub copy_tool: String,
}

fn default_copy_tool() -> String {
    DEFAULT_COPY_TOOL.to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            copy_tool: default_copy_tool(),
        }
    }
}

impl RemoteConfig {
    /// Config with an explicit kubeconfig override
    pub fn with_kubeconfig(path: impl Into<PathBuf>) -> Self {
        Self {
            kubeconfig: Some(path.into()),
            ..Self::default()
        }
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        Ok(dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join("gadget-remote"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Check that an explicitly configured kubeconfig exists on disk.
    ///
    /// Without an override there is nothing to check; default discovery
    /// reports its own errors when credentials are resolved.
    pub fn ensure_kubeconfig_exists(&self) -> Result<(), ConfigError> {
        match &self.kubeconfig {
            Some(path) if !path.exists() => Err(ConfigError::KubeconfigNotFound(path.clone())),
            _ => Ok(()),
        }
    }
}
