//! User configuration for CAPM.
//!
//! A single optional TOML file supplies defaults for the command-line flags:
//!
//! ```toml
//! # ~/.capm/config.toml
//! registry = "~/capsules"
//! target = "claude"
//! targets_dir = "~/.capm/targets"
//! ```
//!
//! # Location
//!
//! 1. `CAPM_CONFIG` environment variable (if set)
//! 2. `~/.capm/config.toml`
//!
//! A missing file yields the defaults. Paths may use `~` and `$VAR`; they are
//! expanded when read through the accessors, not when parsed. Command-line
//! flags always win over configured values.
//!
//! The loaded values are handed to the core as explicit arguments; nothing in
//! the library reads configuration on its own.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::{CONFIG_ENV_VAR, DEFAULT_TARGET_NAME};
use crate::core::CapmError;
use crate::target::Targets;

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapmConfig {
    /// Default registry root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<PathBuf>,

    /// Default target name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Directory of extra target declarations (`*.yaml`, `*.yml`, `*.toml`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets_dir: Option<PathBuf>,
}

impl CapmConfig {
    /// Config file location: `$CAPM_CONFIG`, else `~/.capm/config.toml`.
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be determined and no override is
    /// set.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        let home = dirs::home_dir().ok_or_else(|| CapmError::ConfigError {
            message: "Unable to determine home directory".to_string(),
        })?;
        Ok(home.join(".capm").join("config.toml"))
    }

    /// Load from the default location; a missing file gives defaults.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!(path = %path.display(), "No config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CapmError::ConfigError {
                message: format!("{}: {}", path.display(), e.message()),
            })
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), ?config, "Loaded config");
        Ok(config)
    }

    /// Configured registry root, expanded.
    pub fn registry_path(&self) -> Result<Option<PathBuf>> {
        self.registry.as_deref().map(expand_path).transpose()
    }

    /// Configured targets directory, expanded.
    pub fn targets_path(&self) -> Result<Option<PathBuf>> {
        self.targets_dir.as_deref().map(expand_path).transpose()
    }

    /// Configured target name, or the built-in default.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.target.as_deref().unwrap_or(DEFAULT_TARGET_NAME)
    }

    /// The built-in target plus everything declared in `targets_dir`.
    pub fn load_targets(&self) -> Result<Targets> {
        match self.targets_path()? {
            Some(dir) => Targets::load_dir(&dir),
            None => Ok(Targets::builtin()),
        }
    }
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| CapmError::ConfigError {
        message: format!("Cannot expand path '{raw}': {e}"),
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "registry = \"/srv/capsules\"\ntarget = \"cursor\"\n").unwrap();

        let config = CapmConfig::load_from(&path).await.unwrap();
        assert_eq!(config.registry, Some(PathBuf::from("/srv/capsules")));
        assert_eq!(config.target_name(), "cursor");
        assert_eq!(config.targets_dir, None);
    }

    #[tokio::test]
    async fn test_unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "registy = \"/typo\"\n").unwrap();

        let err = CapmConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CapmError>(), Some(CapmError::ConfigError { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = CapmConfig::default();
        assert_eq!(config.target_name(), "claude");
        assert!(config.registry_path().unwrap().is_none());
        assert_eq!(config.load_targets().unwrap().names(), vec!["claude".to_string()]);
    }

    #[test]
    fn test_tilde_expansion() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = CapmConfig {
            registry: Some(PathBuf::from("~/capsules")),
            ..CapmConfig::default()
        };
        assert_eq!(config.registry_path().unwrap(), Some(home.join("capsules")));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_override_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");

        // SAFETY: serialized with every other env-touching test
        unsafe { std::env::set_var(CONFIG_ENV_VAR, &path) };
        assert_eq!(CapmConfig::default_path().unwrap(), path);
        assert_eq!(CapmConfig::load().await.unwrap(), CapmConfig::default());

        std::fs::write(&path, "target = \"other\"\n").unwrap();
        assert_eq!(CapmConfig::load().await.unwrap().target.as_deref(), Some("other"));

        unsafe { std::env::remove_var(CONFIG_ENV_VAR) };
    }
}
