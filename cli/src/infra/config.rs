//! YAML-backed provider configuration loader.

use std::path::PathBuf;

use anyhow::{Context, Result};
use orbstack_common::ProviderConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "ORBSTACK_PROVIDER_CONFIG";

/// Loads `ProviderConfig` from a YAML file on disk.
pub struct YamlConfigStore {
    path: Option<PathBuf>,
}

impl YamlConfigStore {
    /// Loader for the default location (`$ORBSTACK_PROVIDER_CONFIG` or
    /// `~/.orbstack-provider/config.yaml`).
    #[must_use]
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Loader for an explicit file.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Resolve the config file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.path {
            return Ok(p.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".orbstack-provider").join("config.yaml"))
    }

    /// Load the config, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<ProviderConfig> {
        let path = self.path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(ProviderConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }
}

impl Default for YamlConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
