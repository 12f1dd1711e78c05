//! Provider configuration schema and validators.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distribution used when none is configured.
pub const DEFAULT_DISTRO: &str = "ubuntu";

/// Default state cache time-to-live in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5;

static MACHINE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$").expect("machine name pattern is valid")
});

/// How SSH connection details are derived for a running machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SshMode {
    /// Connect through the backend's loopback SSH proxy, machine name as user.
    #[default]
    Proxy,
    /// Connect straight to the machine's IP address.
    Direct,
}

/// Per-machine provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    pub distro: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_username: Option<String>,
    pub forward_agent: bool,
    pub ssh_mode: SshMode,
    pub cache_ttl_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            distro: DEFAULT_DISTRO.to_string(),
            version: None,
            machine_name: None,
            ssh_username: None,
            forward_agent: false,
            ssh_mode: SshMode::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ProviderConfig {
    /// Distribution spec passed to the backend: `distro` or `distro:version`.
    #[must_use]
    pub fn distribution_spec(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => format!("{}:{v}", self.distro.trim()),
            _ => self.distro.trim().to_string(),
        }
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.distro.trim().is_empty() {
            problems.push("distro must not be empty".to_string());
        }
        if let Some(name) = &self.machine_name
            && let Err(e) = validate_machine_name(name)
        {
            problems.push(e.to_string());
        }
        if let Some(user) = &self.ssh_username
            && user.trim().is_empty()
        {
            problems.push("ssh_username must not be empty when set".to_string());
        }
        if self.cache_ttl_secs == 0 {
            problems.push("cache_ttl_secs must be greater than zero".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/// Configuration validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid machine_name '{0}': must match ^[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$")]
    InvalidMachineName(String),

    #[error("invalid provider configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Validates a custom machine name override.
pub fn validate_machine_name(name: &str) -> Result<(), ConfigError> {
    if MACHINE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidMachineName(name.to_string()))
    }
}
