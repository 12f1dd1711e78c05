//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ── Provider errors ───────────────────────────────────────────────────────────

/// Every failure a lifecycle operation can surface to its host.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("orbctl is not installed or not on PATH. Install OrbStack from https://orbstack.dev")]
    BackendNotInstalled,

    #[error("OrbStack is not running. Start it with 'orbctl start' and retry.")]
    BackendNotRunning,

    #[error("'{command}' failed: {diagnostic}")]
    CommandFailed { command: String, diagnostic: String },

    #[error("'{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("could not find a free machine name for '{logical_name}' after {attempts} attempts")]
    NameCollision { logical_name: String, attempts: u32 },

    #[error("SSH is not ready on machine '{machine}': {reason}")]
    SshNotReady { machine: String, reason: String },

    #[error("'{operation}' requires a machine identity, but none is recorded")]
    InvalidMachineIdentity { operation: String },

    #[error("cannot access machine data at {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected output from '{command}'")]
    MalformedOutput {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// Stable error key for machine-readable output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BackendNotInstalled => "backend_not_installed",
            Self::BackendNotRunning => "backend_not_running",
            Self::CommandFailed { .. } => "command_failed",
            Self::Timeout { .. } => "timeout",
            Self::NameCollision { .. } => "name_collision",
            Self::SshNotReady { .. } => "ssh_not_ready",
            Self::InvalidMachineIdentity { .. } => "invalid_machine_identity",
            Self::Storage { .. } => "storage",
            Self::MalformedOutput { .. } => "malformed_output",
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

// ── Runner errors ─────────────────────────────────────────────────────────────

/// Failures of the process runner itself, before any exit code is known.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("waiting for {program}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
