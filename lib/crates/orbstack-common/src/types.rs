use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state identifier reported to the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum StateId {
    #[default]
    NotCreated,
    Stopped,
    Running,
}

impl StateId {
    /// Stable snake_case key, identical to the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StateId::NotCreated => "not_created",
            StateId::Stopped => "stopped",
            StateId::Running => "running",
        }
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine state as exchanged with the host.
///
/// Only `id` is authoritative; the descriptions are for humans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineState {
    pub id: StateId,
    pub short_description: String,
    pub long_description: String,
}

impl MachineState {
    #[must_use]
    pub fn not_created() -> Self {
        Self {
            id: StateId::NotCreated,
            short_description: "not created".to_string(),
            long_description: "The machine has not been created yet. Run `up` to create it."
                .to_string(),
        }
    }

    #[must_use]
    pub fn stopped() -> Self {
        Self {
            id: StateId::Stopped,
            short_description: "stopped".to_string(),
            long_description: "The machine exists but is not running. Run `up` to start it."
                .to_string(),
        }
    }

    #[must_use]
    pub fn running() -> Self {
        Self {
            id: StateId::Running,
            short_description: "running".to_string(),
            long_description: "The machine is running.".to_string(),
        }
    }

    /// Fallback for a backend status outside `running`/`stopped`.
    #[must_use]
    pub fn unknown(status: &str) -> Self {
        Self {
            id: StateId::NotCreated,
            short_description: "unknown".to_string(),
            long_description: format!("The backend reported an unrecognized status '{status}'."),
        }
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::not_created()
    }
}

/// Connection details handed to the host's SSH layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub forward_agent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,
}

/// Contents of the per-machine metadata file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineMetadata {
    pub machine_name: String,
    pub distribution: String,
    pub created_at: DateTime<Utc>,
}
