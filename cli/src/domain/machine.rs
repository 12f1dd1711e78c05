//! Machine records reported by the backend and their mapping to host state.
//!
//! Pure functions only — no I/O, no async.

use orbstack_common::MachineState;
use serde::{Deserialize, Serialize};

/// Backend status string for a running machine.
pub const STATUS_RUNNING: &str = "running";

/// Backend status string for a stopped machine.
pub const STATUS_STOPPED: &str = "stopped";

/// A machine as reported by one backend query. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub name: String,
    #[serde(alias = "state")]
    pub status: String,
    #[serde(default, alias = "ip4", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, alias = "username", skip_serializing_if = "Option::is_none")]
    pub default_username: Option<String>,
}

impl MachineRecord {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_RUNNING)
    }

    /// The IP address, if the machine has one yet.
    #[must_use]
    pub fn ip(&self) -> Option<&str> {
        self.ip_address.as_deref().filter(|ip| !ip.trim().is_empty())
    }
}

/// Map an optional backend record onto the host-facing state.
///
/// Anything other than an exact `running` or `stopped` becomes `not_created`.
#[must_use]
pub fn machine_state(record: Option<&MachineRecord>) -> MachineState {
    match record {
        None => MachineState::not_created(),
        Some(r) => match r.status.to_ascii_lowercase().as_str() {
            STATUS_RUNNING => MachineState::running(),
            STATUS_STOPPED => MachineState::stopped(),
            other => MachineState::unknown(other),
        },
    }
}
