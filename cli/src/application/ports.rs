//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `orbstack_common` — never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use orbstack_common::{MachineMetadata, ProviderConfig};

use crate::domain::{MachineRecord, ProviderError, RunnerError};

// ── Backend Port Traits ───────────────────────────────────────────────────────

/// Read-only machine queries.
#[allow(async_fn_in_trait)]
pub trait MachineInspector {
    /// List every machine the backend knows. Empty when there are none.
    async fn list_machines(&self) -> Result<Vec<MachineRecord>, ProviderError>;
    /// Detail for one machine, `None` if it does not exist.
    async fn machine_info(&self, name: &str) -> Result<Option<MachineRecord>, ProviderError>;
}

/// Mutating machine operations.
#[allow(async_fn_in_trait)]
pub trait MachineLifecycle {
    /// Create and boot a machine. `distribution` is `distro` or `distro:version`.
    async fn create_machine(
        &self,
        name: &str,
        distribution: &str,
    ) -> Result<MachineRecord, ProviderError>;
    /// Start a machine. Starting a running machine is not an error.
    async fn start_machine(&self, name: &str) -> Result<MachineRecord, ProviderError>;
    /// Stop a machine. Stopping a stopped machine is not an error.
    async fn stop_machine(&self, name: &str) -> Result<MachineRecord, ProviderError>;
    /// Delete a machine. Fails with `CommandFailed` if it does not exist.
    async fn delete_machine(&self, name: &str) -> Result<bool, ProviderError>;
}

/// Environment probes. Never fail; execution errors read as false/absent.
#[allow(async_fn_in_trait)]
pub trait BackendProbe {
    /// Whether the backend CLI can be executed.
    async fn available(&self) -> bool;
    /// Whether the backend daemon is up.
    async fn running(&self) -> bool;
    /// Backend version string, if it can be determined.
    async fn version(&self) -> Option<String>;
}

/// Composite trait — any type implementing all three sub-traits is a `MachineGateway`.
pub trait MachineGateway: MachineInspector + MachineLifecycle + BackendProbe {}

/// Blanket implementation: any type implementing all three sub-traits is a `MachineGateway`.
impl<T> MachineGateway for T where T: MachineInspector + MachineLifecycle + BackendProbe {}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output using the runner's default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output, RunnerError>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output, RunnerError>;
}

// ── Host Collaborator Ports ───────────────────────────────────────────────────

/// Operator-facing message sink. Sync, fire-and-forget.
pub trait MessageSink {
    /// Emit an informational message.
    fn info(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit an error message.
    fn error(&self, message: &str);
}

/// The host's view of the machine being managed.
pub trait MachineHandle {
    /// Logical machine name as the host knows it, e.g. `"default"`.
    fn logical_name(&self) -> &str;
    /// Provider configuration for this machine.
    fn config(&self) -> &ProviderConfig;
    /// Per-machine durable storage directory.
    fn data_dir(&self) -> &Path;
}

// ── Storage Port ──────────────────────────────────────────────────────────────

/// Durable per-machine identity and metadata.
#[allow(async_fn_in_trait)]
pub trait MachineStore {
    /// Load the recorded identity, `None` if no machine has been created.
    async fn load_identity(&self) -> Result<Option<String>, ProviderError>;
    /// Load the recorded metadata, `None` if absent.
    async fn load_metadata(&self) -> Result<Option<MachineMetadata>, ProviderError>;
    /// Persist identity and metadata for a freshly created machine.
    async fn save(&self, metadata: &MachineMetadata) -> Result<(), ProviderError>;
    /// Remove both files. Absence is not an error.
    async fn clear(&self) -> Result<(), ProviderError>;
}

// ── Naming Port ───────────────────────────────────────────────────────────────

/// Source of random identity suffixes.
pub trait SuffixGenerator {
    /// Produce one suffix of `domain::naming::SUFFIX_LEN` lowercase hex characters.
    fn next_suffix(&self) -> String;
}
