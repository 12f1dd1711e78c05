//! Machine lifecycle controller: up, halt, start, reload, destroy, state, ssh info.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use chrono::Utc;
use orbstack_common::{MachineMetadata, MachineState, ProviderConfig, SshInfo, SshMode, StateId};
use tokio::time::Instant;

use super::namer::generate_identity;
use crate::application::ports::{
    MachineGateway, MachineHandle, MachineStore, MessageSink, SuffixGenerator,
};
use crate::application::state_cache::StateCache;
use crate::domain::naming::is_valid_identity;
use crate::domain::{MachineRecord, ProviderError, machine_state};

/// Loopback address of the backend's SSH proxy.
pub const SSH_PROXY_HOST: &str = "127.0.0.1";

/// Port of the backend's SSH proxy.
pub const SSH_PROXY_PORT: u16 = 32222;

/// SSH port used when connecting to a machine's own address.
pub const SSH_DIRECT_PORT: u16 = 22;

const MIN_BACKEND_VERSION: semver::Version = semver::Version::new(1, 0, 0);

/// Bounds for the post-transition SSH readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(2),
        }
    }
}

/// Drives one machine through its lifecycle.
///
/// Operations take `&mut self`: the host runs one operation at a time per
/// machine, and the state cache is not synchronized.
pub struct MachineController<G, S, N, U> {
    gateway: G,
    store: S,
    suffixes: N,
    ui: U,
    config: ProviderConfig,
    logical_name: String,
    cache: StateCache<MachineState>,
    readiness: ReadinessPolicy,
    proxy_key_path: Option<String>,
}

impl<G, S, N, U> MachineController<G, S, N, U>
where
    G: MachineGateway,
    S: MachineStore,
    N: SuffixGenerator,
    U: MessageSink,
{
    /// Build a controller for the machine described by `handle`.
    ///
    /// A configured `machine_name` takes precedence over the host's logical name.
    pub fn new(handle: &impl MachineHandle, gateway: G, store: S, suffixes: N, ui: U) -> Self {
        let config = handle.config().clone();
        let logical_name = config
            .machine_name
            .clone()
            .unwrap_or_else(|| handle.logical_name().to_string());
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            gateway,
            store,
            suffixes,
            ui,
            config,
            logical_name,
            cache: StateCache::new(ttl),
            readiness: ReadinessPolicy::default(),
            proxy_key_path: None,
        }
    }

    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Private key reported alongside proxy-mode SSH info.
    #[must_use]
    pub fn with_proxy_key_path(mut self, path: Option<String>) -> Self {
        self.proxy_key_path = path;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// The recorded machine identity, if any.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the identity file exists but cannot be read.
    pub async fn identity(&self) -> Result<Option<String>, ProviderError> {
        self.store.load_identity().await
    }

    async fn require_identity(&self, operation: &str) -> Result<String, ProviderError> {
        match self.identity().await? {
            Some(id) if is_valid_identity(&id) => Ok(id),
            _ => Err(ProviderError::InvalidMachineIdentity {
                operation: operation.to_string(),
            }),
        }
    }

    // ── Backend checks ────────────────────────────────────────────────────────

    /// Verify the backend is installed and running before mutating anything.
    ///
    /// # Errors
    ///
    /// Returns `BackendNotInstalled` or `BackendNotRunning`.
    pub async fn check_backend(&self) -> Result<(), ProviderError> {
        if !self.gateway.available().await {
            return Err(ProviderError::BackendNotInstalled);
        }
        if !self.gateway.running().await {
            return Err(ProviderError::BackendNotRunning);
        }
        if let Some(version) = self.gateway.version().await
            && let Some(parsed) = parse_version(&version)
            && parsed < MIN_BACKEND_VERSION
        {
            self.ui.warn(&format!(
                "OrbStack {parsed} is older than the minimum supported {MIN_BACKEND_VERSION}; \
                 consider updating."
            ));
        }
        Ok(())
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// Create the machine if it is gone, start it if listed but not running,
    /// then wait for SSH. A recorded identity is only replaced when the
    /// backend no longer lists it.
    ///
    /// # Errors
    ///
    /// Propagates every backend, naming, storage and readiness failure.
    pub async fn up(&mut self) -> Result<MachineState, ProviderError> {
        let Some(id) = self.identity().await?.filter(|id| is_valid_identity(id)) else {
            return self.create().await;
        };

        // An unrecognized status still means the machine exists.
        let machines = self.gateway.list_machines().await?;
        let Some(record) = machines.into_iter().find(|m| m.name == id) else {
            self.cache.invalidate(&id);
            self.ui.warn(&format!(
                "Recorded machine '{id}' no longer exists; creating a new one."
            ));
            return self.create().await;
        };
        let current = machine_state(Some(&record));
        self.cache.set(&id, current.clone());

        if current.id == StateId::Running {
            self.ui.info(&format!("Machine '{id}' is already running."));
            return Ok(current);
        }
        if current.id == StateId::Stopped {
            self.ui.info(&format!("Starting machine '{id}'..."));
        } else {
            self.ui.warn(&format!(
                "Machine '{id}' reports status '{}'; starting it.",
                record.status
            ));
        }
        let started = self.gateway.start_machine(&id).await;
        self.cache.invalidate(&id);
        started?;
        self.wait_for_ssh(&id).await?;
        self.ui.info(&format!("Machine '{id}' is running."));
        Ok(MachineState::running())
    }

    async fn create(&mut self) -> Result<MachineState, ProviderError> {
        let identity =
            generate_identity(&self.gateway, &self.suffixes, &self.logical_name).await?;
        let distribution = self.config.distribution_spec();

        self.ui.info(&format!(
            "Creating machine '{identity}' from {distribution}..."
        ));
        let created = self.gateway.create_machine(&identity, &distribution).await;
        self.cache.invalidate(&identity);
        if let Err(e) = &created {
            self.ui
                .error(&format!("Failed to create machine '{identity}': {e}"));
        }
        created?;

        self.store
            .save(&MachineMetadata {
                machine_name: identity.clone(),
                distribution,
                created_at: Utc::now(),
            })
            .await?;

        self.wait_for_ssh(&identity).await?;
        self.ui.info(&format!("Machine '{identity}' is running."));
        Ok(MachineState::running())
    }

    /// Stop the machine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMachineIdentity` when nothing is recorded, or the
    /// backend failure.
    pub async fn halt(&mut self) -> Result<(), ProviderError> {
        let id = self.require_identity("halt").await?;
        self.ui.info(&format!("Stopping machine '{id}'..."));
        let stopped = self.gateway.stop_machine(&id).await;
        self.cache.invalidate(&id);
        stopped?;
        self.ui.info(&format!("Machine '{id}' stopped."));
        Ok(())
    }

    /// Start the machine without waiting for SSH.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMachineIdentity` when nothing is recorded, or the
    /// backend failure.
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        let id = self.require_identity("start").await?;
        self.ui.info(&format!("Starting machine '{id}'..."));
        let started = self.gateway.start_machine(&id).await;
        self.cache.invalidate(&id);
        started?;
        self.ui.info(&format!("Machine '{id}' started."));
        Ok(())
    }

    /// Halt then start. A failed halt aborts before start runs.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either step.
    pub async fn reload(&mut self) -> Result<(), ProviderError> {
        self.halt().await?;
        self.start().await
    }

    /// Delete the machine and forget it locally.
    ///
    /// Backend deletion failures are reported as warnings and otherwise
    /// ignored; the local files are removed regardless.
    ///
    /// # Errors
    ///
    /// Returns `Storage` only if a local file exists and cannot be removed.
    pub async fn destroy(&mut self) -> Result<(), ProviderError> {
        let identity = match self.identity().await {
            Ok(id) => id,
            Err(e) => {
                self.ui.warn(&format!("Could not read machine identity: {e}"));
                None
            }
        };

        match identity {
            None => self.ui.info("Machine is already destroyed."),
            Some(id) if !is_valid_identity(&id) => self.ui.warn(&format!(
                "Recorded machine identity '{id}' is invalid; removing local data only."
            )),
            Some(id) => {
                self.ui.info(&format!("Destroying machine '{id}'..."));
                match self.gateway.delete_machine(&id).await {
                    Ok(_) => self.ui.info(&format!("Machine '{id}' destroyed.")),
                    Err(e) => {
                        tracing::warn!(machine = %id, error = %e, "backend delete failed");
                        self.ui.warn(&format!(
                            "Could not delete machine '{id}' ({e}); removing local data anyway."
                        ));
                    }
                }
            }
        }

        let cleared = self.store.clear().await;
        self.cache.invalidate_all();
        cleared
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Current machine state. Never fails: errors read as `not_created`.
    pub async fn state(&mut self) -> MachineState {
        let identity = match self.identity().await {
            Ok(Some(id)) => id,
            Ok(None) => return MachineState::not_created(),
            Err(e) => {
                self.ui
                    .warn(&format!("Could not read machine identity: {e}"));
                return MachineState::not_created();
            }
        };
        if !is_valid_identity(&identity) {
            self.ui.warn(&format!(
                "Recorded machine identity '{identity}' is invalid."
            ));
            return MachineState::not_created();
        }
        match self.fetch_state(&identity).await {
            Ok(state) => state,
            Err(e) => {
                self.ui
                    .warn(&format!("Could not query machine '{identity}': {e}"));
                MachineState::not_created()
            }
        }
    }

    async fn fetch_state(&mut self, identity: &str) -> Result<MachineState, ProviderError> {
        if let Some(state) = self.cache.get(identity) {
            tracing::debug!(machine = identity, state = %state.id, "state cache hit");
            return Ok(state);
        }
        tracing::debug!(machine = identity, "state cache miss");
        let machines = self.gateway.list_machines().await?;
        let state = machine_state(machines.iter().find(|m| m.name == identity));
        self.cache.set(identity, state.clone());
        Ok(state)
    }

    /// SSH connection details for a running machine, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `SshNotReady` in direct mode when the running machine has no
    /// address or no usable username yet. Backend errors read as `None`.
    pub async fn ssh_info(&mut self) -> Result<Option<SshInfo>, ProviderError> {
        let state = self.state().await;
        if state.id != StateId::Running {
            return Ok(None);
        }
        let Some(identity) = self.identity().await.ok().flatten() else {
            return Ok(None);
        };

        match self.config.ssh_mode {
            SshMode::Proxy => Ok(Some(SshInfo {
                host: SSH_PROXY_HOST.to_string(),
                port: SSH_PROXY_PORT,
                username: identity,
                forward_agent: self.config.forward_agent,
                private_key_path: self.proxy_key_path.clone(),
            })),
            SshMode::Direct => {
                let record = match self.gateway.machine_info(&identity).await {
                    Ok(Some(r)) => r,
                    Ok(None) => return Ok(None),
                    Err(e) => {
                        self.ui.warn(&format!(
                            "Could not fetch SSH details for '{identity}': {e}"
                        ));
                        return Ok(None);
                    }
                };
                self.direct_ssh_info(&identity, &record).map(Some)
            }
        }
    }

    fn direct_ssh_info(
        &self,
        identity: &str,
        record: &MachineRecord,
    ) -> Result<SshInfo, ProviderError> {
        let host = record.ip().ok_or_else(|| ProviderError::SshNotReady {
            machine: identity.to_string(),
            reason: "no IP address assigned yet".to_string(),
        })?;
        let username = self
            .config
            .ssh_username
            .clone()
            .or_else(|| record.default_username.clone())
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ProviderError::SshNotReady {
                machine: identity.to_string(),
                reason: "no SSH username configured or reported".to_string(),
            })?;
        Ok(SshInfo {
            host: host.to_string(),
            port: SSH_DIRECT_PORT,
            username,
            forward_agent: self.config.forward_agent,
            private_key_path: None,
        })
    }

    /// Poll until the machine is running and reachable for the configured SSH mode.
    ///
    /// # Errors
    ///
    /// Returns `SshNotReady` once the readiness timeout elapses. A missing
    /// backend binary aborts the wait immediately.
    pub async fn wait_for_ssh(&mut self, identity: &str) -> Result<(), ProviderError> {
        let deadline = Instant::now() + self.readiness.timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.gateway.machine_info(identity).await {
                Ok(Some(record)) if self.is_reachable(&record) => {
                    tracing::debug!(machine = identity, attempts, "ssh ready");
                    self.cache.invalidate(identity);
                    return Ok(());
                }
                Ok(_) => tracing::trace!(machine = identity, attempts, "ssh not ready yet"),
                Err(ProviderError::BackendNotInstalled) => {
                    return Err(ProviderError::BackendNotInstalled);
                }
                Err(e) => tracing::debug!(machine = identity, error = %e, "readiness probe failed"),
            }
            if Instant::now() + self.readiness.interval > deadline {
                break;
            }
            tokio::time::sleep(self.readiness.interval).await;
        }
        self.cache.invalidate(identity);
        Err(ProviderError::SshNotReady {
            machine: identity.to_string(),
            reason: format!(
                "not reachable after {}s ({attempts} checks)",
                self.readiness.timeout.as_secs()
            ),
        })
    }

    fn is_reachable(&self, record: &MachineRecord) -> bool {
        record.is_running()
            && match self.config.ssh_mode {
                SshMode::Proxy => true,
                SshMode::Direct => record.ip().is_some(),
            }
    }
}

/// Pull a semantic version out of `orbctl version` output.
fn parse_version(output: &str) -> Option<semver::Version> {
    output
        .split_whitespace()
        .map(|tok| tok.trim_start_matches('v'))
        .find_map(|tok| semver::Version::parse(tok).ok())
}
