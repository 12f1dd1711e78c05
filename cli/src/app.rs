//! Application context — unified state passed to every command handler.
//!
//! `AppContext` owns the output context, the resolved provider configuration
//! and the host's machine handle, and wires them into a `MachineController`
//! on demand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use orbstack_common::ProviderConfig;

use crate::application::ports::MachineHandle;
use crate::application::services::machine::{MachineController, RandomSuffix};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::orbctl::OrbctlGateway;
use crate::infra::proxy_key_path;
use crate::infra::store::MachineDataDir;
use crate::output::{OutputContext, TerminalSink};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// The machine as the host describes it.
#[derive(Debug, Clone)]
pub struct HostMachine {
    pub logical_name: String,
    pub config: ProviderConfig,
    pub data_dir: PathBuf,
}

impl MachineHandle for HostMachine {
    fn logical_name(&self) -> &str {
        &self.logical_name
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Controller wired to the real backend and filesystem.
pub type ProductionController<'a> = MachineController<
    OrbctlGateway<TokioCommandRunner>,
    MachineDataDir,
    RandomSuffix,
    TerminalSink<'a>,
>;

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Resolved provider configuration.
    pub config: ProviderConfig,
    /// Logical machine name.
    pub logical_name: String,
    /// Per-machine storage directory, if one was given.
    pub data_dir: Option<PathBuf>,
}

impl AppContext {
    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Message sink for the current output mode.
    #[must_use]
    pub fn sink(&self) -> TerminalSink<'_> {
        if self.is_json() {
            TerminalSink::stderr(&self.output)
        } else {
            TerminalSink::new(&self.output)
        }
    }

    /// The host machine handle.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory was supplied.
    pub fn machine(&self) -> Result<HostMachine> {
        let data_dir = self
            .data_dir
            .clone()
            .context("a machine data directory is required (--data-dir)")?;
        Ok(HostMachine {
            logical_name: self.logical_name.clone(),
            config: self.config.clone(),
            data_dir,
        })
    }

    /// Build a controller for the configured machine.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory was supplied.
    pub fn controller(&self) -> Result<ProductionController<'_>> {
        let machine = self.machine()?;
        let store = MachineDataDir::new(machine.data_dir());
        Ok(MachineController::new(
            &machine,
            OrbctlGateway::default_runner(),
            store,
            RandomSuffix,
            self.sink(),
        )
        .with_proxy_key_path(proxy_key_path()))
    }
}
