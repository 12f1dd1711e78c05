//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use orbstack_common::{ProviderConfig, SshMode};

use crate::app::{AppContext, OutputMode};
use crate::application::actions::Operation;
use crate::commands;
use crate::infra::config::YamlConfigStore;
use crate::output::OutputContext;

/// Manage an OrbStack machine on behalf of a host orchestration tool
#[derive(Parser)]
#[command(
    name = "orbstack-provider",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Per-machine data directory
    #[arg(long, global = true, env = "ORBSTACK_PROVIDER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Logical machine name
    #[arg(long, global = true, default_value = "default")]
    pub name: String,

    /// Config file (defaults to ~/.orbstack-provider/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-invocation overrides of config file values.
#[derive(Args, Default)]
pub struct ConfigOverrides {
    /// Distribution to create, e.g. `ubuntu`
    #[arg(long, global = true)]
    pub distro: Option<String>,

    /// Distribution version, e.g. `noble`
    #[arg(long, global = true)]
    pub distro_version: Option<String>,

    /// Custom machine name used instead of --name
    #[arg(long, global = true)]
    pub machine_name: Option<String>,

    /// SSH username for direct connections
    #[arg(long, global = true)]
    pub ssh_username: Option<String>,

    /// Forward the SSH agent
    #[arg(long, global = true)]
    pub forward_agent: bool,

    /// How SSH connection details are derived
    #[arg(long, global = true, value_enum)]
    pub ssh_mode: Option<SshMode>,
}

impl ConfigOverrides {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(self, config: &mut ProviderConfig) {
        if let Some(distro) = self.distro {
            config.distro = distro;
        }
        if let Some(version) = self.distro_version {
            config.version = Some(version);
        }
        if let Some(name) = self.machine_name {
            config.machine_name = Some(name);
        }
        if let Some(user) = self.ssh_username {
            config.ssh_username = Some(user);
        }
        if self.forward_agent {
            config.forward_agent = true;
        }
        if let Some(mode) = self.ssh_mode {
            config.ssh_mode = mode;
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the machine if needed and start it
    Up,

    /// Stop the machine
    Halt,

    /// Start a stopped machine
    Start,

    /// Stop and start the machine
    Reload,

    /// Delete the machine and its local data
    Destroy,

    /// Show the machine state
    Status,

    /// Show SSH connection details
    SshInfo,

    /// Check that OrbStack is installed and running
    Doctor,
}

impl Cli {
    /// Resolve configuration and build the application context.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid.
    pub fn context(&mut self) -> Result<AppContext> {
        let store = match self.config.take() {
            Some(path) => YamlConfigStore::with_path(path),
            None => YamlConfigStore::new(),
        };
        let mut config = store.load()?;
        std::mem::take(&mut self.overrides).apply(&mut config);
        config.validate().context("invalid configuration")?;

        Ok(AppContext {
            output: OutputContext::new(self.no_color, self.quiet),
            mode: if self.json {
                OutputMode::Json
            } else {
                OutputMode::Human
            },
            config,
            logical_name: self.name.clone(),
            data_dir: self.data_dir.clone(),
        })
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(mut self) -> Result<()> {
        let app = self.context()?;
        match self.command {
            Command::Up => commands::machine::run(&app, Operation::Up).await,
            Command::Halt => commands::machine::run(&app, Operation::Halt).await,
            Command::Start => commands::machine::run(&app, Operation::Start).await,
            Command::Reload => commands::machine::run(&app, Operation::Reload).await,
            Command::Destroy => commands::machine::run(&app, Operation::Destroy).await,
            Command::Status => commands::status::run(&app).await,
            Command::SshInfo => commands::ssh_info::run(&app).await,
            Command::Doctor => commands::doctor::run(&app).await,
        }
    }
}
