//! Infrastructure implementation of the machine gateway port traits.
//!
//! `OrbctlGateway<R>` routes every `orbctl` invocation through a
//! `CommandRunner` and is the single place where exit codes and runner
//! failures become `ProviderError` values.

use std::process::Output;
use std::time::Duration;

use serde::Deserialize;

use crate::application::ports::{
    BackendProbe, CommandRunner, MachineInspector, MachineLifecycle,
};
use crate::domain::{MachineRecord, ProviderError, RunnerError};
use crate::infra::command_runner::{CREATE_TIMEOUT, DEFAULT_CMD_TIMEOUT, TokioCommandRunner};

/// Backend CLI binary.
pub const ORBCTL: &str = "orbctl";

/// Infrastructure adapter that routes all orbctl calls through a `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct OrbctlGateway<R: CommandRunner> {
    runner: R,
    program: String,
    create_timeout: Duration,
}

impl<R: CommandRunner> OrbctlGateway<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: ORBCTL.to_string(),
            create_timeout: CREATE_TIMEOUT,
        }
    }

    /// Use a different binary name or path (e.g. `orb`).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run one orbctl command and classify the outcome.
    ///
    /// Only a zero exit status yields `Ok`.
    async fn invoke(&self, args: &[&str], timeout: Option<Duration>) -> Result<Output, ProviderError> {
        let command = self.describe(args);
        let result = match timeout {
            Some(t) => self.runner.run_with_timeout(&self.program, args, t).await,
            None => self.runner.run(&self.program, args).await,
        };
        let output = result.map_err(|e| classify_runner_error(&command, e))?;
        if output.status.success() {
            return Ok(output);
        }
        let diagnostic = diagnostic_text(&output);
        tracing::warn!(%command, code = ?output.status.code(), %diagnostic, "orbctl failed");
        if mentions_daemon_down(&diagnostic) {
            return Err(ProviderError::BackendNotRunning);
        }
        Err(ProviderError::CommandFailed {
            command,
            diagnostic,
        })
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Detail for `name` after a successful mutation, or a minimal record when
    /// the backend has none to give. A failed lookup does not undo the mutation.
    async fn record_after(&self, name: &str, status: &str) -> MachineRecord {
        match self.machine_info(name).await {
            Ok(Some(record)) => record,
            Ok(None) => minimal_record(name, status),
            Err(e) => {
                tracing::debug!(machine = name, error = %e, "detail lookup failed after mutation");
                minimal_record(name, status)
            }
        }
    }
}

impl OrbctlGateway<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT))
    }
}

impl<R: CommandRunner> MachineInspector for OrbctlGateway<R> {
    async fn list_machines(&self) -> Result<Vec<MachineRecord>, ProviderError> {
        let output = self.invoke(&["list", "--format", "json"], None).await?;
        parse_machine_list(&output.stdout).map_err(|source| ProviderError::MalformedOutput {
            command: self.describe(&["list"]),
            source,
        })
    }

    async fn machine_info(&self, name: &str) -> Result<Option<MachineRecord>, ProviderError> {
        match self.invoke(&["info", name, "--format", "json"], None).await {
            Ok(output) => parse_machine_info(&output.stdout)
                .map(Some)
                .map_err(|source| ProviderError::MalformedOutput {
                    command: self.describe(&["info", name]),
                    source,
                }),
            Err(ProviderError::CommandFailed { diagnostic, .. })
                if mentions_missing_machine(&diagnostic) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl<R: CommandRunner> MachineLifecycle for OrbctlGateway<R> {
    async fn create_machine(
        &self,
        name: &str,
        distribution: &str,
    ) -> Result<MachineRecord, ProviderError> {
        self.invoke(&["create", distribution, name], Some(self.create_timeout))
            .await?;
        Ok(self.record_after(name, "running").await)
    }

    async fn start_machine(&self, name: &str) -> Result<MachineRecord, ProviderError> {
        self.invoke(&["start", name], None).await?;
        Ok(self.record_after(name, "running").await)
    }

    async fn stop_machine(&self, name: &str) -> Result<MachineRecord, ProviderError> {
        self.invoke(&["stop", name], None).await?;
        Ok(self.record_after(name, "stopped").await)
    }

    async fn delete_machine(&self, name: &str) -> Result<bool, ProviderError> {
        self.invoke(&["delete", "--force", name], None).await?;
        Ok(true)
    }
}

impl<R: CommandRunner> BackendProbe for OrbctlGateway<R> {
    async fn available(&self) -> bool {
        self.runner
            .run(&self.program, &["version"])
            .await
            .is_ok_and(|o| o.status.success())
    }

    async fn running(&self) -> bool {
        match self.runner.run(&self.program, &["status"]).await {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout)
                .trim()
                .eq_ignore_ascii_case("running"),
            _ => false,
        }
    }

    async fn version(&self) -> Option<String> {
        let output = self.runner.run(&self.program, &["version"]).await.ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from)
    }
}

// ── Output parsing ───────────────────────────────────────────────────────────

/// `orbctl info --format json` wraps the machine in a `record` object on
/// some versions and prints it bare on others; the address sits beside it.
#[derive(Deserialize)]
struct InfoEnvelope {
    record: MachineRecord,
    #[serde(default)]
    ip4: Option<String>,
}

/// Parse `orbctl list --format json`. Empty output means no machines.
///
/// # Errors
///
/// Returns the JSON error when the output is not an array of machines.
pub fn parse_machine_list(stdout: &[u8]) -> Result<Vec<MachineRecord>, serde_json::Error> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(text)
}

/// Parse `orbctl info <name> --format json`.
///
/// # Errors
///
/// Returns the JSON error when neither the wrapped nor the bare form matches.
pub fn parse_machine_info(stdout: &[u8]) -> Result<MachineRecord, serde_json::Error> {
    if let Ok(env) = serde_json::from_slice::<InfoEnvelope>(stdout) {
        let mut record = env.record;
        if record.ip().is_none() {
            record.ip_address = env.ip4.filter(|ip| !ip.trim().is_empty());
        }
        return Ok(record);
    }
    serde_json::from_slice(stdout)
}

fn minimal_record(name: &str, status: &str) -> MachineRecord {
    MachineRecord {
        name: name.to_string(),
        status: status.to_string(),
        ip_address: None,
        default_username: None,
    }
}

fn diagnostic_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stdout
        }
    } else {
        stderr
    }
}

fn classify_runner_error(command: &str, err: RunnerError) -> ProviderError {
    match err {
        RunnerError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            ProviderError::BackendNotInstalled
        }
        RunnerError::TimedOut { timeout, .. } => ProviderError::Timeout {
            command: command.to_string(),
            seconds: timeout.as_secs(),
        },
        other => ProviderError::CommandFailed {
            command: command.to_string(),
            diagnostic: other.to_string(),
        },
    }
}

fn mentions_daemon_down(diagnostic: &str) -> bool {
    let d = diagnostic.to_ascii_lowercase();
    d.contains("not running") && (d.contains("orbstack") || d.contains("daemon"))
}

fn mentions_missing_machine(diagnostic: &str) -> bool {
    let d = diagnostic.to_ascii_lowercase();
    d.contains("not found") || d.contains("does not exist") || d.contains("no such machine")
}
