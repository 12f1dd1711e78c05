//! `doctor` — report backend availability.

use anyhow::Result;
use serde::Serialize;

use crate::app::AppContext;
use crate::application::ports::BackendProbe;
use crate::infra::orbctl::OrbctlGateway;
use crate::output::json;

/// Backend probe results.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DoctorReport {
    pub available: bool,
    pub running: bool,
    pub version: Option<String>,
}

impl DoctorReport {
    #[must_use]
    pub fn healthy(&self) -> bool {
        self.available && self.running
    }
}

/// Collect all probes. Never fails.
pub async fn probe(backend: &impl BackendProbe) -> DoctorReport {
    let available = backend.available().await;
    DoctorReport {
        available,
        running: available && backend.running().await,
        version: if available {
            backend.version().await
        } else {
            None
        },
    }
}

/// Run `doctor`.
///
/// # Errors
///
/// Returns an error if OrbStack is missing or not running. In JSON mode the
/// report itself carries the result and the command always succeeds.
pub async fn run(app: &AppContext) -> Result<()> {
    let report = probe(&OrbctlGateway::default_runner()).await;

    if app.is_json() {
        println!("{}", json::format_value(&report)?);
        return Ok(());
    }

    let ctx = &app.output;
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    ctx.header("OrbStack");
    ctx.kv("Installed:", yes_no(report.available));
    ctx.kv("Running:", yes_no(report.running));
    ctx.kv("Version:", report.version.as_deref().unwrap_or("unknown"));

    if report.healthy() {
        Ok(())
    } else if !report.available {
        Err(crate::domain::ProviderError::BackendNotInstalled.into())
    } else {
        Err(crate::domain::ProviderError::BackendNotRunning.into())
    }
}
