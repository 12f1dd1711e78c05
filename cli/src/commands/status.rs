//! `status` — report the machine state. Never fails on backend errors.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::MachineStore;
use crate::output::json;

/// Run `status`.
///
/// # Errors
///
/// Returns an error only if no data directory was given.
pub async fn run(app: &AppContext) -> Result<()> {
    let mut controller = app.controller()?;
    let state = controller.state().await;

    if app.is_json() {
        println!("{}", json::format_value(&state)?);
        return Ok(());
    }

    let ctx = &app.output;
    ctx.header(&format!("Machine '{}'", controller.logical_name()));
    ctx.kv("State:", state.id.as_str());
    if let Ok(Some(meta)) = controller.store().load_metadata().await {
        ctx.kv("Name:", &meta.machine_name);
        ctx.kv("Distribution:", &meta.distribution);
        ctx.kv("Created:", &meta.created_at.to_rfc3339());
    }
    ctx.kv("", &state.long_description);
    Ok(())
}
