//! `up`, `halt`, `start`, `reload`, `destroy` — run a registered operation.

use anyhow::{Context, Result};
use orbstack_common::MachineState;
use serde::Serialize;

use crate::app::AppContext;
use crate::application::actions::{Operation, run_operation};
use crate::output::json;

#[derive(Serialize)]
struct OperationResult<'a> {
    operation: &'a str,
    state: MachineState,
}

/// Run one lifecycle operation against the configured machine.
///
/// # Errors
///
/// Returns an error if any step of the operation fails.
pub async fn run(app: &AppContext, op: Operation) -> Result<()> {
    let mut controller = app.controller()?;
    run_operation(&mut controller, op)
        .await
        .with_context(|| format!("{op} failed"))?;

    let state = controller.state().await;
    if app.is_json() {
        println!(
            "{}",
            json::format_value(&OperationResult {
                operation: op.as_str(),
                state,
            })?
        );
    } else {
        app.output.success(&format!("{op} complete ({})", state.short_description));
    }
    Ok(())
}
