//! `ssh-info` — connection details for a running machine.

use anyhow::Result;

use crate::app::AppContext;
use crate::output::json;

/// Run `ssh-info`.
///
/// # Errors
///
/// Returns an error if the machine is running but SSH is not ready yet.
pub async fn run(app: &AppContext) -> Result<()> {
    let mut controller = app.controller()?;
    let info = controller.ssh_info().await?;

    if app.is_json() {
        println!("{}", json::format_value(&info)?);
        return Ok(());
    }

    let ctx = &app.output;
    match info {
        None => ctx.kv("SSH:", "not available (machine is not running)"),
        Some(info) => {
            ctx.kv("Host:", &info.host);
            ctx.kv("Port:", &info.port.to_string());
            ctx.kv("User:", &info.username);
            ctx.kv("Forward agent:", if info.forward_agent { "yes" } else { "no" });
            if let Some(key) = &info.private_key_path {
                ctx.kv("Identity file:", key);
            }
        }
    }
    Ok(())
}
