//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one document on stdout: the
//! command's value on success, or an error object on failure.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::ProviderError;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format an error chain, using the `ProviderError` key when one is inside.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_anyhow_error(err: &anyhow::Error) -> Result<String> {
    let code = err
        .chain()
        .find_map(|e| e.downcast_ref::<ProviderError>())
        .map_or("error", ProviderError::kind);
    format_error(&format!("{err:#}"), code)
}

/// Pretty-print any serializable value.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_value<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}
