//! Machine identity generation with live collision checks.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use rand::Rng;

use crate::application::ports::{MachineInspector, SuffixGenerator};
use crate::domain::ProviderError;
use crate::domain::naming::{SUFFIX_LEN, candidate_identity, sanitize_name};

/// Candidates tried before giving up.
pub const MAX_NAME_ATTEMPTS: u32 = 3;

/// Production suffix source backed by the thread-local RNG.
pub struct RandomSuffix;

impl SuffixGenerator for RandomSuffix {
    fn next_suffix(&self) -> String {
        let value: u32 = rand::rng().random_range(0..1 << (SUFFIX_LEN * 4));
        format!("{value:0width$x}", width = SUFFIX_LEN)
    }
}

/// Generate an identity for `logical_name` that no live machine is using.
///
/// The machine list is re-read for every candidate so machines created
/// out-of-band are seen.
///
/// # Errors
///
/// Returns `NameCollision` after [`MAX_NAME_ATTEMPTS`] taken candidates, or
/// whatever the backend reports when listing fails.
pub async fn generate_identity(
    gateway: &impl MachineInspector,
    suffixes: &impl SuffixGenerator,
    logical_name: &str,
) -> Result<String, ProviderError> {
    let sanitized = sanitize_name(logical_name);
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let candidate = candidate_identity(&sanitized, &suffixes.next_suffix());
        let machines = gateway.list_machines().await?;
        if machines.iter().all(|m| m.name != candidate) {
            tracing::debug!(%candidate, attempt, "machine identity accepted");
            return Ok(candidate);
        }
        tracing::debug!(%candidate, attempt, "machine identity already taken");
    }
    Err(ProviderError::NameCollision {
        logical_name: logical_name.to_string(),
        attempts: MAX_NAME_ATTEMPTS,
    })
}
