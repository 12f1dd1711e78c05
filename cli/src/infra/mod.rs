//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! orbctl gateway, per-machine file storage, and config loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod orbctl;
pub mod store;

/// Private key OrbStack's SSH proxy accepts, if the home directory is known.
#[must_use]
pub fn proxy_key_path() -> Option<String> {
    dirs::home_dir().map(|h| {
        h.join(".orbstack")
            .join("ssh")
            .join("id_ed25519")
            .to_string_lossy()
            .into_owned()
    })
}
