//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod error;
pub mod machine;
pub mod naming;

pub use error::{ProviderError, RunnerError};
pub use machine::{MachineRecord, machine_state};
pub use naming::{candidate_identity, is_valid_identity, sanitize_name};
