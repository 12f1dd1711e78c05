//! Application services for the machine lifecycle.
//!
//! Each module imports only from `crate::domain` and
//! `crate::application::ports`.

pub mod lifecycle;
pub mod namer;

pub use lifecycle::{MachineController, ReadinessPolicy};
pub use namer::{MAX_NAME_ATTEMPTS, RandomSuffix, generate_identity};
