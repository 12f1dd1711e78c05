pub mod config;
pub mod types;

pub use config::{ConfigError, ProviderConfig, SshMode, validate_machine_name};
pub use types::*;
