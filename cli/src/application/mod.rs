//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` — never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod actions;
pub mod ports;
pub mod services;
pub mod state_cache;

pub use ports::{
    BackendProbe, CommandRunner, MachineGateway, MachineHandle, MachineInspector,
    MachineLifecycle, MachineStore, MessageSink, SuffixGenerator,
};
pub use state_cache::StateCache;
