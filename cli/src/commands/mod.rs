//! Command implementations

pub mod doctor;
pub mod machine;
pub mod ssh_info;
pub mod status;
