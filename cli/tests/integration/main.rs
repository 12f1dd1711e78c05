//! Integration tests for the orbstack-provider CLI
//!
//! These tests spawn the actual binary. Backend calls are pointed at an
//! empty `PATH` so no real `orbctl` is ever reached.
