//! Lifecycle controller tests: transitions, idempotence, state queries and SSH info.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use orbstack_common::{ProviderConfig, SshMode, StateId};
use orbstack_provider::application::services::machine::ReadinessPolicy;
use orbstack_provider::domain::ProviderError;
use orbstack_provider::infra::store::{IDENTITY_FILE, METADATA_FILE, MachineDataDir};
use tempfile::TempDir;

use crate::helpers::{
    FakeGateway, Level, MemoryStore, command_failed, controller, timed_out,
};

const ID: &str = "vagrant-default-a3b2c1";

fn noble() -> ProviderConfig {
    ProviderConfig {
        version: Some("noble".to_string()),
        ..ProviderConfig::default()
    }
}

fn direct() -> ProviderConfig {
    ProviderConfig {
        ssh_mode: SshMode::Direct,
        ..ProviderConfig::default()
    }
}

// ── up ───────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_up_creates_machine_and_records_it() {
    let dir = TempDir::new().expect("temp dir");
    let mut ctl = controller(
        FakeGateway::default(),
        MachineDataDir::new(dir.path()),
        &["a3b2c1"],
        noble(),
    );

    let state = ctl.up().await.expect("up");

    assert_eq!(state.id, StateId::Running);
    assert_eq!(ctl.gateway().count("create:"), 1);
    assert!(
        ctl.gateway()
            .calls()
            .contains(&format!("create:{ID}:ubuntu:noble")),
        "calls: {:?}",
        ctl.gateway().calls()
    );

    let id = std::fs::read_to_string(dir.path().join(IDENTITY_FILE)).expect("id file");
    assert_eq!(id.trim(), ID);

    let raw = std::fs::read_to_string(dir.path().join(METADATA_FILE)).expect("metadata file");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    let obj = json.as_object().expect("object");
    assert_eq!(obj.len(), 3, "unexpected keys: {obj:?}");
    assert_eq!(json["machine_name"], ID);
    assert_eq!(json["distribution"], "ubuntu:noble");
    let created_at = json["created_at"].as_str().expect("timestamp");
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[tokio::test]
async fn test_up_is_idempotent() {
    let mut ctl = controller(
        FakeGateway::default(),
        MemoryStore::default(),
        &["a3b2c1", "ffffff"],
        ProviderConfig::default(),
    );

    ctl.up().await.expect("first up");
    let first = ctl.identity().await.expect("identity");
    let state = ctl.up().await.expect("second up");

    assert_eq!(state.id, StateId::Running);
    assert_eq!(ctl.gateway().count("create:"), 1);
    assert_eq!(ctl.identity().await.expect("identity"), first);
    assert!(
        ctl.ui()
            .at(Level::Info)
            .iter()
            .any(|m| m.contains("already running"))
    );
}

#[tokio::test]
async fn test_up_starts_stopped_machine() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "stopped"),
        MemoryStore::with_identity(ID),
        &[],
        ProviderConfig::default(),
    );

    let state = ctl.up().await.expect("up");

    assert_eq!(state.id, StateId::Running);
    assert_eq!(ctl.gateway().count("create:"), 0);
    assert_eq!(ctl.gateway().count(&format!("start:{ID}")), 1);
}

#[tokio::test]
async fn test_up_recreates_when_recorded_machine_is_gone() {
    let mut ctl = controller(
        FakeGateway::default(),
        MemoryStore::with_identity("vagrant-default-000000"),
        &["a3b2c1"],
        ProviderConfig::default(),
    );

    ctl.up().await.expect("up");

    assert_eq!(ctl.identity().await.expect("identity").as_deref(), Some(ID));
    assert_eq!(ctl.ui().at(Level::Warn).len(), 1);
}

#[tokio::test]
async fn test_up_keeps_listed_machine_with_unknown_status() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "starting"),
        MemoryStore::with_identity(ID),
        &["ffffff"],
        ProviderConfig::default(),
    );

    let state = ctl.up().await.expect("up");

    assert_eq!(state.id, StateId::Running);
    assert_eq!(ctl.gateway().count("create:"), 0);
    assert_eq!(ctl.gateway().count(&format!("start:{ID}")), 1);
    assert_eq!(ctl.identity().await.expect("identity").as_deref(), Some(ID));
    assert_eq!(ctl.gateway().machines.borrow().len(), 1);
    assert!(
        ctl.ui()
            .at(Level::Warn)
            .iter()
            .any(|m| m.contains("'starting'"))
    );
}

#[tokio::test]
async fn test_up_unknown_status_start_failure_keeps_identity() {
    let gw = FakeGateway::with_machine(ID, "paused");
    gw.fail_start.set(Some(command_failed));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &["ffffff"], noble());

    let err = ctl.up().await.expect_err("start failed");

    assert!(matches!(err, ProviderError::CommandFailed { .. }), "got: {err}");
    assert_eq!(ctl.gateway().count("create:"), 0);
    assert_eq!(ctl.identity().await.expect("identity").as_deref(), Some(ID));
}

#[tokio::test]
async fn test_up_does_not_recreate_when_listing_fails() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.fail_list.set(Some(timed_out));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &["a3b2c1"], noble());

    let err = ctl.up().await.expect_err("listing failure must propagate");

    assert!(matches!(err, ProviderError::Timeout { .. }), "got: {err}");
    assert_eq!(ctl.gateway().count("create:"), 0);
    assert_eq!(ctl.identity().await.expect("identity").as_deref(), Some(ID));
}

#[tokio::test]
async fn test_up_create_failure_leaves_no_record() {
    let dir = TempDir::new().expect("temp dir");
    let gw = FakeGateway::default();
    gw.fail_create.set(Some(command_failed));
    let mut ctl = controller(gw, MachineDataDir::new(dir.path()), &["a3b2c1"], noble());

    let err = ctl.up().await.expect_err("create should fail");

    assert!(matches!(err, ProviderError::CommandFailed { .. }), "got: {err}");
    assert!(!dir.path().join(IDENTITY_FILE).exists());
    assert!(!dir.path().join(METADATA_FILE).exists());
    assert_eq!(ctl.ui().at(Level::Error).len(), 1);
}

#[tokio::test]
async fn test_up_uses_configured_machine_name() {
    let config = ProviderConfig {
        machine_name: Some("web-01".to_string()),
        ..ProviderConfig::default()
    };
    let mut ctl = controller(FakeGateway::default(), MemoryStore::default(), &["abcdef"], config);

    ctl.up().await.expect("up");

    assert_eq!(ctl.logical_name(), "web-01");
    assert_eq!(
        ctl.identity().await.expect("identity").as_deref(),
        Some("vagrant-web-01-abcdef")
    );
    assert!(ctl.gateway().calls().contains(&"create:vagrant-web-01-abcdef:ubuntu".to_string()));
}

// ── halt / start / reload ────────────────────────────────────────────────────

#[tokio::test]
async fn test_halt_without_identity_is_invalid_identity() {
    let mut ctl = controller(
        FakeGateway::default(),
        MemoryStore::default(),
        &[],
        ProviderConfig::default(),
    );

    let err = ctl.halt().await.expect_err("nothing to halt");

    assert!(matches!(err, ProviderError::InvalidMachineIdentity { .. }), "got: {err}");
    assert!(ctl.gateway().calls().is_empty());
}

#[tokio::test]
async fn test_start_with_malformed_identity_is_rejected() {
    let mut ctl = controller(
        FakeGateway::default(),
        MemoryStore::with_identity("Not A Name"),
        &[],
        ProviderConfig::default(),
    );

    let err = ctl.start().await.expect_err("malformed identity");

    assert!(matches!(err, ProviderError::InvalidMachineIdentity { .. }), "got: {err}");
}

#[tokio::test]
async fn test_halt_invalidates_cached_state() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MemoryStore::with_identity(ID),
        &[],
        ProviderConfig::default(),
    );

    assert_eq!(ctl.state().await.id, StateId::Running);
    ctl.halt().await.expect("halt");
    assert_eq!(ctl.state().await.id, StateId::Stopped);
    assert_eq!(ctl.gateway().count("list"), 2);
}

#[tokio::test]
async fn test_reload_halts_then_starts() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MemoryStore::with_identity(ID),
        &[],
        ProviderConfig::default(),
    );

    ctl.reload().await.expect("reload");

    assert_eq!(ctl.gateway().calls(), vec![format!("stop:{ID}"), format!("start:{ID}")]);
}

#[tokio::test]
async fn test_reload_aborts_when_halt_fails() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.fail_stop.set(Some(command_failed));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &[], ProviderConfig::default());

    let err = ctl.reload().await.expect_err("halt failure");

    assert!(matches!(err, ProviderError::CommandFailed { .. }), "got: {err}");
    assert_eq!(ctl.gateway().count("start:"), 0);
}

// ── destroy ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_destroy_removes_machine_and_files() {
    let dir = TempDir::new().expect("temp dir");
    let mut ctl = controller(
        FakeGateway::default(),
        MachineDataDir::new(dir.path()),
        &["a3b2c1"],
        ProviderConfig::default(),
    );
    ctl.up().await.expect("up");

    ctl.destroy().await.expect("destroy");

    assert!(ctl.gateway().machines.borrow().is_empty());
    assert!(!dir.path().join(IDENTITY_FILE).exists());
    assert!(!dir.path().join(METADATA_FILE).exists());
    assert_eq!(ctl.state().await.id, StateId::NotCreated);
}

#[tokio::test]
async fn test_destroy_twice_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MachineDataDir::new(dir.path()),
        &[],
        ProviderConfig::default(),
    );

    ctl.destroy().await.expect("first destroy");
    ctl.destroy().await.expect("second destroy");

    assert_eq!(ctl.gateway().count("delete:"), 0);
    assert!(
        ctl.ui()
            .at(Level::Info)
            .iter()
            .all(|m| m.contains("already destroyed"))
    );
}

#[tokio::test]
async fn test_destroy_survives_backend_failure() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.fail_delete.set(Some(command_failed));
    let store = MemoryStore::with_identity(ID);
    let mut ctl = controller(gw, store, &[], ProviderConfig::default());

    // Prime the cache so a stale entry would be visible afterwards.
    assert_eq!(ctl.state().await.id, StateId::Running);

    ctl.destroy().await.expect("destroy ignores backend failure");

    assert!(ctl.store().identity.borrow().is_none());
    assert_eq!(ctl.ui().at(Level::Warn).len(), 1);

    // Same identity recorded again: the cache must have been dropped.
    *ctl.store().identity.borrow_mut() = Some(ID.to_string());
    ctl.gateway().machines.borrow_mut().clear();
    assert_eq!(ctl.state().await.id, StateId::NotCreated);
}

// ── state ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_state_without_identity_skips_backend() {
    let mut ctl = controller(
        FakeGateway::default(),
        MemoryStore::default(),
        &[],
        ProviderConfig::default(),
    );

    let state = ctl.state().await;

    assert_eq!(state.id, StateId::NotCreated);
    assert!(ctl.gateway().calls().is_empty());
}

#[tokio::test]
async fn test_state_maps_unknown_status_to_not_created() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "paused"),
        MemoryStore::with_identity(ID),
        &[],
        ProviderConfig::default(),
    );

    let state = ctl.state().await;

    assert_eq!(state.id, StateId::NotCreated);
    assert_eq!(state.short_description, "unknown");
}

#[tokio::test]
async fn test_state_swallows_backend_errors() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.fail_list.set(Some(timed_out));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &[], ProviderConfig::default());

    let state = ctl.state().await;

    assert_eq!(state.id, StateId::NotCreated);
    assert_eq!(ctl.ui().at(Level::Warn).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_state_is_cached_for_ttl() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MemoryStore::with_identity(ID),
        &[],
        ProviderConfig::default(),
    );

    assert_eq!(ctl.state().await.id, StateId::Running);
    ctl.gateway().set_status(ID, "stopped");

    tokio::time::advance(Duration::from_millis(4_900)).await;
    assert_eq!(ctl.state().await.id, StateId::Running);
    assert_eq!(ctl.gateway().count("list"), 1);

    tokio::time::advance(Duration::from_millis(200)).await;
    assert_eq!(ctl.state().await.id, StateId::Stopped);
    assert_eq!(ctl.gateway().count("list"), 2);
}

// ── ssh_info ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ssh_info_absent_when_not_created() {
    let mut ctl = controller(FakeGateway::default(), MemoryStore::default(), &[], direct());

    assert_eq!(ctl.ssh_info().await.expect("ssh_info"), None);
    assert!(ctl.gateway().calls().is_empty());
}

#[tokio::test]
async fn test_ssh_info_absent_when_stopped() {
    let gw = FakeGateway::with_machine(ID, "stopped");
    gw.fail_info.set(Some(command_failed));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &[], direct());

    assert_eq!(ctl.ssh_info().await.expect("ssh_info"), None);
    assert_eq!(ctl.gateway().count("info:"), 0);
}

#[tokio::test]
async fn test_ssh_info_proxy_mode() {
    let config = ProviderConfig {
        forward_agent: true,
        ..ProviderConfig::default()
    };
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MemoryStore::with_identity(ID),
        &[],
        config,
    )
    .with_proxy_key_path(Some("/home/u/.orbstack/ssh/id_ed25519".to_string()));

    let info = ctl.ssh_info().await.expect("ssh_info").expect("running");

    assert_eq!(info.host, "127.0.0.1");
    assert_eq!(info.port, 32222);
    assert_eq!(info.username, ID);
    assert!(info.forward_agent);
    assert_eq!(
        info.private_key_path.as_deref(),
        Some("/home/u/.orbstack/ssh/id_ed25519")
    );
    assert_eq!(ctl.gateway().count("info:"), 0);
}

#[tokio::test]
async fn test_ssh_info_direct_mode_prefers_configured_username() {
    let config = ProviderConfig {
        ssh_username: Some("ops".to_string()),
        ..direct()
    };
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MemoryStore::with_identity(ID),
        &[],
        config,
    );

    let info = ctl.ssh_info().await.expect("ssh_info").expect("running");

    assert_eq!(info.host, "198.19.249.2");
    assert_eq!(info.port, 22);
    assert_eq!(info.username, "ops");
    assert!(!info.forward_agent);
}

#[tokio::test]
async fn test_ssh_info_direct_mode_falls_back_to_backend_username() {
    let mut ctl = controller(
        FakeGateway::with_machine(ID, "running"),
        MemoryStore::with_identity(ID),
        &[],
        direct(),
    );

    let info = ctl.ssh_info().await.expect("ssh_info").expect("running");

    assert_eq!(info.username, "dev");
}

#[tokio::test]
async fn test_ssh_info_direct_mode_without_address_is_not_ready() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.machines.borrow_mut()[0].ip_address = None;
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &[], direct());

    let err = ctl.ssh_info().await.expect_err("no address yet");

    assert!(matches!(err, ProviderError::SshNotReady { .. }), "got: {err}");
}

#[tokio::test]
async fn test_ssh_info_backend_error_reads_as_absent() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.fail_info.set(Some(timed_out));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &[], direct());

    assert_eq!(ctl.ssh_info().await.expect("ssh_info"), None);
    assert_eq!(ctl.ui().at(Level::Warn).len(), 1);
}

// ── readiness ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_up_waits_until_machine_reports_running() {
    let gw = FakeGateway::default();
    gw.pending_polls.set(3);
    let mut ctl = controller(gw, MemoryStore::default(), &["a3b2c1"], direct());

    ctl.up().await.expect("up");

    assert_eq!(ctl.gateway().count("info:"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_up_times_out_waiting_for_ssh() {
    let gw = FakeGateway::default();
    gw.created_with_ip.set(false);
    let mut ctl = controller(gw, MemoryStore::default(), &["a3b2c1"], direct()).with_readiness(
        ReadinessPolicy {
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(2),
        },
    );
    let started = tokio::time::Instant::now();

    let err = ctl.up().await.expect_err("never reachable");

    assert!(matches!(err, ProviderError::SshNotReady { .. }), "got: {err}");
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(ctl.gateway().count("info:"), 6);
}

#[tokio::test]
async fn test_wait_aborts_when_backend_disappears() {
    let gw = FakeGateway::with_machine(ID, "running");
    gw.fail_info.set(Some(|| ProviderError::BackendNotInstalled));
    let mut ctl = controller(gw, MemoryStore::with_identity(ID), &[], ProviderConfig::default());

    let err = ctl.wait_for_ssh(ID).await.expect_err("backend gone");

    assert!(matches!(err, ProviderError::BackendNotInstalled), "got: {err}");
    assert_eq!(ctl.gateway().count("info:"), 1);
}

// ── backend checks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_check_backend_reports_missing_and_stopped_daemon() {
    let ctl = controller(
        FakeGateway::default(),
        MemoryStore::default(),
        &[],
        ProviderConfig::default(),
    );
    ctl.gateway().available.set(false);
    assert!(matches!(
        ctl.check_backend().await,
        Err(ProviderError::BackendNotInstalled)
    ));

    ctl.gateway().available.set(true);
    ctl.gateway().running.set(false);
    assert!(matches!(
        ctl.check_backend().await,
        Err(ProviderError::BackendNotRunning)
    ));
}

#[tokio::test]
async fn test_check_backend_warns_on_old_version() {
    let ctl = controller(
        FakeGateway::default(),
        MemoryStore::default(),
        &[],
        ProviderConfig::default(),
    );
    ctl.gateway()
        .version
        .replace(Some("Version: 0.9.0 (90000)".to_string()));

    ctl.check_backend().await.expect("old version is only a warning");

    assert_eq!(ctl.ui().at(Level::Warn).len(), 1);
}
