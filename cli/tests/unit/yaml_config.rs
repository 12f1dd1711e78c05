//! Config file loading and the `ORBSTACK_PROVIDER_CONFIG` override.
//!
//! Tests that touch the environment are marked `#[serial]`.

#![allow(clippy::expect_used, unsafe_code)]

use orbstack_common::{ProviderConfig, SshMode};
use orbstack_provider::infra::config::{CONFIG_ENV, YamlConfigStore};
use serial_test::serial;
use tempfile::TempDir;

fn write(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, body).expect("write config");
    path
}

#[test]
#[serial]
fn test_env_var_selects_config_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "distro: debian\nversion: bookworm\nssh_mode: direct\n");
    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var(CONFIG_ENV, &path) };

    let store = YamlConfigStore::new();
    let resolved = store.path().expect("path");
    let loaded = store.load();

    unsafe { std::env::remove_var(CONFIG_ENV) };

    assert_eq!(resolved, path);
    let config = loaded.expect("load");
    assert_eq!(config.distribution_spec(), "debian:bookworm");
    assert_eq!(config.ssh_mode, SshMode::Direct);
    assert_eq!(config.cache_ttl_secs, 5);
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env_var() {
    let dir = TempDir::new().expect("temp dir");
    let explicit = write(&dir, "forward_agent: true\n");
    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var(CONFIG_ENV, dir.path().join("other.yaml")) };

    let loaded = YamlConfigStore::with_path(explicit).load();

    unsafe { std::env::remove_var(CONFIG_ENV) };

    let config = loaded.expect("load");
    assert!(config.forward_agent);
    assert_eq!(config.distro, "ubuntu");
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "machine_name: web-01\n");

    let config = YamlConfigStore::with_path(path).load().expect("load");

    assert_eq!(
        config,
        ProviderConfig {
            machine_name: Some("web-01".to_string()),
            ..ProviderConfig::default()
        }
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_unparseable_file_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "cache_ttl_secs: [not, a, number]\n");

    let err = YamlConfigStore::with_path(path)
        .load()
        .expect_err("bad yaml");

    assert!(format!("{err:#}").contains("cannot parse"), "got: {err:#}");
}
