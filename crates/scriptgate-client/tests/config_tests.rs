// crates/scriptgate-client/tests/config_tests.rs
// ============================================================================
// Module: Client Config Tests
// Description: Load, save, and validation behavior of the TOML config.
// Purpose: Prove the fail-closed load guards and the persistence round trip.
// ============================================================================

//! ## Overview
//! Uses `tempfile` fixtures so every test works against an explicit path and
//! never touches the real home directory.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::PathBuf;

use scriptgate_client::ClientConfig;
use scriptgate_client::ConfigError;
use scriptgate_client::Credentials;
use tempfile::TempDir;

fn sample_config() -> ClientConfig {
    ClientConfig {
        server: "https://scripts.example".to_string(),
        username: Some("alice".to_string()),
        key_path: Some(PathBuf::from("/home/alice/.keys/script.pem")),
        client_id: Some("cid".to_string()),
        client_secret: Some("shh".to_string()),
    }
}

// ============================================================================
// SECTION: Round Trip Tests
// ============================================================================

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scriptgate.toml");

    let config = sample_config();
    let written = config.save(Some(&path)).expect("save");
    assert_eq!(written, path);

    let loaded = ClientConfig::load(Some(&path)).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("nested").join("deeper").join("scriptgate.toml");

    sample_config().save(Some(&path)).expect("save");
    assert!(path.is_file());
}

#[cfg(unix)]
#[test]
fn saved_config_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scriptgate.toml");
    sample_config().save(Some(&path)).expect("save");

    let mode = fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ============================================================================
// SECTION: Load Guard Tests
// ============================================================================

fn assert_invalid(result: Result<ClientConfig, ConfigError>, needle: &str) {
    match result {
        Err(error) => {
            let message = error.to_string();
            assert!(message.contains(needle), "error {message} did not contain {needle}");
        }
        Ok(_) => panic!("expected invalid config load"),
    }
}

#[test]
fn load_rejects_unknown_fields() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scriptgate.toml");
    fs::write(&path, "server = \"https://scripts.example\"\nextra = 1\n").expect("write");

    assert!(matches!(ClientConfig::load(Some(&path)), Err(ConfigError::Parse(_))));
}

#[test]
fn load_rejects_oversized_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scriptgate.toml");
    fs::write(&path, vec![b'a'; 1_048_577]).expect("write");

    assert_invalid(ClientConfig::load(Some(&path)), "config file exceeds size limit");
}

#[test]
fn load_rejects_non_utf8_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("scriptgate.toml");
    fs::write(&path, [0xFF, 0xFE, 0xFF]).expect("write");

    assert_invalid(ClientConfig::load(Some(&path)), "config file must be utf-8");
}

#[test]
fn load_rejects_overlong_path() {
    let long_path = "a".repeat(5_000);
    assert_invalid(
        ClientConfig::load(Some(std::path::Path::new(&long_path))),
        "config path exceeds max length",
    );
}

#[test]
fn load_rejects_overlong_path_component() {
    let long_component = "a".repeat(300);
    assert_invalid(
        ClientConfig::load(Some(std::path::Path::new(&long_component))),
        "config path component too long",
    );
}

// ============================================================================
// SECTION: Validation and Credentials Tests
// ============================================================================

#[test]
fn empty_server_fails_validation() {
    let config = ClientConfig::new("   ".to_string());
    assert_invalid(config.validate().map(|()| config.clone()), "server url must not be empty");
}

#[test]
fn half_configured_credentials_fail_validation() {
    let mut config = sample_config();
    config.client_secret = None;
    assert_invalid(
        config.validate().map(|()| config.clone()),
        "client_id and client_secret must be set together",
    );
}

#[test]
fn paired_credentials_map_to_basic_auth() {
    let config = sample_config();
    assert!(matches!(config.credentials(), Credentials::Basic { .. }));
}

#[test]
fn missing_credentials_map_to_anonymous() {
    let config = ClientConfig::new("https://scripts.example".to_string());
    assert!(matches!(config.credentials(), Credentials::Anonymous));
}
