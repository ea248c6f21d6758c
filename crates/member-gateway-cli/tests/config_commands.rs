// crates/member-gateway-cli/tests/config_commands.rs
// ============================================================================
// Module: CLI Config Command Tests
// Description: Integration tests for CLI config validation workflows.
// Purpose: Ensure config validation reports success and fails closed on errors.
// Dependencies: member-gateway-cli binary, member-gateway-config, tempfile
// ============================================================================

//! ## Overview
//! Runs the CLI binary for config validation and ensures invalid configuration
//! fails closed with explicit errors.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use member_gateway_config::config_toml_example;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn member_gateway_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_member-gateway"))
}

fn validate(dir: &TempDir, content: &str) -> Output {
    let config_path = dir.path().join("member-gateway.toml");
    fs::write(&config_path, content).expect("write config");
    Command::new(member_gateway_bin())
        .args(["config", "validate", "--config", config_path.to_string_lossy().as_ref()])
        .env_remove("MEMBER_GATEWAY_CONFIG")
        .output()
        .expect("config validate")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies the canonical example validates.
#[test]
fn cli_config_validate_accepts_example() {
    let dir = TempDir::new().unwrap();
    let output = validate(&dir, &config_toml_example());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");
    assert!(output.stderr.is_empty());
}

/// Verifies plaintext legacy targets validate with a warning.
#[test]
fn cli_config_validate_warns_on_plaintext_legacy() {
    let dir = TempDir::new().unwrap();
    let content =
        config_toml_example().replace("https://legacy.example.internal/api", "http://legacy.example.internal/api");
    let output = validate(&dir, &content);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("plain http"));
}

/// Verifies invalid configuration fails closed.
#[test]
fn cli_config_validate_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let content = config_toml_example().replace("workers = 4", "workers = 0");
    let output = validate(&dir, &content);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load config"));
}

/// Verifies unparseable configuration fails closed.
#[test]
fn cli_config_validate_rejects_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let output = validate(&dir, "[server\nbind = ");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

/// Verifies a missing config file is reported.
#[test]
fn cli_config_validate_rejects_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let output = Command::new(member_gateway_bin())
        .args(["config", "validate", "--config", missing.to_string_lossy().as_ref()])
        .output()
        .expect("config validate");
    assert!(!output.status.success());
}

/// Verifies the example command prints a config that parses.
#[test]
fn cli_config_example_prints_canonical_example() {
    let output = Command::new(member_gateway_bin()).args(["config", "example"]).output().expect("config example");
    assert!(output.status.success());
    let printed = String::from_utf8_lossy(&output.stdout);
    assert_eq!(printed.trim_end(), config_toml_example().trim_end());
}

/// Verifies serve fails closed on an invalid config before binding.
#[test]
fn cli_serve_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("member-gateway.toml");
    fs::write(&config_path, config_toml_example().replace("bind = \"127.0.0.1:8080\"", "bind = \"nope\""))
        .expect("write config");
    let output = Command::new(member_gateway_bin())
        .args(["serve", "--config", config_path.to_string_lossy().as_ref()])
        .output()
        .expect("serve");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load config"));
}
