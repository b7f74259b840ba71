// crates/canteen-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that run the canteen binary.
// Purpose: Ensure config validation and admin bootstrap fail closed.
// Dependencies: canteen-cli binary, tempfile
// ============================================================================
//! ## Overview
//! Runs `canteen config validate` and `canteen admin create` against configs
//! written to a temp directory.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;

use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn canteen_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_canteen"))
}

fn write_config(dir: &TempDir) -> PathBuf {
    let root = dir.path().display();
    let config = format!(
        r#"
[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"

[store]
path = "{root}/canteen.db"

[payments]
key_id = "rzp_test_key"
key_secret = "rzp_test_secret"

[media]
dir = "{root}/media"

[server.audit]
enabled = false
"#
    );
    let path = dir.path().join("canteen.toml");
    fs::write(&path, config.trim()).expect("write config");
    path
}

fn run(args: &[&str], config: &Path) -> Output {
    Command::new(canteen_bin())
        .args(args)
        .arg("--config")
        .arg(config)
        .env_remove("CANTEEN_ADMIN_PASSWORD")
        .output()
        .expect("run canteen")
}

fn create_admin_with_stdin(config: &Path, email: &str, password: &str) -> Output {
    let mut child = Command::new(canteen_bin())
        .args(["admin", "create", "--name", "Ops", "--email", email, "--password-stdin"])
        .arg("--config")
        .arg(config)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn canteen");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        writeln!(stdin, "{password}").expect("write password");
    }
    child.wait_with_output().expect("wait canteen")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies a complete config validates.
#[test]
fn config_validate_accepts_valid_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let output = run(&["config", "validate"], &config);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("config is valid"));
}

/// Verifies a short JWT secret fails validation.
#[test]
fn config_validate_rejects_short_secret() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("canteen.toml");
    fs::write(
        &config,
        "[auth]\njwt_secret = \"short\"\n\n[payments]\nkey_id = \"k\"\nkey_secret = \"s\"\n",
    )
    .unwrap();
    let output = run(&["config", "validate"], &config);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load config"), "unexpected stderr: {stderr}");
}

/// Verifies a missing config file is reported.
#[test]
fn config_validate_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let output = run(&["config", "validate"], &dir.path().join("absent.toml"));
    assert!(!output.status.success());
}

/// Verifies admin creation refuses to run without a password source.
#[test]
fn admin_create_requires_password() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let output =
        run(&["admin", "create", "--name", "Ops", "--email", "ops@example.com"], &config);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CANTEEN_ADMIN_PASSWORD"), "unexpected stderr: {stderr}");
    assert!(!dir.path().join("canteen.db").exists());
}

/// Verifies admins are persisted once and duplicates are rejected.
#[test]
fn admin_create_persists_and_rejects_duplicates() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = create_admin_with_stdin(&config, "Ops@Example.com", "admin-pass-1");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let created: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(created["email"], "ops@example.com");
    assert_eq!(created["name"], "Ops");
    assert!(dir.path().join("canteen.db").exists());

    let output = Command::new(canteen_bin())
        .args(["admin", "create", "--name", "Ops", "--email", "ops@example.com"])
        .arg("--config")
        .arg(&config)
        .env("CANTEEN_ADMIN_PASSWORD", "admin-pass-2")
        .output()
        .expect("run canteen");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Email Already exists"), "unexpected stderr: {stderr}");
}
