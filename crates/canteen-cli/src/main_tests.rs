// crates/canteen-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and password resolution.
// Purpose: Ensure admin passwords never come from argv and blanks fail closed.
// Dependencies: canteen-cli main helpers
// ============================================================================

//! ## Overview
//! Validates clap wiring for each subcommand and the password sources used by
//! `admin create`.

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

use std::io::Cursor;
use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;

use super::AdminCommand;
use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::password_from_env;
use super::read_password_line;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn serve_accepts_config_path() {
    let cli = Cli::try_parse_from(["canteen", "serve", "--config", "conf/canteen.toml"]).unwrap();
    match cli.command {
        Some(Commands::Serve(command)) => {
            assert_eq!(command.config, Some(PathBuf::from("conf/canteen.toml")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn config_validate_defaults_to_no_path() {
    let cli = Cli::try_parse_from(["canteen", "config", "validate"]).unwrap();
    match cli.command {
        Some(Commands::Config {
            command: ConfigCommand::Validate(command),
        }) => assert!(command.config.is_none()),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn admin_create_requires_name_and_email() {
    assert!(Cli::try_parse_from(["canteen", "admin", "create", "--name", "Ops"]).is_err());
    let cli = Cli::try_parse_from([
        "canteen",
        "admin",
        "create",
        "--name",
        "Ops",
        "--email",
        "ops@example.com",
        "--password-stdin",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Admin {
            command: AdminCommand::Create(command),
        }) => {
            assert_eq!(command.name, "Ops");
            assert_eq!(command.email, "ops@example.com");
            assert!(command.password_stdin);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn admin_create_has_no_password_argument() {
    let result = Cli::try_parse_from([
        "canteen",
        "admin",
        "create",
        "--name",
        "Ops",
        "--email",
        "ops@example.com",
        "--password",
        "hunter22",
    ]);
    assert!(result.is_err());
}

#[test]
fn version_flag_needs_no_subcommand() {
    let cli = Cli::try_parse_from(["canteen", "--version"]).unwrap();
    assert!(cli.show_version);
    assert!(cli.command.is_none());
}

// ============================================================================
// SECTION: Password Sources
// ============================================================================

#[test]
fn stdin_password_strips_line_ending() {
    let password = read_password_line(Cursor::new("s3cret-pass\r\nignored\n")).unwrap();
    assert_eq!(password, "s3cret-pass");
}

#[test]
fn stdin_password_rejects_blank_line() {
    let error = read_password_line(Cursor::new("\n")).unwrap_err();
    assert!(error.to_string().contains("empty"));
    assert!(read_password_line(Cursor::new("")).is_err());
}

#[test]
fn env_password_must_be_present_and_non_empty() {
    assert_eq!(password_from_env(Some("from-env".to_string())).unwrap(), "from-env");
    let missing = password_from_env(None).unwrap_err();
    assert!(missing.to_string().contains("CANTEEN_ADMIN_PASSWORD"));
    assert!(password_from_env(Some(String::new())).is_err());
}
