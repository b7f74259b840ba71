//! Config defaults and section validation tests for canteen-config.
// crates/canteen-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Section Validation Tests
// Description: Validate default values and per-section invariants.
// Purpose: Ensure minimal config is valid and secrets are never defaulted.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use canteen_config::CanteenConfig;
use canteen_config::GoogleOAuthConfig;
use canteen_store_sqlite::SqliteStoreMode;

mod common;

type TestResult = Result<(), String>;

#[test]
fn minimal_config_validates_with_defaults() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.server.max_body_bytes, 8 * 1024 * 1024);
    assert_eq!(config.auth.token_ttl_secs, 172_800);
    assert_eq!(config.auth.min_password_length, 6);
    assert_eq!(config.payments.currency, "INR");
    assert_eq!(config.payments.api_base_trimmed(), "https://api.razorpay.com/v1");
    assert_eq!(config.media.max_image_bytes, 2 * 1024 * 1024);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.orders.max_item_quantity, 50);
    assert!(config.server.audit.enabled);
    assert!(config.server.cors.allows_any_origin());
    assert!(config.auth.google.is_none());
    Ok(())
}

#[test]
fn empty_config_rejects_missing_jwt_secret() -> TestResult {
    let config = common::config_from_toml("").map_err(|err| err.to_string())?;
    common::assert_invalid(config.validate(), "auth.jwt_secret")
}

#[test]
fn short_jwt_secret_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.jwt_secret = "too-short".to_string();
    common::assert_invalid(config.validate(), "at least 32 bytes")
}

#[test]
fn payment_keys_are_required() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.payments.key_secret = "  ".to_string();
    common::assert_invalid(config.validate(), "payments.key_secret")
}

#[test]
fn currency_must_be_iso_code() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.payments.currency = "rupee".to_string();
    common::assert_invalid(config.validate(), "payments.currency")
}

#[test]
fn bind_must_be_socket_address() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = "localhost".to_string();
    common::assert_invalid(config.validate(), "server.bind")
}

#[test]
fn zero_body_limit_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    common::assert_invalid(config.validate(), "server.max_body_bytes")
}

#[test]
fn frontend_url_must_be_http() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.frontend_url = "file:///tmp/app".to_string();
    common::assert_invalid(config.validate(), "server.frontend_url")
}

#[test]
fn cors_entries_must_be_bare_origins() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.cors.allowed_origins = vec!["https://shop.example.com/app".to_string()];
    common::assert_invalid(config.validate(), "must be an origin")?;
    config.server.cors.allowed_origins = vec!["https://shop.example.com".to_string()];
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn disabled_cache_ignores_zero_limits() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.ttl_secs = 0;
    common::assert_invalid(config.validate(), "cache.ttl_secs")?;
    config.cache.enabled = false;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn order_limits_must_be_positive() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.orders.max_items = 0;
    common::assert_invalid(config.validate(), "orders.max_items")
}

#[test]
fn google_block_fills_endpoint_defaults() -> TestResult {
    let toml_str = format!(
        "{}\n[auth.google]\nclient_id = \"cid\"\nclient_secret = \"secret\"\nredirect_uri = \
         \"http://127.0.0.1:8080/login/oauth2/code/google\"\n",
        common::MINIMAL_TOML.replace("[auth]\n", "[auth]\nmin_password_length = 8\n")
    );
    let config = common::config_from_toml(&toml_str).map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let google = config.auth.google.as_ref().ok_or("google missing")?;
    assert_eq!(google.token_url, "https://oauth2.googleapis.com/token");
    assert_eq!(google.timeout_ms, 10_000);
    assert_eq!(config.auth.min_password_length, 8);
    Ok(())
}

#[test]
fn google_block_requires_client_secret() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.google = Some(GoogleOAuthConfig {
        client_id: "cid".to_string(),
        client_secret: String::new(),
        redirect_uri: "http://127.0.0.1:8080/cb".to_string(),
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        token_url: "https://oauth2.googleapis.com/token".to_string(),
        userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        timeout_ms: 5_000,
    });
    common::assert_invalid(config.validate(), "auth.google.client_secret")
}

#[test]
fn store_section_maps_to_sqlite_config() -> TestResult {
    let toml_str = format!(
        "{}\n[store]\npath = \"data/canteen.db\"\njournal_mode = \"delete\"\n",
        common::MINIMAL_TOML
    );
    let config: CanteenConfig =
        common::config_from_toml(&toml_str).map_err(|err| err.to_string())?;
    let sqlite = config.store.sqlite_config();
    assert_eq!(sqlite.path.to_string_lossy(), "data/canteen.db");
    assert_eq!(sqlite.journal_mode, SqliteStoreMode::Delete);
    assert_eq!(sqlite.busy_timeout_ms, 5_000);
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() {
    let result = common::config_from_toml("[server]\nbnd = \"127.0.0.1:1\"\n");
    assert!(result.is_err());
}
