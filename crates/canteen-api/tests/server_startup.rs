// crates/canteen-api/tests/server_startup.rs
// ============================================================================
// Module: Server Startup Tests
// Description: Server construction from config and prebuilt components.
// Purpose: Validate config rejection and startup security warnings.
// Dependencies: canteen-api, canteen-config, tempfile
// ============================================================================

//! Startup tests for [`canteen_api::ApiServer`].

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use canteen_api::ApiServer;
use canteen_api::FileImageStore;
use canteen_api::ServerComponents;
use canteen_api::ServerError;
use canteen_core::FixedClock;
use canteen_core::SharedCanteenStore;
use canteen_store_sqlite::SqliteCanteenStore;
use canteen_store_sqlite::SqliteStoreConfig;
use common::FakeGateway;
use common::RecordingAuditSink;
use common::START;
use common::test_config;
use tempfile::TempDir;

fn components(dir: &TempDir, audit: Arc<RecordingAuditSink>) -> ServerComponents {
    let config = test_config(dir, "");
    let store =
        SqliteCanteenStore::new(&SqliteStoreConfig::for_path(dir.path().join("canteen.db"))).unwrap();
    ServerComponents {
        store: SharedCanteenStore::from_store(store),
        payments: Arc::new(FakeGateway::default()),
        images: Arc::new(FileImageStore::new(&config.media, config.server.public_base()).unwrap()),
        oauth: None,
        clock: Arc::new(FixedClock::new(START)),
        audit,
    }
}

#[test]
fn from_config_builds_production_dependencies() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let server = ApiServer::from_config(config).unwrap();
    assert_eq!(server.bind_addr().to_string(), "127.0.0.1:8080");
    assert!(dir.path().join("canteen.db").exists());
    assert!(dir.path().join("media").is_dir());
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, "");
    config.auth.jwt_secret = "short".to_string();
    let audit = Arc::new(RecordingAuditSink::default());
    let result = ApiServer::from_components(&config, components(&dir, audit));
    assert!(matches!(result, Err(ServerError::Config(_))));
}

#[test]
fn public_bind_with_open_cors_is_flagged() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, "");
    config.server.bind = "0.0.0.0:8080".to_string();
    let audit = Arc::new(RecordingAuditSink::default());
    ApiServer::from_components(&config, components(&dir, audit.clone())).unwrap();
    let warnings = audit.events("security_audit");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["kind"], "open_cors_on_public_bind");
}

#[test]
fn public_bind_with_pinned_origins_is_quiet() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, "");
    config.server.bind = "0.0.0.0:8080".to_string();
    config.server.cors.allowed_origins = vec!["https://canteen.example.com".to_string()];
    let audit = Arc::new(RecordingAuditSink::default());
    ApiServer::from_components(&config, components(&dir, audit.clone())).unwrap();
    assert!(audit.events("security_audit").is_empty());
}
