// crates/canteen-store-sqlite/src/lib.rs
// ============================================================================
// Module: Canteen SQLite Store
// Description: Durable CanteenStore backend using SQLite.
// Purpose: Persist users, catalog, carts, and orders for the canteen API.
// Dependencies: canteen-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`canteen_core::CanteenStore`]
//! implementation. The schema is versioned and fails closed on mismatch;
//! multi-row writes such as order placement run in a single transaction.
//! Security posture: stored rows are re-validated on read and malformed values
//! surface as corruption errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteCanteenStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
