// crates/canteen-config/src/lib.rs
// ============================================================================
// Module: Canteen Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for canteen.toml semantics.
// Dependencies: canteen-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! `canteen-config` defines the configuration model for the canteen API
//! server and CLI. Loading enforces size and path limits and validation fails
//! closed: a config that loads is safe to serve with.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
