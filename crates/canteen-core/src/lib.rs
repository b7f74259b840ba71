// crates/canteen-core/src/lib.rs
// ============================================================================
// Module: Canteen Core Library
// Description: Public API surface for the canteen domain.
// Purpose: Expose domain types and persistence/gateway interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Canteen core defines the domain model shared by the store, the services,
//! and the HTTP surface: users, categories, menu items, carts, and orders,
//! plus money, pagination, and clock primitives. It performs no I/O; storage
//! and external gateways are reached through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CanteenStore;
pub use interfaces::ImageBlob;
pub use interfaces::ImageError;
pub use interfaces::ImageStore;
pub use interfaces::OAuthError;
pub use interfaces::OAuthProfile;
pub use interfaces::OAuthProvider;
pub use interfaces::PaymentError;
pub use interfaces::PaymentGateway;
pub use interfaces::PaymentOrder;
pub use interfaces::SharedCanteenStore;
pub use interfaces::StoredImage;
pub use interfaces::StoreError;
