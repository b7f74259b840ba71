// crates/canteen-api/src/lib.rs
// ============================================================================
// Module: Canteen API
// Description: Services, gateway clients, and HTTP surface for the canteen.
// Purpose: Serve menu browsing, carts, orders, payments, and admin dashboards.
// Dependencies: canteen-core, canteen-config, canteen-store-sqlite, axum
// ============================================================================

//! ## Overview
//! The crate is layered: [`server`] decodes HTTP requests and hands them to
//! [`services`], which enforce business rules against the
//! [`canteen_core::CanteenStore`] trait. Gateways ([`payments`], [`oauth`],
//! [`media`]) sit behind core traits so tests can swap them out.
//! Security posture: request input is untrusted; tokens are verified on every
//! protected route and internal error details never reach clients.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod cache;
pub mod media;
pub mod oauth;
pub mod payments;
pub mod server;
pub mod services;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ApiAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::JwtKeys;
pub use cache::TtlCache;
pub use media::FileImageStore;
pub use oauth::GoogleOAuthProvider;
pub use payments::RazorpayGateway;
pub use server::ApiServer;
pub use server::ServerComponents;
pub use server::ServerError;
pub use services::CanteenServices;
pub use services::ServiceError;
