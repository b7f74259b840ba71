// crates/canteen-core/src/core/mod.rs
// ============================================================================
// Module: Canteen Core Types
// Description: Canonical canteen domain records and value types.
// Purpose: Provide stable, serializable types for the API and the store.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for the JSON shapes served by the
//! HTTP API and for the rows persisted by store backends.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod identifiers;
pub mod model;
pub mod money;
pub mod paging;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::MonthWindow;
pub use clock::SystemClock;
pub use clock::TimeError;
pub use clock::format_rfc3339;
pub use clock::last_months;
pub use clock::to_unix_millis;
pub use identifiers::AddressId;
pub use identifiers::CartEntryId;
pub use identifiers::CategoryId;
pub use identifiers::MenuItemId;
pub use identifiers::OrderId;
pub use identifiers::OrderItemId;
pub use identifiers::UserId;
pub use identifiers::generate_record_id;
pub use model::CartEntry;
pub use model::CartView;
pub use model::Category;
pub use model::DeliveryAddress;
pub use model::ItemTally;
pub use model::MenuFilter;
pub use model::MenuItem;
pub use model::MenuItemWithCart;
pub use model::ModelError;
pub use model::NewCartEntry;
pub use model::Order;
pub use model::OrderItem;
pub use model::OrderStatus;
pub use model::OrderWithUser;
pub use model::Role;
pub use model::User;
pub use model::UserDto;
pub use model::normalize_email;
pub use model::slugify;
pub use money::Money;
pub use money::MoneyError;
pub use paging::DEFAULT_PAGE_LIMIT;
pub use paging::MAX_PAGE_LIMIT;
pub use paging::Page;
pub use paging::PageRequest;
