// crates/canteen-core/src/core/identifiers.rs
// ============================================================================
// Module: Canteen Identifiers
// Description: Opaque string identifiers for canteen records.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: hex, rand, serde
// ============================================================================

//! ## Overview
//! Every record is keyed by an opaque string identifier. Identifiers are
//! generated as 32 lowercase hex characters followed by the creation time in
//! unix milliseconds. Order identifiers use the customer-facing
//! `ORD_<unix_millis>_<8 uppercase hex>` form instead.
//!
//! Identifiers are not validated on construction; malformed values simply
//! fail to match a stored row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random bytes used for generated record identifiers (32 hex chars).
const RECORD_ID_RANDOM_BYTES: usize = 16;
/// Random bytes used for order identifier suffixes (8 hex chars).
const ORDER_ID_RANDOM_BYTES: usize = 4;
/// Prefix carried by order identifiers.
const ORDER_ID_PREFIX: &str = "ORD";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Declares a transparent string identifier with the standard accessors.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// User account identifier.
    UserId
);
string_id!(
    /// Menu category identifier.
    CategoryId
);
string_id!(
    /// Menu item identifier.
    MenuItemId
);
string_id!(
    /// Cart entry identifier.
    CartEntryId
);
string_id!(
    /// Order identifier (`ORD_<millis>_<hex>`).
    OrderId
);
string_id!(
    /// Order line identifier.
    OrderItemId
);
string_id!(
    /// Delivery address identifier.
    AddressId
);

/// Implements `generate` for identifiers that use the record id scheme.
macro_rules! record_id_generator {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $name {
                /// Generates a fresh random identifier.
                #[must_use]
                pub fn generate() -> Self {
                    Self(generate_record_id())
                }
            }
        )+
    };
}

record_id_generator!(UserId, CategoryId, MenuItemId, CartEntryId, OrderItemId, AddressId);

impl OrderId {
    /// Generates a fresh order identifier.
    #[must_use]
    pub fn generate() -> Self {
        let suffix = random_hex(ORDER_ID_RANDOM_BYTES).to_ascii_uppercase();
        Self(format!("{ORDER_ID_PREFIX}_{}_{suffix}", unix_millis()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Generates a record identifier: random hex followed by unix millis.
#[must_use]
pub fn generate_record_id() -> String {
    format!("{}{}", random_hex(RECORD_ID_RANDOM_BYTES), unix_millis())
}

/// Returns `len` random bytes hex encoded.
fn random_hex(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn record_ids_are_hex_prefixed_with_millis_suffix() {
        let id = UserId::generate();
        let (hex_part, millis_part) = id.as_str().split_at(32);
        assert!(hex_part.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
        assert!(millis_part.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn record_ids_are_unique() {
        let first = MenuItemId::generate();
        let second = MenuItemId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn order_ids_use_customer_facing_format() {
        let id = OrderId::generate();
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase()));
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let id = CategoryId::new("cat-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cat-1\"");
    }
}
