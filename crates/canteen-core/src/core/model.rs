// crates/canteen-core/src/core/model.rs
// ============================================================================
// Module: Canteen Domain Model
// Description: Users, catalog, cart, and order records.
// Purpose: Define the records persisted by stores and served over HTTP.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! JSON field names are camelCase. Secrets never serialize: [`User`] carries
//! the password hash and has no `Serialize` impl, so responses go through
//! [`UserDto`]; image store keys (`img_id`) are skipped.
//!
//! Order lines are snapshots of the menu item at order time and keep no link
//! to the live catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::identifiers::AddressId;
use crate::core::identifiers::CartEntryId;
use crate::core::identifiers::CategoryId;
use crate::core::identifiers::MenuItemId;
use crate::core::identifiers::OrderId;
use crate::core::identifiers::OrderItemId;
use crate::core::identifiers::UserId;
use crate::core::money::Money;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Domain value parsing and validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Unknown order status label.
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
    /// Unknown role label.
    #[error("unknown role: {0}")]
    UnknownRole(String),
    /// A required field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular customer.
    Customer,
    /// Canteen administrator.
    Admin,
}

impl Role {
    /// Returns the stable uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(ModelError::UnknownRole(value.to_string())),
        }
    }
}

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Email address, stored lowercase.
    pub email: String,
    /// Argon2 PHC hash; absent for OAuth-only accounts.
    pub password_hash: Option<String>,
    /// Account role.
    pub role: Role,
    /// Creation time.
    pub created_at: OffsetDateTime,
    /// Last update time.
    pub updated_at: Option<OffsetDateTime>,
}

impl User {
    /// Returns the public projection of this user.
    #[must_use]
    pub fn to_dto(&self) -> UserDto {
        UserDto {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns true when the account has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public user projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update time.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Normalizes an email address for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Menu category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Category identifier.
    pub category_id: CategoryId,
    /// Display name.
    pub category_name: String,
    /// Unique URL-friendly key.
    pub slug_name: String,
    /// Public image URL.
    pub img_url: Option<String>,
    /// Image store key.
    #[serde(skip)]
    pub img_id: Option<String>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update time.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Menu item with its category summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Item identifier.
    pub item_id: MenuItemId,
    /// Display name, unique case-insensitively.
    pub item_name: String,
    /// Description.
    pub description: String,
    /// Unit price.
    pub price: Money,
    /// Public image URL.
    pub img_url: Option<String>,
    /// Image store key.
    #[serde(skip)]
    pub img_id: Option<String>,
    /// Owning category identifier.
    pub category_id: CategoryId,
    /// Owning category name.
    pub category_name: String,
    /// Whether the item can be ordered.
    pub is_available: bool,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update time.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Menu item annotated with whether it sits in a given user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItemWithCart {
    /// The menu item.
    #[serde(flatten)]
    pub item: MenuItem,
    /// Whether the item is in the user's cart.
    pub saved: bool,
}

/// Menu listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MenuFilter {
    /// Case-insensitive item name prefix.
    pub query: Option<String>,
    /// Category restriction.
    pub category_id: Option<CategoryId>,
    /// Inclusive lower price bound.
    pub min_price: Option<Money>,
    /// Inclusive upper price bound.
    pub max_price: Option<Money>,
}

impl MenuFilter {
    /// Returns a stable key describing this filter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "q={}|cat={}|min={}|max={}",
            self.query.as_deref().unwrap_or(""),
            self.category_id.as_ref().map_or("", CategoryId::as_str),
            self.min_price.map_or(-1, Money::paise),
            self.max_price.map_or(-1, Money::paise),
        )
    }
}

/// Builds a category slug: whitespace runs become `-`, then lowercase.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
}

// ============================================================================
// SECTION: Cart
// ============================================================================

/// Stored cart entry joined with its menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    /// Cart entry identifier.
    pub cart_id: CartEntryId,
    /// Owning user.
    pub user_id: UserId,
    /// Quantity, at least one.
    pub quantity: u32,
    /// Current menu item.
    pub menu_item: MenuItem,
}

/// New cart entry row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartEntry {
    /// Cart entry identifier.
    pub cart_id: CartEntryId,
    /// Owning user.
    pub user_id: UserId,
    /// Menu item.
    pub item_id: MenuItemId,
    /// Quantity, at least one.
    pub quantity: u32,
    /// Insertion instant; carts list oldest first.
    pub created_at: OffsetDateTime,
}

/// Cart entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Cart entry identifier.
    pub cart_id: CartEntryId,
    /// Quantity.
    pub quantity: u32,
    /// Owning user.
    pub users: UserDto,
    /// Menu item.
    pub menu_item: MenuItem,
}

// ============================================================================
// SECTION: Orders
// ============================================================================

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Awaiting payment.
    Pending,
    /// Payment verified.
    Paid,
    /// Kitchen is preparing the order.
    Preparing,
    /// Handed to the customer.
    Delivered,
    /// Cancelled by the customer or an admin.
    Cancelled,
    /// Payment verification failed.
    Failed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Paid,
        Self::Preparing,
        Self::Delivered,
        Self::Cancelled,
        Self::Failed,
    ];

    /// Returns the stable uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Preparing => "PREPARING",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns true when an order in this status may still be cancelled.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Paid | Self::Preparing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownStatus(value.to_string()))
    }
}

/// Delivery address captured with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    /// Address identifier.
    pub id: AddressId,
    /// Recipient name.
    pub name: String,
    /// Recipient phone.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub pincode: String,
}

impl DeliveryAddress {
    /// Ensures every field is present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingField`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ModelError> {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("pincode", &self.pincode),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(ModelError::MissingField(label));
            }
        }
        Ok(())
    }
}

/// Order line snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Line identifier.
    pub order_item_id: OrderItemId,
    /// Menu item identifier at order time.
    pub item_id: MenuItemId,
    /// Item name at order time.
    pub item_name: String,
    /// Unit price at order time.
    pub price: Money,
    /// Ordered quantity.
    pub quantity: u32,
    /// Item image URL at order time.
    pub image_url: Option<String>,
}

/// Customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier.
    pub order_id: OrderId,
    /// Ordering user.
    pub user_id: UserId,
    /// Payment gateway order identifier.
    pub razorpay_order_id: Option<String>,
    /// Payment gateway payment identifier, set once verified.
    pub razorpay_payment_id: Option<String>,
    /// Current status.
    pub status: OrderStatus,
    /// Order total computed from stored prices.
    pub total_amount: Money,
    /// Delivery address.
    pub delivery_address: DeliveryAddress,
    /// Order lines.
    pub items: Vec<OrderItem>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update time.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Order paired with its owner for admin listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithUser {
    /// The order.
    pub order: Order,
    /// The ordering user, if the account still exists.
    pub user: Option<UserDto>,
}

/// Total ordered quantity for one menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTally {
    /// Menu item identifier.
    pub item_id: MenuItemId,
    /// Sum of ordered quantities.
    pub total_count: u64,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use time::macros::datetime;

    use super::*;

    fn sample_item() -> MenuItem {
        MenuItem {
            item_id: MenuItemId::new("item-1"),
            item_name: "Masala Dosa".to_string(),
            description: "Crisp".to_string(),
            price: Money::from_paise(8_000).unwrap(),
            img_url: Some("http://localhost/media/a.png".to_string()),
            img_id: Some("a.png".to_string()),
            category_id: CategoryId::new("cat-1"),
            category_name: "South Indian".to_string(),
            is_available: true,
            created_at: datetime!(2024-05-01 08:00 UTC),
            updated_at: None,
        }
    }

    #[test]
    fn status_parsing_is_case_insensitive_and_strict() {
        assert_eq!("preparing".parse::<OrderStatus>().unwrap(), OrderStatus::Preparing);
        assert_eq!(" Paid ".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_open_orders_are_cancellable() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Preparing.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Failed.is_cancellable());
    }

    #[test]
    fn slug_joins_words_with_dashes() {
        assert_eq!(slugify("  South  Indian Meals "), "south-indian-meals");
        assert_eq!(slugify("Drinks"), "drinks");
    }

    #[test]
    fn menu_item_json_hides_image_key() {
        let json = serde_json::to_value(sample_item()).unwrap();
        assert_eq!(json["itemName"], "Masala Dosa");
        assert_eq!(json["price"], 80.0);
        assert_eq!(json["isAvailable"], true);
        assert!(json.get("imgId").is_none());
        assert_eq!(json["createdAt"], "2024-05-01T08:00:00Z");
    }

    #[test]
    fn saved_flag_is_flattened_next_to_item_fields() {
        let json = serde_json::to_value(MenuItemWithCart {
            item: sample_item(),
            saved: true,
        })
        .unwrap();
        assert_eq!(json["saved"], true);
        assert_eq!(json["itemId"], "item-1");
    }

    #[test]
    fn address_requires_every_field() {
        let address = DeliveryAddress {
            id: AddressId::new("addr"),
            name: "Asha".to_string(),
            phone: " ".to_string(),
            address: "12 Main".to_string(),
            city: "Pune".to_string(),
            pincode: "411001".to_string(),
        };
        assert_eq!(address.validate(), Err(ModelError::MissingField("phone")));
    }

    #[test]
    fn user_dto_omits_password_hash() {
        let user = User {
            user_id: UserId::new("u1"),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: Some("$argon2id$secret".to_string()),
            role: Role::Customer,
            created_at: datetime!(2024-05-01 08:00 UTC),
            updated_at: None,
        };
        let json = serde_json::to_string(&user.to_dto()).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }
}
