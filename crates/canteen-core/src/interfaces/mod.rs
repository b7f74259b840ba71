// crates/canteen-core/src/interfaces/mod.rs
// ============================================================================
// Module: Canteen Interfaces
// Description: Backend-agnostic persistence and gateway traits.
// Purpose: Decouple services from SQLite, Razorpay, Google, and disk storage.
// Dependencies: crate::core, thiserror, time
// ============================================================================

//! ## Overview
//! Services depend only on these traits. [`CanteenStore`] is the repository
//! boundary; [`PaymentGateway`], [`ImageStore`], and [`OAuthProvider`] wrap the
//! external systems. All traits are synchronous; the HTTP layer runs service
//! calls on blocking worker threads.
//! Security posture: every value crossing these boundaries is untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::CartEntry;
use crate::core::CartEntryId;
use crate::core::Category;
use crate::core::CategoryId;
use crate::core::ItemTally;
use crate::core::MenuFilter;
use crate::core::MenuItem;
use crate::core::MenuItemId;
use crate::core::Money;
use crate::core::NewCartEntry;
use crate::core::Order;
use crate::core::OrderId;
use crate::core::OrderStatus;
use crate::core::Page;
use crate::core::PageRequest;
use crate::core::User;
use crate::core::UserId;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Target record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// Write violates a uniqueness or reference constraint.
    #[error("record conflict: {0}")]
    Conflict(String),
    /// Backend reported an error.
    #[error("store error: {0}")]
    Db(String),
    /// Input rejected by the store.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Stored data failed to decode.
    #[error("store corruption: {0}")]
    Corrupt(String),
}

/// Repository for every canteen record.
///
/// # Invariants
/// - Emails are compared in their stored (lowercase) form.
/// - Listings are newest first unless stated otherwise.
/// - `insert_order` persists the address, the order, and its lines atomically.
pub trait CanteenStore {
    /// Verifies the backend can serve queries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend is unavailable.
    fn readiness(&self) -> Result<(), StoreError>;

    // ---- users ----

    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the email is taken.
    fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Inserts a user unless the email is already registered, then returns
    /// the account stored under that email.
    ///
    /// Concurrent calls for one email all return the same account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write or read fails.
    fn insert_user_or_existing(&self, user: &User) -> Result<User, StoreError>;

    /// Loads a user by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn user_by_id(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// Loads a user by normalized email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Lists customers whose name or email starts with `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn search_customers(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError>;

    /// Counts customer accounts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_customers(&self) -> Result<u64, StoreError>;

    // ---- categories ----

    /// Inserts a category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the slug is taken.
    fn insert_category(&self, category: &Category) -> Result<(), StoreError>;

    /// Loads a category by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn category_by_id(&self, category_id: &CategoryId) -> Result<Option<Category>, StoreError>;

    /// Loads a category by slug.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;

    /// Lists categories whose name starts with `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn search_categories(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Category>, StoreError>;

    /// Deletes a category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when missing and
    /// [`StoreError::Conflict`] while menu items still reference it.
    fn delete_category(&self, category_id: &CategoryId) -> Result<(), StoreError>;

    /// Counts categories.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_categories(&self) -> Result<u64, StoreError>;

    /// Returns true when any menu item references the category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn category_in_use(&self, category_id: &CategoryId) -> Result<bool, StoreError>;

    // ---- menu ----

    /// Inserts a menu item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the name is taken and
    /// [`StoreError::NotFound`] when the category is missing.
    fn insert_menu_item(&self, item: &MenuItem) -> Result<(), StoreError>;

    /// Loads a menu item by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn menu_item_by_id(&self, item_id: &MenuItemId) -> Result<Option<MenuItem>, StoreError>;

    /// Loads a menu item by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn menu_item_by_name_ci(&self, name: &str) -> Result<Option<MenuItem>, StoreError>;

    /// Lists menu items matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn search_menu_items(
        &self,
        filter: &MenuFilter,
        page: PageRequest,
    ) -> Result<Page<MenuItem>, StoreError>;

    /// Lists every item in a category, or every item when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn menu_items_by_category(
        &self,
        category_id: Option<&CategoryId>,
    ) -> Result<Vec<MenuItem>, StoreError>;

    /// Replaces the mutable fields of a menu item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the item is missing.
    fn update_menu_item(&self, item: &MenuItem) -> Result<(), StoreError>;

    /// Deletes a menu item and the cart entries that reference it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the item is missing.
    fn delete_menu_item(&self, item_id: &MenuItemId) -> Result<(), StoreError>;

    /// Counts menu items.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_menu_items(&self) -> Result<u64, StoreError>;

    // ---- cart ----

    /// Inserts a cart entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the user already has the item.
    fn insert_cart_entry(&self, entry: &NewCartEntry) -> Result<(), StoreError>;

    /// Loads a cart entry by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn cart_entry_by_id(&self, cart_id: &CartEntryId) -> Result<Option<CartEntry>, StoreError>;

    /// Loads the cart entry a user holds for an item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn cart_entry_for(
        &self,
        user_id: &UserId,
        item_id: &MenuItemId,
    ) -> Result<Option<CartEntry>, StoreError>;

    /// Lists a user's cart entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn cart_entries_for_user(&self, user_id: &UserId) -> Result<Vec<CartEntry>, StoreError>;

    /// Sets a cart entry quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the entry is missing.
    fn update_cart_quantity(&self, cart_id: &CartEntryId, quantity: u32) -> Result<(), StoreError>;

    /// Deletes a cart entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the entry is missing.
    fn delete_cart_entry(&self, cart_id: &CartEntryId) -> Result<(), StoreError>;

    /// Removes every cart entry of a user and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn clear_cart(&self, user_id: &UserId) -> Result<u64, StoreError>;

    // ---- orders ----

    /// Persists an order with its address and lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any row fails; nothing is persisted then.
    fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Loads an order with its address and lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Lists a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn orders_for_user(&self, user_id: &UserId, page: PageRequest)
    -> Result<Page<Order>, StoreError>;

    /// Lists orders, optionally restricted to one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn orders_by_status(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError>;

    /// Updates an order status and, when given, its payment identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the order is missing.
    fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Moves an order to `to` only while its current status is one of `from`.
    ///
    /// The status check and the write happen as one statement. Returns
    /// `false` when the order is missing or has already left `from`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn transition_order_status(
        &self,
        order_id: &OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    /// Counts orders, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_orders(&self, status: Option<OrderStatus>) -> Result<u64, StoreError>;

    /// Sums DELIVERED order totals created in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn delivered_income_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Money, StoreError>;

    /// Returns per-item ordered quantities over non-cancelled orders,
    /// largest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn top_ordered_items(&self, limit: u32) -> Result<Vec<ItemTally>, StoreError>;
}

/// Shared store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedCanteenStore {
    /// Inner store implementation.
    inner: Arc<dyn CanteenStore + Send + Sync>,
}

impl SharedCanteenStore {
    /// Wraps a store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl CanteenStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn CanteenStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl CanteenStore for SharedCanteenStore {
    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.insert_user(user)
    }

    fn insert_user_or_existing(&self, user: &User) -> Result<User, StoreError> {
        self.inner.insert_user_or_existing(user)
    }

    fn user_by_id(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.user_by_id(user_id)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.user_by_email(email)
    }

    fn search_customers(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        self.inner.search_customers(query, page)
    }

    fn count_customers(&self) -> Result<u64, StoreError> {
        self.inner.count_customers()
    }

    fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.inner.insert_category(category)
    }

    fn category_by_id(&self, category_id: &CategoryId) -> Result<Option<Category>, StoreError> {
        self.inner.category_by_id(category_id)
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        self.inner.category_by_slug(slug)
    }

    fn search_categories(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Category>, StoreError> {
        self.inner.search_categories(query, page)
    }

    fn delete_category(&self, category_id: &CategoryId) -> Result<(), StoreError> {
        self.inner.delete_category(category_id)
    }

    fn count_categories(&self) -> Result<u64, StoreError> {
        self.inner.count_categories()
    }

    fn category_in_use(&self, category_id: &CategoryId) -> Result<bool, StoreError> {
        self.inner.category_in_use(category_id)
    }

    fn insert_menu_item(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.inner.insert_menu_item(item)
    }

    fn menu_item_by_id(&self, item_id: &MenuItemId) -> Result<Option<MenuItem>, StoreError> {
        self.inner.menu_item_by_id(item_id)
    }

    fn menu_item_by_name_ci(&self, name: &str) -> Result<Option<MenuItem>, StoreError> {
        self.inner.menu_item_by_name_ci(name)
    }

    fn search_menu_items(
        &self,
        filter: &MenuFilter,
        page: PageRequest,
    ) -> Result<Page<MenuItem>, StoreError> {
        self.inner.search_menu_items(filter, page)
    }

    fn menu_items_by_category(
        &self,
        category_id: Option<&CategoryId>,
    ) -> Result<Vec<MenuItem>, StoreError> {
        self.inner.menu_items_by_category(category_id)
    }

    fn update_menu_item(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.inner.update_menu_item(item)
    }

    fn delete_menu_item(&self, item_id: &MenuItemId) -> Result<(), StoreError> {
        self.inner.delete_menu_item(item_id)
    }

    fn count_menu_items(&self) -> Result<u64, StoreError> {
        self.inner.count_menu_items()
    }

    fn insert_cart_entry(&self, entry: &NewCartEntry) -> Result<(), StoreError> {
        self.inner.insert_cart_entry(entry)
    }

    fn cart_entry_by_id(&self, cart_id: &CartEntryId) -> Result<Option<CartEntry>, StoreError> {
        self.inner.cart_entry_by_id(cart_id)
    }

    fn cart_entry_for(
        &self,
        user_id: &UserId,
        item_id: &MenuItemId,
    ) -> Result<Option<CartEntry>, StoreError> {
        self.inner.cart_entry_for(user_id, item_id)
    }

    fn cart_entries_for_user(&self, user_id: &UserId) -> Result<Vec<CartEntry>, StoreError> {
        self.inner.cart_entries_for_user(user_id)
    }

    fn update_cart_quantity(&self, cart_id: &CartEntryId, quantity: u32) -> Result<(), StoreError> {
        self.inner.update_cart_quantity(cart_id, quantity)
    }

    fn delete_cart_entry(&self, cart_id: &CartEntryId) -> Result<(), StoreError> {
        self.inner.delete_cart_entry(cart_id)
    }

    fn clear_cart(&self, user_id: &UserId) -> Result<u64, StoreError> {
        self.inner.clear_cart(user_id)
    }

    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.insert_order(order)
    }

    fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.order_by_id(order_id)
    }

    fn orders_for_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        self.inner.orders_for_user(user_id, page)
    }

    fn orders_by_status(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        self.inner.orders_by_status(status, page)
    }

    fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.inner.update_order_status(order_id, status, payment_id, updated_at)
    }

    fn transition_order_status(
        &self,
        order_id: &OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        payment_id: Option<&str>,
        updated_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        self.inner.transition_order_status(order_id, from, to, payment_id, updated_at)
    }

    fn count_orders(&self, status: Option<OrderStatus>) -> Result<u64, StoreError> {
        self.inner.count_orders(status)
    }

    fn delivered_income_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Money, StoreError> {
        self.inner.delivered_income_between(start, end)
    }

    fn top_ordered_items(&self, limit: u32) -> Result<Vec<ItemTally>, StoreError> {
        self.inner.top_ordered_items(limit)
    }
}

// ============================================================================
// SECTION: Payment Gateway
// ============================================================================

/// Payment gateway errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Request could not be sent or timed out.
    #[error("payment gateway transport error: {0}")]
    Transport(String),
    /// Gateway rejected the request.
    #[error("payment gateway rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway error message.
        message: String,
    },
    /// Gateway response could not be understood.
    #[error("payment gateway invalid response: {0}")]
    InvalidResponse(String),
}

/// Gateway-side payment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    /// Gateway order identifier handed to the checkout client.
    pub id: String,
    /// Amount in paise.
    pub amount: Money,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt reference.
    pub receipt: String,
}

/// External payment gateway.
pub trait PaymentGateway {
    /// Creates a gateway order for `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] when the gateway call fails.
    fn create_order(&self, amount: Money, receipt: &str) -> Result<PaymentOrder, PaymentError>;

    /// Returns true when `signature` authenticates the order/payment pair.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

// ============================================================================
// SECTION: Image Store
// ============================================================================

/// Image store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Content type is not an accepted image format.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    /// Image exceeded the configured size limit.
    #[error("image too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Image name is not a plain file name.
    #[error("invalid image name: {0}")]
    InvalidName(String),
    /// Image does not exist.
    #[error("image not found: {0}")]
    NotFound(String),
    /// Backend I/O failure.
    #[error("image store io error: {0}")]
    Io(String),
}

/// Reference to a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Store key used for deletion.
    pub id: String,
    /// Public URL.
    pub url: String,
}

/// Image bytes with their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// MIME type.
    pub content_type: &'static str,
}

/// Storage for catalog images.
pub trait ImageStore {
    /// Stores an image and returns its key and URL.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] when the image is rejected or cannot be written.
    fn put(&self, bytes: &[u8], content_type: &str) -> Result<StoredImage, ImageError>;

    /// Loads an image by key.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] when the key is invalid or missing.
    fn get(&self, id: &str) -> Result<ImageBlob, ImageError>;

    /// Deletes an image by key.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] when the delete fails.
    fn delete(&self, id: &str) -> Result<(), ImageError>;
}

// ============================================================================
// SECTION: OAuth Provider
// ============================================================================

/// OAuth provider errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// Request could not be sent or timed out.
    #[error("oauth transport error: {0}")]
    Transport(String),
    /// Provider rejected the exchange.
    #[error("oauth provider rejected request: {0}")]
    Rejected(String),
    /// Provider response could not be understood.
    #[error("oauth invalid response: {0}")]
    InvalidResponse(String),
}

/// Identity returned by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    /// Verified email, if the provider shared it.
    pub email: Option<String>,
    /// Display name, if the provider shared it.
    pub name: Option<String>,
}

/// OAuth2 authorization-code provider.
pub trait OAuthProvider {
    /// Returns the provider consent URL for `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError`] when the exchange or profile fetch fails.
    fn exchange(&self, code: &str) -> Result<OAuthProfile, OAuthError>;
}
