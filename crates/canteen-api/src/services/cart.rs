// crates/canteen-api/src/services/cart.rs
// ============================================================================
// Module: Cart Service
// Description: Per-user cart entries.
// Purpose: Add, update, remove, and list the caller's cart.
// Dependencies: canteen-core
// ============================================================================

//! ## Overview
//! A user holds at most one entry per menu item. Entries belonging to other
//! users are reported as missing rather than forbidden so other users' cart ids
//! stay hidden.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use canteen_core::CanteenStore;
use canteen_core::CartEntry;
use canteen_core::CartEntryId;
use canteen_core::CartView;
use canteen_core::Clock;
use canteen_core::MenuItemId;
use canteen_core::NewCartEntry;
use canteen_core::SharedCanteenStore;
use canteen_core::StoreError;
use canteen_core::User;

use super::ServiceDeps;
use super::ServiceError;

// ============================================================================
// SECTION: Service
// ============================================================================

/// Cart service.
#[derive(Clone)]
pub struct CartService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Time source for entry timestamps.
    clock: Arc<dyn Clock>,
    /// Largest quantity a single entry may hold.
    max_quantity: u32,
}

impl CartService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps, max_quantity: u32) -> Self {
        Self {
            store: deps.store.clone(),
            clock: Arc::clone(&deps.clock),
            max_quantity,
        }
    }

    /// Adds one unit of an item to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown items and
    /// [`ServiceError::BadRequest`] for duplicates or unavailable items.
    pub fn add(&self, user: &User, item_id: &MenuItemId) -> Result<CartView, ServiceError> {
        let item = self
            .store
            .menu_item_by_id(item_id)?
            .ok_or_else(item_not_found)?;
        if self.store.cart_entry_for(&user.user_id, item_id)?.is_some() {
            return Err(already_added());
        }
        if !item.is_available {
            return Err(unavailable());
        }
        let entry = NewCartEntry {
            cart_id: CartEntryId::generate(),
            user_id: user.user_id.clone(),
            item_id: item.item_id.clone(),
            quantity: 1,
            created_at: self.clock.now(),
        };
        self.store.insert_cart_entry(&entry).map_err(|err| match err {
            StoreError::Conflict(_) => already_added(),
            StoreError::NotFound(_) => item_not_found(),
            other => other.into(),
        })?;
        Ok(CartView {
            cart_id: entry.cart_id,
            quantity: entry.quantity,
            users: user.to_dto(),
            menu_item: item,
        })
    }

    /// Sets the quantity of one of the user's entries.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for out-of-range quantities or
    /// unavailable items and [`ServiceError::NotFound`] for foreign entries.
    pub fn update_quantity(
        &self,
        user: &User,
        cart_id: &CartEntryId,
        quantity: u32,
    ) -> Result<CartView, ServiceError> {
        if quantity == 0 {
            return Err(ServiceError::BadRequest("Quantity must be at least 1".to_string()));
        }
        if quantity > self.max_quantity {
            return Err(ServiceError::BadRequest(format!(
                "Quantity must be at most {}",
                self.max_quantity
            )));
        }
        let entry = self.owned_entry(user, cart_id)?;
        if !entry.menu_item.is_available {
            return Err(unavailable());
        }
        self.store.update_cart_quantity(cart_id, quantity)?;
        Ok(CartView {
            cart_id: entry.cart_id,
            quantity,
            users: user.to_dto(),
            menu_item: entry.menu_item,
        })
    }

    /// Removes one of the user's entries.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown or foreign entries.
    pub fn remove(&self, user: &User, cart_id: &CartEntryId) -> Result<(), ServiceError> {
        self.owned_entry(user, cart_id)?;
        self.store.delete_cart_entry(cart_id)?;
        Ok(())
    }

    /// Lists the user's cart, oldest entry first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn items(&self, user: &User) -> Result<Vec<CartView>, ServiceError> {
        let owner = user.to_dto();
        let entries = self.store.cart_entries_for_user(&user.user_id)?;
        Ok(entries
            .into_iter()
            .map(|entry| CartView {
                cart_id: entry.cart_id,
                quantity: entry.quantity,
                users: owner.clone(),
                menu_item: entry.menu_item,
            })
            .collect())
    }

    /// Loads an entry that belongs to `user`.
    fn owned_entry(&self, user: &User, cart_id: &CartEntryId) -> Result<CartEntry, ServiceError> {
        self.store
            .cart_entry_by_id(cart_id)?
            .filter(|entry| entry.user_id == user.user_id)
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))
    }
}

/// Unknown or deleted item error.
fn item_not_found() -> ServiceError {
    ServiceError::NotFound("Item Not Found".to_string())
}

/// Duplicate entry error.
fn already_added() -> ServiceError {
    ServiceError::BadRequest("Already added to cart".to_string())
}

/// Unavailable item error.
fn unavailable() -> ServiceError {
    ServiceError::BadRequest("Item not available".to_string())
}
