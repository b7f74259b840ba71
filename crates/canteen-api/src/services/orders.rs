// crates/canteen-api/src/services/orders.rs
// ============================================================================
// Module: Order Service
// Description: Order placement, listings, cancellation, and status changes.
// Purpose: Price orders from stored menu data and open a gateway payment.
// Dependencies: canteen-core, serde
// ============================================================================

//! ## Overview
//! Order totals are always computed from stored prices; prices sent by the
//! client are ignored. A gateway order is created before anything is written,
//! so a gateway failure leaves no trace in the store.
//!
//! Orders of other users are reported as missing unless the caller is an
//! administrator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use canteen_config::OrdersConfig;
use canteen_core::AddressId;
use canteen_core::CanteenStore;
use canteen_core::Clock;
use canteen_core::DeliveryAddress;
use canteen_core::MenuItemId;
use canteen_core::Money;
use canteen_core::Order;
use canteen_core::OrderId;
use canteen_core::OrderItem;
use canteen_core::OrderItemId;
use canteen_core::OrderStatus;
use canteen_core::OrderWithUser;
use canteen_core::Page;
use canteen_core::PageRequest;
use canteen_core::PaymentGateway;
use canteen_core::SharedCanteenStore;
use canteen_core::User;
use canteen_core::to_unix_millis;
use serde::Deserialize;
use serde::Serialize;

use super::ServiceDeps;
use super::ServiceError;
use crate::cache::CacheNamespace;
use crate::cache::TtlCache;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    /// Menu item identifier.
    pub item_id: MenuItemId,
    /// Requested quantity.
    pub quantity: u32,
}

/// Delivery address as sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressRequest {
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

/// Order placement payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Requested lines.
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    /// Delivery address.
    pub delivery_address: AddressRequest,
}

/// Identifiers returned after placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    /// Gateway order id used by the checkout client.
    pub razorpay_order_id: String,
    /// Local order id.
    pub order_id: OrderId,
}

/// Order counts by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    /// Every order.
    pub total_orders: u64,
    /// PENDING orders.
    pub pending: u64,
    /// PREPARING orders.
    pub preparing: u64,
    /// DELIVERED orders.
    pub delivered: u64,
    /// CANCELLED orders.
    pub cancelled: u64,
    /// FAILED orders.
    pub failed: u64,
}

/// Cache key for the single stats entry.
const STATS_KEY: &str = "all";

// ============================================================================
// SECTION: Service
// ============================================================================

/// Order service.
#[derive(Clone)]
pub struct OrderService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Payment gateway.
    payments: Arc<dyn PaymentGateway + Send + Sync>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Stats cache.
    cache: Arc<TtlCache>,
    /// Per-order limits.
    limits: OrdersConfig,
}

impl OrderService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps, limits: &OrdersConfig) -> Self {
        Self {
            store: deps.store.clone(),
            payments: Arc::clone(&deps.payments),
            clock: Arc::clone(&deps.clock),
            cache: Arc::clone(&deps.cache),
            limits: limits.clone(),
        }
    }

    /// Prices the request, opens a gateway order, and stores a PENDING order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for invalid lines or addresses,
    /// [`ServiceError::NotFound`] for unknown items, and
    /// [`ServiceError::Gateway`] when the payment gateway fails.
    pub fn create(
        &self,
        user: &User,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, ServiceError> {
        let lines = self.merged_lines(&request.items)?;
        let address = DeliveryAddress {
            id: AddressId::generate(),
            name: request.delivery_address.name.trim().to_string(),
            phone: request.delivery_address.phone.trim().to_string(),
            address: request.delivery_address.address.trim().to_string(),
            city: request.delivery_address.city.trim().to_string(),
            pincode: request.delivery_address.pincode.trim().to_string(),
        };
        address.validate()?;

        let mut items = Vec::with_capacity(lines.len());
        for (item_id, quantity) in lines {
            let menu_item = self.store.menu_item_by_id(&item_id)?.ok_or_else(|| {
                ServiceError::NotFound(format!("Menu item not found: {item_id}"))
            })?;
            if !menu_item.is_available {
                return Err(ServiceError::BadRequest(format!(
                    "Menu item not available: {}",
                    menu_item.item_name
                )));
            }
            items.push(OrderItem {
                order_item_id: OrderItemId::generate(),
                item_id: menu_item.item_id,
                item_name: menu_item.item_name,
                price: menu_item.price,
                quantity,
                image_url: menu_item.img_url,
            });
        }
        let total_amount = Money::checked_sum(
            items
                .iter()
                .map(|line| line.price.checked_mul(line.quantity))
                .collect::<Result<Vec<_>, _>>()?,
        )?;

        let now = self.clock.now();
        let receipt = format!("order_rcptid_{}", to_unix_millis(now));
        let gateway_order = self
            .payments
            .create_order(total_amount, &receipt)
            .map_err(|err| ServiceError::Gateway(err.to_string()))?;

        let order = Order {
            order_id: OrderId::generate(),
            user_id: user.user_id.clone(),
            razorpay_order_id: Some(gateway_order.id.clone()),
            razorpay_payment_id: None,
            status: OrderStatus::Pending,
            total_amount,
            delivery_address: address,
            items,
            created_at: now,
            updated_at: None,
        };
        self.store.insert_order(&order)?;
        self.cache.invalidate(CacheNamespace::OrderStats);
        Ok(CreatedOrder {
            razorpay_order_id: gateway_order.id,
            order_id: order.order_id,
        })
    }

    /// Lists the user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn list_for_user(
        &self,
        user: &User,
        page: PageRequest,
    ) -> Result<Page<Order>, ServiceError> {
        Ok(self.store.orders_for_user(&user.user_id, page)?)
    }

    /// Lists every order with its owner, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for unknown status labels.
    pub fn list_admin(
        &self,
        status: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<OrderWithUser>, ServiceError> {
        let status = status
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()?;
        let orders = self.store.orders_by_status(status, page)?;
        orders.try_map(|order| {
            let user = self.store.user_by_id(&order.user_id)?.map(|owner| owner.to_dto());
            Ok::<_, ServiceError>(OrderWithUser {
                order,
                user,
            })
        })
    }

    /// Loads an order visible to `user`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown or foreign orders.
    pub fn get(&self, user: &User, order_id: &OrderId) -> Result<Order, ServiceError> {
        self.store
            .order_by_id(order_id)?
            .filter(|order| user.is_admin() || order.user_id == user.user_id)
            .ok_or_else(order_not_found)
    }

    /// Cancels an open order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown or foreign orders and
    /// [`ServiceError::BadRequest`] once the order can no longer be cancelled.
    pub fn cancel(&self, user: &User, order_id: &OrderId) -> Result<Order, ServiceError> {
        let mut order = self.get(user, order_id)?;
        if !order.status.is_cancellable() {
            return Err(not_cancellable(order.status));
        }
        let cancellable: Vec<OrderStatus> =
            OrderStatus::ALL.iter().copied().filter(|status| status.is_cancellable()).collect();
        let now = self.clock.now();
        let cancelled = self.store.transition_order_status(
            &order.order_id,
            &cancellable,
            OrderStatus::Cancelled,
            None,
            now,
        )?;
        if !cancelled {
            let current = self.store.order_by_id(order_id)?.ok_or_else(order_not_found)?;
            return Err(not_cancellable(current.status));
        }
        self.cache.invalidate(CacheNamespace::OrderStats);
        order.status = OrderStatus::Cancelled;
        order.updated_at = Some(now);
        Ok(order)
    }

    /// Sets an order status from its label.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for unknown labels and
    /// [`ServiceError::NotFound`] for unknown orders.
    pub fn update_status(&self, order_id: &OrderId, status: &str) -> Result<Order, ServiceError> {
        let status: OrderStatus = status.parse()?;
        let order = self.store.order_by_id(order_id)?.ok_or_else(order_not_found)?;
        self.set_status(order, status)
    }

    /// Returns order counts by status.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the store fails.
    pub fn stats(&self) -> Result<OrderStats, ServiceError> {
        self.cache.get_or_insert_with(CacheNamespace::OrderStats, STATS_KEY, || {
            Ok::<_, ServiceError>(OrderStats {
                total_orders: self.store.count_orders(None)?,
                pending: self.store.count_orders(Some(OrderStatus::Pending))?,
                preparing: self.store.count_orders(Some(OrderStatus::Preparing))?,
                delivered: self.store.count_orders(Some(OrderStatus::Delivered))?,
                cancelled: self.store.count_orders(Some(OrderStatus::Cancelled))?,
                failed: self.store.count_orders(Some(OrderStatus::Failed))?,
            })
        })
    }

    /// Persists a status change and returns the updated order.
    fn set_status(&self, mut order: Order, status: OrderStatus) -> Result<Order, ServiceError> {
        let now = self.clock.now();
        self.store.update_order_status(&order.order_id, status, None, now)?;
        self.cache.invalidate(CacheNamespace::OrderStats);
        order.status = status;
        order.updated_at = Some(now);
        Ok(order)
    }

    /// Validates lines and merges duplicate item ids, keeping first-seen order.
    ///
    /// Every line carries at least one unit, so a request with more lines than
    /// `max_items * max_item_quantity` cannot merge into an acceptable order
    /// and is rejected before any merging.
    fn merged_lines(
        &self,
        lines: &[OrderLineRequest],
    ) -> Result<Vec<(MenuItemId, u32)>, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::BadRequest("Order must contain at least one item".into()));
        }
        let max_lines = usize::try_from(self.limits.max_item_quantity)
            .map_or(usize::MAX, |quantity| self.limits.max_items.saturating_mul(quantity));
        if lines.len() > max_lines {
            return Err(too_many_items(self.limits.max_items));
        }
        let mut positions: HashMap<&MenuItemId, usize> = HashMap::with_capacity(lines.len());
        let mut merged: Vec<(MenuItemId, u32)> = Vec::new();
        for line in lines {
            if line.quantity == 0 {
                return Err(ServiceError::BadRequest("Quantity must be at least 1".to_string()));
            }
            match positions.get(&line.item_id).copied() {
                Some(position) => {
                    if let Some((_, quantity)) = merged.get_mut(position) {
                        *quantity = quantity.saturating_add(line.quantity);
                    }
                }
                None => {
                    positions.insert(&line.item_id, merged.len());
                    merged.push((line.item_id.clone(), line.quantity));
                }
            }
            if merged.len() > self.limits.max_items {
                return Err(too_many_items(self.limits.max_items));
            }
        }
        if merged.iter().any(|(_, quantity)| *quantity > self.limits.max_item_quantity) {
            return Err(ServiceError::BadRequest(format!(
                "Quantity must be at most {}",
                self.limits.max_item_quantity
            )));
        }
        Ok(merged)
    }
}

/// Rejection for orders with too many distinct items.
fn too_many_items(max_items: usize) -> ServiceError {
    ServiceError::BadRequest(format!("Order may contain at most {max_items} items"))
}

/// Missing or foreign order error.
fn order_not_found() -> ServiceError {
    ServiceError::NotFound("Order Not Found".to_string())
}

/// Rejection for orders past the cancellable statuses.
fn not_cancellable(status: OrderStatus) -> ServiceError {
    ServiceError::BadRequest(format!("Order cannot be cancelled in status {status}"))
}
