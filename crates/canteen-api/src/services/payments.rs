// crates/canteen-api/src/services/payments.rs
// ============================================================================
// Module: Payment Service
// Description: Checkout signature verification.
// Purpose: Settle orders once the gateway confirms payment.
// Dependencies: canteen-core, serde
// ============================================================================

//! ## Overview
//! Verification is only accepted for the caller's own order, for the gateway
//! order that was issued for it, and while the order is still awaiting
//! payment. A failed verification marks the order FAILED; a later successful
//! attempt may still settle it.
//!
//! The status written after the gateway check is guarded by the status the
//! order holds at write time, so a slow rejected attempt can never overwrite
//! a settlement that landed while it was in flight.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use canteen_core::CanteenStore;
use canteen_core::Clock;
use canteen_core::OrderId;
use canteen_core::OrderStatus;
use canteen_core::PaymentGateway;
use canteen_core::SharedCanteenStore;
use canteen_core::User;
use serde::Deserialize;
use serde::Serialize;

use super::ServiceDeps;
use super::ServiceError;
use super::non_blank;
use crate::cache::CacheNamespace;
use crate::cache::TtlCache;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Checkout callback payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Gateway order id.
    pub razorpay_order_id: String,
    /// Gateway payment id.
    pub razorpay_payment_id: String,
    /// Hex HMAC signature from the checkout client.
    pub razorpay_signature: String,
    /// Local order id.
    pub order_id: String,
}

/// Verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    /// Local order id.
    pub order_id: OrderId,
    /// Status after verification.
    pub status: OrderStatus,
    /// Whether the signature matched.
    #[serde(skip)]
    pub verified: bool,
}

/// Statuses from which a verified payment may settle an order.
const AWAITING_PAYMENT: &[OrderStatus] = &[OrderStatus::Pending, OrderStatus::Failed];
/// Statuses from which a rejected signature may mark an order FAILED.
const UNSETTLED: &[OrderStatus] = &[OrderStatus::Pending];

// ============================================================================
// SECTION: Service
// ============================================================================

/// Payment verification service.
#[derive(Clone)]
pub struct PaymentService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Payment gateway.
    payments: Arc<dyn PaymentGateway + Send + Sync>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Stats cache.
    cache: Arc<TtlCache>,
}

impl PaymentService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps) -> Self {
        Self {
            store: deps.store.clone(),
            payments: Arc::clone(&deps.payments),
            clock: Arc::clone(&deps.clock),
            cache: Arc::clone(&deps.cache),
        }
    }

    /// Verifies a checkout signature and settles the order.
    ///
    /// A signature mismatch is not an error: the order is marked FAILED and
    /// the outcome says so.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown or foreign orders and
    /// [`ServiceError::BadRequest`] for mismatched gateway orders or orders
    /// that are not awaiting payment.
    pub fn verify(
        &self,
        user: &User,
        request: &VerifyPaymentRequest,
    ) -> Result<PaymentVerification, ServiceError> {
        let order_id = OrderId::new(non_blank(&request.order_id, "orderId")?);
        let gateway_order_id = non_blank(&request.razorpay_order_id, "razorpayOrderId")?;
        let payment_id = non_blank(&request.razorpay_payment_id, "razorpayPaymentId")?;
        let signature = non_blank(&request.razorpay_signature, "razorpaySignature")?;

        let order = self
            .store
            .order_by_id(&order_id)?
            .filter(|order| order.user_id == user.user_id)
            .ok_or_else(|| ServiceError::NotFound("Order Not Found".to_string()))?;
        if order.razorpay_order_id.as_deref() != Some(gateway_order_id) {
            return Err(ServiceError::BadRequest(
                "Payment order does not match this order".to_string(),
            ));
        }
        if !AWAITING_PAYMENT.contains(&order.status) {
            return Err(not_awaiting_payment(order.status));
        }

        let now = self.clock.now();
        let verified = self.payments.verify_signature(gateway_order_id, payment_id, signature);
        let (from, to, payment) = if verified {
            (AWAITING_PAYMENT, OrderStatus::Paid, Some(payment_id))
        } else {
            (UNSETTLED, OrderStatus::Failed, None)
        };
        if !self.store.transition_order_status(&order_id, from, to, payment, now)? {
            let current = self.store.order_by_id(&order_id)?.map(|order| order.status);
            match current {
                Some(OrderStatus::Failed) if !verified => {}
                Some(status) => return Err(not_awaiting_payment(status)),
                None => return Err(ServiceError::NotFound("Order Not Found".to_string())),
            }
        }
        if verified {
            self.store.clear_cart(&user.user_id)?;
        }
        self.cache.invalidate(CacheNamespace::OrderStats);
        Ok(PaymentVerification {
            order_id,
            status: to,
            verified,
        })
    }
}

/// Rejection for orders that left the payable statuses.
fn not_awaiting_payment(status: OrderStatus) -> ServiceError {
    ServiceError::BadRequest(format!("Order is not awaiting payment (status {status})"))
}
