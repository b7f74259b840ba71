// crates/canteen-api/src/payments.rs
// ============================================================================
// Module: Razorpay Gateway
// Description: Blocking Razorpay client and payment signature checks.
// Purpose: Create gateway orders and verify checkout callbacks.
// Dependencies: reqwest, hmac, sha2, hex, subtle
// ============================================================================

//! ## Overview
//! [`RazorpayGateway`] implements [`PaymentGateway`] over the Razorpay REST
//! API using basic auth. Checkout callbacks are verified by recomputing
//! `hex(HMAC_SHA256(key_secret, order_id + "|" + payment_id))` and comparing
//! it in constant time.
//!
//! The client is blocking; construct and call it outside async workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use canteen_config::PaymentsConfig;
use canteen_core::Money;
use canteen_core::PaymentError;
use canteen_core::PaymentGateway;
use canteen_core::PaymentOrder;
use hmac::Mac;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::auth::HmacSha256;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Order creation request body.
#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    /// Amount in paise.
    amount: i64,
    /// ISO currency code.
    currency: &'a str,
    /// Merchant receipt reference.
    receipt: &'a str,
    /// Auto-capture flag.
    payment_capture: u8,
}

/// Order creation response body.
#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    /// Gateway order identifier.
    id: Option<String>,
    /// Amount in paise echoed by the gateway.
    amount: Option<i64>,
    /// Currency echoed by the gateway.
    currency: Option<String>,
}

/// Error response body.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    /// Error detail.
    error: Option<ErrorDetail>,
}

/// Error detail object.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    /// Human-readable description.
    description: Option<String>,
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Razorpay REST client.
pub struct RazorpayGateway {
    /// Blocking HTTP client.
    client: Client,
    /// API base URL without a trailing slash.
    api_base: String,
    /// API key identifier.
    key_id: String,
    /// API key secret.
    key_secret: String,
    /// Order currency.
    currency: String,
}

impl RazorpayGateway {
    /// Builds a gateway client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .build()
            .map_err(|_| PaymentError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base_trimmed().to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            currency: config.currency.clone(),
        })
    }
}

impl PaymentGateway for RazorpayGateway {
    fn create_order(&self, amount: Money, receipt: &str) -> Result<PaymentOrder, PaymentError> {
        let body = CreateOrderBody {
            amount: amount.paise(),
            currency: &self.currency,
            receipt,
            payment_capture: 1,
        };
        let response = self
            .client
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    PaymentError::Transport("payment gateway timed out".to_string())
                } else {
                    PaymentError::Transport("payment gateway unreachable".to_string())
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|detail| detail.description)
                .unwrap_or_else(|| "request rejected".to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let parsed: CreateOrderResponse = response
            .json()
            .map_err(|_| PaymentError::InvalidResponse("order response is not json".to_string()))?;
        let id = parsed
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PaymentError::InvalidResponse("order response missing id".to_string()))?;
        let amount = match parsed.amount {
            Some(paise) => Money::from_paise(paise)
                .map_err(|err| PaymentError::InvalidResponse(err.to_string()))?,
            None => amount,
        };
        Ok(PaymentOrder {
            id,
            amount,
            currency: parsed.currency.unwrap_or_else(|| self.currency.clone()),
            receipt: receipt.to_string(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature_matches(&self.key_secret, order_id, payment_id, signature)
    }
}

// ============================================================================
// SECTION: Signatures
// ============================================================================

/// Computes the hex checkout signature for an order and payment pair.
#[must_use]
pub fn payment_signature(key_secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a checkout signature in constant time.
#[must_use]
pub fn signature_matches(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Some(expected) = payment_signature(key_secret, order_id, payment_id) else {
        return false;
    };
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
