// crates/canteen-api/src/services/mod.rs
// ============================================================================
// Module: Canteen Services
// Description: Business rules between HTTP handlers and the store.
// Purpose: Own validation, ownership checks, caching, and gateway calls.
// Dependencies: canteen-core, thiserror
// ============================================================================

//! ## Overview
//! Services are synchronous and cheap to clone. Every dependency is an `Arc`
//! so handlers can move a service into a blocking task. Failures surface as
//! [`ServiceError`], whose variants map one-to-one onto HTTP status classes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod orders;
pub mod payments;
pub mod users;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use canteen_config::CanteenConfig;
use canteen_core::Clock;
use canteen_core::ImageError;
use canteen_core::ImageStore;
use canteen_core::ModelError;
use canteen_core::MoneyError;
use canteen_core::PaymentGateway;
use canteen_core::SharedCanteenStore;
use canteen_core::StoreError;
use canteen_core::TimeError;
use thiserror::Error;

pub use self::auth::AuthService;
pub use self::auth::AuthToken;
pub use self::auth::SigninRequest;
pub use self::auth::SignupRequest;
pub use self::cart::CartService;
pub use self::catalog::CatalogService;
pub use self::catalog::ImageUpload;
pub use self::catalog::ItemUpdate;
pub use self::catalog::NewCategory;
pub use self::catalog::NewMenuItem;
pub use self::dashboard::DashboardService;
pub use self::dashboard::DashboardSummary;
pub use self::dashboard::MonthlyIncome;
pub use self::dashboard::TopItem;
pub use self::orders::AddressRequest;
pub use self::orders::CreateOrderRequest;
pub use self::orders::CreatedOrder;
pub use self::orders::OrderLineRequest;
pub use self::orders::OrderService;
pub use self::orders::OrderStats;
pub use self::payments::PaymentService;
pub use self::payments::PaymentVerification;
pub use self::payments::VerifyPaymentRequest;
pub use self::users::UserService;
use crate::audit::ApiAuditSink;
use crate::auth::AuthError;
use crate::auth::JwtKeys;
use crate::cache::TtlCache;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Service-layer failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Request failed validation.
    #[error("{0}")]
    BadRequest(String),
    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthenticated(String),
    /// Caller lacks the required role or ownership.
    #[error("{0}")]
    Forbidden(String),
    /// Referenced record does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request conflicts with existing state.
    #[error("{0}")]
    Conflict(String),
    /// Upload exceeds a size limit.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Upload has an unsupported media type.
    #[error("{0}")]
    UnsupportedMedia(String),
    /// An upstream gateway failed.
    #[error("{0}")]
    Gateway(String),
    /// Unexpected failure; the detail is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns a stable label for the error class.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::UnsupportedMedia(_) => "unsupported_media_type",
            Self::Gateway(_) => "bad_gateway",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(message) => Self::NotFound(message),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::Db(_) | StoreError::Invalid(_) | StoreError::Corrupt(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl From<ImageError> for ServiceError {
    fn from(error: ImageError) -> Self {
        match error {
            ImageError::UnsupportedType(_) => Self::UnsupportedMedia(error.to_string()),
            ImageError::TooLarge {
                ..
            } => Self::PayloadTooLarge(error.to_string()),
            ImageError::InvalidName(_) => Self::BadRequest(error.to_string()),
            ImageError::NotFound(_) => Self::NotFound(error.to_string()),
            ImageError::Io(_) => Self::Internal(error.to_string()),
        }
    }
}

impl From<MoneyError> for ServiceError {
    fn from(error: MoneyError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<ModelError> for ServiceError {
    fn from(error: ModelError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<TimeError> for ServiceError {
    fn from(error: TimeError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<AuthError> for ServiceError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidToken(_) | AuthError::Expired => {
                Self::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string())
            }
            AuthError::Key(_) | AuthError::Password(_) => Self::Internal(error.to_string()),
        }
    }
}

/// Message returned for missing or invalid credentials.
pub const UNAUTHENTICATED_MESSAGE: &str = "Unauthorized - Invalid or missing token";

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Shared dependencies used to build the services.
#[derive(Clone)]
pub struct ServiceDeps {
    /// Persistence.
    pub store: SharedCanteenStore,
    /// Payment gateway.
    pub payments: Arc<dyn PaymentGateway + Send + Sync>,
    /// Image storage.
    pub images: Arc<dyn ImageStore + Send + Sync>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Listing cache.
    pub cache: Arc<TtlCache>,
    /// Token keys.
    pub tokens: Arc<JwtKeys>,
    /// Sink for failures that never reach a response.
    pub audit: Arc<dyn ApiAuditSink>,
}

/// Every service, wired to shared dependencies.
#[derive(Clone)]
pub struct CanteenServices {
    /// Signup, signin, and token validation.
    pub auth: AuthService,
    /// Categories and menu items.
    pub catalog: CatalogService,
    /// Per-user carts.
    pub cart: CartService,
    /// Order placement and lifecycle.
    pub orders: OrderService,
    /// Checkout verification.
    pub payments: PaymentService,
    /// Profiles and customer search.
    pub users: UserService,
    /// Admin statistics.
    pub dashboard: DashboardService,
}

impl CanteenServices {
    /// Wires every service from shared dependencies and configuration.
    #[must_use]
    pub fn new(deps: &ServiceDeps, config: &CanteenConfig) -> Self {
        Self {
            auth: AuthService::new(deps, config.auth.min_password_length),
            catalog: CatalogService::new(deps),
            cart: CartService::new(deps, config.orders.max_item_quantity),
            orders: OrderService::new(deps, &config.orders),
            payments: PaymentService::new(deps),
            users: UserService::new(deps),
            dashboard: DashboardService::new(deps),
        }
    }
}

/// Builds a `required` validation error for a field.
pub(crate) fn required(field: &str) -> ServiceError {
    ServiceError::BadRequest(format!("{field} is required"))
}

/// Returns the trimmed value or a `required` error when blank.
pub(crate) fn non_blank<'a>(value: &'a str, field: &str) -> Result<&'a str, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() { Err(required(field)) } else { Ok(trimmed) }
}

/// Cache key for a query and page.
pub(crate) fn page_key(query: Option<&str>, page: canteen_core::PageRequest) -> String {
    format!("q={}|page={}|limit={}", query.unwrap_or(""), page.page(), page.limit())
}

/// Normalizes an optional search string (blank means none).
pub(crate) fn normalize_query(query: Option<&str>) -> Option<String> {
    query.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
