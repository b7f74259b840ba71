// crates/canteen-api/src/server/response.rs
// ============================================================================
// Module: HTTP Envelopes and Extractors
// Description: Success/failure envelopes, error mapping, and request guards.
// Purpose: Give every route the same response shape and auth checks.
// Dependencies: axum, serde, time
// ============================================================================

//! ## Overview
//! Successful responses are wrapped as `{status, message, data}` and failures
//! as `{status, type, error, localTime}`. Extractor rejections are converted
//! into the failure envelope so malformed input never produces axum's plain
//! text bodies.
//!
//! Internal failures reach the client as `internal error`. The detail rides
//! along in the response extensions so the audit middleware can record it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::response::Response;
use canteen_core::User;
use canteen_core::format_rfc3339;
use serde::Serialize;
use time::OffsetDateTime;

use super::AppState;
use super::run_blocking;
use crate::audit::AuthDecisionEvent;
use crate::auth::bearer_token;
use crate::services::ServiceError;
use crate::services::UNAUTHENTICATED_MESSAGE;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message returned to non-admin callers of admin routes.
pub const FORBIDDEN_MESSAGE: &str = "Forbidden - Admin access required";
/// Message returned for internal failures.
const INTERNAL_MESSAGE: &str = "internal error";
/// Message returned for payment gateway failures.
const GATEWAY_MESSAGE: &str = "Payment gateway error";

// ============================================================================
// SECTION: Success Envelope
// ============================================================================

/// Success envelope body.
#[derive(Debug, Serialize)]
struct SuccessBody<T> {
    /// Always `success`.
    status: &'static str,
    /// Human-readable outcome.
    message: &'static str,
    /// Payload, `null` when absent.
    data: T,
}

/// Successful response carrying `data`.
#[derive(Debug)]
pub struct ApiSuccess<T> {
    /// Human-readable outcome.
    message: &'static str,
    /// Payload.
    data: T,
}

impl<T> ApiSuccess<T> {
    /// Wraps a payload.
    #[must_use]
    pub const fn new(message: &'static str, data: T) -> Self {
        Self {
            message,
            data,
        }
    }
}

impl ApiSuccess<()> {
    /// Success without a payload.
    #[must_use]
    pub const fn empty(message: &'static str) -> Self {
        Self::new(message, ())
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            status: "success",
            message: self.message,
            data: self.data,
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Handler result type.
pub type ApiResult<T> = Result<ApiSuccess<T>, ApiError>;

// ============================================================================
// SECTION: Failure Envelope
// ============================================================================

/// Failure envelope body.
#[derive(Debug, Serialize)]
struct FailureBody<'a> {
    /// Always `failure`.
    status: &'static str,
    /// Error class label.
    #[serde(rename = "type")]
    kind: &'static str,
    /// Client-facing message.
    error: &'a str,
    /// Server time of the failure.
    #[serde(rename = "localTime")]
    local_time: String,
}

/// Internal error detail attached to failure responses for auditing.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// HTTP error with a status, class label, and client message.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status.
    status: StatusCode,
    /// Error class label.
    kind: &'static str,
    /// Client-facing message.
    message: String,
    /// Detail kept out of the response body.
    detail: Option<String>,
}

impl ApiError {
    /// Builds an error with an explicit status and label.
    #[must_use]
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Builds a 500 whose detail is only audited.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: INTERNAL_MESSAGE.to_string(),
            detail: Some(detail.into()),
        }
    }

    /// Builds a 404.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Builds a 400.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error class label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Maps an extractor rejection onto the envelope classes.
    fn from_rejection(status: StatusCode, text: String) -> Self {
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => Self::new(status, "payload_too_large", text),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Self::new(status, "unsupported_media_type", text),
            other if other.is_server_error() => Self::internal(text),
            _ => Self::bad_request(text),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        let kind = error.kind();
        match error {
            ServiceError::BadRequest(message) => Self::new(StatusCode::BAD_REQUEST, kind, message),
            ServiceError::Unauthenticated(message) => {
                Self::new(StatusCode::UNAUTHORIZED, kind, message)
            }
            ServiceError::Forbidden(message) => Self::new(StatusCode::FORBIDDEN, kind, message),
            ServiceError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, kind, message),
            ServiceError::Conflict(message) => Self::new(StatusCode::CONFLICT, kind, message),
            ServiceError::PayloadTooLarge(message) => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, kind, message)
            }
            ServiceError::UnsupportedMedia(message) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, kind, message)
            }
            ServiceError::Gateway(detail) => Self {
                status: StatusCode::BAD_GATEWAY,
                kind,
                message: GATEWAY_MESSAGE.to_string(),
                detail: Some(detail),
            },
            ServiceError::Internal(detail) => Self::internal(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::from_rejection(error.status(), error.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let local_time = format_rfc3339(OffsetDateTime::now_utc()).unwrap_or_default();
        let body = FailureBody {
            status: "failure",
            kind: self.kind,
            error: &self.message,
            local_time,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(detail) = self.detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

// ============================================================================
// SECTION: Input Extractors
// ============================================================================

/// JSON body whose rejections use the failure envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections use the failure envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejections use the failure envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

// ============================================================================
// SECTION: Auth Extractors
// ============================================================================

/// Any authenticated account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = authenticate(parts, state, "user").await?;
        record_auth(state, parts, true, "token_valid", "user", Some(&user));
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = authenticate(parts, state, "admin").await?;
        if !user.is_admin() {
            record_auth(state, parts, false, "not_admin", "admin", Some(&user));
            return Err(ServiceError::Forbidden(FORBIDDEN_MESSAGE.to_string()).into());
        }
        record_auth(state, parts, true, "admin_token_valid", "admin", Some(&user));
        Ok(Self(user))
    }
}

/// Resolves the bearer token to a user, auditing denials.
async fn authenticate(
    parts: &Parts,
    state: &AppState,
    route_class: &'static str,
) -> Result<User, ApiError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);
    let Some(token) = token else {
        record_auth(state, parts, false, "missing_token", route_class, None);
        return Err(unauthenticated());
    };
    let auth = state.services.auth.clone();
    match run_blocking(move || auth.authenticate(&token)).await {
        Ok(user) => Ok(user),
        Err(err) if err.status() == StatusCode::UNAUTHORIZED => {
            record_auth(state, parts, false, "invalid_token", route_class, None);
            Err(err)
        }
        Err(err) => Err(err),
    }
}

/// Emits an auth decision event.
fn record_auth(
    state: &AppState,
    parts: &Parts,
    allowed: bool,
    reason: &'static str,
    route_class: &'static str,
    user: Option<&User>,
) {
    let event = AuthDecisionEvent::new(
        allowed,
        reason,
        route_class,
        parts.uri.path().to_string(),
        user.map(|user| user.email.clone()),
    );
    state.audit.record_auth(&event);
}

/// Standard 401.
fn unauthenticated() -> ApiError {
    ServiceError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string()).into()
}
