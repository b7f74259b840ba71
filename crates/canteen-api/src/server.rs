// crates/canteen-api/src/server.rs
// ============================================================================
// Module: HTTP Server
// Description: axum router, middleware, and lifecycle for the canteen API.
// Purpose: Wire configuration, services, and gateways into a serving router.
// Dependencies: axum, tokio, tower-http
// ============================================================================

//! ## Overview
//! [`ApiServer::from_config`] builds every production dependency (SQLite
//! store, Razorpay client, image directory, optional Google OAuth) and must be
//! called outside the async runtime because the gateway clients are blocking.
//! [`ApiServer::from_components`] accepts prebuilt dependencies and is what
//! tests use.
//!
//! Every request passes through the audit middleware, which records one
//! `http_request` event and, for internal failures, a `service_error` event.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod handlers;
pub mod response;


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::header::ACCEPT;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::middleware;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use canteen_config::CanteenConfig;
use canteen_config::CorsConfig;
use canteen_core::Clock;
use canteen_core::ImageStore;
use canteen_core::OAuthProvider;
use canteen_core::PaymentGateway;
use canteen_core::SharedCanteenStore;
use canteen_core::SystemClock;
use canteen_store_sqlite::SqliteCanteenStore;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;

use self::handlers as h;
use self::response::ApiError;
use self::response::ErrorDetail;
use crate::audit::ApiAuditSink;
use crate::audit::RequestAuditEvent;
use crate::audit::SecurityAuditEvent;
use crate::audit::ServiceErrorEvent;
use crate::audit::sink_from_config;
use crate::auth::JwtKeys;
use crate::auth::bearer_token;
use crate::cache::TtlCache;
use crate::media::FileImageStore;
use crate::oauth::GoogleOAuthProvider;
use crate::oauth::OAuthStateSigner;
use crate::payments::RazorpayGateway;
use crate::services::CanteenServices;
use crate::services::ServiceDeps;
use crate::services::ServiceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// CORS preflight cache lifetime.
const CORS_MAX_AGE: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// SECTION: State
// ============================================================================

/// OAuth provider paired with its state-token signer.
pub struct OAuthFlow {
    /// Provider client.
    pub(crate) provider: Arc<dyn OAuthProvider + Send + Sync>,
    /// State-token signer.
    pub(crate) states: OAuthStateSigner,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Business services.
    pub(crate) services: CanteenServices,
    /// Audit sink.
    pub(crate) audit: Arc<dyn ApiAuditSink>,
    /// OAuth flow, when configured.
    pub(crate) oauth: Option<Arc<OAuthFlow>>,
    /// Image storage for `/media`.
    pub(crate) images: Arc<dyn ImageStore + Send + Sync>,
    /// Frontend base URL for OAuth redirects.
    pub(crate) frontend_url: String,
    /// Time source.
    pub(crate) clock: Arc<dyn Clock>,
}

/// Prebuilt dependencies for [`ApiServer::from_components`].
pub struct ServerComponents {
    /// Persistence.
    pub store: SharedCanteenStore,
    /// Payment gateway.
    pub payments: Arc<dyn PaymentGateway + Send + Sync>,
    /// Image storage.
    pub images: Arc<dyn ImageStore + Send + Sync>,
    /// OAuth provider, if any.
    pub oauth: Option<Arc<dyn OAuthProvider + Send + Sync>>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Audit sink.
    pub audit: Arc<dyn ApiAuditSink>,
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Canteen HTTP server.
pub struct ApiServer {
    /// Bind address.
    bind: SocketAddr,
    /// Maximum request body size.
    max_body_bytes: usize,
    /// CORS policy.
    cors: CorsLayer,
    /// Handler state.
    state: AppState,
}

impl ApiServer {
    /// Builds the server and its production dependencies.
    ///
    /// Gateway clients are blocking, so call this outside the async runtime
    /// (for example from `spawn_blocking`).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a dependency
    /// cannot be initialized.
    pub fn from_config(config: CanteenConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = SqliteCanteenStore::new(&config.store.sqlite_config())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let payments =
            RazorpayGateway::new(&config.payments).map_err(|err| ServerError::Init(err.to_string()))?;
        let images = FileImageStore::new(&config.media, config.server.public_base())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let oauth = match &config.auth.google {
            Some(google) => {
                let provider = GoogleOAuthProvider::new(google)
                    .map_err(|err| ServerError::Init(err.to_string()))?;
                Some(Arc::new(provider) as Arc<dyn OAuthProvider + Send + Sync>)
            }
            None => None,
        };
        let audit = sink_from_config(&config.server.audit)
            .map_err(|err| ServerError::Init(format!("audit sink: {err}")))?;
        let components = ServerComponents {
            store: SharedCanteenStore::from_store(store),
            payments: Arc::new(payments),
            images: Arc::new(images),
            oauth,
            clock: Arc::new(SystemClock),
            audit,
        };
        Self::from_components(&config, components)
    }

    /// Builds the server from prebuilt dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when configuration is invalid.
    pub fn from_components(
        config: &CanteenConfig,
        components: ServerComponents,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let cors = cors_layer(&config.server.cors)?;
        let cache = Arc::new(TtlCache::from_config(&config.cache, Arc::clone(&components.clock)));
        let tokens =
            Arc::new(JwtKeys::new(config.auth.jwt_secret.as_bytes(), config.auth.token_ttl_secs));
        let deps = ServiceDeps {
            store: components.store,
            payments: components.payments,
            images: Arc::clone(&components.images),
            clock: Arc::clone(&components.clock),
            cache,
            tokens,
            audit: Arc::clone(&components.audit),
        };
        let oauth = components.oauth.map(|provider| {
            Arc::new(OAuthFlow {
                provider,
                states: OAuthStateSigner::new(config.auth.jwt_secret.as_bytes()),
            })
        });
        let state = AppState {
            services: CanteenServices::new(&deps, config),
            audit: components.audit,
            oauth,
            images: components.images,
            frontend_url: config.server.frontend_base().to_string(),
            clock: components.clock,
        };
        emit_exposure_warning(&state, bind, &config.server.cors);
        Ok(Self {
            bind,
            max_body_bytes: config.server.max_body_bytes,
            cors,
            state,
        })
    }

    /// Returns the wired services.
    #[must_use]
    pub const fn services(&self) -> &CanteenServices {
        &self.state.services
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Builds the application router.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.cors.clone(), self.max_body_bytes)
    }

    /// Serves HTTP until ctrl-c or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds every route with middleware applied.
fn build_router(state: AppState, cors: CorsLayer, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(h::health))
        .route("/media/{file}", get(h::media))
        // auth
        .route("/api/v1/auth/signup", post(h::signup))
        .route("/api/v1/auth/signin", post(h::signin))
        .route("/oauth2/authorization/google", get(h::oauth_authorize))
        .route("/login/oauth2/code/google", get(h::oauth_callback))
        // users
        .route("/api/v1/user/secure/auth/profile", get(h::profile))
        .route("/api/v1/user/secure/", get(h::list_customers))
        // categories
        .route("/api/v1/category/secure/add", post(h::add_category))
        .route("/api/v1/category/public/", get(h::list_categories))
        .route("/api/v1/category/secure/{id}", delete(h::delete_category))
        // menu items
        .route("/api/v1/menu-item/secure/add", post(h::add_item))
        .route("/api/v1/menu-item/public/", get(h::list_items))
        .route("/api/v1/menu-item/public/user/", get(h::list_items_for_user))
        .route("/api/v1/menu-item/public/user/{id}", get(h::get_item_for_user))
        .route("/api/v1/menu-item/public/category/{id}", get(h::items_by_category))
        .route("/api/v1/menu-item/public/{id}", get(h::get_item))
        .route("/api/v1/menu-item/secure/{id}", put(h::update_item).delete(h::delete_item))
        // cart
        .route("/api/v1/cart/secure/add", post(h::cart_add))
        .route("/api/v1/cart/secure/{id}/quantity", put(h::cart_quantity))
        .route("/api/v1/cart/secure/remove", delete(h::cart_remove))
        .route("/api/v1/cart/secure/", get(h::cart_items))
        // orders
        .route("/api/v1/orders/secure/create", post(h::create_order))
        .route("/api/v1/orders/secure/all", get(h::my_orders))
        .route("/api/v1/orders/secure/admin/all", get(h::admin_orders))
        .route("/api/v1/orders/secure/stats", get(h::order_stats))
        .route("/api/v1/orders/secure/", put(h::update_order_status))
        .route("/api/v1/orders/secure/{id}", get(h::get_order))
        .route("/api/v1/orders/secure/{id}/cancel", delete(h::cancel_order))
        // payments
        .route("/api/v1/payments/secure/verify", post(h::verify_payment))
        // dashboard
        .route("/api/v1/dashboard/public/stats1", get(h::dashboard_summary))
        .route("/api/v1/dashboard/secure/income", get(h::dashboard_income))
        .route("/api/v1/dashboard/secure/top-items", get(h::dashboard_top_items))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), audit_requests))
        .layer(cors)
        .with_state(state)
}

/// Envelope for unknown routes.
async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Builds the CORS policy; no configured origins mirrors the caller's origin.
fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, ServerError> {
    let origin = if config.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| HeaderValue::from_str(origin.trim_end_matches('/')))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ServerError::Config("invalid cors origin".to_string()))?;
        AllowOrigin::list(origins)
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE))
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Records one audit event per request.
async fn audit_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| peer.ip().to_string());
    let subject = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| state.services.auth.token_subject(token));

    let response = next.run(request).await;

    let status = response.status().as_u16();
    if let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>() {
        state.audit.record_error(&ServiceErrorEvent::new(path.clone(), status, detail.clone()));
    }
    let latency_ms = started.elapsed().as_millis();
    state
        .audit
        .record_request(&RequestAuditEvent::new(method, path, status, latency_ms, subject, peer_ip));
    response
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs a service call on the blocking pool.
///
/// # Errors
///
/// Returns the mapped service error, or an internal error when the task
/// panics or is cancelled.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
        .map_err(ApiError::from)
}

/// Warns when the server is reachable off-host while CORS accepts any origin.
fn emit_exposure_warning(state: &AppState, bind: SocketAddr, cors: &CorsConfig) {
    if !bind.ip().is_loopback() && cors.allows_any_origin() {
        let event = SecurityAuditEvent::new(
            "open_cors_on_public_bind",
            format!(
                "server binds {bind} and mirrors any origin; configure \
                 server.cors.allowed_origins"
            ),
        );
        state.audit.record_security(&event);
    }
}

/// Resolves on ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
