// crates/canteen-api/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fakes and request helpers for canteen API tests.
// Purpose: Drive the full router against a temp SQLite store and fake gateways.
// Dependencies: canteen-api, canteen-core, canteen-config, tower, tempfile
// ============================================================================

//! ## Overview
//! [`TestApp`] wires the real router to a temp-dir `SQLite` store, a
//! file-backed image store, a fake payment gateway, and a recording audit
//! sink. Requests go through `tower::ServiceExt::oneshot`, so no sockets are
//! opened.

#![allow(dead_code, reason = "Shared test helpers may be unused in some suites.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::Body;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use canteen_api::ApiAuditSink;
use canteen_api::ApiServer;
use canteen_api::FileImageStore;
use canteen_api::ServerComponents;
use canteen_api::audit::AuthDecisionEvent;
use canteen_api::audit::RequestAuditEvent;
use canteen_api::audit::SecurityAuditEvent;
use canteen_api::audit::ServiceErrorEvent;
use canteen_config::CanteenConfig;
use canteen_core::FixedClock;
use canteen_core::Money;
use canteen_core::OAuthError;
use canteen_core::OAuthProfile;
use canteen_core::OAuthProvider;
use canteen_core::PaymentError;
use canteen_core::PaymentGateway;
use canteen_core::PaymentOrder;
use canteen_core::SharedCanteenStore;
use canteen_store_sqlite::SqliteCanteenStore;
use canteen_store_sqlite::SqliteStoreConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::datetime;
use tower::ServiceExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Instant every test clock starts at.
pub const START: OffsetDateTime = datetime!(2026-03-15 10:00 UTC);

/// Admin credentials seeded by [`TestApp::admin_token`].
pub const ADMIN_EMAIL: &str = "admin@canteen.test";
/// Admin password.
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Smallest valid PNG header, enough for the image store.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

/// Multipart boundary used by [`multipart_body`].
const BOUNDARY: &str = "canteen-test-boundary";

// ============================================================================
// SECTION: Fakes
// ============================================================================

/// Payment gateway that hands out sequential order ids.
///
/// A signature is accepted when it equals `sig:{order}:{payment}`.
#[derive(Default)]
pub struct FakeGateway {
    /// Number of orders created.
    created: AtomicU32,
    /// When set, `create_order` fails.
    fail: AtomicBool,
    /// Amounts requested, in order.
    amounts: Mutex<Vec<Money>>,
    /// Pause applied to the next rejected signature check.
    hold: Mutex<Option<Arc<SignatureHold>>>,
}

/// Two-step rendezvous that keeps a rejected signature check in flight.
///
/// The gateway waits on `entered` once the check has started and on
/// `release` before returning its verdict.
pub struct SignatureHold {
    /// Reached when the held check starts.
    pub entered: Barrier,
    /// Passed when the test lets the check finish.
    pub release: Barrier,
}

impl FakeGateway {
    /// Makes subsequent `create_order` calls fail.
    pub fn fail_orders(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Returns every amount requested so far.
    pub fn amounts(&self) -> Vec<Money> {
        self.amounts.lock().unwrap().clone()
    }

    /// Holds the next rejected signature check until the test releases it.
    pub fn hold_next_rejection(&self) -> Arc<SignatureHold> {
        let hold = Arc::new(SignatureHold {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        });
        *self.hold.lock().unwrap() = Some(Arc::clone(&hold));
        hold
    }

    /// Signature the fake accepts for an order/payment pair.
    pub fn signature(order_id: &str, payment_id: &str) -> String {
        format!("sig:{order_id}:{payment_id}")
    }
}

impl PaymentGateway for FakeGateway {
    fn create_order(&self, amount: Money, receipt: &str) -> Result<PaymentOrder, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected {
                status: 401,
                message: "Authentication failed".to_string(),
            });
        }
        self.amounts.lock().unwrap().push(amount);
        let sequence = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentOrder {
            id: format!("order_fake_{sequence}"),
            amount,
            currency: "INR".to_string(),
            receipt: receipt.to_string(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let accepted = signature == Self::signature(order_id, payment_id);
        if !accepted {
            let hold = self.hold.lock().unwrap().take();
            if let Some(hold) = hold {
                hold.entered.wait();
                hold.release.wait();
            }
        }
        accepted
    }
}

/// OAuth provider returning a fixed profile for code `good`.
pub struct FakeOAuth {
    /// Profile returned on success.
    pub profile: OAuthProfile,
}

impl OAuthProvider for FakeOAuth {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.example.test/auth?state={state}")
    }

    fn exchange(&self, code: &str) -> Result<OAuthProfile, OAuthError> {
        if code == "good" {
            Ok(self.profile.clone())
        } else {
            Err(OAuthError::Rejected("invalid_grant".to_string()))
        }
    }
}

/// Audit sink that keeps every event as JSON.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<Value>>,
}

impl RecordingAuditSink {
    /// Returns recorded events whose `event` field equals `kind`.
    pub fn events(&self, kind: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event["event"] == kind)
            .cloned()
            .collect()
    }

    /// Stores one serialized event.
    fn push(&self, event: &impl serde::Serialize) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

impl ApiAuditSink for RecordingAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.push(event);
    }

    fn record_auth(&self, event: &AuthDecisionEvent) {
        self.push(event);
    }

    fn record_error(&self, event: &ServiceErrorEvent) {
        self.push(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.push(event);
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Builds a valid config rooted in `dir`.
pub fn test_config(dir: &TempDir, extra: &str) -> CanteenConfig {
    let root = dir.path().display();
    let toml = format!(
        r#"
[server]
public_base_url = "http://127.0.0.1:8080"
frontend_url = "http://localhost:5173"

[auth]
jwt_secret = "test-secret-test-secret-test-secret-0123"

[store]
path = "{root}/canteen.db"

[payments]
key_id = "rzp_test_key"
key_secret = "rzp_test_secret"

[media]
dir = "{root}/media"

[orders]
max_item_quantity = 10
max_items = 5
{extra}
"#
    );
    CanteenConfig::from_toml_str(&toml).unwrap()
}

// ============================================================================
// SECTION: Test App
// ============================================================================

/// Router plus handles on its fakes.
pub struct TestApp {
    /// Keeps the temp dir alive.
    pub dir: TempDir,
    /// Server used for service access.
    pub server: ApiServer,
    /// Router under test.
    pub router: Router,
    /// Payment gateway fake.
    pub gateway: Arc<FakeGateway>,
    /// Audit recorder.
    pub audit: Arc<RecordingAuditSink>,
    /// Test clock.
    pub clock: Arc<FixedClock>,
    /// Store shared with the server.
    pub store: SharedCanteenStore,
}

impl TestApp {
    /// Builds an app without OAuth.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Builds an app whose OAuth provider returns `profile`.
    pub fn with_oauth(profile: OAuthProfile) -> Self {
        Self::build(Some(profile))
    }

    fn build(oauth: Option<OAuthProfile>) -> Self {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, "");
        let store = SqliteCanteenStore::new(&SqliteStoreConfig::for_path(
            dir.path().join("canteen.db"),
        ))
        .unwrap();
        let store = SharedCanteenStore::from_store(store);
        let images = FileImageStore::new(&config.media, config.server.public_base()).unwrap();
        let gateway = Arc::new(FakeGateway::default());
        let audit = Arc::new(RecordingAuditSink::default());
        let clock = Arc::new(FixedClock::new(START));
        let components = ServerComponents {
            store: store.clone(),
            payments: gateway.clone(),
            images: Arc::new(images),
            oauth: oauth.map(|profile| {
                Arc::new(FakeOAuth {
                    profile,
                }) as Arc<dyn OAuthProvider + Send + Sync>
            }),
            clock: clock.clone(),
            audit: audit.clone(),
        };
        let server = ApiServer::from_components(&config, components).unwrap();
        let router = server.router();
        Self {
            dir,
            server,
            router,
            gateway,
            audit,
            clock,
            store,
        }
    }

    /// Sends a request and returns the status with the parsed JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Sends a multipart form.
    pub async fn send_multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(multipart_body(fields, image))).unwrap();
        self.dispatch(request).await
    }

    /// Sends a GET and returns the status plus `Location` header.
    pub async fn redirect(&self, uri: &str) -> (StatusCode, Option<String>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let location = response
            .headers()
            .get(LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        (response.status(), location)
    }

    /// Sends a GET and returns the status, content type, and raw bytes.
    pub async fn raw(&self, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, content_type, bytes)
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    // ------------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------------

    /// Signs up a customer and returns its token.
    pub async fn customer_token(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/signup",
                None,
                Some(json!({"name": name, "email": email, "password": "secret-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Creates the admin account and returns its token.
    pub async fn admin_token(&self) -> String {
        let auth = self.server.services().auth.clone();
        tokio::task::spawn_blocking(move || {
            auth.create_admin("Admin", ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
        })
        .await
        .unwrap();
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/signin",
                None,
                Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Creates a category and returns its id.
    pub async fn category(&self, admin: &str, name: &str) -> String {
        let (status, body) = self
            .send_multipart(
                "/api/v1/category/secure/add",
                Some(admin),
                &[("categoryName", name)],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["categoryId"].as_str().unwrap().to_string()
    }

    /// Creates a menu item and returns its id.
    pub async fn item(&self, admin: &str, category_id: &str, name: &str, price: &str) -> String {
        let (status, body) = self
            .send_multipart(
                "/api/v1/menu-item/secure/add",
                Some(admin),
                &[
                    ("itemName", name),
                    ("description", "fresh"),
                    ("price", price),
                    ("categoryId", category_id),
                ],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["itemId"].as_str().unwrap().to_string()
    }

    /// Places an order and returns `(orderId, razorpayOrderId)`.
    pub async fn order(&self, token: &str, lines: Value) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/orders/secure/create",
                Some(token),
                Some(json!({"items": lines, "deliveryAddress": address()})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["data"]["orderId"].as_str().unwrap().to_string(),
            body["data"]["razorpayOrderId"].as_str().unwrap().to_string(),
        )
    }
}

// ============================================================================
// SECTION: Bodies
// ============================================================================

/// A complete delivery address.
pub fn address() -> Value {
    json!({
        "name": "Asha",
        "phone": "9876543210",
        "address": "12 MG Road",
        "city": "Pune",
        "pincode": "411001"
    })
}

/// Encodes text fields and an optional PNG `img` part.
pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"img\"; \
                 filename=\"img.bin\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
