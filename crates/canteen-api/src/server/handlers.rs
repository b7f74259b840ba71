// crates/canteen-api/src/server/handlers.rs
// ============================================================================
// Module: HTTP Handlers
// Description: Route handlers for the canteen HTTP API.
// Purpose: Decode requests, call services off the async workers, and wrap
//          results in envelopes.
// Dependencies: axum, serde, url
// ============================================================================

//! ## Overview
//! Handlers stay thin: they decode input, move a cloned service into
//! [`run_blocking`], and pick the success message. Business rules live in
//! [`crate::services`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use axum::Json;
use axum::extract::Multipart;
use axum::extract::State;
use axum::extract::multipart::MultipartRejection;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use axum::response::IntoResponse;
use axum::response::Response;
use canteen_core::CartEntryId;
use canteen_core::CartView;
use canteen_core::Category;
use canteen_core::CategoryId;
use canteen_core::ImageStore;
use canteen_core::MenuFilter;
use canteen_core::MenuItem;
use canteen_core::MenuItemId;
use canteen_core::MenuItemWithCart;
use canteen_core::Money;
use canteen_core::Order;
use canteen_core::OrderId;
use canteen_core::OrderWithUser;
use canteen_core::Page;
use canteen_core::PageRequest;
use canteen_core::UserDto;
use canteen_core::UserId;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use url::form_urlencoded;

use super::AppState;
use super::response::AdminUser;
use super::response::ApiError;
use super::response::ApiJson;
use super::response::ApiPath;
use super::response::ApiQuery;
use super::response::ApiResult;
use super::response::ApiSuccess;
use super::response::AuthUser;
use super::run_blocking;
use crate::audit::AuthDecisionEvent;
use crate::services::AuthToken;
use crate::services::CreateOrderRequest;
use crate::services::CreatedOrder;
use crate::services::DashboardSummary;
use crate::services::ImageUpload;
use crate::services::ItemUpdate;
use crate::services::MonthlyIncome;
use crate::services::NewCategory;
use crate::services::NewMenuItem;
use crate::services::OrderStats;
use crate::services::PaymentVerification;
use crate::services::ServiceError;
use crate::services::SigninRequest;
use crate::services::SignupRequest;
use crate::services::TopItem;
use crate::services::VerifyPaymentRequest;

// ============================================================================
// SECTION: Query Types
// ============================================================================

/// Search and paging parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageQuery {
    /// Prefix search.
    q: Option<String>,
    /// Zero-based page.
    page: Option<u32>,
    /// Page size.
    limit: Option<u32>,
}

impl PageQuery {
    /// Returns the normalized page request.
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Menu listing parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct MenuQuery {
    /// Item name prefix.
    q: Option<String>,
    /// Category id.
    category: Option<String>,
    /// Inclusive lower price bound, in rupees.
    min_price: Option<f64>,
    /// Inclusive upper price bound, in rupees.
    max_price: Option<f64>,
    /// Zero-based page.
    page: Option<u32>,
    /// Page size.
    limit: Option<u32>,
    /// User whose cart drives the `saved` flag.
    user_id: Option<String>,
}

impl MenuQuery {
    /// Builds the service filter.
    fn filter(&self) -> Result<MenuFilter, ApiError> {
        Ok(MenuFilter {
            query: self.q.clone(),
            category_id: self.category.as_deref().map(CategoryId::new),
            min_price: self.min_price.map(Money::from_rupees).transpose().map_err(price_error)?,
            max_price: self.max_price.map(Money::from_rupees).transpose().map_err(price_error)?,
        })
    }

    /// Returns the user id, if any.
    fn user(&self) -> Option<UserId> {
        self.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty()).map(UserId::new)
    }
}

/// `userId` parameter for single-item lookups.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct UserQuery {
    /// User whose cart drives the `saved` flag.
    user_id: Option<String>,
}

/// Cart add parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartAddQuery {
    /// Menu item id.
    item_id: String,
}

/// Cart quantity parameters.
#[derive(Debug, Deserialize)]
pub(crate) struct QuantityQuery {
    /// New quantity.
    quantity: u32,
}

/// Cart remove parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartRemoveQuery {
    /// Cart entry id.
    cart_id: String,
}

/// Admin order listing parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AdminOrdersQuery {
    /// Status filter.
    status: Option<String>,
    /// Zero-based page.
    page: Option<u32>,
    /// Page size.
    limit: Option<u32>,
}

/// Order status update parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusUpdateQuery {
    /// Order id.
    order_id: String,
    /// New status label.
    status: String,
}

/// Income history parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct IncomeQuery {
    /// Number of months.
    months: Option<u32>,
}

/// Default income history length.
const DEFAULT_INCOME_MONTHS: u32 = 6;

/// OAuth callback parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct OAuthCallbackQuery {
    /// Authorization code.
    code: Option<String>,
    /// State token.
    state: Option<String>,
}

/// Menu item update body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct UpdateItemBody {
    /// New description.
    description: Option<String>,
    /// New price in rupees.
    price: Option<Money>,
    /// New availability, as a boolean or `"true"`/`"false"`.
    is_available: Option<AvailabilityFlag>,
}

/// Availability sent either as a JSON boolean or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AvailabilityFlag {
    /// JSON boolean.
    Bool(bool),
    /// String form.
    Text(String),
}

impl AvailabilityFlag {
    /// Resolves the flag.
    fn resolve(&self) -> Result<bool, ApiError> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ApiError::bad_request("isAvailable must be true or false")),
            },
        }
    }
}

// ============================================================================
// SECTION: Health and Media
// ============================================================================

/// Liveness check.
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves a stored image.
pub(crate) async fn media(
    State(state): State<AppState>,
    ApiPath(file): ApiPath<String>,
) -> Result<Response, ApiError> {
    let images = state.images.clone();
    let blob = run_blocking(move || images.get(&file).map_err(ServiceError::from)).await?;
    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static(blob.content_type)),
        (CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
    ];
    Ok((headers, blob.bytes).into_response())
}

// ============================================================================
// SECTION: Auth
// ============================================================================

/// `POST /api/v1/auth/signup`.
pub(crate) async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<AuthToken> {
    let auth = state.services.auth.clone();
    let token = run_blocking(move || auth.signup(&request)).await?;
    Ok(ApiSuccess::new("User Signup Successfully", token))
}

/// `POST /api/v1/auth/signin`.
pub(crate) async fn signin(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SigninRequest>,
) -> ApiResult<AuthToken> {
    let auth = state.services.auth.clone();
    let token = run_blocking(move || auth.signin(&request)).await?;
    Ok(ApiSuccess::new("User Signin Successfully", token))
}

/// `GET /oauth2/authorization/google`: redirects to the consent screen.
pub(crate) async fn oauth_authorize(State(state): State<AppState>) -> Result<Response, ApiError> {
    let flow = state.oauth.clone().ok_or_else(|| ApiError::not_found("OAuth is not configured"))?;
    let state_token = flow
        .states
        .issue(state.clock.now())
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(found(&flow.provider.authorization_url(&state_token)))
}

/// `GET /login/oauth2/code/google`: completes the flow and redirects to the
/// frontend with a token.
pub(crate) async fn oauth_callback(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OAuthCallbackQuery>,
) -> Result<Response, ApiError> {
    let flow = state.oauth.clone().ok_or_else(|| ApiError::not_found("OAuth is not configured"))?;
    let frontend = state.frontend_url.clone();
    let failure = |reason: &'static str| {
        let event = AuthDecisionEvent::new(
            false,
            reason,
            "oauth",
            "/login/oauth2/code/google".to_string(),
            None,
        );
        state.audit.record_auth(&event);
        found(&format!("{frontend}/login?error={reason}"))
    };
    let (Some(code), Some(state_token)) = (query.code, query.state) else {
        return Ok(failure("oauth_failed"));
    };
    if flow.states.verify(&state_token, state.clock.now()).is_err() {
        return Ok(failure("oauth_failed"));
    }
    let provider = flow.provider.clone();
    let Ok(profile) = run_blocking(move || {
        provider.exchange(&code).map_err(|err| ServiceError::Gateway(err.to_string()))
    })
    .await
    else {
        return Ok(failure("oauth_failed"));
    };
    if profile.email.as_deref().is_none_or(|email| email.trim().is_empty()) {
        return Ok(failure("missing_email"));
    }
    let auth = state.services.auth.clone();
    let token = run_blocking(move || auth.oauth_login(&profile)).await?;
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", &token.token)
        .append_pair("role", token.role.as_str())
        .finish();
    Ok(found(&format!("{frontend}/auth/oauth2/success?{query}")))
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// `GET /api/v1/user/secure/auth/profile`.
pub(crate) async fn profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<UserDto> {
    Ok(ApiSuccess::new("Profile Data", state.services.users.profile(&user)))
}

/// `GET /api/v1/user/secure/`.
pub(crate) async fn list_customers(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<UserDto>> {
    let users = state.services.users.clone();
    let page = query.page_request();
    let result = run_blocking(move || users.list_customers(query.q.as_deref(), page)).await?;
    Ok(ApiSuccess::new("Users Data", result))
}

// ============================================================================
// SECTION: Categories
// ============================================================================

/// `POST /api/v1/category/secure/add` (multipart `categoryName`, `img`).
pub(crate) async fn add_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Category> {
    let mut form = read_form(multipart?).await?;
    let input = NewCategory {
        name: form.text("categoryName"),
        image: form.image.take(),
    };
    let catalog = state.services.catalog.clone();
    let category = run_blocking(move || catalog.add_category(input)).await?;
    Ok(ApiSuccess::new("New Category Added", category))
}

/// `GET /api/v1/category/public/`.
pub(crate) async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<Category>> {
    let catalog = state.services.catalog.clone();
    let page = query.page_request();
    let result = run_blocking(move || catalog.list_categories(query.q.as_deref(), page)).await?;
    Ok(ApiSuccess::new("Categories", result))
}

/// `DELETE /api/v1/category/secure/{id}`.
pub(crate) async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<()> {
    let catalog = state.services.catalog.clone();
    run_blocking(move || catalog.delete_category(&CategoryId::new(id))).await?;
    Ok(ApiSuccess::empty("Category Deleted Successfully"))
}

// ============================================================================
// SECTION: Menu Items
// ============================================================================

/// `POST /api/v1/menu-item/secure/add` (multipart).
pub(crate) async fn add_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<MenuItem> {
    let mut form = read_form(multipart?).await?;
    let price_text = form.text("price");
    let price = price_text
        .trim()
        .parse::<f64>()
        .map_err(|_| ApiError::bad_request("price is invalid"))
        .and_then(|rupees| Money::from_rupees(rupees).map_err(price_error))?;
    let input = NewMenuItem {
        name: form.text("itemName"),
        description: form.text("description"),
        price,
        category_id: CategoryId::new(form.text("categoryId").trim()),
        image: form.image.take(),
    };
    let catalog = state.services.catalog.clone();
    let item = run_blocking(move || catalog.add_item(input)).await?;
    Ok(ApiSuccess::new("New Item added to menu", item))
}

/// `GET /api/v1/menu-item/public/`.
pub(crate) async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MenuQuery>,
) -> ApiResult<Page<MenuItem>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    let catalog = state.services.catalog.clone();
    let result = run_blocking(move || catalog.list_items(&filter, page)).await?;
    Ok(ApiSuccess::new("Menu Item", result))
}

/// `GET /api/v1/menu-item/public/user/`.
pub(crate) async fn list_items_for_user(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MenuQuery>,
) -> ApiResult<Page<MenuItemWithCart>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    let user = query.user();
    let catalog = state.services.catalog.clone();
    let result =
        run_blocking(move || catalog.list_items_for_user(user.as_ref(), &filter, page)).await?;
    Ok(ApiSuccess::new("Menu Item", result))
}

/// `GET /api/v1/menu-item/public/user/{id}`.
pub(crate) async fn get_item_for_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<MenuItemWithCart> {
    let user = query.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty()).map(UserId::new);
    let catalog = state.services.catalog.clone();
    let item =
        run_blocking(move || catalog.get_item_for_user(&MenuItemId::new(id), user.as_ref()))
            .await?;
    Ok(ApiSuccess::new("Menu Item", item))
}

/// `GET /api/v1/menu-item/public/{id}`.
pub(crate) async fn get_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<MenuItem> {
    let catalog = state.services.catalog.clone();
    let item = run_blocking(move || catalog.get_item(&MenuItemId::new(id))).await?;
    Ok(ApiSuccess::new("Menu Item", item))
}

/// `GET /api/v1/menu-item/public/category/{id}`.
pub(crate) async fn items_by_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Vec<MenuItem>> {
    let catalog = state.services.catalog.clone();
    let items = run_blocking(move || catalog.items_by_category(&CategoryId::new(id))).await?;
    Ok(ApiSuccess::new("Menu Item", items))
}

/// `PUT /api/v1/menu-item/secure/{id}`.
pub(crate) async fn update_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateItemBody>,
) -> ApiResult<MenuItem> {
    let update = ItemUpdate {
        description: body.description,
        price: body.price,
        is_available: body.is_available.as_ref().map(AvailabilityFlag::resolve).transpose()?,
    };
    let catalog = state.services.catalog.clone();
    let item = run_blocking(move || catalog.update_item(&MenuItemId::new(id), update)).await?;
    Ok(ApiSuccess::new("Menu Item updated successfully", item))
}

/// `DELETE /api/v1/menu-item/secure/{id}`.
pub(crate) async fn delete_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<()> {
    let catalog = state.services.catalog.clone();
    run_blocking(move || catalog.delete_item(&MenuItemId::new(id))).await?;
    Ok(ApiSuccess::empty("Menu Item deleted successfully"))
}

// ============================================================================
// SECTION: Cart
// ============================================================================

/// `POST /api/v1/cart/secure/add?itemId=`.
pub(crate) async fn cart_add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<CartAddQuery>,
) -> ApiResult<CartView> {
    let cart = state.services.cart.clone();
    let view = run_blocking(move || cart.add(&user, &MenuItemId::new(query.item_id))).await?;
    Ok(ApiSuccess::new("Added to cart", view))
}

/// `PUT /api/v1/cart/secure/{id}/quantity?quantity=`.
pub(crate) async fn cart_quantity(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<QuantityQuery>,
) -> ApiResult<CartView> {
    let cart = state.services.cart.clone();
    let view = run_blocking(move || {
        cart.update_quantity(&user, &CartEntryId::new(id), query.quantity)
    })
    .await?;
    Ok(ApiSuccess::new("Cart Quantity updated", view))
}

/// `DELETE /api/v1/cart/secure/remove?cartId=`.
pub(crate) async fn cart_remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<CartRemoveQuery>,
) -> ApiResult<()> {
    let cart = state.services.cart.clone();
    run_blocking(move || cart.remove(&user, &CartEntryId::new(query.cart_id))).await?;
    Ok(ApiSuccess::empty("Delete from cart"))
}

/// `GET /api/v1/cart/secure/`.
pub(crate) async fn cart_items(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Vec<CartView>> {
    let cart = state.services.cart.clone();
    let items = run_blocking(move || cart.items(&user)).await?;
    Ok(ApiSuccess::new("Cart Data", items))
}

// ============================================================================
// SECTION: Orders
// ============================================================================

/// `POST /api/v1/orders/secure/create`.
pub(crate) async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> ApiResult<CreatedOrder> {
    let orders = state.services.orders.clone();
    let created = run_blocking(move || orders.create(&user, &request)).await?;
    Ok(ApiSuccess::new("New Order Created", created))
}

/// `GET /api/v1/orders/secure/all`.
pub(crate) async fn my_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<Order>> {
    let orders = state.services.orders.clone();
    let page = query.page_request();
    let result = run_blocking(move || orders.list_for_user(&user, page)).await?;
    Ok(ApiSuccess::new("Orders", result))
}

/// `GET /api/v1/orders/secure/admin/all`.
pub(crate) async fn admin_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<AdminOrdersQuery>,
) -> ApiResult<Page<OrderWithUser>> {
    let orders = state.services.orders.clone();
    let page = PageRequest::new(query.page, query.limit);
    let result = run_blocking(move || orders.list_admin(query.status.as_deref(), page)).await?;
    Ok(ApiSuccess::new("Orders", result))
}

/// `GET /api/v1/orders/secure/stats`.
pub(crate) async fn order_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<OrderStats> {
    let orders = state.services.orders.clone();
    let stats = run_blocking(move || orders.stats()).await?;
    Ok(ApiSuccess::new("Order Stats", stats))
}

/// `PUT /api/v1/orders/secure/?orderId=&status=`.
pub(crate) async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<StatusUpdateQuery>,
) -> ApiResult<Order> {
    let orders = state.services.orders.clone();
    let order = run_blocking(move || {
        orders.update_status(&OrderId::new(query.order_id), &query.status)
    })
    .await?;
    Ok(ApiSuccess::new("Order status updated", order))
}

/// `GET /api/v1/orders/secure/{id}`.
pub(crate) async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Order> {
    let orders = state.services.orders.clone();
    let order = run_blocking(move || orders.get(&user, &OrderId::new(id))).await?;
    Ok(ApiSuccess::new("Order data", order))
}

/// `DELETE /api/v1/orders/secure/{id}/cancel`.
pub(crate) async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Order> {
    let orders = state.services.orders.clone();
    let order = run_blocking(move || orders.cancel(&user, &OrderId::new(id))).await?;
    Ok(ApiSuccess::new("Order canceled", order))
}

// ============================================================================
// SECTION: Payments
// ============================================================================

/// `POST /api/v1/payments/secure/verify`.
pub(crate) async fn verify_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<VerifyPaymentRequest>,
) -> ApiResult<PaymentVerification> {
    let payments = state.services.payments.clone();
    let outcome = run_blocking(move || payments.verify(&user, &request)).await?;
    let message =
        if outcome.verified { "Payment verified" } else { "Payment verification failed" };
    Ok(ApiSuccess::new(message, outcome))
}

// ============================================================================
// SECTION: Dashboard
// ============================================================================

/// `GET /api/v1/dashboard/public/stats1`.
pub(crate) async fn dashboard_summary(
    State(state): State<AppState>,
) -> ApiResult<DashboardSummary> {
    let dashboard = state.services.dashboard.clone();
    let summary = run_blocking(move || dashboard.summary()).await?;
    Ok(ApiSuccess::new("Dashboard Stats", summary))
}

/// `GET /api/v1/dashboard/secure/income?months=`.
pub(crate) async fn dashboard_income(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<IncomeQuery>,
) -> ApiResult<Vec<MonthlyIncome>> {
    let months = query.months.unwrap_or(DEFAULT_INCOME_MONTHS);
    let dashboard = state.services.dashboard.clone();
    let income = run_blocking(move || dashboard.income_by_months(months)).await?;
    Ok(ApiSuccess::new("Income By Months", income))
}

/// `GET /api/v1/dashboard/secure/top-items`.
pub(crate) async fn dashboard_top_items(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<TopItem>> {
    let dashboard = state.services.dashboard.clone();
    let items = run_blocking(move || dashboard.top_items()).await?;
    Ok(ApiSuccess::new("Top Items", items))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decoded multipart form: text fields plus the optional `img` upload.
struct MultipartForm {
    /// Text fields by name.
    texts: HashMap<String, String>,
    /// Image upload.
    image: Option<ImageUpload>,
}

impl MultipartForm {
    /// Returns a text field, empty when absent.
    fn text(&mut self, name: &str) -> String {
        self.texts.remove(name).unwrap_or_default()
    }
}

/// Reads every multipart field into memory.
async fn read_form(mut multipart: Multipart) -> Result<MultipartForm, ApiError> {
    let mut texts = HashMap::new();
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "img" {
            let content_type =
                field.content_type().unwrap_or("application/octet-stream").to_string();
            let bytes = field.bytes().await?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
        } else {
            let value = field.text().await?;
            texts.insert(name, value);
        }
    }
    Ok(MultipartForm {
        texts,
        image,
    })
}

/// 302 redirect.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => ApiError::internal("redirect location is not a valid header").into_response(),
    }
}

/// Maps a price conversion failure.
fn price_error(error: canteen_core::MoneyError) -> ApiError {
    ApiError::bad_request(format!("price is invalid: {error}"))
}
