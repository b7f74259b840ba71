// crates/canteen-config/src/config.rs
// ============================================================================
// Module: Canteen Configuration
// Description: Configuration loading and validation for the canteen server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: canteen-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `CANTEEN_CONFIG`, then `canteen.toml`.
//! Missing secrets or malformed endpoints fail validation instead of being
//! defaulted.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use canteen_store_sqlite::SqliteStoreConfig;
use canteen_store_sqlite::SqliteStoreMode;
use canteen_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "canteen.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CANTEEN_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum JWT signing secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;
/// Default request body limit (8 MiB).
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
/// Hard ceiling for the request body limit (64 MiB).
const MAX_BODY_BYTES_CEILING: usize = 64 * 1024 * 1024;
/// Default image size limit (2 MiB).
const DEFAULT_MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
/// Default token lifetime (2 days).
const DEFAULT_TOKEN_TTL_SECS: u64 = 2 * 24 * 60 * 60;
/// Hard ceiling for token lifetime (30 days).
const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Default outbound HTTP timeout.
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
/// Hard ceiling for outbound HTTP timeouts.
const MAX_HTTP_TIMEOUT_MS: u64 = 120_000;
/// Default cache TTL.
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
/// Hard ceiling for cache entry lifetime (1 day).
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
/// Default cache capacity.
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;
/// Default per-line quantity limit.
const DEFAULT_MAX_ITEM_QUANTITY: u32 = 50;
/// Default distinct lines per order.
const DEFAULT_MAX_ORDER_ITEMS: usize = 50;

// ============================================================================
// SECTION: Config Root
// ============================================================================

/// Root configuration for the canteen server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanteenConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token and password configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Payment gateway configuration.
    #[serde(default)]
    pub payments: PaymentsConfig,
    /// Image storage configuration.
    #[serde(default)]
    pub media: MediaConfig,
    /// Listing cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Order placement limits.
    #[serde(default)]
    pub orders: OrdersConfig,
}

impl CanteenConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.store.validate()?;
        self.payments.validate()?;
        self.media.validate()?;
        self.cache.validate()?;
        self.orders.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (`host:port`).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Base URL under which this server is reachable (used for image URLs).
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Frontend URL used for OAuth redirects.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            public_base_url: default_public_base_url(),
            frontend_url: default_frontend_url(),
            cors: CorsConfig::default(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind is invalid: {}", self.bind)))
    }

    /// Returns the public base URL without a trailing slash.
    #[must_use]
    pub fn public_base(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    /// Returns the frontend URL without a trailing slash.
    #[must_use]
    pub fn frontend_base(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes exceeds limit ({MAX_BODY_BYTES_CEILING})"
            )));
        }
        validate_http_url("server.public_base_url", &self.public_base_url)?;
        validate_http_url("server.frontend_url", &self.frontend_url)?;
        self.cors.validate()?;
        self.audit.validate()
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; empty mirrors any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Returns true when any origin is accepted.
    #[must_use]
    pub const fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty()
    }

    /// Validates CORS configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.allowed_origins {
            let parsed = validate_http_url("server.cors.allowed_origins", origin)?;
            if parsed.path() != "/" || parsed.query().is_some() {
                return Err(ConfigError::Invalid(format!(
                    "server.cors.allowed_origins entry must be an origin: {origin}"
                )));
            }
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Auth
// ============================================================================

/// Token and password configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret; also keys OAuth state tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Minimum accepted password length.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Optional Google OAuth configuration.
    #[serde(default)]
    pub google: Option<GoogleOAuthConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            min_password_length: default_min_password_length(),
            google: None,
        }
    }
}

impl AuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }
        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        if self.min_password_length == 0 || self.min_password_length > 128 {
            return Err(ConfigError::Invalid(
                "auth.min_password_length must be between 1 and 128".to_string(),
            ));
        }
        if let Some(google) = &self.google {
            google.validate()?;
        }
        Ok(())
    }
}

/// Google OAuth2 client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleOAuthConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Callback URL registered with Google.
    pub redirect_uri: String,
    /// Authorization endpoint.
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    /// Token endpoint.
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    /// Userinfo endpoint.
    #[serde(default = "default_google_userinfo_url")]
    pub userinfo_url: String,
    /// Outbound request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl GoogleOAuthConfig {
    /// Validates Google OAuth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("auth.google.client_id", &self.client_id)?;
        require_non_empty("auth.google.client_secret", &self.client_secret)?;
        validate_http_url("auth.google.redirect_uri", &self.redirect_uri)?;
        validate_http_url("auth.google.auth_url", &self.auth_url)?;
        validate_http_url("auth.google.token_url", &self.token_url)?;
        validate_http_url("auth.google.userinfo_url", &self.userinfo_url)?;
        validate_timeout("auth.google.timeout_ms", self.timeout_ms)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the equivalent `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_HTTP_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms exceeds limit ({MAX_HTTP_TIMEOUT_MS})"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Payments
// ============================================================================

/// Razorpay gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentsConfig {
    /// API key identifier.
    #[serde(default)]
    pub key_id: String,
    /// API key secret; also keys payment signatures.
    #[serde(default)]
    pub key_secret: String,
    /// API base URL.
    #[serde(default = "default_payments_api_base")]
    pub api_base: String,
    /// ISO currency code for orders.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Outbound request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            api_base: default_payments_api_base(),
            currency: default_currency(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl PaymentsConfig {
    /// Returns the API base URL without a trailing slash.
    #[must_use]
    pub fn api_base_trimmed(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Validates payment configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("payments.key_id", &self.key_id)?;
        require_non_empty("payments.key_secret", &self.key_secret)?;
        validate_http_url("payments.api_base", &self.api_base)?;
        if self.currency.len() != 3 || !self.currency.chars().all(|ch| ch.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid(
                "payments.currency must be a 3-letter uppercase ISO code".to_string(),
            ));
        }
        validate_timeout("payments.timeout_ms", self.timeout_ms)
    }
}

// ============================================================================
// SECTION: Media
// ============================================================================

/// Image storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory holding uploaded images.
    #[serde(default = "default_media_dir")]
    pub dir: PathBuf,
    /// Maximum image size in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl MediaConfig {
    /// Validates media configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("media.dir", &self.dir.to_string_lossy())?;
        if self.max_image_bytes == 0 || self.max_image_bytes > MAX_BODY_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "media.max_image_bytes must be between 1 and {MAX_BODY_BYTES_CEILING}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Listing cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Enable caching; when disabled every lookup misses.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Entry lifetime in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum cached entries across namespaces.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    /// Validates cache configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && (self.ttl_secs == 0 || self.max_entries == 0) {
            return Err(ConfigError::Invalid(
                "cache.ttl_secs and cache.max_entries must be greater than zero".to_string(),
            ));
        }
        if self.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "cache.ttl_secs must be at most {MAX_CACHE_TTL_SECS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Orders
// ============================================================================

/// Order placement limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrdersConfig {
    /// Maximum quantity per order line.
    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: u32,
    /// Maximum distinct lines per order.
    #[serde(default = "default_max_order_items")]
    pub max_items: usize,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            max_item_quantity: default_max_item_quantity(),
            max_items: default_max_order_items(),
        }
    }
}

impl OrdersConfig {
    /// Validates order limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_item_quantity == 0 || self.max_items == 0 {
            return Err(ConfigError::Invalid(
                "orders.max_item_quantity and orders.max_items must be greater than zero"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default public base URL.
fn default_public_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

/// Default frontend URL.
fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default token lifetime.
const fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

/// Default minimum password length.
const fn default_min_password_length() -> usize {
    6
}

/// Google authorization endpoint.
fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

/// Google token endpoint.
fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Google userinfo endpoint.
fn default_google_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

/// Default outbound HTTP timeout.
const fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

/// Default database path.
fn default_store_path() -> PathBuf {
    PathBuf::from("canteen.db")
}

/// Default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Razorpay API base.
fn default_payments_api_base() -> String {
    "https://api.razorpay.com/v1".to_string()
}

/// Default currency.
fn default_currency() -> String {
    "INR".to_string()
}

/// Default media directory.
fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

/// Default image size limit.
const fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

/// Caching is on unless disabled.
const fn default_cache_enabled() -> bool {
    true
}

/// Default cache TTL.
const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Default cache capacity.
const fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

/// Default per-line quantity limit.
const fn default_max_item_quantity() -> u32 {
    DEFAULT_MAX_ITEM_QUANTITY
}

/// Default order line limit.
const fn default_max_order_items() -> usize {
    DEFAULT_MAX_ORDER_ITEMS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Rejects blank strings.
fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Parses an absolute http(s) URL.
fn validate_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must be an http(s) url")));
    }
    Ok(parsed)
}

/// Validates an outbound timeout.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_HTTP_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_HTTP_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        assert!(validate_path_string("test_path", "   ").is_err());
    }

    #[test]
    fn validate_path_string_rejects_component_too_long() {
        let path = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        assert!(validate_path_string("test_path", &path).is_err());
    }

    #[test]
    fn http_url_rejects_other_schemes() {
        assert!(validate_http_url("field", "ftp://example.com").is_err());
        assert!(validate_http_url("field", "not a url").is_err());
        assert!(validate_http_url("field", "https://example.com/v1").is_ok());
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }
}
