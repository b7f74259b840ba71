// crates/canteen-api/src/auth.rs
// ============================================================================
// Module: Tokens and Passwords
// Description: HS256 access tokens and Argon2id password hashing.
// Purpose: Issue and validate bearer tokens without external identity services.
// Dependencies: argon2, base64, hmac, sha2, serde_json
// ============================================================================

//! ## Overview
//! Access tokens are compact JWS strings signed with HMAC-SHA256. Validation
//! is fail-closed: a token must have exactly three segments, declare `HS256`,
//! carry a matching MAC (checked in constant time), and be unexpired.
//!
//! Passwords are stored as Argon2id PHC strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordHasher;
use argon2::PasswordVerifier;
use argon2::password_hash::SaltString;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use canteen_core::Role;
use canteen_core::User;
use canteen_core::UserId;
use hmac::Hmac;
use hmac::Mac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Only accepted signing algorithm.
const JWT_ALG: &str = "HS256";
/// Upper bound on accepted token length.
const MAX_TOKEN_BYTES: usize = 8 * 1024;
/// Salt length for password hashes.
const SALT_BYTES: usize = 16;

/// HMAC-SHA256 keyed hasher.
pub(crate) type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Token and password errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Token is past its expiry.
    #[error("token expired")]
    Expired,
    /// Signing key could not be used.
    #[error("signing key error: {0}")]
    Key(String),
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Password(String),
}

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the account email).
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Account role.
    pub role: Role,
    /// Account identifier.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// JOSE header.
#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    /// Signing algorithm.
    alg: String,
    /// Token type.
    #[serde(default)]
    typ: Option<String>,
}

// ============================================================================
// SECTION: Token Keys
// ============================================================================

/// HS256 signing key and token lifetime.
pub struct JwtKeys {
    /// Shared signing secret.
    secret: Vec<u8>,
    /// Token lifetime in seconds.
    ttl_secs: i64,
}

impl JwtKeys {
    /// Builds keys from a secret and a lifetime.
    #[must_use]
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            secret: secret.to_vec(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issues a token for `user` valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when encoding or signing fails.
    pub fn issue(&self, user: &User, now: OffsetDateTime) -> Result<String, AuthError> {
        let iat = now.unix_timestamp();
        let claims = Claims {
            sub: user.email.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            user_id: user.user_id.clone(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        let header = JwtHeader {
            alg: JWT_ALG.to_string(),
            typ: Some("JWT".to_string()),
        };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = self.sign(signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Validates a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for malformed or forged tokens and
    /// [`AuthError::Expired`] once `exp` has passed.
    pub fn verify(&self, token: &str, now: OffsetDateTime) -> Result<Claims, AuthError> {
        if token.len() > MAX_TOKEN_BYTES {
            return Err(AuthError::InvalidToken("token too large".to_string()));
        }
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(AuthError::InvalidToken("expected three segments".to_string()));
        };
        let parsed_header: JwtHeader = decode_segment(header)?;
        if parsed_header.alg != JWT_ALG {
            return Err(AuthError::InvalidToken("unsupported algorithm".to_string()));
        }
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken("signature encoding".to_string()))?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken("signature mismatch".to_string()))?;
        let claims: Claims = decode_segment(payload)?;
        if claims.exp <= now.unix_timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Computes the MAC over `input`.
    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, AuthError> {
        let mut mac = self.mac()?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Returns a fresh keyed MAC.
    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|err| AuthError::Key(err.to_string()))
    }
}

/// Extracts the token from an `Authorization: Bearer` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

// ============================================================================
// SECTION: Passwords
// ============================================================================

/// Hashes a password into an Argon2id PHC string.
///
/// # Errors
///
/// Returns [`AuthError::Password`] when hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|err| AuthError::Password(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Password(err.to_string()))
}

/// Checks a password against a stored PHC string.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a value as an unpadded base64url JSON segment.
fn encode_segment(value: &impl Serialize) -> Result<String, AuthError> {
    let json =
        serde_json::to_vec(value).map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes an unpadded base64url JSON segment.
fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken("segment encoding".to_string()))?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken("segment json".to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
