// crates/canteen-api/src/services/auth.rs
// ============================================================================
// Module: Auth Service
// Description: Signup, signin, OAuth account linking, and token validation.
// Purpose: Turn credentials into access tokens and tokens back into users.
// Dependencies: canteen-core, serde
// ============================================================================

//! ## Overview
//! Emails are normalized to lowercase before every lookup. Accounts created
//! through OAuth carry no password and must keep signing in through OAuth.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use canteen_core::CanteenStore;
use canteen_core::Clock;
use canteen_core::OAuthProfile;
use canteen_core::Role;
use canteen_core::SharedCanteenStore;
use canteen_core::StoreError;
use canteen_core::User;
use canteen_core::UserId;
use canteen_core::normalize_email;
use serde::Deserialize;
use serde::Serialize;

use super::ServiceDeps;
use super::ServiceError;
use super::UNAUTHENTICATED_MESSAGE;
use super::non_blank;
use crate::auth::JwtKeys;
use crate::auth::hash_password;
use crate::auth::verify_password;
use crate::cache::CacheNamespace;
use crate::cache::TtlCache;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Signup payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Signin payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    /// Account email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthToken {
    /// Bearer token.
    pub token: String,
    /// Account role.
    pub role: Role,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Account and token service.
#[derive(Clone)]
pub struct AuthService {
    /// Persistence.
    store: SharedCanteenStore,
    /// Token keys.
    tokens: Arc<JwtKeys>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Listing cache.
    cache: Arc<TtlCache>,
    /// Minimum accepted password length.
    min_password_length: usize,
}

impl AuthService {
    /// Builds the service.
    #[must_use]
    pub fn new(deps: &ServiceDeps, min_password_length: usize) -> Self {
        Self {
            store: deps.store.clone(),
            tokens: Arc::clone(&deps.tokens),
            clock: Arc::clone(&deps.clock),
            cache: Arc::clone(&deps.cache),
            min_password_length,
        }
    }

    /// Creates a customer account and returns its token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for invalid input and
    /// [`ServiceError::Conflict`] when the email is taken.
    pub fn signup(&self, request: &SignupRequest) -> Result<AuthToken, ServiceError> {
        let user =
            self.create_account(&request.name, &request.email, &request.password, Role::Customer)?;
        self.token_for(&user)
    }

    /// Checks credentials and returns a token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown emails and
    /// [`ServiceError::BadRequest`] for wrong or missing passwords.
    pub fn signin(&self, request: &SigninRequest) -> Result<AuthToken, ServiceError> {
        let email = normalize_email(&request.email);
        let user = self
            .store
            .user_by_email(&email)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        let Some(stored_hash) = user.password_hash.as_deref() else {
            return Err(ServiceError::BadRequest("Please login using google".to_string()));
        };
        if !verify_password(&request.password, stored_hash) {
            return Err(ServiceError::BadRequest("Invalid Password".to_string()));
        }
        self.token_for(&user)
    }

    /// Finds or creates the customer behind an OAuth profile.
    ///
    /// Simultaneous first logins for one email resolve to a single account.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] when the profile has no email.
    pub fn oauth_login(&self, profile: &OAuthProfile) -> Result<AuthToken, ServiceError> {
        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| email.contains('@'))
            .ok_or_else(|| ServiceError::BadRequest("OAuth profile has no email".to_string()))?;
        if let Some(user) = self.store.user_by_email(&email)? {
            return self.token_for(&user);
        }
        let name = profile
            .name
            .clone()
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let user = User {
            user_id: UserId::generate(),
            name,
            email,
            password_hash: None,
            role: Role::Customer,
            created_at: self.clock.now(),
            updated_at: None,
        };
        let stored = self.store.insert_user_or_existing(&user)?;
        if stored.user_id == user.user_id {
            self.cache.invalidate(CacheNamespace::UserSearch);
        }
        self.token_for(&stored)
    }

    /// Creates an administrator account.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for invalid input and
    /// [`ServiceError::Conflict`] when the email is taken.
    pub fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        self.create_account(name, email, password, Role::Admin)
    }

    /// Resolves a bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] for invalid tokens or
    /// accounts that no longer exist.
    pub fn authenticate(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self.tokens.verify(token, self.clock.now())?;
        let user = self
            .store
            .user_by_email(&claims.sub)?
            .filter(|user| user.user_id == claims.user_id)
            .ok_or_else(|| ServiceError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string()))?;
        Ok(user)
    }

    /// Returns the token subject without touching the store.
    #[must_use]
    pub fn token_subject(&self, token: &str) -> Option<String> {
        self.tokens.verify(token, self.clock.now()).ok().map(|claims| claims.sub)
    }

    /// Validates input and persists a new account.
    fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        let email = normalize_email(non_blank(email, "Email")?);
        if !email.contains('@') {
            return Err(ServiceError::BadRequest("Email is invalid".to_string()));
        }
        let name = non_blank(name, "Name")?.to_string();
        if password.chars().count() < self.min_password_length {
            return Err(ServiceError::BadRequest(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        if self.store.user_by_email(&email)?.is_some() {
            return Err(email_taken());
        }
        let user = User {
            user_id: UserId::generate(),
            name,
            email,
            password_hash: Some(hash_password(password)?),
            role,
            created_at: self.clock.now(),
            updated_at: None,
        };
        self.insert_account(&user)?;
        Ok(user)
    }

    /// Inserts an account and invalidates customer search.
    fn insert_account(&self, user: &User) -> Result<(), ServiceError> {
        self.store.insert_user(user).map_err(|err| match err {
            StoreError::Conflict(_) => email_taken(),
            other => other.into(),
        })?;
        self.cache.invalidate(CacheNamespace::UserSearch);
        Ok(())
    }

    /// Issues a token for `user`.
    fn token_for(&self, user: &User) -> Result<AuthToken, ServiceError> {
        Ok(AuthToken {
            token: self.tokens.issue(user, self.clock.now())?,
            role: user.role,
        })
    }
}

/// Conflict returned for duplicate emails.
fn email_taken() -> ServiceError {
    ServiceError::Conflict("Email Already exists".to_string())
}
