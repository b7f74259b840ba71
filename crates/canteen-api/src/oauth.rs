// crates/canteen-api/src/oauth.rs
// ============================================================================
// Module: Google OAuth2
// Description: Authorization-code flow client and stateless state tokens.
// Purpose: Sign customers in with a Google account.
// Dependencies: reqwest, url, hmac, base64
// ============================================================================

//! ## Overview
//! [`GoogleOAuthProvider`] builds the consent URL, exchanges the returned code
//! for an access token, and reads the userinfo profile. The `state` parameter
//! is a stateless token, `nonce.expiry.mac`, keyed by the server secret, so no
//! session storage is needed to reject forged callbacks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use canteen_config::GoogleOAuthConfig;
use canteen_core::OAuthError;
use canteen_core::OAuthProfile;
use canteen_core::OAuthProvider;
use hmac::Mac;
use rand::RngCore;
use rand::rngs::OsRng;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;
use url::form_urlencoded;

use crate::auth::AuthError;
use crate::auth::HmacSha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Requested scopes.
const OAUTH_SCOPE: &str = "openid email profile";
/// State token lifetime.
pub const STATE_TTL_SECS: i64 = 10 * 60;
/// Nonce length in bytes.
const NONCE_BYTES: usize = 16;

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// Bearer token for the userinfo endpoint.
    access_token: Option<String>,
}

/// Userinfo endpoint response.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    /// Account email.
    email: Option<String>,
    /// Display name.
    name: Option<String>,
}

/// Google OAuth2 client.
pub struct GoogleOAuthProvider {
    /// Blocking HTTP client.
    client: Client,
    /// Parsed authorization endpoint.
    auth_url: Url,
    /// Provider configuration.
    config: GoogleOAuthConfig,
}

impl GoogleOAuthProvider {
    /// Builds a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Transport`] when the client cannot be built and
    /// [`OAuthError::InvalidResponse`] when the authorization URL is invalid.
    pub fn new(config: &GoogleOAuthConfig) -> Result<Self, OAuthError> {
        let auth_url = Url::parse(&config.auth_url)
            .map_err(|err| OAuthError::InvalidResponse(format!("auth_url: {err}")))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .build()
            .map_err(|_| OAuthError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            client,
            auth_url,
            config: config.clone(),
        })
    }

    /// Exchanges an authorization code for an access token.
    fn access_token(&self, code: &str) -> Result<String, OAuthError> {
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("code", code)
            .append_pair("client_id", &self.config.client_id)
            .append_pair("client_secret", &self.config.client_secret)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("grant_type", "authorization_code")
            .finish();
        let response = self
            .client
            .post(&self.config.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(form)
            .send()
            .map_err(|_| OAuthError::Transport("token endpoint unreachable".to_string()))?;
        if !response.status().is_success() {
            return Err(OAuthError::Rejected(format!(
                "token endpoint returned {}",
                response.status().as_u16()
            )));
        }
        let parsed: TokenResponse = response
            .json()
            .map_err(|_| OAuthError::InvalidResponse("token response is not json".to_string()))?;
        parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| OAuthError::InvalidResponse("token response missing access_token".into()))
    }
}

impl OAuthProvider for GoogleOAuthProvider {
    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", OAUTH_SCOPE)
            .append_pair("state", state);
        url.into()
    }

    fn exchange(&self, code: &str) -> Result<OAuthProfile, OAuthError> {
        let access_token = self.access_token(code)?;
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|_| OAuthError::Transport("userinfo endpoint unreachable".to_string()))?;
        if !response.status().is_success() {
            return Err(OAuthError::Rejected(format!(
                "userinfo endpoint returned {}",
                response.status().as_u16()
            )));
        }
        let info: UserInfoResponse = response
            .json()
            .map_err(|_| OAuthError::InvalidResponse("userinfo response is not json".to_string()))?;
        Ok(OAuthProfile {
            email: info.email.filter(|email| !email.trim().is_empty()),
            name: info.name.filter(|name| !name.trim().is_empty()),
        })
    }
}

// ============================================================================
// SECTION: State Tokens
// ============================================================================

/// Issues and checks OAuth `state` tokens.
pub struct OAuthStateSigner {
    /// MAC key.
    key: Vec<u8>,
}

impl OAuthStateSigner {
    /// Builds a signer keyed by `key`.
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
        }
    }

    /// Issues a state token expiring [`STATE_TTL_SECS`] after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Key`] when the key cannot be used.
    pub fn issue(&self, now: OffsetDateTime) -> Result<String, AuthError> {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);
        let body = format!("{}.{}", hex::encode(nonce), now.unix_timestamp() + STATE_TTL_SECS);
        let mac = self.mac(&body)?;
        Ok(format!("{body}.{mac}"))
    }

    /// Checks a state token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for malformed or forged tokens and
    /// [`AuthError::Expired`] once expired.
    pub fn verify(&self, state: &str, now: OffsetDateTime) -> Result<(), AuthError> {
        let mut segments = state.split('.');
        let (Some(nonce), Some(expiry), Some(mac), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(AuthError::InvalidToken("malformed state".to_string()));
        };
        let signature = URL_SAFE_NO_PAD
            .decode(mac)
            .map_err(|_| AuthError::InvalidToken("state encoding".to_string()))?;
        let mut verifier = HmacSha256::new_from_slice(&self.key)
            .map_err(|err| AuthError::Key(err.to_string()))?;
        verifier.update(nonce.as_bytes());
        verifier.update(b".");
        verifier.update(expiry.as_bytes());
        verifier
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken("state signature mismatch".to_string()))?;
        let expires_at: i64 = expiry
            .parse()
            .map_err(|_| AuthError::InvalidToken("state expiry".to_string()))?;
        if expires_at <= now.unix_timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(())
    }

    /// Returns the encoded MAC over `body`.
    fn mac(&self, body: &str) -> Result<String, AuthError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|err| AuthError::Key(err.to_string()))?;
        mac.update(body.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use time::Duration;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn state_token_round_trip_and_expiry() {
        let signer = OAuthStateSigner::new(b"state-key-state-key-state-key-32");
        let now = datetime!(2024-07-01 09:00 UTC);
        let state = signer.issue(now).unwrap();
        assert!(signer.verify(&state, now + Duration::minutes(9)).is_ok());
        assert_eq!(signer.verify(&state, now + Duration::minutes(10)), Err(AuthError::Expired));
    }

    #[test]
    fn state_token_rejects_tampering() {
        let signer = OAuthStateSigner::new(b"state-key-state-key-state-key-32");
        let now = datetime!(2024-07-01 09:00 UTC);
        let state = signer.issue(now).unwrap();
        let extended = (now.unix_timestamp() + 86_400).to_string();
        let mut parts: Vec<&str> = state.split('.').collect();
        parts[1] = &extended;
        assert!(signer.verify(&parts.join("."), now).is_err());
        let other = OAuthStateSigner::new(b"another-key-another-key-another!");
        assert!(other.verify(&state, now).is_err());
        assert!(signer.verify("garbage", now).is_err());
    }

    #[test]
    fn authorization_url_carries_flow_parameters() {
        let config = GoogleOAuthConfig {
            client_id: "client-1".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://127.0.0.1:8080/login/oauth2/code/google".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            timeout_ms: 1_000,
        };
        let provider = GoogleOAuthProvider::new(&config).unwrap();
        let url = Url::parse(&provider.authorization_url("st.ate.mac")).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), OAUTH_SCOPE.to_string())));
        assert!(pairs.contains(&("state".to_string(), "st.ate.mac".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), "client-1".to_string())));
    }
}
