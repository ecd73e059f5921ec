//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// User session data
///
/// Stored in a signed cookie. Only binds the token to a user ID;
/// everything else is read from the database per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// ID of the authenticated user
    pub user_id: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` lasting `max_age_seconds`
    pub fn new(user_id: impl Into<String>, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns `Unauthorized` if the signature is invalid, the token is
/// malformed, or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let invalid = || crate::error::AppError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string());

    // 1. Split token into payload and signature
    let (payload_b64, signature_b64) = token.split_once('.').ok_or_else(invalid)?;
    if signature_b64.contains('.') {
        return Err(invalid());
    }

    // 2. Verify HMAC signature (constant-time comparison)
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| invalid())?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| invalid())?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| invalid())?;

    let session: Session = serde_json::from_slice(&payload_bytes).map_err(|_| invalid())?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(invalid());
    }

    Ok(session)
}

/// 401 body when no session token accompanies the request
pub const NO_TOKEN_MESSAGE: &str = "Unauthorized - No Token Provided";
/// 401 body when the session token fails verification
pub const INVALID_TOKEN_MESSAGE: &str = "Unauthorized - Invalid Token";

/// Session cookie carrying `token`
///
/// HttpOnly and SameSite=Strict always; Secure unless the server runs on a
/// local development host.
pub fn build_session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((config.auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.should_use_secure_cookies())
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(config.auth.session_max_age))
        .build()
}

/// Session cookie overwritten with an empty value and `Max-Age=0`
pub fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.auth.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .secure(config.should_use_secure_cookies())
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();
    cookie
}
