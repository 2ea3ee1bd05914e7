//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Browser session data
///
/// Carries the pending OAuth state between the authorize and callback
/// requests, plus one-shot messages for the landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// CSRF state of the in-flight authorization (last write wins)
    #[serde(default)]
    pub oauth2_state: Option<String>,
    /// Messages shown once on the next landing page render
    #[serde(default)]
    pub flashes: Vec<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session
    pub fn new(max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            oauth2_state: None,
            flashes: Vec::new(),
            created_at: now,
            expires_at: Duration::try_seconds(max_age_seconds)
                .and_then(|max_age| now.checked_add_signed(max_age))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Queue a message for the landing page
    pub fn flash(&mut self, message: impl Into<String>) {
        self.flashes.push(message.into());
    }

    /// Remove and return all queued messages
    pub fn take_flashes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.flashes)
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
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns `AppError::Unauthorized` if the signature is invalid, the token
/// is malformed or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

/// Read the session from the request cookies
///
/// A missing, tampered or expired cookie yields a fresh session.
pub fn load_session(jar: &CookieJar, config: &AppConfig) -> Session {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| verify_session_token(cookie.value(), &config.auth.session_secret).ok())
        .unwrap_or_else(|| Session::new(config.auth.session_max_age))
}

/// Write the session back as a signed cookie
pub fn save_session(
    jar: CookieJar,
    session: &Session,
    config: &AppConfig,
) -> Result<CookieJar, AppError> {
    let token = create_session_token(session, &config.auth.session_secret)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.should_use_secure_cookies());
    Ok(jar.add(cookie))
}

/// Drop the session cookie
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
