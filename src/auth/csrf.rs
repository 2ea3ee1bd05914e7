//! Anti-forgery state tokens for the authorization redirect

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::error::AppError;

/// Random bytes per state token
const STATE_TOKEN_BYTES: usize = 32;

/// Generate a random CSRF state token (URL-safe base64, no padding)
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify the state returned by the provider against the one stored in
/// the session
///
/// # Errors
/// Returns `AppError::Unauthorized` if either is missing or they differ
pub fn verify_state(stored: Option<&str>, returned: Option<&str>) -> Result<(), AppError> {
    match (stored, returned) {
        (Some(stored), Some(returned)) if !stored.is_empty() && stored == returned => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tokens_are_url_safe_and_unique() {
        let a = generate_state_token();
        let b = generate_state_token();

        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(a, b);
    }

    #[test]
    fn matching_state_is_accepted() {
        assert!(verify_state(Some("abc123"), Some("abc123")).is_ok());
    }

    #[test]
    fn mismatched_or_missing_state_is_rejected() {
        assert!(matches!(
            verify_state(Some("abc123"), Some("xyz999")),
            Err(AppError::Unauthorized)
        ));
        assert!(verify_state(Some("abc123"), None).is_err());
        assert!(verify_state(None, Some("abc123")).is_err());
        assert!(verify_state(None, None).is_err());
        assert!(verify_state(Some(""), Some("")).is_err());
    }
}
