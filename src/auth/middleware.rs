//! Bearer token authentication
//!
//! Protects API routes with the JWT issued at the end of a login.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use super::jwt::Claims;
use crate::AppState;
use crate::error::AppError;

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for the authenticated caller
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(claims): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", claims.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| AppError::Unauthorized)?;

        Ok(CurrentUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::{HeaderValue, Request};

    use crate::data::{MemoryStore, User};

    fn state() -> AppState {
        AppState::with_store(
            crate::config::tests::valid_config(),
            Arc::new(MemoryStore::new()),
        )
        .unwrap()
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut request = Request::builder().uri("/api/me");
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        request.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_bearer_token_yields_claims() {
        let state = state();
        let token = state
            .tokens
            .issue(&User {
                id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
                email: "a@example.com".to_string(),
            })
            .unwrap();

        let mut parts = parts(Some(&format!("Bearer {token}")));
        let CurrentUser(claims) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(claims.email, "a@example.com");
    }

    #[tokio::test]
    async fn claims_in_extensions_do_not_authenticate() {
        let state = state();
        let mut parts = parts(None);
        parts.extensions.insert(Claims {
            sub: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            email: "a@example.com".to_string(),
            iss: "loginbridge".to_string(),
            iat: 0,
            exp: i64::MAX,
        });

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
