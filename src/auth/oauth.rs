//! OAuth 2.0 authorization code flow
//!
//! Browser-facing half of the flow: redirect to the provider, validate
//! the callback, and hand the code to [`crate::service::LoginService`].

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;

use super::csrf::{generate_state_token, verify_state};
use super::provider::ProviderConfig;
use super::session::{Session, clear_session, load_session, save_session};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::LOGIN_ATTEMPTS_TOTAL;

/// Where every finished or aborted flow lands
const LANDING_PAGE: &str = "/";

/// Create authentication router
///
/// Routes:
/// - GET /authorize/{provider} - Redirect to provider
/// - GET /callback/{provider} - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/authorize/:provider", get(authorize))
        .route("/callback/:provider", get(callback))
        .route("/logout", post(logout))
}

// =============================================================================
// Authorization redirect
// =============================================================================

/// GET /authorize/{provider}
///
/// Redirects the browser to the provider's authorization page.
///
/// # Steps
/// 1. Look up the provider (404 if unknown)
/// 2. Generate a CSRF state token and store it in the session,
///    replacing any earlier attempt
/// 3. Redirect with client_id, redirect_uri, response_type, scope, state
async fn authorize(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider = state.providers.lookup(&provider_name)?;

    let csrf_state = generate_state_token();
    let mut session = load_session(&jar, &state.config);
    session.oauth2_state = Some(csrf_state.clone());

    let redirect_uri = state.config.server.callback_url(provider.name());
    let url = provider.authorization_url(&redirect_uri, &csrf_state);

    LOGIN_ATTEMPTS_TOTAL
        .with_label_values(&[provider.name()])
        .inc();
    tracing::info!(provider = provider.name(), "Redirecting to provider");

    let jar = save_session(jar, &session, &state.config)?;
    Ok((jar, Redirect::to(url.as_str())))
}

// =============================================================================
// Callback
// =============================================================================

/// GET /callback/{provider}
///
/// Handles the provider's redirect back to us.
///
/// The stored state is discarded whatever the outcome, so the session
/// cookie is rewritten on every response past provider lookup.
async fn callback(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Response {
    let provider = match state.providers.lookup(&provider_name) {
        Ok(provider) => provider,
        Err(error) => return error.into_response(),
    };

    let mut session = load_session(&jar, &state.config);
    let outcome = match handle_callback(&state, provider, &params, &mut session).await {
        Err(AppError::ProviderError(messages)) => {
            tracing::warn!(
                provider = provider.name(),
                errors = ?messages,
                "Provider returned an error"
            );
            for message in messages {
                session.flash(message);
            }
            Ok(Redirect::to(LANDING_PAGE))
        }
        other => other,
    };

    let jar = match save_session(jar, &session, &state.config) {
        Ok(jar) => jar,
        Err(error) => return error.into_response(),
    };

    match outcome {
        Ok(redirect) => (jar, redirect).into_response(),
        Err(error) => (jar, error).into_response(),
    }
}

/// Callback steps after provider lookup
///
/// # Steps
/// 1. Bail out with `ProviderError` on any `error*` parameter
/// 2. Verify CSRF state against the session (consumed here)
/// 3. Require a code
/// 4. Complete the login and flash the issued token
async fn handle_callback(
    state: &AppState,
    provider: &ProviderConfig,
    params: &HashMap<String, String>,
    session: &mut Session,
) -> Result<Redirect, AppError> {
    let stored_state = session.oauth2_state.take();

    let errors = provider_errors(params);
    if !errors.is_empty() {
        return Err(AppError::ProviderError(errors));
    }

    verify_state(
        stored_state.as_deref(),
        params.get("state").map(String::as_str),
    )
    .inspect_err(|_| {
        tracing::warn!(provider = provider.name(), "OAuth state mismatch");
    })?;

    let code = params
        .get("code")
        .filter(|code| !code.is_empty())
        .ok_or(AppError::Unauthorized)?;

    // Must match the redirect_uri sent in the authorization request
    let redirect_uri = state.config.server.callback_url(provider.name());
    let outcome = state.login.complete(provider, code, &redirect_uri).await?;

    session.flash(format!(
        "Signed in with {} as {}.",
        provider.kind.display_name(),
        outcome.user.email
    ));
    session.flash(format!("Your access token: {}", outcome.token));

    Ok(Redirect::to(LANDING_PAGE))
}

/// `error*` query parameters as "key: value" messages, in key order
fn provider_errors(params: &HashMap<String, String>) -> Vec<String> {
    let mut errors: Vec<String> = params
        .iter()
        .filter(|(key, _)| key.starts_with("error"))
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    errors.sort();
    errors
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Clears the session cookie and redirects to the landing page.
/// Issued JWTs stay valid until they expire.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (clear_session(jar), Redirect::to(LANDING_PAGE))
}
