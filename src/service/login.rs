//! Login service
//!
//! Server-side half of the authorization code flow: code exchange,
//! userinfo fetch, user resolution, activity logging and JWT issuance.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use crate::auth::jwt::TokenIssuer;
use crate::auth::provider::ProviderConfig;
use crate::data::{ActivityLog, ActivityType, Store, User};
use crate::error::AppError;
use crate::metrics::{
    LOGINS_COMPLETED_TOTAL, PROVIDER_REQUEST_DURATION_SECONDS, PROVIDER_REQUESTS_TOTAL,
};

/// Token endpoint response
///
/// Only the access token is used; refresh tokens are ignored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Result of a completed login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub activity_type: ActivityType,
    /// Application JWT for the user
    pub token: String,
}

/// Login service
pub struct LoginService {
    http_client: Arc<reqwest::Client>,
    store: Arc<dyn Store>,
    tokens: Arc<TokenIssuer>,
}

impl LoginService {
    /// Create new login service
    pub fn new(
        http_client: Arc<reqwest::Client>,
        store: Arc<dyn Store>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            http_client,
            store,
            tokens,
        }
    }

    /// Finish a login after the callback has passed state validation
    ///
    /// # Steps
    /// 1. Exchange the code for an access token
    /// 2. Fetch userinfo and extract the email
    /// 3. Find or create the user
    /// 4. Append a signup/login activity entry
    /// 5. Issue a JWT
    ///
    /// # Errors
    /// - `Unauthorized` if the token exchange or userinfo fetch fails
    /// - `Internal` if the userinfo body has no email
    /// - `Database` on store failures
    pub async fn complete(
        &self,
        provider: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<LoginOutcome, AppError> {
        let access_token = self.exchange_code(provider, code, redirect_uri).await?;
        let email = self.fetch_email(provider, &access_token).await?;

        let resolution = self.store.find_or_create_user(&email).await?;
        self.store
            .append_activity(&ActivityLog::now(
                resolution.user.id.clone(),
                resolution.activity_type,
            ))
            .await?;

        let token = self.tokens.issue(&resolution.user)?;

        LOGINS_COMPLETED_TOTAL
            .with_label_values(&[provider.name(), resolution.activity_type.as_str()])
            .inc();
        tracing::info!(
            provider = provider.name(),
            user_id = %resolution.user.id,
            activity = resolution.activity_type.as_str(),
            "Login completed"
        );

        Ok(LoginOutcome {
            user: resolution.user,
            activity_type: resolution.activity_type,
            token,
        })
    }

    /// Exchange an authorization code for an access token
    async fn exchange_code(
        &self,
        provider: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, AppError> {
        let started = Instant::now();
        let response = self
            .http_client
            .post(provider.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", provider.client_id.as_str()),
                ("client_secret", provider.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await;
        let response = observe(provider, "token", started, response)?;

        if !response.status().is_success() {
            tracing::warn!(
                provider = provider.name(),
                status = %response.status(),
                "Token exchange rejected"
            );
            return Err(AppError::Unauthorized);
        }

        let body: TokenResponse = response.json().await.map_err(|error| {
            tracing::warn!(provider = provider.name(), %error, "Token response is not JSON");
            AppError::Unauthorized
        })?;

        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                tracing::warn!(
                    provider = provider.name(),
                    "Token response has no access_token"
                );
                AppError::Unauthorized
            })
    }

    /// Fetch userinfo with the access token and extract the email
    async fn fetch_email(
        &self,
        provider: &ProviderConfig,
        access_token: &str,
    ) -> Result<String, AppError> {
        let started = Instant::now();
        let response = self
            .http_client
            .get(provider.userinfo_url.clone())
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await;
        let response = observe(provider, "userinfo", started, response)?;

        if !response.status().is_success() {
            tracing::warn!(
                provider = provider.name(),
                status = %response.status(),
                "Userinfo request rejected"
            );
            return Err(AppError::Unauthorized);
        }

        let body: serde_json::Value = response.json().await.map_err(|error| {
            tracing::warn!(provider = provider.name(), %error, "Userinfo response is not JSON");
            AppError::Unauthorized
        })?;

        Ok(provider.kind.extract_email(&body)?)
    }
}

/// Record metrics for a provider call; transport failures count as 401
fn observe(
    provider: &ProviderConfig,
    endpoint: &str,
    started: Instant,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, AppError> {
    PROVIDER_REQUEST_DURATION_SECONDS
        .with_label_values(&[provider.name(), endpoint])
        .observe(started.elapsed().as_secs_f64());

    match response {
        Ok(response) => {
            PROVIDER_REQUESTS_TOTAL
                .with_label_values(&[provider.name(), endpoint, response.status().as_str()])
                .inc();
            Ok(response)
        }
        Err(error) => {
            PROVIDER_REQUESTS_TOTAL
                .with_label_values(&[provider.name(), endpoint, "error"])
                .inc();
            tracing::warn!(
                provider = provider.name(),
                endpoint,
                timeout = error.is_timeout(),
                %error,
                "Provider request failed"
            );
            Err(AppError::Unauthorized)
        }
    }
}
