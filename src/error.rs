//! Error types for loginbridge
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Each variant maps to a single HTTP status. The callback handler
/// intercepts `ProviderError` and turns it into a flash message instead
/// of rendering it.
#[derive(Debug, Error)]
pub enum AppError {
    /// Provider name is not registered (404)
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication failed or is missing (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Provider redirected back with one or more `error*` parameters
    /// (recoverable)
    #[error("Provider error: {}", .0.join(", "))]
    ProviderError(Vec<String>),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// JWT creation or validation failed (401)
    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Short label used for the error metric
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::UnknownProvider(_) => "unknown_provider",
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::ProviderError(_) => "provider_error",
            AppError::Database(_) => "database",
            AppError::HttpClient(_) => "http_client",
            AppError::Token(_) => "token",
            AppError::Config(_) => "config",
            AppError::Encryption(_) => "encryption",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::UnknownProvider(_) | AppError::NotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Token(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::ProviderError(messages) => (StatusCode::BAD_GATEWAY, messages.join(", ")),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Encryption(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.error_type()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
