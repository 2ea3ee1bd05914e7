//! loginbridge - Sign in with Google or GitHub, get an application JWT
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - /authorize/{provider}, /callback/{provider}, /logout     │
//! │  - Landing page, /api/me, /health, /metrics                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Code exchange, userinfo, user resolution, JWT issuance   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - MongoDB (users, activity_logs)                           │
//! │  - In-memory store                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: Landing page, current user API, metrics
//! - `auth`: Providers, OAuth flow, session cookie, JWT
//! - `service`: Login orchestration
//! - `data`: Store trait and implementations
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Built once at startup and cloned for each request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Enabled OAuth providers
    pub providers: Arc<auth::ProviderRegistry>,

    /// User and activity store
    pub store: Arc<dyn data::Store>,

    /// JWT issuer/verifier
    pub tokens: Arc<auth::TokenIssuer>,

    /// Login orchestration
    pub login: Arc<service::LoginService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// Connects the store selected by `database.backend`.
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let store: Arc<dyn data::Store> = match config.database.backend {
            config::StoreBackend::Mongodb => {
                Arc::new(data::MongoStore::connect(&config.database).await?)
            }
            config::StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; users and activity are lost on restart");
                Arc::new(data::MemoryStore::new())
            }
        };

        Self::with_store(config, store)
    }

    /// Initialize application state around an existing store
    pub fn with_store(
        config: config::AppConfig,
        store: Arc<dyn data::Store>,
    ) -> Result<Self, error::AppError> {
        let providers = auth::ProviderRegistry::from_config(&config.providers)?;

        // Provider calls block the request; bound them
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("loginbridge/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.http.timeout_seconds))
            .build()?;

        let tokens = Arc::new(auth::TokenIssuer::new(&config.auth));
        let login = service::LoginService::new(Arc::new(http_client), store.clone(), tokens.clone());

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            providers: Arc::new(providers),
            store,
            tokens,
            login: Arc::new(login),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::pages_router())
        .merge(auth::auth_router())
        .nest("/api", api::me_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
