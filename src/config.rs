//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub http: HttpClientConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Public domain, including a port when not 80/443 (e.g., "localhost:3000")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public base URL
    ///
    /// # Returns
    /// Full URL like "https://login.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    /// Callback URL registered with a provider.
    ///
    /// Used for both the authorization redirect and the token exchange;
    /// providers require the two to match exactly.
    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/callback/{}", self.base_url(), provider)
    }
}

/// Which store implementation backs users and activity logs
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    /// Volatile store, lost on restart
    Memory,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    /// Database name
    pub name: String,
}

impl DatabaseConfig {
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for the session cookie (32+ bytes, required)
    pub session_secret: String,
    /// Session cookie max age in seconds (default: 86400)
    pub session_max_age: i64,
    /// HS256 key for issued JWTs (32+ bytes, required)
    pub jwt_secret: String,
    /// Issued JWT lifetime in seconds (default: 3600)
    pub jwt_ttl_seconds: i64,
}

/// Configured OAuth providers
///
/// A provider without a section is not registered.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersConfig {
    pub google: Option<ProviderSettings>,
    pub github: Option<ProviderSettings>,
}

/// Credentials and optional endpoint overrides for one provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub userinfo_url: Option<String>,
    pub scopes: Option<Vec<String>>,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    /// Timeout for provider token and userinfo calls
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Unprefixed provider/database variables (`GOOGLE_CLIENT_ID`, ...)
    /// 5. Environment variables (LOGINBRIDGE__*)
    ///
    /// Secrets and `server.domain` have no defaults; loading fails when
    /// they are absent.
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        Self::from_env(std::env::vars().collect())
    }

    fn from_env(vars: config::Map<String, String>) -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.protocol", "http")?
            .set_default("database.backend", "mongodb")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 27017)?
            .set_default("database.name", "loginbridge")?
            .set_default("auth.session_max_age", 86400)?
            .set_default("auth.jwt_ttl_seconds", 3600)?
            .set_default("http.timeout_seconds", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(unprefixed_aliases(&vars))),
            )
            // Load from environment variables (LOGINBRIDGE__*)
            .add_source(
                Environment::with_prefix("LOGINBRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("providers.google.scopes")
                    .with_list_parse_key("providers.github.scopes")
                    .source(Some(vars)),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SECRET_BYTES: usize = 32;
        // Session expiry and JWT `exp` are computed with chrono; keep them in range
        const MAX_LIFETIME_SECONDS: i64 = 365 * 24 * 60 * 60;

        for (key, secret) in [
            ("auth.session_secret", &self.auth.session_secret),
            ("auth.jwt_secret", &self.auth.jwt_secret),
        ] {
            if secret.len() < MIN_SECRET_BYTES {
                return Err(crate::error::AppError::Config(format!(
                    "{} must be at least {} bytes",
                    key, MIN_SECRET_BYTES
                )));
            }
        }

        for (key, seconds) in [
            ("auth.session_max_age", self.auth.session_max_age),
            ("auth.jwt_ttl_seconds", self.auth.jwt_ttl_seconds),
        ] {
            if seconds <= 0 {
                return Err(crate::error::AppError::Config(format!(
                    "{} must be greater than 0",
                    key
                )));
            }
            if seconds > MAX_LIFETIME_SECONDS {
                return Err(crate::error::AppError::Config(format!(
                    "{} must be at most {} seconds",
                    key, MAX_LIFETIME_SECONDS
                )));
            }
        }

        if self.http.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.providers.google.is_none() && self.providers.github.is_none() {
            tracing::warn!("No OAuth providers configured; every sign-in route will return 404");
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

/// Plain variable names accepted alongside `LOGINBRIDGE__*`
const UNPREFIXED_KEYS: &[(&str, &str)] = &[
    ("GOOGLE_CLIENT_ID", "providers__google__client_id"),
    ("GOOGLE_CLIENT_SECRET", "providers__google__client_secret"),
    ("GITHUB_CLIENT_ID", "providers__github__client_id"),
    ("GITHUB_CLIENT_SECRET", "providers__github__client_secret"),
    ("DATABASE_HOST", "database__host"),
    ("DATABASE_PORT", "database__port"),
    ("DATABASE_NAME", "database__name"),
];

/// Rename the plain variables present in `vars` to config paths
fn unprefixed_aliases(vars: &config::Map<String, String>) -> config::Map<String, String> {
    UNPREFIXED_KEYS
        .iter()
        .filter_map(|(name, key)| {
            vars.get(*name)
                .map(|value| ((*key).to_string(), value.clone()))
        })
        .collect()
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
