//! OAuth provider registry
//!
//! Providers are fixed at compile time by [`ProviderKind`]; which of them
//! are enabled, and with what credentials, comes from configuration.

use std::collections::BTreeMap;

use anyhow::{Context, anyhow};
use serde_json::Value;
use url::Url;

use crate::config::{ProviderSettings, ProvidersConfig};
use crate::error::AppError;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    GitHub,
}

struct DefaultEndpoints {
    authorize_url: &'static str,
    token_url: &'static str,
    userinfo_url: &'static str,
    scopes: &'static [&'static str],
}

impl ProviderKind {
    /// Name used in routes (`/authorize/{name}`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
        }
    }

    /// Human-readable name for the landing page
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::GitHub => "GitHub",
        }
    }

    fn defaults(&self) -> DefaultEndpoints {
        match self {
            Self::Google => DefaultEndpoints {
                authorize_url: "https://accounts.google.com/o/oauth2/auth",
                token_url: "https://accounts.google.com/o/oauth2/token",
                userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo",
                scopes: &["https://www.googleapis.com/auth/userinfo.email"],
            },
            Self::GitHub => DefaultEndpoints {
                authorize_url: "https://github.com/login/oauth/authorize",
                token_url: "https://github.com/login/oauth/access_token",
                userinfo_url: "https://api.github.com/user/emails",
                scopes: &["user:email"],
            },
        }
    }

    /// Pull the email address out of a userinfo response body
    ///
    /// - Google: `{"email": "..."}`
    /// - GitHub: `[{"email": "...", ...}, ...]`, first entry wins
    pub fn extract_email(&self, body: &Value) -> anyhow::Result<String> {
        let email = match self {
            Self::Google => body.get("email"),
            Self::GitHub => body.get(0).and_then(|first| first.get("email")),
        };

        email
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| anyhow!("{} userinfo response has no email", self.name()))
    }
}

/// Resolved provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    fn from_settings(kind: ProviderKind, settings: &ProviderSettings) -> anyhow::Result<Self> {
        let defaults = kind.defaults();
        let parse = |field: &str, value: Option<&String>, default: &str| {
            let raw = value.map(String::as_str).unwrap_or(default);
            Url::parse(raw).with_context(|| format!("providers.{}.{}", kind.name(), field))
        };

        Ok(Self {
            kind,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            authorize_url: parse(
                "authorize_url",
                settings.authorize_url.as_ref(),
                defaults.authorize_url,
            )?,
            token_url: parse("token_url", settings.token_url.as_ref(), defaults.token_url)?,
            userinfo_url: parse(
                "userinfo_url",
                settings.userinfo_url.as_ref(),
                defaults.userinfo_url,
            )?,
            scopes: settings
                .scopes
                .clone()
                .unwrap_or_else(|| defaults.scopes.iter().map(|s| s.to_string()).collect()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Build the provider's authorization URL
    ///
    /// Existing query parameters on `authorize_url` are kept.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        url
    }
}

/// Registry of enabled providers, keyed by route name
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, ProviderConfig>,
}

impl ProviderRegistry {
    /// Build the registry from configuration
    ///
    /// # Errors
    /// Returns `AppError::Config` if an endpoint override is not a valid URL
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, AppError> {
        let mut providers = BTreeMap::new();

        for (kind, settings) in [
            (ProviderKind::Google, config.google.as_ref()),
            (ProviderKind::GitHub, config.github.as_ref()),
        ] {
            let Some(settings) = settings else {
                continue;
            };
            if settings.client_id.trim().is_empty() || settings.client_secret.trim().is_empty() {
                tracing::warn!(
                    provider = kind.name(),
                    "OAuth provider has empty credentials; not registered"
                );
                continue;
            }
            let provider = ProviderConfig::from_settings(kind, settings)
                .map_err(|e| AppError::Config(format!("{e:#}")))?;
            tracing::info!(provider = kind.name(), "OAuth provider registered");
            providers.insert(kind.name(), provider);
        }

        Ok(Self { providers })
    }

    /// Look up a provider by route name
    ///
    /// # Errors
    /// Returns `AppError::UnknownProvider` when no provider has this name
    pub fn lookup(&self, name: &str) -> Result<&ProviderConfig, AppError> {
        self.providers
            .get(name)
            .ok_or_else(|| AppError::UnknownProvider(name.to_string()))
    }

    /// Enabled providers in name order
    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.values()
    }
}
