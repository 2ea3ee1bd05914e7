//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use loginbridge::auth::session::{Session, create_session_token, verify_session_token};
use loginbridge::data::MemoryStore;
use loginbridge::{AppState, config};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_SECRET: &str = "test-session-secret-32-bytes-long!";
pub const JWT_SECRET: &str = "test-jwt-secret-that-is-32-bytes!!";
pub const PUBLIC_DOMAIN: &str = "login.test.example.com";

/// Test server instance
///
/// Runs the real router on an ephemeral port, backed by an in-memory
/// store, with a mock server standing in for both providers.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub provider: MockServer,
    /// Client that does not follow redirects
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        let provider = MockServer::start().await;
        let mut config = test_config(&provider.uri());
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_store(config, store.clone()).unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = loginbridge::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            store,
            provider,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Signed `session=...` cookie pair carrying this OAuth state
    pub fn session_cookie_with_state(&self, oauth2_state: &str) -> String {
        let mut session = Session::new(3600);
        session.oauth2_state = Some(oauth2_state.to_string());
        format!(
            "session={}",
            create_session_token(&session, SESSION_SECRET).unwrap()
        )
    }

    /// Hit `/authorize/{provider}` and return (state, session cookie pair)
    pub async fn authorize(&self, provider: &str, cookie: Option<&str>) -> (String, String) {
        let mut request = self.client.get(self.url(&format!("/authorize/{provider}")));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 303);

        let location = url::Url::parse(location(&response)).unwrap();
        let state = query_param(&location, "state").expect("state parameter");
        let cookie = session_cookie(&response).expect("session cookie");
        (state, cookie)
    }

    /// Hit `/callback/{provider}` with the given query and cookie
    pub async fn callback(
        &self,
        provider: &str,
        query: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .get(self.url(&format!("/callback/{provider}")))
            .query(query);
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.unwrap()
    }

    /// Full authorize + callback round trip with a fresh session
    pub async fn login(&self, provider: &str) -> reqwest::Response {
        let (state, cookie) = self.authorize(provider, None).await;
        self.callback(
            provider,
            &[("code", "auth-code"), ("state", state.as_str())],
            Some(&cookie),
        )
        .await
    }
}

/// Build test configuration pointing providers at the mock server
pub fn test_config(provider_uri: &str) -> config::AppConfig {
    let provider = |name: &str, userinfo: &str| config::ProviderSettings {
        client_id: format!("{name}-client-id"),
        client_secret: format!("{name}-client-secret"),
        authorize_url: Some(format!("{provider_uri}/{name}/authorize")),
        token_url: Some(format!("{provider_uri}/{name}/token")),
        userinfo_url: Some(format!("{provider_uri}/{name}/{userinfo}")),
        scopes: None,
    };

    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            domain: PUBLIC_DOMAIN.to_string(),
            protocol: "https".to_string(),
        },
        database: config::DatabaseConfig {
            backend: config::StoreBackend::Memory,
            host: "localhost".to_string(),
            port: 27017,
            name: "loginbridge-test".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: SESSION_SECRET.to_string(),
            session_max_age: 3600,
            jwt_secret: JWT_SECRET.to_string(),
            jwt_ttl_seconds: 3600,
        },
        providers: config::ProvidersConfig {
            google: Some(provider("google", "userinfo")),
            github: Some(provider("github", "user/emails")),
        },
        http: config::HttpClientConfig { timeout_seconds: 5 },
        logging: config::LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Mount a successful token exchange for `provider`
pub async fn mount_token(server: &MockServer, provider: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/{provider}/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

/// Mount a Google userinfo response for `access_token`
pub async fn mount_google_userinfo(server: &MockServer, access_token: &str, email: &str) {
    Mock::given(method("GET"))
        .and(path("/google/userinfo"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "1234567890",
            "email": email,
            "email_verified": true
        })))
        .mount(server)
        .await;
}

/// Mount a GitHub email list response for `access_token`
pub async fn mount_github_emails(server: &MockServer, access_token: &str, email: &str) {
    Mock::given(method("GET"))
        .and(path("/github/user/emails"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "email": email, "primary": true, "verified": true, "visibility": "public" }
        ])))
        .mount(server)
        .await;
}

/// Location header of a redirect
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

/// `session=...` pair from the response's Set-Cookie headers
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .find(|pair| pair.starts_with("session="))
        .map(ToString::to_string)
}

/// Decode a `session=...` pair back into session data
pub fn decode_session(cookie: &str) -> Session {
    let token = cookie.strip_prefix("session=").expect("session cookie pair");
    verify_session_token(token, SESSION_SECRET).expect("valid session cookie")
}

pub fn query_param(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Callback URL the server registers for `provider`
pub fn callback_url(provider: &str) -> String {
    format!("https://{PUBLIC_DOMAIN}/callback/{provider}")
}
