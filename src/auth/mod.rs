//! OAuth authentication
//!
//! Handles:
//! - Provider registry (Google, GitHub)
//! - Authorization code flow and CSRF state
//! - Cookie session and flash messages
//! - JWT issuance and bearer authentication

pub mod csrf;
pub mod jwt;
mod middleware;
mod oauth;
pub mod provider;
pub mod session;

pub use jwt::{Claims, TokenIssuer};
pub use middleware::CurrentUser;
pub use oauth::auth_router;
pub use provider::{ProviderConfig, ProviderKind, ProviderRegistry};
pub use session::{Session, create_session_token, verify_session_token};
