//! Service layer
//!
//! Contains business logic separated from HTTP handlers.

mod login;

pub use login::{LoginOutcome, LoginService};
