//! API layer
//!
//! HTTP handlers for:
//! - Landing page
//! - Current user API
//! - Metrics (Prometheus)

mod me;
pub mod metrics;
mod pages;

pub use me::{ActivityResponse, MeResponse, me_router};
pub use metrics::metrics_router;
pub use pages::pages_router;
