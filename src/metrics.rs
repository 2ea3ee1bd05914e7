//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Login flow
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("loginbridge_login_attempts_total", "Total number of authorization redirects"),
        &["provider"]
    ).expect("metric can be created");
    pub static ref LOGINS_COMPLETED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("loginbridge_logins_completed_total", "Total number of successful callbacks"),
        &["provider", "activity"]
    ).expect("metric can be created");

    // Provider calls
    pub static ref PROVIDER_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("loginbridge_provider_requests_total", "Total number of requests to OAuth providers"),
        &["provider", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref PROVIDER_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "loginbridge_provider_request_duration_seconds",
            "OAuth provider request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["provider", "endpoint"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("loginbridge_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGIN_ATTEMPTS_TOTAL.clone()))
        .expect("LOGIN_ATTEMPTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LOGINS_COMPLETED_TOTAL.clone()))
        .expect("LOGINS_COMPLETED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PROVIDER_REQUESTS_TOTAL.clone()))
        .expect("PROVIDER_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PROVIDER_REQUEST_DURATION_SECONDS.clone()))
        .expect("PROVIDER_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
