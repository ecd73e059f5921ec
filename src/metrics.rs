//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{Counter, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authdesk_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "authdesk_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authdesk_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "authdesk_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Auth Metrics
    pub static ref AUTH_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authdesk_auth_attempts_total", "Total number of signup and login attempts"),
        &["action", "result"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref AVATAR_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "authdesk_avatar_uploads_total",
        "Total number of avatar uploads"
    ).expect("metric can be created");
    pub static ref AVATAR_BYTES_UPLOADED: Counter = Counter::new(
        "authdesk_avatar_bytes_uploaded_total",
        "Total bytes of avatar images uploaded"
    ).expect("metric can be created");

    // Application Metrics
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "authdesk_users_total",
        "Total number of registered users"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authdesk_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; already-registered collectors are skipped.
pub fn init_metrics() {
    register("HTTP_REQUESTS_TOTAL", Box::new(HTTP_REQUESTS_TOTAL.clone()));
    register(
        "HTTP_REQUEST_DURATION_SECONDS",
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
    );
    register("DB_QUERIES_TOTAL", Box::new(DB_QUERIES_TOTAL.clone()));
    register(
        "DB_QUERY_DURATION_SECONDS",
        Box::new(DB_QUERY_DURATION_SECONDS.clone()),
    );
    register("AUTH_ATTEMPTS_TOTAL", Box::new(AUTH_ATTEMPTS_TOTAL.clone()));
    register("AVATAR_UPLOADS_TOTAL", Box::new(AVATAR_UPLOADS_TOTAL.clone()));
    register("AVATAR_BYTES_UPLOADED", Box::new(AVATAR_BYTES_UPLOADED.clone()));
    register("USERS_TOTAL", Box::new(USERS_TOTAL.clone()));
    register("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone()));

    tracing::info!("Metrics registry initialized");
}

fn register(name: &str, collector: Box<dyn Collector>) {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
        Err(error) => tracing::warn!(metric = name, %error, "Failed to register metric"),
    }
}

/// Record the outcome of a signup or login attempt.
pub fn record_auth_attempt(action: &str, result: &str) {
    AUTH_ATTEMPTS_TOTAL.with_label_values(&[action, result]).inc();
}

/// Record one completed HTTP request.
pub fn record_request(method: &str, endpoint: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_metrics_is_idempotent() {
        init_metrics();
        init_metrics();

        record_auth_attempt("login", "success");
        let families = REGISTRY.gather();
        assert!(
            families
                .iter()
                .any(|family| family.get_name() == "authdesk_auth_attempts_total")
        );
    }
}
