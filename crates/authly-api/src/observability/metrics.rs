//! Metrics definitions for the Authly API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authly_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 8 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS, OTHER)
//! - `endpoint`: known routes plus `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: `success` plus one label per authentication error kind

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Routes reported under their own `endpoint` label.
const KNOWN_ENDPOINTS: [&str; 6] = [
    "/",
    "/health",
    "/ready",
    "/metrics",
    "/api/auth/verify",
    "/api/v1/me",
];

/// Methods reported under their own `method` label.
const KNOWN_METHODS: [&str; 7] = ["GET", "POST", "PATCH", "DELETE", "PUT", "HEAD", "OPTIONS"];

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authentication is a per-request hot path; most requests should finish well under 50ms
        .set_buckets_for_metric(
            Matcher::Prefix("authly_http_request".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetches cross the network and are bounded by the fetch timeout
        .set_buckets_for_metric(
            Matcher::Prefix("authly_jwks_refresh".to_string()),
            &[
                0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authly_http_requests_total`, `authly_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures every response, including 404/405 produced by the router.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_method = normalize_method(method);
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authly_http_request_duration_seconds",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("authly_http_requests_total",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize HTTP method to bound label cardinality.
///
/// Extension methods are reported as `OTHER`.
pub fn normalize_method(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .find(|known| **known == method)
        .copied()
        .unwrap_or("OTHER")
}

/// Normalize endpoint path to bound label cardinality.
///
/// Unknown paths are reported as `/other`.
pub fn normalize_endpoint(path: &str) -> &'static str {
    KNOWN_ENDPOINTS
        .iter()
        .find(|known| **known == path)
        .copied()
        .unwrap_or("/other")
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record the outcome of one authentication attempt
///
/// Metric: `authly_auth_attempts_total`
/// Labels: `outcome` (`success` or an `AuthError::kind()` label)
pub fn record_auth_attempt(outcome: &'static str) {
    counter!("authly_auth_attempts_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record one JWKS refresh
///
/// Metric: `authly_jwks_refresh_total`, `authly_jwks_refresh_duration_seconds`
/// Labels: `status` (`success` or `error`)
pub fn record_jwks_refresh(status: &'static str, duration: Duration) {
    counter!("authly_jwks_refresh_total", "status" => status).increment(1);
    histogram!("authly_jwks_refresh_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}
