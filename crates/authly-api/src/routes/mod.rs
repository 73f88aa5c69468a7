//! HTTP routes for the Authly API.
//!
//! Defines the Axum router and application state.

use crate::auth::{AuthGate, KeySetCache, TokenValidator};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authentication pipeline; also owns the key set cache handle.
    pub auth_gate: Arc<AuthGate>,
}

impl AppState {
    /// Build the key set cache and auth gate for `config`.
    ///
    /// The JWKS URL is not registered here; call
    /// [`KeySetCache::register`] on `auth_gate.key_cache()` before serving.
    pub fn new(config: Config) -> Self {
        let key_cache = KeySetCache::new(config.key_set_cache_config());
        let auth_gate = AuthGate::new(
            key_cache,
            config.jwks_url.clone(),
            TokenValidator::new(config.jwt_clock_skew),
        );

        Self {
            config,
            auth_gate: Arc::new(auth_gate),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - Liveness and readiness probes (public)
/// - `/metrics` - Prometheus scrape endpoint (public)
/// - `/api/auth/verify`, `/api/v1/me` - Caller identity (bearer token required)
///
/// Layer order (outermost first): HTTP metrics, CORS, timeout, trace.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/auth/verify", get(handlers::verify_token))
        .route("/api/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth_gate),
            require_auth,
        ));

    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_app_state_uses_configured_jwks_url() {
        let vars = std::collections::HashMap::from([(
            "BETTER_AUTH_URL".to_string(),
            "http://auth.internal:3000".to_string(),
        )]);
        let state = AppState::new(Config::from_vars(&vars).unwrap());

        assert_eq!(
            state.auth_gate.jwks_url(),
            "http://auth.internal:3000/api/auth/jwks"
        );
        assert!(state.auth_gate.key_cache().registered_urls().is_empty());
    }
}
