//! Authentication middleware for protected routes.
//!
//! Runs the [`AuthGate`] on the request headers and injects the resulting
//! [`Identity`] into request extensions.

use crate::auth::{AuthGate, Identity};
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 Unauthorized with `WWW-Authenticate` if the credential is missing or invalid
/// - 502/503 if the key set cannot be served
/// - Otherwise continues to the next handler with `Identity` in extensions
#[instrument(skip_all, name = "authly.middleware.auth")]
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let identity = gate.authenticate(req.headers())?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Extension trait for reading the authenticated identity from a request.
pub trait IdentityExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::extract::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{KeySetCache, KeySetCacheConfig, TokenValidator};
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, header::WWW_AUTHENTICATE, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn protected(req: Request) -> &'static str {
        if req.identity().is_some() {
            "identity"
        } else {
            "anonymous"
        }
    }

    fn test_app() -> Router {
        let gate = Arc::new(AuthGate::new(
            KeySetCache::new(KeySetCacheConfig::default()),
            "http://localhost:3000/api/auth/jwks",
            TokenValidator::default(),
        ));

        Router::new()
            .route("/protected", get(protected))
            .layer(middleware::from_fn_with_state(gate, require_auth))
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let request = HttpRequest::builder()
            .uri("/protected")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_some());
    }

    #[tokio::test]
    async fn test_basic_scheme_is_unauthorized() {
        let request = HttpRequest::builder()
            .uri("/protected")
            .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unregistered_key_source_is_service_unavailable() {
        let request = HttpRequest::builder()
            .uri("/protected")
            .header(AUTHORIZATION, "Bearer abc.def.ghi")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
