//! Mock JWKS endpoint
//!
//! Wraps a wiremock `MockServer` that serves a JWKS document at the same path
//! a Better Auth server uses, and lets tests swap what it serves mid-test.

use crate::crypto_fixtures::jwks_json;
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the JWKS document on.
pub const JWKS_PATH: &str = "/api/auth/jwks";

/// Mock JWKS endpoint for integration tests.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::start().await;
/// jwks.serve_keys(&[key.jwk_json()]).await;
/// cache.register(&jwks.jwks_url()).await?;
///
/// jwks.serve_status(503).await; // endpoint goes down
/// ```
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start a mock server with nothing mounted (every request gets 404).
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL, usable as `BETTER_AUTH_URL`.
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Full JWKS URL.
    pub fn jwks_url(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    /// Serve a JWKS document containing `keys`, replacing any previous behavior.
    pub async fn serve_keys(&self, keys: &[Value]) {
        self.serve(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .await;
    }

    /// Serve `keys` after `delay`, replacing any previous behavior.
    pub async fn serve_keys_with_delay(&self, keys: &[Value], delay: Duration) {
        self.serve(
            ResponseTemplate::new(200)
                .set_body_json(jwks_json(keys))
                .set_delay(delay),
        )
        .await;
    }

    /// Answer every request with `status` and an empty body.
    pub async fn serve_status(&self, status: u16) {
        self.serve(ResponseTemplate::new(status)).await;
    }

    /// Answer every request with a raw 200 body.
    pub async fn serve_raw(&self, body: &str) {
        self.serve(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .await;
    }

    /// Number of requests received since the served behavior last changed.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    async fn serve(&self, response: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::{Ed25519Fixture, SigningFixture};

    #[tokio::test]
    async fn test_serves_keys_then_status() {
        let jwks = MockJwksServer::start().await;
        let key = Ed25519Fixture::new(1, "key-1");

        jwks.serve_keys(&[key.jwk_json()]).await;
        let body: Value = reqwest::get(jwks.jwks_url()).await.unwrap().json().await.unwrap();
        assert_eq!(body["keys"][0]["kid"], "key-1");

        jwks.serve_status(503).await;
        let response = reqwest::get(jwks.jwks_url()).await.unwrap();
        assert_eq!(response.status().as_u16(), 503);
    }

    #[tokio::test]
    async fn test_jwks_url_uses_better_auth_path() {
        let jwks = MockJwksServer::start().await;
        assert!(jwks.jwks_url().starts_with(&jwks.base_url()));
        assert!(jwks.jwks_url().ends_with("/api/auth/jwks"));
    }
}
