//! Test server harness for E2E testing
//!
//! Provides `TestAuthlyServer` for spawning real Authly API instances in tests.

use authly_api::auth::{AuthError, KeySetCache};
use authly_api::config::Config;
use authly_api::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the Authly API in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let jwks = MockJwksServer::start().await;
///     jwks.serve_keys(&[key.jwk_json()]).await;
///
///     let server = TestAuthlyServer::spawn(&jwks.jwks_url()).await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthlyServer {
    addr: SocketAddr,
    config: Config,
    key_cache: KeySetCache,
    registration: Result<(), AuthError>,
    _handle: JoinHandle<()>,
}

impl TestAuthlyServer {
    /// Spawn a server that validates tokens against `jwks_url`.
    ///
    /// The server will:
    /// - Register `jwks_url` with its key cache (a failed first fetch is kept
    ///   in [`TestAuthlyServer::registration`], not returned as an error)
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::from([(
            "JWKS_URL".to_string(),
            jwks_url.to_string(),
        )]))
        .await
    }

    /// Spawn a server from explicit environment variables.
    pub async fn spawn_with_vars(mut vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        vars.entry("BIND_ADDRESS".to_string())
            .or_insert_with(|| "127.0.0.1:0".to_string());

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config.clone()));
        let key_cache = state.auth_gate.key_cache().clone();
        let registration = key_cache.register(&config.jwks_url).await;

        // Handle that renders without installing a global recorder
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind(&config.bind_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            key_cache,
            registration,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The server's key cache.
    pub fn key_cache(&self) -> &KeySetCache {
        &self.key_cache
    }

    /// Outcome of registering the JWKS URL at startup.
    pub fn registration(&self) -> &Result<(), AuthError> {
        &self.registration
    }
}

impl Drop for TestAuthlyServer {
    fn drop(&mut self) {
        self._handle.abort();
        self.key_cache.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::{Ed25519Fixture, SigningFixture};
    use crate::jwks_server::MockJwksServer;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let jwks = MockJwksServer::start().await;
        jwks.serve_keys(&[Ed25519Fixture::new(1, "key-1").jwk_json()]).await;

        let server = TestAuthlyServer::spawn(&jwks.jwks_url()).await?;
        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.registration().is_ok());

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "authly-api");
        assert_eq!(body["jwks"], "loaded");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_addr() -> Result<(), anyhow::Error> {
        let jwks = MockJwksServer::start().await;
        jwks.serve_status(500).await;

        let server = TestAuthlyServer::spawn(&jwks.jwks_url()).await?;
        assert!(server.registration().is_err());

        let addr = server.addr();
        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
        assert_eq!(server.url(), format!("http://{}", addr));
        assert_eq!(server.config().jwks_url, jwks.jwks_url());

        Ok(())
    }
}
