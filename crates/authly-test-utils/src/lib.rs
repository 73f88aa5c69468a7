//! # Authly Test Utilities
//!
//! Shared test utilities for the Authly API.
//!
//! This crate provides:
//! - Crypto fixtures (deterministic Ed25519, generated P-256) with JWK rendering
//! - `TestTokenBuilder` for signed test tokens
//! - `MockJwksServer`, a wiremock-backed JWKS endpoint
//! - `TestAuthlyServer`, a real server bound to a random port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authly_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = Ed25519Fixture::new(1, "key-1");
//!     let jwks = MockJwksServer::start().await;
//!     jwks.serve_keys(&[key.jwk_json()]).await;
//!
//!     let server = TestAuthlyServer::spawn(&jwks.jwks_url()).await?;
//!     let token = TestTokenBuilder::for_user("user-42").sign(&key);
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use server_harness::*;
pub use token_builders::*;
