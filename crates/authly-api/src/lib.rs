//! Authly API service library.
//!
//! An HTTP service that authenticates callers by their bearer tokens. Tokens
//! are JWTs issued by a Better Auth server and verified against the public
//! keys it publishes at its JWKS endpoint.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth::AuthGate -> handlers/*.rs
//!                                          |
//!                          bearer -> jwks (KeySetCache) -> jwt -> identity
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, key set cache, validation and identity
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and metrics middleware
//! - `models` - Response bodies
//! - `observability` - Metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
