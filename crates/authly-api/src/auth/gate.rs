//! Request authentication pipeline.
//!
//! Composes bearer extraction, key lookup, token validation and identity
//! building. The first failing stage ends the request and its error is
//! returned unchanged.

use crate::auth::bearer::extract_from_headers;
use crate::auth::error::AuthError;
use crate::auth::identity::{build_identity, Identity};
use crate::auth::jwks::KeySetCache;
use crate::auth::jwt::TokenValidator;
use crate::observability::metrics::record_auth_attempt;
use axum::http::HeaderMap;
use std::fmt;
use tracing::instrument;

/// Progress of a single request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    TokenExtracted,
    KeysResolved,
    Validated,
    IdentityBuilt,
}

impl AuthStage {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthStage::Unauthenticated => "unauthenticated",
            AuthStage::TokenExtracted => "token_extracted",
            AuthStage::KeysResolved => "keys_resolved",
            AuthStage::Validated => "validated",
            AuthStage::IdentityBuilt => "identity_built",
        }
    }
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticates requests against the key set published at one URL.
#[derive(Debug, Clone)]
pub struct AuthGate {
    key_cache: KeySetCache,
    jwks_url: String,
    validator: TokenValidator,
}

impl AuthGate {
    /// Create a gate. `jwks_url` should already be registered with `key_cache`;
    /// until it is, requests fail with `NotRegistered`.
    pub fn new(key_cache: KeySetCache, jwks_url: impl Into<String>, validator: TokenValidator) -> Self {
        Self {
            key_cache,
            jwks_url: jwks_url.into(),
            validator,
        }
    }

    pub fn key_cache(&self) -> &KeySetCache {
        &self.key_cache
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Authenticate a request from its headers.
    ///
    /// Never performs network I/O; key refreshes happen in the background.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first stage that failed.
    #[instrument(skip_all, name = "authly.auth.gate")]
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let mut stage = AuthStage::Unauthenticated;
        let result = self.run(headers, &mut stage);

        match &result {
            Ok(_) => {
                record_auth_attempt("success");
                tracing::debug!(target: "authly.auth.gate", stage = %stage, "Request authenticated");
            }
            Err(e) => {
                record_auth_attempt(e.kind());
                if e.is_client_fault() {
                    tracing::debug!(
                        target: "authly.auth.gate",
                        stage = %stage,
                        kind = e.kind(),
                        "Request rejected"
                    );
                } else {
                    tracing::warn!(
                        target: "authly.auth.gate",
                        stage = %stage,
                        kind = e.kind(),
                        error = %e,
                        "Request rejected: key set unavailable"
                    );
                }
            }
        }

        result
    }

    fn run(&self, headers: &HeaderMap, stage: &mut AuthStage) -> Result<Identity, AuthError> {
        let token = extract_from_headers(headers)?;
        *stage = AuthStage::TokenExtracted;

        let keys = self.key_cache.lookup(&self.jwks_url)?;
        *stage = AuthStage::KeysResolved;

        let claims = self.validator.validate(token.as_str(), &keys)?;
        *stage = AuthStage::Validated;

        let identity = build_identity(claims)?;
        *stage = AuthStage::IdentityBuilt;

        Ok(identity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::KeySetCacheConfig;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn gate() -> AuthGate {
        AuthGate::new(
            KeySetCache::new(KeySetCacheConfig::default()),
            "http://localhost:3000/api/auth/jwks",
            TokenValidator::default(),
        )
    }

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[tokio::test]
    async fn test_header_errors_short_circuit_before_key_lookup() {
        let gate = gate();

        assert_eq!(
            gate.authenticate(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        );
        assert_eq!(
            gate.authenticate(&headers("Basic xyz")),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            gate.authenticate(&headers("Bearer ")),
            Err(AuthError::EmptyToken)
        );
    }

    #[tokio::test]
    async fn test_unregistered_url_is_infrastructure_fault() {
        let result = gate().authenticate(&headers("Bearer abc.def.ghi"));
        assert!(matches!(result, Err(AuthError::NotRegistered { .. })));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(AuthStage::Unauthenticated.to_string(), "unauthenticated");
        assert_eq!(AuthStage::IdentityBuilt.as_str(), "identity_built");
    }
}
