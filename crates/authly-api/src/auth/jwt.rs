//! JWT validation against a cached key set.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - `alg: none` and HMAC algorithms never verify: a key is only tried with
//!   the algorithms of its own family
//! - Expiration, not-before and issued-at are checked with clock skew tolerance
//! - Failure details are logged at debug level only

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::auth::jwks::KeySet;
use common::jwt::{
    decode_segment, split_compact, validate_temporal_claims_at, JwtValidationError,
    DEFAULT_CLOCK_SKEW,
};
use jsonwebtoken::{crypto, decode_header};
use std::time::Duration;
use tracing::instrument;

/// Stateless token validator; the key set is supplied per call.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    clock_skew: Duration,
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_SKEW)
    }
}

impl TokenValidator {
    pub fn new(clock_skew: Duration) -> Self {
        Self { clock_skew }
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Validate a token against `keys` at the current time.
    ///
    /// # Errors
    ///
    /// See [`TokenValidator::validate_at`].
    pub fn validate(&self, token: &str, keys: &KeySet) -> Result<Claims, AuthError> {
        self.validate_at(token, keys, chrono::Utc::now().timestamp())
    }

    /// Validate a token against `keys` at `now` (Unix seconds).
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before decoding
    /// 2. Structure - three segments, known `alg`, base64url signature
    /// 3. Signature - candidate keys by `kid`, first that verifies wins
    /// 4. Claims - payload decoded into [`Claims`] only after the signature verified
    /// 5. Temporal - `exp`, `nbf` and `iat` with clock skew tolerance
    ///
    /// # Errors
    ///
    /// - `MalformedToken` for size or structure failures
    /// - `InvalidSignature` if no candidate key verifies the signature
    /// - `ExpiredToken` / `NotYetValid` for temporal failures
    #[instrument(skip_all, fields(key_set_version = keys.version()))]
    pub fn validate_at(&self, token: &str, keys: &KeySet, now: i64) -> Result<Claims, AuthError> {
        let parts = split_compact(token).map_err(|e| {
            tracing::debug!(target: "authly.auth.jwt", error = ?e, "Token structure rejected");
            AuthError::MalformedToken
        })?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "authly.auth.jwt", error = %e, "Token header rejected");
            AuthError::MalformedToken
        })?;

        // Checked before any key is tried; the result must not depend on the key set
        if decode_segment(parts.signature).is_err() {
            tracing::debug!(target: "authly.auth.jwt", "Token signature is not base64url");
            return Err(AuthError::MalformedToken);
        }

        let kid = header.kid.as_deref();
        let mut tried = 0usize;
        let mut verified = false;

        for key in keys.candidates(kid).filter(|key| key.supports(header.alg)) {
            tried += 1;
            match crypto::verify(
                parts.signature,
                parts.signing_input.as_bytes(),
                key.decoding_key(),
                header.alg,
            ) {
                Ok(true) => {
                    verified = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(
                        target: "authly.auth.jwt",
                        kid = ?key.kid(),
                        error = %e,
                        "Key could not verify token"
                    );
                }
            }
        }

        if !verified {
            tracing::debug!(
                target: "authly.auth.jwt",
                alg = ?header.alg,
                kid = ?kid,
                candidates = tried,
                "Token signature did not verify"
            );
            return Err(AuthError::InvalidSignature);
        }

        // Payload content is only interpreted once the signature is trusted
        let claims: Claims = decode_segment(parts.payload)
            .map_err(|_| AuthError::MalformedToken)
            .and_then(|payload| {
                serde_json::from_slice(&payload).map_err(|e| {
                    tracing::debug!(target: "authly.auth.jwt", error = %e, "Token payload rejected");
                    AuthError::MalformedToken
                })
            })?;

        validate_temporal_claims_at(claims.iat, claims.nbf, claims.exp, self.clock_skew, now)
            .map_err(|e| match e {
                JwtValidationError::Expired => AuthError::ExpiredToken,
                JwtValidationError::NotYetValid | JwtValidationError::IatTooFarInFuture => {
                    AuthError::NotYetValid
                }
                JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                    AuthError::MalformedToken
                }
            })?;

        tracing::debug!(target: "authly.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}
