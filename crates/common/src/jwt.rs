//! JWT utilities shared across Authly crates.
//!
//! This module provides the pieces of JWT handling that do not depend on a
//! key set:
//! - Size limits for DoS prevention
//! - Clock skew constants for temporal claim validation
//! - Compact-serialization splitting and base64url segment decoding
//! - `exp` / `nbf` / `iat` validation against an explicit clock
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding (DoS prevention)
//! - Error messages are generic to prevent information leakage; details are
//!   logged at debug level under the `common.jwt` target
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_compact, validate_temporal_claims, DEFAULT_CLOCK_SKEW};
//!
//! let parts = split_compact(token)?;
//! let payload = decode_segment(parts.payload)?;
//! // ... verify the signature over parts.signing_input ...
//! validate_temporal_claims(claims.iat, claims.nbf, claims.exp, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical session tokens are 300-900 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance applied to `exp`, `nbf` and `iat` (30 seconds).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(30);

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Configuration above this value is rejected at startup.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced by the key-independent JWT checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a three-segment compact JWT, or a segment is not base64url.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// `exp` is further in the past than the clock skew allows.
    #[error("The access token is invalid or expired")]
    Expired,

    /// `nbf` is further in the future than the clock skew allows.
    #[error("The access token is invalid or expired")]
    NotYetValid,

    /// `iat` is further in the future than the clock skew allows.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Compact serialization
// =============================================================================

/// The three segments of a compact JWT, borrowed from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactParts<'a> {
    /// Base64url-encoded JOSE header.
    pub header: &'a str,

    /// Base64url-encoded claims payload.
    pub payload: &'a str,

    /// Base64url-encoded signature (may be empty for unsecured tokens).
    pub signature: &'a str,

    /// `header.payload`, the bytes the signature is computed over.
    pub signing_input: &'a str,
}

/// Split a compact JWT into its segments.
///
/// # Errors
///
/// - `TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` if the token does not have exactly three segments or the
///   header or payload segment is empty
pub fn split_compact(token: &str) -> Result<CompactParts<'_>, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let (signing_input, signature) = token.rsplit_once('.').ok_or_else(|| {
        tracing::debug!(target: "common.jwt", "Token rejected: no segment separator");
        JwtValidationError::MalformedToken
    })?;

    let (header, payload) = signing_input.split_once('.').ok_or_else(|| {
        tracing::debug!(target: "common.jwt", "Token rejected: only two segments");
        JwtValidationError::MalformedToken
    })?;

    if payload.contains('.') {
        tracing::debug!(target: "common.jwt", "Token rejected: more than three segments");
        return Err(JwtValidationError::MalformedToken);
    }

    if header.is_empty() || payload.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty header or payload");
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(CompactParts {
        header,
        payload,
        signature,
        signing_input,
    })
}

/// Decode one base64url (unpadded) JWT segment.
///
/// # Errors
///
/// Returns `MalformedToken` if the segment is not valid base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

// =============================================================================
// Temporal claims
// =============================================================================

/// Validate `iat`, `nbf` and `exp` against the current time.
///
/// Absent claims are not checked.
///
/// # Errors
///
/// See [`validate_temporal_claims_at`].
pub fn validate_temporal_claims(
    iat: Option<i64>,
    nbf: Option<i64>,
    exp: Option<i64>,
    clock_skew: Duration,
) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_temporal_claims_at(iat, nbf, exp, clock_skew, now)
}

/// Deterministic variant of [`validate_temporal_claims`] against an explicit
/// `now` (Unix seconds).
///
/// The expiry check runs first so an expired token is always reported as
/// expired, whatever its other claims say.
///
/// # Errors
///
/// - `Expired` if `exp + skew < now`
/// - `NotYetValid` if `nbf - skew > now`
/// - `IatTooFarInFuture` if `iat - skew > now`
pub fn validate_temporal_claims_at(
    iat: Option<i64>,
    nbf: Option<i64>,
    exp: Option<i64>,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let skew = clock_skew.as_secs() as i64;

    if let Some(exp) = exp {
        if exp.saturating_add(skew) < now {
            tracing::debug!(
                target: "common.jwt",
                exp = exp,
                now = now,
                clock_skew_secs = skew,
                "Token rejected: expired"
            );
            return Err(JwtValidationError::Expired);
        }
    }

    if let Some(nbf) = nbf {
        if nbf.saturating_sub(skew) > now {
            tracing::debug!(
                target: "common.jwt",
                nbf = nbf,
                now = now,
                clock_skew_secs = skew,
                "Token rejected: not yet valid"
            );
            return Err(JwtValidationError::NotYetValid);
        }
    }

    if let Some(iat) = iat {
        if iat.saturating_sub(skew) > now {
            tracing::debug!(
                target: "common.jwt",
                iat = iat,
                now = now,
                clock_skew_secs = skew,
                "Token rejected: iat too far in the future"
            );
            return Err(JwtValidationError::IatTooFarInFuture);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
