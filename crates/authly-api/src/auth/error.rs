//! Authentication pipeline error kinds.
//!
//! Every stage of the pipeline fails with exactly one of these kinds and the
//! orchestrator passes it through unchanged. Kinds split into two families:
//!
//! - **Client faults** - the presented credential is missing or bad. The HTTP
//!   layer answers 401 with a generic message and never reveals which check
//!   failed.
//! - **Infrastructure faults** - the key cache cannot answer. The HTTP layer
//!   answers 502/503 and logs the detail server-side.

use thiserror::Error;

/// Failure of one stage of the token verification pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("invalid Authorization header")]
    MalformedHeader,

    #[error("empty bearer token")]
    EmptyToken,

    #[error("malformed token")]
    MalformedToken,

    #[error("token signature did not verify against any key")]
    InvalidSignature,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token has no subject")]
    MissingSubject,

    #[error("failed to register key set source {url}: {reason}")]
    RegistrationError { url: String, reason: String },

    #[error("no key set has been fetched yet from {url}: {reason}")]
    FetchError { url: String, reason: String },

    #[error("key set source {url} is not registered")]
    NotRegistered { url: String },
}

impl AuthError {
    /// True when the request's credential is at fault (HTTP 401).
    pub fn is_client_fault(&self) -> bool {
        !self.is_infrastructure_fault()
    }

    /// True when the key cache could not serve the request (HTTP 502/503).
    pub fn is_infrastructure_fault(&self) -> bool {
        matches!(
            self,
            AuthError::RegistrationError { .. }
                | AuthError::FetchError { .. }
                | AuthError::NotRegistered { .. }
        )
    }

    /// Stable, bounded label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::EmptyToken => "empty_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredToken => "expired_token",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::MissingSubject => "missing_subject",
            AuthError::RegistrationError { .. } => "registration_error",
            AuthError::FetchError { .. } => "fetch_error",
            AuthError::NotRegistered { .. } => "not_registered",
        }
    }
}
