//! Handlers for authenticated callers.
//!
//! Both routes sit behind `require_auth`, which places the caller's
//! [`Identity`] in request extensions.

use crate::auth::Identity;
use crate::errors::ApiError;
use crate::models::VerifyResponse;
use axum::{Extension, Json};
use tracing::instrument;

fn require_identity(identity: Option<Extension<Identity>>) -> Result<Identity, ApiError> {
    identity.map(|Extension(identity)| identity).ok_or_else(|| {
        tracing::error!(target: "authly.handlers", "Identity missing from request extensions");
        ApiError::Internal
    })
}

/// Handler for GET /api/auth/verify
///
/// ```json
/// {
///   "status": "success",
///   "message": "Token is valid",
///   "user": {"id": "user-42", "email": "a@b.com", "name": ""}
/// }
/// ```
#[instrument(skip_all, name = "authly.handlers.verify")]
pub async fn verify_token(
    identity: Option<Extension<Identity>>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let user = require_identity(identity)?;
    Ok(Json(VerifyResponse::valid(user)))
}

/// Handler for GET /api/v1/me
///
/// Returns the caller's identity: `{"id", "email", "name"}`.
#[instrument(skip_all, name = "authly.handlers.me")]
pub async fn get_me(identity: Option<Extension<Identity>>) -> Result<Json<Identity>, ApiError> {
    tracing::debug!(target: "authly.handlers.me", "Returning caller identity");
    require_identity(identity).map(Json)
}
