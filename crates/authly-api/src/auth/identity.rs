//! Authenticated identity derived from validated claims.

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use serde::{Deserialize, Serialize};

/// The authenticated caller, attached to request extensions by the auth
/// middleware and read by handlers via `Extension<Identity>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject of the token (user id). Never empty.
    pub id: String,

    /// Email claim, or empty.
    pub email: String,

    /// Display name claim, or empty.
    pub name: String,
}

/// Build an [`Identity`] from validated claims.
///
/// # Errors
///
/// Returns `MissingSubject` if `sub` is absent or empty.
pub fn build_identity(claims: Claims) -> Result<Identity, AuthError> {
    let id = claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or(AuthError::MissingSubject)?;

    Ok(Identity {
        id,
        email: claims.email.unwrap_or_default(),
        name: claims.name.unwrap_or_default(),
    })
}
