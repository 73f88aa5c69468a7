//! Response bodies for the Authly API.

use crate::auth::Identity;
use serde::Serialize;

/// Name reported by `/health`.
pub const SERVICE_NAME: &str = "authly-api";

/// Key set state as reported by health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JwksState {
    /// At least one key set has been fetched.
    Loaded,
    /// No key set is available yet.
    Unavailable,
}

/// Liveness response returned by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,

    /// Unix timestamp of the response.
    pub timestamp: i64,

    /// Service name.
    pub service: &'static str,

    /// Whether tokens can currently be verified.
    pub jwks: JwksState,
}

/// Readiness response returned by `/ready`.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    pub jwks: JwksState,

    /// Generic error message when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for `/api/auth/verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    /// Always "success".
    pub status: &'static str,

    /// Human-readable result.
    pub message: &'static str,

    /// The authenticated caller.
    pub user: Identity,
}

impl VerifyResponse {
    pub fn valid(user: Identity) -> Self {
        Self {
            status: "success",
            message: "Token is valid",
            user,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_shape() {
        let response = VerifyResponse::valid(Identity {
            id: "user-42".to_string(),
            email: "a@b.com".to_string(),
            name: String::new(),
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "status": "success",
                "message": "Token is valid",
                "user": {"id": "user-42", "email": "a@b.com", "name": ""}
            })
        );
    }

    #[test]
    fn test_readiness_response_omits_empty_error() {
        let response = ReadinessResponse {
            status: "ready",
            jwks: JwksState::Loaded,
            error: None,
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"status": "ready", "jwks": "loaded"})
        );
    }
}
