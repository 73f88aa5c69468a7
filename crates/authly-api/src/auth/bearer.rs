//! Bearer token extraction from the `Authorization` header.

use crate::auth::error::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::fmt;

/// Literal scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// A raw bearer token borrowed from the request's `Authorization` header.
///
/// Always non-empty. The value is a credential, so `Debug` does not print it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawToken<'a>(&'a str);

impl<'a> RawToken<'a> {
    /// The token text with the `Bearer ` prefix removed.
    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl fmt::Debug for RawToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawToken").field(&"[REDACTED]").finish()
    }
}

/// Parse an `Authorization` header value into a raw token.
///
/// # Errors
///
/// - `MissingHeader` if the header is absent or empty
/// - `MalformedHeader` if it does not start with `"Bearer "`
/// - `EmptyToken` if nothing follows the prefix
pub fn extract_bearer(header: Option<&str>) -> Result<RawToken<'_>, AuthError> {
    let value = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)?;

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }

    Ok(RawToken(token))
}

/// Extract the bearer token from request headers.
///
/// A header value that is not visible ASCII cannot carry a compact JWT and is
/// reported as `MalformedHeader`.
pub fn extract_from_headers(headers: &HeaderMap) -> Result<RawToken<'_>, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AuthError::MalformedHeader))
        .transpose()?;

    extract_bearer(header)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_bearer_header() {
        let token = extract_bearer(Some("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token.as_str(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer(None), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_empty_header_is_missing() {
        assert_eq!(extract_bearer(Some("")), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_wrong_scheme_is_malformed() {
        for header in ["Basic xyz", "bearer abc", "BEARER abc", "Bearer", "Token abc", " Bearer abc"] {
            assert_eq!(
                extract_bearer(Some(header)),
                Err(AuthError::MalformedHeader),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_prefix_only_is_empty_token() {
        assert_eq!(extract_bearer(Some("Bearer ")), Err(AuthError::EmptyToken));
    }

    #[test]
    fn test_remainder_is_not_trimmed() {
        // Only the literal prefix is stripped; the rest is passed through as-is
        let token = extract_bearer(Some("Bearer  two-spaces")).unwrap();
        assert_eq!(token.as_str(), " two-spaces");
    }

    #[test]
    fn test_raw_token_debug_is_redacted() {
        let token = extract_bearer(Some("Bearer secret-token")).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_extract_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            extract_from_headers(&headers),
            Err(AuthError::MissingHeader)
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_from_headers(&headers).unwrap().as_str(), "tok");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(
            extract_from_headers(&headers),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn test_non_ascii_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xffabc").unwrap(),
        );
        assert_eq!(
            extract_from_headers(&headers),
            Err(AuthError::MalformedHeader)
        );
    }
}
