//! JWT claims structure.
//!
//! Claims are decoded once, straight from the token payload, into a typed
//! struct. Identity fields are lenient: a value of an unexpected JSON type is
//! treated as absent. Temporal fields are strict: a non-numeric `exp`, `nbf`
//! or `iat` makes the whole token malformed, since silently dropping an
//! expiry would extend a token's lifetime.
//!
//! The `sub` and `email` fields are redacted in Debug output.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Decoded token payload.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id) - redacted in Debug output.
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub: Option<String>,

    /// User email - redacted in Debug output.
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,

    /// Display name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    /// Issuer.
    #[serde(default, deserialize_with = "lenient_string")]
    pub iss: Option<String>,

    /// Issued-at (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,

    /// Not-before (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub nbf: Option<i64>,

    /// Expiration (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("iss", &self.iss)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Accept a string; anything else (number, bool, object, null) is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Accept an RFC 7519 NumericDate: integer or fractional seconds.
///
/// Fractions are truncated toward zero. `null` counts as absent.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                Ok(Some(secs))
            } else if let Some(secs) = n.as_f64().filter(|f| f.is_finite()) {
                // Saturating float-to-int conversion
                #[allow(clippy::cast_possible_truncation)]
                Ok(Some(secs as i64))
            } else {
                Err(serde::de::Error::custom("NumericDate out of range"))
            }
        }
        other => Err(serde::de::Error::custom(format!(
            "expected NumericDate, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
