//! Builder patterns for test token construction
//!
//! Provides a fluent API for signed test JWTs.

use crate::crypto_fixtures::SigningFixture;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Header};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
enum KidChoice {
    FromKey,
    Custom(String),
    Omitted,
}

/// Builder for signed test JWTs
///
/// `new()` starts with no claims at all; `for_user()` starts with a subject,
/// an email and a one hour lifetime.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::for_user("user-42")
///     .name("Ada")
///     .expires_in(60)
///     .sign(&key);
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    kid: KidChoice,
}

impl TestTokenBuilder {
    /// Create a builder with an empty payload
    pub fn new() -> Self {
        Self {
            claims: Map::new(),
            kid: KidChoice::FromKey,
        }
    }

    /// Create a builder for a typical session token
    pub fn for_user(subject: &str) -> Self {
        Self::new()
            .subject(subject)
            .email(&format!("{subject}@example.com"))
            .issued_at(Utc::now().timestamp())
            .expires_in(3600)
    }

    /// Set the subject (`sub`)
    pub fn subject(self, subject: &str) -> Self {
        self.claim("sub", Value::String(subject.to_string()))
    }

    /// Set the email claim
    pub fn email(self, email: &str) -> Self {
        self.claim("email", Value::String(email.to_string()))
    }

    /// Set the display name claim
    pub fn name(self, name: &str) -> Self {
        self.claim("name", Value::String(name.to_string()))
    }

    /// Set the issuer (`iss`)
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", Value::String(issuer.to_string()))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.claim("iat", Value::from(timestamp))
    }

    /// Set not-before timestamp
    pub fn not_before(self, timestamp: i64) -> Self {
        self.claim("nbf", Value::from(timestamp))
    }

    /// Set expiration timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim("exp", Value::from(timestamp))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.expires_at((Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set or replace an arbitrary claim
    pub fn claim(mut self, key: &str, value: Value) -> Self {
        self.claims.insert(key.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, key: &str) -> Self {
        self.claims.remove(key);
        self
    }

    /// Put `kid` in the header instead of the signing key's own ID
    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = KidChoice::Custom(kid.to_string());
        self
    }

    /// Leave `kid` out of the header
    pub fn without_kid(mut self) -> Self {
        self.kid = KidChoice::Omitted;
        self
    }

    /// The payload as JSON
    pub fn build(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with `key` and return the compact JWT
    pub fn sign<K: SigningFixture>(&self, key: &K) -> String {
        let mut header = Header::new(key.algorithm());
        header.kid = match &self.kid {
            KidChoice::FromKey => Some(key.kid().to_string()),
            KidChoice::Custom(kid) => Some(kid.clone()),
            KidChoice::Omitted => None,
        };

        encode(&header, &self.claims, &key.encoding_key()).expect("test token should sign")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
