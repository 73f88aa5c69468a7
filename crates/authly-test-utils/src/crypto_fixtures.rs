//! Cryptographic fixtures for testing
//!
//! Provides signing keys together with the JWK a JWKS endpoint would publish
//! for them. Ed25519 keys are deterministic based on a seed value; P-256 keys
//! are generated fresh because ring has no seeded ECDSA constructor.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, Ed25519KeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use serde_json::{json, Value};

/// A private key that can sign test tokens and describe itself as a JWK.
pub trait SigningFixture {
    /// Key ID placed in token headers and in the JWK.
    fn kid(&self) -> &str;

    /// JWS algorithm used when signing.
    fn algorithm(&self) -> Algorithm;

    /// jsonwebtoken key for signing.
    fn encoding_key(&self) -> EncodingKey;

    /// Public JWK, as served by a JWKS endpoint.
    fn jwk_json(&self) -> Value;
}

/// Deterministic Ed25519 keypair.
///
/// The same seed always produces the same keypair, ensuring test reproducibility.
///
/// # Example
/// ```rust,ignore
/// let key = Ed25519Fixture::new(1, "key-1");
/// assert_eq!(key.jwk_json(), Ed25519Fixture::new(1, "key-1").jwk_json());
/// ```
#[derive(Debug, Clone)]
pub struct Ed25519Fixture {
    kid: String,
    public_key: Vec<u8>,
    pkcs8: Vec<u8>,
}

impl Ed25519Fixture {
    /// Build the keypair for `seed` (0-255) under key ID `kid`.
    pub fn new(seed: u8, kid: &str) -> Self {
        let seed_bytes = seed_bytes(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("32-byte seed is always a valid Ed25519 seed");

        Self {
            kid: kid.to_string(),
            public_key: key_pair.public_key().as_ref().to_vec(),
            pkcs8: build_pkcs8_from_seed(&seed_bytes),
        }
    }

    /// Raw 32-byte public key.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Same key material under a different key ID.
    pub fn with_kid(&self, kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            ..self.clone()
        }
    }
}

impl SigningFixture for Ed25519Fixture {
    fn kid(&self) -> &str {
        &self.kid
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_ed_der(&self.pkcs8)
    }

    fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(&self.public_key),
            "alg": "EdDSA",
            "use": "sig",
        })
    }
}

/// Freshly generated ECDSA P-256 keypair (ES256).
#[derive(Debug, Clone)]
pub struct P256Fixture {
    kid: String,
    public_key: Vec<u8>,
    pkcs8: Vec<u8>,
}

impl P256Fixture {
    /// Generate a new keypair under key ID `kid`.
    pub fn generate(kid: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .expect("P-256 key generation should succeed");
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .expect("freshly generated PKCS#8 should parse");

        Self {
            kid: kid.to_string(),
            public_key: key_pair.public_key().as_ref().to_vec(),
            pkcs8: pkcs8.as_ref().to_vec(),
        }
    }

    /// Uncompressed SEC1 point split into its (x, y) coordinates.
    fn coordinates(&self) -> (&[u8], &[u8]) {
        // 0x04 || x (32 bytes) || y (32 bytes)
        let point = self
            .public_key
            .get(1..65)
            .expect("uncompressed P-256 point is 65 bytes");
        point.split_at(32)
    }
}

impl SigningFixture for P256Fixture {
    fn kid(&self) -> &str {
        &self.kid
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::ES256
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_ec_der(&self.pkcs8)
    }

    fn jwk_json(&self) -> Value {
        let (x, y) = self.coordinates();
        json!({
            "kty": "EC",
            "crv": "P-256",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(x),
            "y": URL_SAFE_NO_PAD.encode(y),
            "alg": "ES256",
            "use": "sig",
        })
    }
}

/// Wrap JWKs into a JWKS document.
pub fn jwks_json(keys: &[Value]) -> Value {
    json!({ "keys": keys })
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    for (i, byte) in seed_bytes.iter_mut().enumerate() {
        let i = i as u8;
        *byte = seed.wrapping_mul(i.wrapping_add(1)).wrapping_add(i);
    }
    seed_bytes
}

/// Build a PKCS#8 v1 document from an Ed25519 seed (RFC 8410).
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_fixture_is_deterministic() {
        let a = Ed25519Fixture::new(1, "key-1");
        let b = Ed25519Fixture::new(1, "key-1");
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.jwk_json(), b.jwk_json());
    }

    #[test]
    fn test_different_seeds_produce_different_keys() {
        let a = Ed25519Fixture::new(1, "key");
        let b = Ed25519Fixture::new(2, "key");
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_ed25519_pkcs8_round_trips_through_ring() {
        let fixture = Ed25519Fixture::new(7, "key-7");
        let parsed = Ed25519KeyPair::from_pkcs8_maybe_unchecked(&fixture.pkcs8).unwrap();
        assert_eq!(parsed.public_key().as_ref(), fixture.public_key());
    }

    #[test]
    fn test_ed25519_jwk_shape() {
        let jwk = Ed25519Fixture::new(1, "key-1").jwk_json();
        assert_eq!(jwk["kty"], "OKP");
        assert_eq!(jwk["crv"], "Ed25519");
        assert_eq!(jwk["kid"], "key-1");
        assert_eq!(jwk["x"].as_str().unwrap().len(), 43);
    }

    #[test]
    fn test_p256_jwk_shape() {
        let jwk = P256Fixture::generate("ec-1").jwk_json();
        assert_eq!(jwk["kty"], "EC");
        assert_eq!(jwk["crv"], "P-256");
        assert_eq!(jwk["x"].as_str().unwrap().len(), 43);
        assert_eq!(jwk["y"].as_str().unwrap().len(), 43);
    }

    #[test]
    fn test_with_kid_keeps_key_material() {
        let a = Ed25519Fixture::new(3, "old");
        let b = a.with_kid("new");
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(b.kid(), "new");
    }
}
