//! JWKS key cache.
//!
//! Fetches JSON Web Key Sets from one or more discovery URLs and keeps the
//! latest successfully fetched set for each URL in memory.
//!
//! # Concurrency
//!
//! - Each registered URL owns a [`KeySet`] snapshot held in an
//!   [`ArcSwapOption`]. Refresh builds a complete new snapshot and swaps the
//!   pointer, so readers always see either the old or the new set, never a mix.
//! - The URL map itself is an [`ArcSwap`] replaced copy-on-write when a URL is
//!   registered. [`KeySetCache::lookup`] takes no lock and performs no I/O.
//! - At most one refresh per URL is in flight (single-permit semaphore).
//!
//! # Freshness
//!
//! - A background task per URL refetches every refresh interval plus jitter.
//! - A lookup that finds a snapshot older than the staleness threshold kicks
//!   off a background refresh and still returns the stale snapshot.
//! - A failed fetch leaves the previous snapshot in place (stale-but-available).

use crate::auth::error::AuthError;
use crate::observability::metrics::record_jwks_refresh;
use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Default interval between background refreshes (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Default retry interval for a URL that has never loaded.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default age after which a lookup triggers an early refresh (15 minutes).
pub const DEFAULT_MAX_STALENESS: Duration = Duration::from_secs(900);

/// Largest JWKS document accepted (64KB).
pub const MAX_JWKS_BODY_BYTES: usize = 64 * 1024;

/// RSA algorithms a bare RSA key may verify.
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

// =============================================================================
// Wire format
// =============================================================================

/// JSON Web Key as published by the discovery endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP", "EC" or "RSA").
    #[serde(default)]
    pub kty: String,

    /// Key ID used to select the key for a token.
    #[serde(default)]
    pub kid: Option<String>,

    /// Curve name for OKP and EC keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key, or EC x coordinate (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is restricted to.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
///
/// Keys are kept as raw JSON so that a single key of an unexpected shape is
/// skipped instead of failing the whole document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<serde_json::Value>,
}

// =============================================================================
// Key set
// =============================================================================

/// A public key prepared for signature verification.
#[derive(Clone)]
pub struct VerificationKey {
    kid: Option<String>,
    algorithms: Vec<Algorithm>,
    decoding_key: DecodingKey,
}

impl VerificationKey {
    /// Prepare a JWK for verification.
    ///
    /// # Errors
    ///
    /// Returns a short reason when the key is not a usable signing key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, String> {
        if let Some(key_use) = jwk.key_use.as_deref() {
            if key_use != "sig" {
                return Err(format!("key use '{key_use}' is not 'sig'"));
            }
        }

        let (family, decoding_key): (Vec<Algorithm>, DecodingKey) = match jwk.kty.as_str() {
            "OKP" => {
                if jwk.crv.as_deref() != Some("Ed25519") {
                    return Err(format!("unsupported OKP curve {:?}", jwk.crv));
                }
                let x = jwk.x.as_deref().ok_or("OKP key missing x")?;
                let key = DecodingKey::from_ed_components(x)
                    .map_err(|e| format!("invalid OKP key material: {e}"))?;
                (vec![Algorithm::EdDSA], key)
            }
            "EC" => {
                let alg = match jwk.crv.as_deref() {
                    Some("P-256") => Algorithm::ES256,
                    Some("P-384") => Algorithm::ES384,
                    other => return Err(format!("unsupported EC curve {other:?}")),
                };
                let x = jwk.x.as_deref().ok_or("EC key missing x")?;
                let y = jwk.y.as_deref().ok_or("EC key missing y")?;
                let key = DecodingKey::from_ec_components(x, y)
                    .map_err(|e| format!("invalid EC key material: {e}"))?;
                (vec![alg], key)
            }
            "RSA" => {
                let n = jwk.n.as_deref().ok_or("RSA key missing n")?;
                let e = jwk.e.as_deref().ok_or("RSA key missing e")?;
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| format!("invalid RSA key material: {e}"))?;
                (RSA_ALGORITHMS.to_vec(), key)
            }
            other => return Err(format!("unsupported key type '{other}'")),
        };

        // A declared alg narrows the key to that one algorithm of its family
        let algorithms = match jwk.alg.as_deref() {
            None => family,
            Some(alg) => {
                let alg = Algorithm::from_str(alg)
                    .map_err(|_| format!("unknown algorithm '{alg}'"))?;
                if !family.contains(&alg) {
                    return Err(format!("algorithm {alg:?} does not match key type"));
                }
                vec![alg]
            }
        };

        Ok(Self {
            kid: jwk.kid.clone(),
            algorithms,
            decoding_key,
        })
    }

    /// Key ID, if the JWK declared one.
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Whether this key may verify tokens signed with `alg`.
    pub fn supports(&self, alg: Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

/// Immutable, versioned snapshot of the verification keys from one URL.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: Vec<VerificationKey>,
    version: u64,
    fetched_at: DateTime<Utc>,
    loaded_at: Instant,
}

impl KeySet {
    /// Build a key set from a JWKS document, skipping unusable keys.
    pub fn from_document(document: &JwksDocument, version: u64) -> Self {
        let keys = document
            .keys
            .iter()
            .filter_map(|raw| {
                let jwk: Jwk = match serde_json::from_value(raw.clone()) {
                    Ok(jwk) => jwk,
                    Err(e) => {
                        tracing::debug!(target: "authly.auth.jwks", error = %e, "Skipping undecodable JWK");
                        return None;
                    }
                };
                match VerificationKey::from_jwk(&jwk) {
                    Ok(key) => Some(key),
                    Err(reason) => {
                        tracing::debug!(
                            target: "authly.auth.jwks",
                            kid = ?jwk.kid,
                            reason = %reason,
                            "Skipping unusable JWK"
                        );
                        None
                    }
                }
            })
            .collect();

        Self::from_keys(keys, version)
    }

    /// Build a key set from already prepared keys.
    pub fn from_keys(keys: Vec<VerificationKey>, version: u64) -> Self {
        Self {
            keys,
            version,
            fetched_at: Utc::now(),
            loaded_at: Instant::now(),
        }
    }

    /// Keys to try for a token: the keys with a matching `kid` when the token
    /// names one, every key otherwise.
    pub fn candidates<'a>(
        &'a self,
        kid: Option<&'a str>,
    ) -> impl Iterator<Item = &'a VerificationKey> + 'a {
        self.keys
            .iter()
            .filter(move |key| kid.is_none() || key.kid() == kid)
    }

    pub fn keys(&self) -> &[VerificationKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Monotonic per-URL snapshot number, starting at 1.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Wall-clock time of the fetch that produced this snapshot.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Time since the fetch that produced this snapshot.
    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Tuning for [`KeySetCache`].
#[derive(Debug, Clone)]
pub struct KeySetCacheConfig {
    /// Interval between background refreshes (jitter of up to 10% is added).
    pub refresh_interval: Duration,

    /// Retry interval while a URL has never loaded.
    pub retry_interval: Duration,

    /// Bound on a single fetch, including reading the body.
    pub fetch_timeout: Duration,

    /// Snapshot age beyond which a lookup triggers an early refresh.
    pub max_staleness: Duration,
}

impl Default for KeySetCacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_staleness: DEFAULT_MAX_STALENESS,
        }
    }
}

/// Point-in-time view of one cache entry, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySetStatus {
    pub url: String,
    pub version: Option<u64>,
    pub key_count: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct CacheEntry {
    url: String,
    snapshot: ArcSwapOption<KeySet>,
    last_error: ArcSwapOption<String>,
    refresh_permit: Arc<Semaphore>,
}

impl CacheEntry {
    fn new(url: String) -> Self {
        Self {
            url,
            snapshot: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
            refresh_permit: Arc::new(Semaphore::new(1)),
        }
    }

    fn fetch_error(&self) -> AuthError {
        let reason = self
            .last_error
            .load_full()
            .map_or_else(|| "no successful fetch yet".to_string(), |e| e.to_string());
        AuthError::FetchError {
            url: self.url.clone(),
            reason,
        }
    }
}

struct CacheInner {
    http_client: reqwest::Client,
    config: KeySetCacheConfig,
    entries: ArcSwap<HashMap<String, Arc<CacheEntry>>>,
    register_lock: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Process-wide cache of signing key sets, keyed by discovery URL.
///
/// Cloning is cheap and every clone shares the same entries. Background
/// refresh tasks stop on [`KeySetCache::shutdown`] or when the last clone is
/// dropped.
#[derive(Clone)]
pub struct KeySetCache {
    inner: Arc<CacheInner>,
}

impl KeySetCache {
    /// Create an empty cache.
    pub fn new(config: KeySetCacheConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(concat!("authly-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authly.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            inner: Arc::new(CacheInner {
                http_client,
                config,
                entries: ArcSwap::from_pointee(HashMap::new()),
                register_lock: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &KeySetCacheConfig {
        &self.inner.config
    }

    /// Register a discovery URL and perform its first fetch.
    ///
    /// Registering an already registered URL is a no-op. If the first fetch
    /// fails the URL stays registered and its background task keeps retrying,
    /// so lookups report `FetchError` until a fetch succeeds. The registration
    /// lock is released before the first fetch, so a slow source never delays
    /// registration of another URL.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError` if the URL is not a valid http(s) URL or
    /// the first fetch fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn register(&self, url: &str) -> Result<(), AuthError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| AuthError::RegistrationError {
            url: url.to_string(),
            reason: format!("invalid URL: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuthError::RegistrationError {
                url: url.to_string(),
                reason: format!("unsupported URL scheme '{}'", parsed.scheme()),
            });
        }

        let guard = self.inner.register_lock.lock().await;

        if self.inner.entries.load().contains_key(url) {
            tracing::debug!(target: "authly.auth.jwks", url = %url, "Key set source already registered");
            return Ok(());
        }

        let entry = Arc::new(CacheEntry::new(url.to_string()));
        let mut entries = HashMap::clone(&self.inner.entries.load());
        entries.insert(url.to_string(), Arc::clone(&entry));
        self.inner.entries.store(Arc::new(entries));
        drop(guard);

        tracing::info!(target: "authly.auth.jwks", url = %url, "Registered key set source");

        let first_fetch = self.inner.refresh_entry(&entry).await;

        // Spawned after the first fetch so its first delay reflects the outcome
        spawn_refresh_task(&self.inner, Arc::clone(&entry));

        first_fetch
            .map(|_| ())
            .map_err(|e| AuthError::RegistrationError {
                url: url.to_string(),
                reason: match e {
                    AuthError::FetchError { reason, .. } => reason,
                    other => other.to_string(),
                },
            })
    }

    /// Return the latest key set for `url`.
    ///
    /// Never blocks on the network. A snapshot older than the staleness
    /// threshold triggers a background refresh and is still returned.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` if `url` was never registered
    /// - `FetchError` if no fetch for `url` has succeeded yet
    pub fn lookup(&self, url: &str) -> Result<Arc<KeySet>, AuthError> {
        let entries = self.inner.entries.load();
        let entry = entries.get(url).ok_or_else(|| AuthError::NotRegistered {
            url: url.to_string(),
        })?;

        let snapshot = entry.snapshot.load_full().ok_or_else(|| entry.fetch_error())?;

        if snapshot.age() > self.inner.config.max_staleness {
            tracing::debug!(
                target: "authly.auth.jwks",
                url = %url,
                age_secs = snapshot.age().as_secs(),
                "Key set is stale, scheduling refresh"
            );
            self.spawn_early_refresh(entry);
        }

        Ok(snapshot)
    }

    /// Refetch `url` now, waiting for any in-flight refresh first.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` if `url` was never registered
    /// - `FetchError` if this fetch failed (the previous snapshot is kept)
    pub async fn refresh(&self, url: &str) -> Result<Arc<KeySet>, AuthError> {
        let entry = self
            .inner
            .entries
            .load()
            .get(url)
            .cloned()
            .ok_or_else(|| AuthError::NotRegistered {
                url: url.to_string(),
            })?;

        self.inner.refresh_entry(&entry).await
    }

    /// Status of `url`, or `None` if it was never registered.
    pub fn status(&self, url: &str) -> Option<KeySetStatus> {
        let entries = self.inner.entries.load();
        let entry = entries.get(url)?;
        let snapshot = entry.snapshot.load_full();

        Some(KeySetStatus {
            url: entry.url.clone(),
            version: snapshot.as_ref().map(|ks| ks.version()),
            key_count: snapshot.as_ref().map_or(0, |ks| ks.len()),
            fetched_at: snapshot.as_ref().map(|ks| ks.fetched_at()),
            last_error: entry.last_error.load_full().map(|e| e.to_string()),
        })
    }

    /// Registered URLs.
    pub fn registered_urls(&self) -> Vec<String> {
        self.inner.entries.load().keys().cloned().collect()
    }

    /// Stop all background refresh tasks. Cached snapshots stay readable.
    pub fn shutdown(&self) {
        tracing::info!(target: "authly.auth.jwks", "Stopping key set refresh tasks");
        self.inner.shutdown.cancel();
    }

    fn spawn_early_refresh(&self, entry: &Arc<CacheEntry>) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        // Skip if a refresh is already running for this URL
        let Ok(permit) = Arc::clone(&entry.refresh_permit).try_acquire_owned() else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        let entry = Arc::clone(entry);
        runtime.spawn(async move {
            let _ = inner.refresh_with_permit(&entry, permit).await;
        });
    }
}

impl fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySetCache")
            .field("config", &self.inner.config)
            .field("registered_urls", &self.registered_urls())
            .finish_non_exhaustive()
    }
}

impl CacheInner {
    async fn refresh_entry(&self, entry: &CacheEntry) -> Result<Arc<KeySet>, AuthError> {
        let permit = Arc::clone(&entry.refresh_permit)
            .acquire_owned()
            .await
            .map_err(|_| entry.fetch_error())?;
        self.refresh_with_permit(entry, permit).await
    }

    #[instrument(skip_all, fields(url = %entry.url))]
    async fn refresh_with_permit(
        &self,
        entry: &CacheEntry,
        _permit: OwnedSemaphorePermit,
    ) -> Result<Arc<KeySet>, AuthError> {
        let start = std::time::Instant::now();
        let next_version = entry
            .snapshot
            .load_full()
            .map_or(1, |current| current.version() + 1);

        match self.fetch_key_set(&entry.url, next_version).await {
            Ok(key_set) => {
                let key_set = Arc::new(key_set);
                entry.snapshot.store(Some(Arc::clone(&key_set)));
                entry.last_error.store(None);
                record_jwks_refresh("success", start.elapsed());

                tracing::info!(
                    target: "authly.auth.jwks",
                    url = %entry.url,
                    version = key_set.version(),
                    key_count = key_set.len(),
                    "JWKS cache refreshed"
                );
                Ok(key_set)
            }
            Err(reason) => {
                entry.last_error.store(Some(Arc::new(reason.clone())));
                record_jwks_refresh("error", start.elapsed());

                let has_snapshot = entry.snapshot.load().is_some();
                tracing::warn!(
                    target: "authly.auth.jwks",
                    url = %entry.url,
                    error = %reason,
                    serving_stale = has_snapshot,
                    "JWKS refresh failed"
                );
                Err(AuthError::FetchError {
                    url: entry.url.clone(),
                    reason,
                })
            }
        }
    }

    async fn fetch_key_set(&self, url: &str, version: u64) -> Result<KeySet, String> {
        tracing::debug!(target: "authly.auth.jwks", url = %url, "Fetching JWKS");

        let response = self
            .http_client
            .get(url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("JWKS endpoint returned {status}"));
        }

        if response
            .content_length()
            .is_some_and(|len| len > MAX_JWKS_BODY_BYTES as u64)
        {
            return Err(format!(
                "JWKS document exceeds {MAX_JWKS_BODY_BYTES} bytes"
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read JWKS body: {e}"))?;
        if body.len() > MAX_JWKS_BODY_BYTES {
            return Err(format!(
                "JWKS document exceeds {MAX_JWKS_BODY_BYTES} bytes"
            ));
        }

        let document: JwksDocument = serde_json::from_slice(&body)
            .map_err(|e| format!("invalid JWKS document: {e}"))?;

        let key_set = KeySet::from_document(&document, version);
        if key_set.is_empty() {
            return Err(format!(
                "JWKS document has no usable signing keys ({} published)",
                document.keys.len()
            ));
        }

        Ok(key_set)
    }

    fn next_refresh_delay(&self, entry: &CacheEntry) -> Duration {
        let interval = self.config.refresh_interval;
        if entry.snapshot.load().is_none() {
            return self.config.retry_interval.min(interval);
        }

        #[allow(clippy::cast_possible_truncation)]
        let max_jitter_ms = (interval.as_millis() / 10) as u64;
        let jitter_ms = if max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_jitter_ms)
        };
        interval + Duration::from_millis(jitter_ms)
    }
}

/// Spawn the periodic refresh loop for one entry.
///
/// The task holds only a weak reference to the cache so dropping the last
/// [`KeySetCache`] handle ends it.
fn spawn_refresh_task(inner: &Arc<CacheInner>, entry: Arc<CacheEntry>) {
    let weak: Weak<CacheInner> = Arc::downgrade(inner);
    let shutdown = inner.shutdown.clone();

    tokio::spawn(async move {
        loop {
            let delay = match weak.upgrade() {
                Some(inner) => inner.next_refresh_delay(&entry),
                None => break,
            };

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            let Some(inner) = weak.upgrade() else {
                break;
            };
            // Failures are logged inside and leave the previous snapshot in place
            let _ = inner.refresh_entry(&entry).await;
        }

        tracing::debug!(target: "authly.auth.jwks", url = %entry.url, "Key set refresh task stopped");
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use authly_test_utils::crypto_fixtures::{Ed25519Fixture, P256Fixture, SigningFixture};

    fn document(keys: Vec<serde_json::Value>) -> JwksDocument {
        JwksDocument { keys }
    }

    #[test]
    fn test_jwk_deserialization() {
        let json = r#"{
            "kty": "OKP",
            "kid": "test-key-01",
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "alg": "EdDSA",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.kid.as_deref(), Some("test-key-01"));
        assert_eq!(jwk.crv.as_deref(), Some("Ed25519"));
        assert_eq!(jwk.alg.as_deref(), Some("EdDSA"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert!(jwk.y.is_none());
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty": "OKP"}"#).unwrap();
        assert_eq!(jwk.kty, "OKP");
        assert!(jwk.kid.is_none());
        assert!(jwk.x.is_none());
    }

    #[test]
    fn test_verification_key_from_ed25519_jwk() {
        let fixture = Ed25519Fixture::new(1, "ed-1");
        let jwk: Jwk = serde_json::from_value(fixture.jwk_json()).unwrap();

        let key = VerificationKey::from_jwk(&jwk).unwrap();
        assert_eq!(key.kid(), Some("ed-1"));
        assert!(key.supports(Algorithm::EdDSA));
        assert!(!key.supports(Algorithm::ES256));
        assert!(!key.supports(Algorithm::HS256));
    }

    #[test]
    fn test_verification_key_from_p256_jwk() {
        let fixture = P256Fixture::generate("ec-1");
        let jwk: Jwk = serde_json::from_value(fixture.jwk_json()).unwrap();

        let key = VerificationKey::from_jwk(&jwk).unwrap();
        assert!(key.supports(Algorithm::ES256));
        assert!(!key.supports(Algorithm::EdDSA));
    }

    #[test]
    fn test_rsa_key_without_alg_supports_rsa_family_only() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: Some("rsa-1".to_string()),
            n: Some("sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw".to_string()),
            e: Some("AQAB".to_string()),
            ..Jwk::default()
        };

        let key = VerificationKey::from_jwk(&jwk).unwrap();
        for alg in RSA_ALGORITHMS {
            assert!(key.supports(alg));
        }
        assert!(!key.supports(Algorithm::HS256));
        assert!(!key.supports(Algorithm::EdDSA));
    }

    #[test]
    fn test_declared_alg_narrows_key() {
        let fixture = Ed25519Fixture::new(1, "ed-1");
        let mut jwk: Jwk = serde_json::from_value(fixture.jwk_json()).unwrap();
        jwk.alg = Some("EdDSA".to_string());
        assert!(VerificationKey::from_jwk(&jwk).is_ok());

        jwk.alg = Some("RS256".to_string());
        assert!(VerificationKey::from_jwk(&jwk).is_err());

        jwk.alg = Some("none".to_string());
        assert!(VerificationKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_rejects_encryption_keys_and_unknown_types() {
        let fixture = Ed25519Fixture::new(1, "ed-1");
        let mut jwk: Jwk = serde_json::from_value(fixture.jwk_json()).unwrap();
        jwk.key_use = Some("enc".to_string());
        assert!(VerificationKey::from_jwk(&jwk).is_err());

        let oct = Jwk {
            kty: "oct".to_string(),
            ..Jwk::default()
        };
        assert!(VerificationKey::from_jwk(&oct).is_err());

        let okp_missing_x = Jwk {
            kty: "OKP".to_string(),
            crv: Some("Ed25519".to_string()),
            ..Jwk::default()
        };
        assert!(VerificationKey::from_jwk(&okp_missing_x).is_err());

        let okp_x448 = Jwk {
            kty: "OKP".to_string(),
            crv: Some("X448".to_string()),
            x: Some("AAAA".to_string()),
            ..Jwk::default()
        };
        assert!(VerificationKey::from_jwk(&okp_x448).is_err());
    }

    #[test]
    fn test_key_set_skips_unusable_keys() {
        let good = Ed25519Fixture::new(1, "good");
        let doc = document(vec![
            good.jwk_json(),
            serde_json::json!({"kty": "oct", "kid": "hmac", "k": "c2VjcmV0"}),
            serde_json::json!({"kty": 42}),
            serde_json::json!("not an object"),
        ]);

        let key_set = KeySet::from_document(&doc, 1);
        assert_eq!(key_set.len(), 1);
        assert_eq!(key_set.keys().first().unwrap().kid(), Some("good"));
        assert_eq!(key_set.version(), 1);
    }

    #[test]
    fn test_candidates_match_kid_or_all() {
        let a = Ed25519Fixture::new(1, "key-a");
        let b = Ed25519Fixture::new(2, "key-b");
        let key_set = KeySet::from_document(&document(vec![a.jwk_json(), b.jwk_json()]), 1);

        let by_kid: Vec<_> = key_set.candidates(Some("key-b")).collect();
        assert_eq!(by_kid.len(), 1);
        assert_eq!(by_kid.first().unwrap().kid(), Some("key-b"));

        assert_eq!(key_set.candidates(Some("unknown")).count(), 0);
        assert_eq!(key_set.candidates(None).count(), 2);
    }

    #[test]
    fn test_jwks_document_deserialization() {
        let doc: JwksDocument =
            serde_json::from_str(r#"{"keys": [{"kty": "OKP", "kid": "key-1"}, {"kty": "OKP"}]}"#)
                .unwrap();
        assert_eq!(doc.keys.len(), 2);

        assert!(serde_json::from_str::<JwksDocument>(r#"{"not_keys": []}"#).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = KeySetCacheConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.retry_interval, Duration::from_secs(10));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.max_staleness, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_lookup_unregistered_url() {
        let cache = KeySetCache::new(KeySetCacheConfig::default());
        let result = cache.lookup("http://localhost:3000/api/auth/jwks");
        assert!(matches!(result, Err(AuthError::NotRegistered { .. })));
        assert!(cache.status("http://localhost:3000/api/auth/jwks").is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_url() {
        let cache = KeySetCache::new(KeySetCacheConfig::default());

        for url in ["not a url", "ftp://example.com/jwks", ""] {
            let result = cache.register(url).await;
            assert!(
                matches!(result, Err(AuthError::RegistrationError { .. })),
                "url {url:?} should fail registration, got {result:?}"
            );
        }
        assert!(cache.registered_urls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_unregistered_url() {
        let cache = KeySetCache::new(KeySetCacheConfig::default());
        let result = cache.refresh("http://localhost:3000/api/auth/jwks").await;
        assert!(matches!(result, Err(AuthError::NotRegistered { .. })));
    }
}
