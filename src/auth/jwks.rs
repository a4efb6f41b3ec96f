// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key resolution against the identity provider's published key set.
//!
//! ## Cache
//!
//! - Keys are cached individually by `kid`, up to `max_entries`
//! - Entries older than `max_age` are treated as misses and purged on insert
//! - Reads use `peek`, so recency is never refreshed: when the cache is full
//!   the oldest-inserted key is evicted first
//! - Misses are serialized behind a fetch lock and re-checked after the lock
//!   is taken, so two requests missing on the same `kid` cause one fetch and
//!   one cache entry
//!
//! ## Refetch limit
//!
//! Tokens are attacker-controlled, so their `kid` must not decide how often
//! the key set is fetched. The outcome of the last fetch, success or failure,
//! is reused by every miss and reachability check for `min_refetch_interval`.
//! A flood of made-up `kid`s therefore costs at most one fetch per interval,
//! and a genuine miss queued behind them waits for that one fetch at most.
//! A key published within the interval after a fetch is picked up by the
//! first miss after it.
//!
//! ## Failure
//!
//! Every fetch is bounded by `fetch_timeout`. A failed, slow or non-matching
//! fetch yields [`KeyFetchError`]; only the matching key of a successful fetch
//! enters the key cache.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use lru::LruCache;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use url::Url;

use super::error::KeyFetchError;

/// Default number of cached signing keys.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Default maximum age of a cached signing key (10 minutes).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);

/// Default key set fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default window in which the last fetch outcome is reused.
pub const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(5);

/// Bounds applied by [`KeyResolver`].
#[derive(Debug, Clone)]
pub struct KeyCacheConfig {
    pub max_entries: NonZeroUsize,
    pub max_age: Duration,
    pub fetch_timeout: Duration,
    pub min_refetch_interval: Duration,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: NonZeroUsize::new(DEFAULT_MAX_ENTRIES).unwrap_or(NonZeroUsize::MIN),
            max_age: DEFAULT_MAX_AGE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
        }
    }
}

/// A public key able to verify token signatures for one `kid`.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    decoding_key: DecodingKey,
    /// Algorithm the key set publishes for this key, when it names one
    algorithm: Option<Algorithm>,
}

impl SigningKey {
    /// Build from a JWK entry.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyFetchError> {
        let kid = jwk.common.key_id.clone().unwrap_or_default();
        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| KeyFetchError::UnusableKey {
            kid: kid.clone(),
            reason: e.to_string(),
        })?;

        let algorithm = match jwk.common.key_algorithm.as_ref() {
            Some(declared) => Some(signature_algorithm(declared).ok_or_else(|| {
                KeyFetchError::UnusableKey {
                    kid: kid.clone(),
                    reason: format!("{declared:?} is not a signature algorithm"),
                }
            })?),
            None => None,
        };

        Ok(Self {
            kid,
            decoding_key,
            algorithm,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Whether this key may verify tokens signed with `algorithm`.
    pub fn permits(&self, algorithm: Algorithm) -> bool {
        self.algorithm.is_none_or(|published| published == algorithm)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn signature_algorithm(declared: &KeyAlgorithm) -> Option<Algorithm> {
    match declared {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

/// Where the published key set comes from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, KeyFetchError>;
}

/// Fetches the key set from the provider's well-known HTTPS endpoint.
pub struct HttpKeySetSource {
    url: Url,
    client: reqwest::Client,
}

impl HttpKeySetSource {
    /// Create a source for `url`.
    ///
    /// Plain HTTP is accepted only for loopback hosts.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, KeyFetchError> {
        if !is_secure_url(&url) {
            return Err(KeyFetchError::InsecureUrl(url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyFetchError::Request(e.to_string()))?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

pub(crate) fn is_secure_url(url: &Url) -> bool {
    match url.scheme() {
        "https" => true,
        "http" => matches!(
            url.host_str(),
            Some("localhost") | Some("127.0.0.1") | Some("[::1]")
        ),
        _ => false,
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeyFetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| KeyFetchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeyFetchError::Status(response.status().as_u16()));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeyFetchError::Decode(e.to_string()))
    }
}

struct CacheEntry {
    key: Arc<SigningKey>,
    inserted_at: Instant,
}

struct LastFetch {
    at: Instant,
    outcome: Result<Arc<JwkSet>, KeyFetchError>,
}

/// Resolves a `kid` to its signing key, cache first.
///
/// One instance is constructed at startup and shared by every request.
pub struct KeyResolver {
    source: Arc<dyn KeySetSource>,
    cache: RwLock<LruCache<String, CacheEntry>>,
    /// Held across every fetch; guards the last outcome.
    last_fetch: Mutex<Option<LastFetch>>,
    max_age: Duration,
    fetch_timeout: Duration,
    min_refetch_interval: Duration,
}

impl KeyResolver {
    pub fn new(source: Arc<dyn KeySetSource>, config: KeyCacheConfig) -> Self {
        Self {
            source,
            cache: RwLock::new(LruCache::new(config.max_entries)),
            last_fetch: Mutex::new(None),
            max_age: config.max_age,
            fetch_timeout: config.fetch_timeout,
            min_refetch_interval: config.min_refetch_interval,
        }
    }

    /// Resolve the signing key for `kid`.
    ///
    /// Hits return without touching the network. A miss consults the key set
    /// (fetched at most once per refetch interval) and caches only the
    /// matching key.
    pub async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeyFetchError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        let mut last_fetch = self.last_fetch.lock().await;

        // Filled while we waited for the lock.
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        tracing::debug!(kid = %kid, "Signing key cache miss");
        let jwks = self.recent_key_set(&mut last_fetch).await?;
        let jwk = jwks
            .find(kid)
            .ok_or_else(|| KeyFetchError::UnknownKeyId(kid.to_string()))?;
        let key = Arc::new(SigningKey::from_jwk(jwk)?);

        self.insert(kid, Arc::clone(&key)).await;
        Ok(key)
    }

    /// Whether signing keys are obtainable, reporting how many the key set
    /// holds. Cached keys answer without a fetch.
    ///
    /// Shares the refetch limit with [`resolve`](Self::resolve), so
    /// concurrent callers cost at most one fetch per interval.
    pub async fn check_reachable(&self) -> Result<usize, KeyFetchError> {
        let cached = self.len().await;
        if cached > 0 {
            return Ok(cached);
        }

        let mut last_fetch = self.last_fetch.lock().await;
        self.recent_key_set(&mut last_fetch)
            .await
            .map(|jwks| jwks.keys.len())
    }

    /// Outcome of the last fetch, if one finished within the refetch interval.
    ///
    /// `Some(true)` when it succeeded. Never fetches.
    pub async fn last_fetch_succeeded(&self) -> Option<bool> {
        let last_fetch = self.last_fetch.lock().await;
        last_fetch
            .as_ref()
            .filter(|last| last.at.elapsed() < self.min_refetch_interval)
            .map(|last| last.outcome.is_ok())
    }

    /// Number of cached keys, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Whether a fresh entry for `kid` is cached.
    pub async fn contains(&self, kid: &str) -> bool {
        self.cached(kid).await.is_some()
    }

    async fn cached(&self, kid: &str) -> Option<Arc<SigningKey>> {
        let cache = self.cache.read().await;
        cache
            .peek(kid)
            .filter(|entry| entry.inserted_at.elapsed() < self.max_age)
            .map(|entry| Arc::clone(&entry.key))
    }

    /// Reuse the last fetch outcome while it is recent, otherwise fetch.
    ///
    /// The caller holds the fetch lock through `last_fetch`.
    async fn recent_key_set(
        &self,
        last_fetch: &mut Option<LastFetch>,
    ) -> Result<Arc<JwkSet>, KeyFetchError> {
        if let Some(last) = last_fetch
            .as_ref()
            .filter(|last| last.at.elapsed() < self.min_refetch_interval)
        {
            return last.outcome.clone();
        }

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result.map(Arc::new),
            Err(_) => Err(KeyFetchError::Timeout(self.fetch_timeout)),
        };
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Key set fetch failed");
        }
        *last_fetch = Some(LastFetch {
            at: Instant::now(),
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn insert(&self, kid: &str, key: Arc<SigningKey>) {
        let mut cache = self.cache.write().await;

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= self.max_age)
            .map(|(kid, _)| kid.clone())
            .collect();
        for stale in &expired {
            cache.pop(stale);
        }

        let entry = CacheEntry {
            key,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = cache.push(kid.to_string(), entry) {
            if evicted != kid {
                tracing::debug!(evicted = %evicted, "Signing key cache full, evicted oldest key");
            }
        }
    }
}
