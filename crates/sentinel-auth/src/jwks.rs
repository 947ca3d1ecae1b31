//! Signing-key discovery.
//!
//! Entra publishes the tenant's current public signing keys at a well-known
//! discovery endpoint, rotating them periodically. [`SigningKeyCache`]
//! fetches that document and resolves keys by `kid` for token verification.
//!
//! The fetched key set is cached with a bounded TTL (honoring the response's
//! `Cache-Control: max-age` within configured limits). A `kid` that is not
//! in the cached set forces one refresh before failing, so freshly rotated
//! keys are picked up without waiting for expiry.
//!
//! Failure of the endpoint always fails the authentication attempt: an
//! unreachable key service never means "no verification required".

use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use tokio::sync::RwLock;
use url::Url;

use crate::error::AuthError;

/// Cache behavior for the signing-key set.
#[derive(Debug, Clone)]
pub struct SigningKeyCacheConfig {
    /// TTL when the response carries no `Cache-Control` (default: 1 hour).
    pub default_ttl: Duration,

    /// Maximum TTL regardless of `Cache-Control` (default: 24 hours).
    pub max_ttl: Duration,

    /// Minimum TTL regardless of `Cache-Control` (default: 5 minutes).
    pub min_ttl: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,
}

impl Default for SigningKeyCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_ttl: Duration::from_secs(86400),
            min_ttl: Duration::from_secs(300),
            max_response_size: 1024 * 1024,
        }
    }
}

/// Cached key set with its expiry.
#[derive(Debug)]
struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

/// Fetches and caches the tenant's signing-key set.
#[derive(Debug)]
pub struct SigningKeyCache {
    /// Discovery endpoint for the tenant.
    keys_url: Url,
    /// HTTP client with a bounded request timeout.
    http_client: reqwest::Client,
    cached: RwLock<Option<CachedKeys>>,
    config: SigningKeyCacheConfig,
    allow_http: bool,
}

impl SigningKeyCache {
    /// Creates a cache for the given discovery endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn new(
        keys_url: Url,
        request_timeout: Duration,
        allow_http: bool,
        config: SigningKeyCacheConfig,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            keys_url,
            http_client,
            cached: RwLock::new(None),
            config,
            allow_http,
        })
    }

    /// Resolves the decoding key for a `kid`.
    ///
    /// Checks the cache first; on a miss or an expired entry, fetches a
    /// fresh key set. A `kid` still absent after a refresh means the token
    /// was not signed by this tenant's current keys.
    ///
    /// # Errors
    ///
    /// - `AuthError::KeyDiscoveryUnavailable` if the fetch fails.
    /// - `AuthError::UnknownSigningKey` if no key matches after a refresh.
    pub async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached_key(kid).await {
            tracing::trace!(kid, "signing key cache hit");
            return Ok(key);
        }

        tracing::debug!(kid, url = %self.keys_url, "signing key cache miss, fetching");
        self.refresh().await?;

        self.cached_key(kid)
            .await
            .ok_or_else(|| AuthError::unknown_key(kid.to_string()))
    }

    /// Looks up a key in the cache without fetching.
    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cached = self.cached.read().await;
        let entry = cached.as_ref()?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        entry
            .keys
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .and_then(|jwk| DecodingKey::from_jwk(jwk).ok())
    }

    /// Fetches the key set from the endpoint and replaces the cache entry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyDiscoveryUnavailable` on any network, status,
    /// size, or parse problem (fail closed).
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.validate_scheme()?;

        let response = self
            .http_client
            .get(self.keys_url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.keys_url, error = %e, "key discovery request failed");
                AuthError::key_discovery(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(AuthError::key_discovery(format!(
                "HTTP status {}",
                response.status().as_u16()
            )));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_response_size
        {
            return Err(AuthError::key_discovery(format!(
                "response exceeds {} bytes",
                self.config.max_response_size
            )));
        }

        let ttl = self.parse_cache_control(response.headers());

        let keys: JwkSet = response.json().await.map_err(|e| {
            tracing::warn!(url = %self.keys_url, error = %e, "key discovery response unparseable");
            AuthError::key_discovery(format!("malformed key set: {e}"))
        })?;

        tracing::debug!(
            url = %self.keys_url,
            key_count = keys.keys.len(),
            ?ttl,
            "cached signing keys"
        );

        let mut cached = self.cached.write().await;
        *cached = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        });

        Ok(())
    }

    /// Drops the cached key set, forcing a fetch on the next resolve.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    /// Discovery must go over HTTPS outside of tests.
    fn validate_scheme(&self) -> Result<(), AuthError> {
        match self.keys_url.scheme() {
            "https" => Ok(()),
            "http" if self.allow_http => Ok(()),
            scheme => Err(AuthError::key_discovery(format!(
                "refusing non-HTTPS key discovery over {scheme}"
            ))),
        }
    }

    /// Derives the cache TTL from `Cache-Control: max-age`, clamped to the
    /// configured bounds; falls back to the default TTL.
    fn parse_cache_control(&self, headers: &reqwest::header::HeaderMap) -> Duration {
        let ttl = headers
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.split(',').find_map(|directive| {
                    directive
                        .trim()
                        .strip_prefix("max-age=")
                        .and_then(|s| s.parse::<u64>().ok())
                })
            })
            .map(Duration::from_secs)
            .unwrap_or(self.config.default_ttl);

        ttl.clamp(self.config.min_ttl, self.config.max_ttl)
    }
}
