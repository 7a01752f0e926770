//! Where key rings come from.
//!
//! [`HttpKeyRingSource`] fetches the issuer's published key set over HTTP.
//! [`MemoryKeyRingSource`] serves a settable key set from memory, for tests
//! and for deployments that pin keys locally.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    config::KeyRingConfig,
    error::{AuthError, Result},
    keyring::{KeyRing, PublishedKey},
};

/// A provider of complete key rings.
///
/// Every call returns a whole new [`KeyRing`]; sources never patch a
/// previously returned value.
#[async_trait]
pub trait KeyRingSource: Send + Sync {
    /// Fetches the current key set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyRingUnavailable`] if the key set cannot be
    /// retrieved or parsed.
    async fn fetch(&self) -> Result<KeyRing>;
}

/// Fetches the published key set from an HTTP(S) endpoint.
#[derive(Debug, Clone)]
pub struct HttpKeyRingSource {
    client: reqwest::Client,
    config: KeyRingConfig,
}

impl HttpKeyRingSource {
    /// Creates a source using the configured URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if the configuration is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: KeyRingConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| AuthError::invalid_config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    /// Returns the source configuration.
    #[must_use]
    pub fn config(&self) -> &KeyRingConfig {
        &self.config
    }
}

#[async_trait]
impl KeyRingSource for HttpKeyRingSource {
    #[tracing::instrument(skip(self), fields(url = %self.config.jwks_url))]
    async fn fetch(&self) -> Result<KeyRing> {
        let url = self.config.jwks_url();

        let response = self.client.get(url).send().await.map_err(|err| {
            let message = if err.is_timeout() {
                format!("timed out fetching key set from {url}")
            } else {
                format!("failed to fetch key set from {url}")
            };
            AuthError::key_ring_unavailable_with_source(message, err)
        })?;

        let status = response.status();
        let response = response.error_for_status().map_err(|err| {
            AuthError::key_ring_unavailable_with_source(
                format!("key set endpoint {url} returned {status}"),
                err,
            )
        })?;

        let body = response.bytes().await.map_err(|err| {
            AuthError::key_ring_unavailable_with_source(
                format!("failed to read key set body from {url}"),
                err,
            )
        })?;

        tracing::debug!(bytes = body.len(), "key set document received");
        KeyRing::from_json(url, &body)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    keys: Vec<PublishedKey>,
    failure: Option<String>,
}

/// An in-memory key set with controllable failures and a fetch counter.
///
/// # Example
///
/// ```
/// use cloudfiles_authn::{KeyRingSource, MemoryKeyRingSource, PublishedKey};
///
/// # #[tokio::main]
/// # async fn main() {
/// let source = MemoryKeyRingSource::new(Vec::new());
/// source.fail_with("endpoint down");
/// assert!(source.fetch().await.is_err());
///
/// source.recover();
/// source.set_keys(vec![PublishedKey::rsa("k1", "zPcq", "AQAB")]);
/// let _ = source.fetch().await;
/// assert_eq!(source.fetch_count(), 2);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryKeyRingSource {
    state: Mutex<MemoryState>,
    delay: Option<Duration>,
    fetches: AtomicU64,
}

impl MemoryKeyRingSource {
    /// Source name recorded on key rings this source produces.
    pub const SOURCE: &'static str = "memory";

    /// Creates a source publishing `keys`.
    #[must_use]
    pub fn new(keys: Vec<PublishedKey>) -> Self {
        Self { state: Mutex::new(MemoryState { keys, failure: None }), ..Self::default() }
    }

    /// Makes every fetch wait for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replaces the published key set, as an issuer rotating keys would.
    pub fn set_keys(&self, keys: Vec<PublishedKey>) {
        self.state.lock().keys = keys;
    }

    /// Makes subsequent fetches fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().failure = Some(message.into());
    }

    /// Clears a failure set by [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    /// Number of fetches served, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Acquire)
    }
}

#[async_trait]
impl KeyRingSource for MemoryKeyRingSource {
    async fn fetch(&self) -> Result<KeyRing> {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if let Some(message) = &state.failure {
            return Err(AuthError::key_ring_unavailable(message.clone()));
        }
        Ok(KeyRing::from_keys(Self::SOURCE, state.keys.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testutil::{RSA_EXPONENT, RSA_MODULUS_A, RSA_MODULUS_B};

    #[tokio::test]
    async fn test_memory_source_serves_current_keys() {
        let source = MemoryKeyRingSource::new(vec![PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        let first = source.fetch().await.unwrap();
        assert!(first.contains("a"));

        source.set_keys(vec![PublishedKey::rsa("b", RSA_MODULUS_B, RSA_EXPONENT)]);
        let second = source.fetch().await.unwrap();
        assert!(!second.contains("a"));
        assert!(second.contains("b"));
        assert_eq!(second.source(), MemoryKeyRingSource::SOURCE);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_source_failure_and_recovery() {
        let source = MemoryKeyRingSource::new(Vec::new());
        source.fail_with("endpoint down");

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, AuthError::KeyRingUnavailable { ref message, .. } if message == "endpoint down"));

        source.recover();
        assert!(source.fetch().await.unwrap().is_empty());
    }

    #[test]
    fn test_http_source_rejects_unvalidated_config() {
        let config: KeyRingConfig = serde_json::from_str(r#"{ "jwks_url": "file:///etc/keys" }"#).unwrap();
        assert!(matches!(HttpKeyRingSource::new(config), Err(AuthError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_http_source_connection_refused_is_unavailable() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = KeyRingConfig::builder().jwks_url(format!("http://{addr}/jwks")).build().unwrap();
        let source = HttpKeyRingSource::new(config).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, AuthError::KeyRingUnavailable { source: Some(_), .. }));
    }
}
