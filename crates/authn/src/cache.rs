//! Process-wide cache of the current [`KeyRing`].
//!
//! The cache starts empty and is filled by the first caller that needs it.
//! Updates always replace the whole ring; readers see either the previous
//! ring or the new one, never a mix.
//!
//! # Lifecycle
//!
//! ```text
//! empty ──get_or_fetch──▶ populated ──refresh_after(gen)──▶ populated (gen + 1)
//!   ▲                         │
//!   └──── fetch failure ──────┘   (also: invalidate)
//! ```
//!
//! # Single-flight fetches
//!
//! Fetches are serialized behind one async lock. A caller that waited for
//! the lock re-checks the cache first: if another caller already installed
//! a ring (or a newer generation than the one it saw), that ring is used
//! and no second fetch is made. A burst of tokens signed with a freshly
//! rotated key therefore costs one fetch, not one per request.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use fail::fail_point;
use parking_lot::RwLock;

use crate::{
    error::{AuthError, Result},
    keyring::KeyRing,
    source::KeyRingSource,
};

/// A key ring together with the cache generation it was installed at.
#[derive(Debug, Clone)]
pub struct KeyRingSnapshot {
    ring: Arc<KeyRing>,
    generation: u64,
}

impl KeyRingSnapshot {
    /// The key ring.
    #[must_use]
    pub fn ring(&self) -> &KeyRing {
        &self.ring
    }

    /// Install counter value; strictly increases with every install.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
struct Slot {
    ring: Option<Arc<KeyRing>>,
    generation: u64,
}

/// Lazily filled, whole-value-replaced cache of the issuer's key ring.
pub struct KeyRingCache {
    source: Arc<dyn KeyRingSource>,
    slot: RwLock<Slot>,
    fetch_lock: tokio::sync::Mutex<()>,
    fetches: AtomicU64,
}

impl KeyRingCache {
    /// Creates an empty cache backed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn KeyRingSource>) -> Self {
        Self {
            source,
            slot: RwLock::new(Slot::default()),
            fetch_lock: tokio::sync::Mutex::new(()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Returns the cached ring, if any, without fetching.
    #[must_use]
    pub fn snapshot(&self) -> Option<KeyRingSnapshot> {
        let slot = self.slot.read();
        slot.ring.as_ref().map(|ring| KeyRingSnapshot { ring: Arc::clone(ring), generation: slot.generation })
    }

    /// Returns the cached ring, fetching it first if the cache is empty.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyRingUnavailable`] if a fetch was needed and
    /// failed. The cache is left empty in that case.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_fetch(&self) -> Result<KeyRingSnapshot> {
        if let Some(snapshot) = self.snapshot() {
            tracing::debug!(generation = snapshot.generation, "key ring cache hit");
            return Ok(snapshot);
        }
        tracing::debug!("key ring cache miss");

        let _guard = self.fetch_lock.lock().await;
        if let Some(snapshot) = self.snapshot() {
            tracing::debug!(generation = snapshot.generation, "key ring filled while waiting");
            return Ok(snapshot);
        }
        self.fetch_and_install().await
    }

    /// Replaces the ring seen at `seen_generation` with a fresh fetch.
    ///
    /// If another caller installed a newer ring in the meantime, that ring
    /// is returned without fetching again.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyRingUnavailable`] if the fetch fails. The
    /// cache is cleared in that case.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_after(&self, seen_generation: u64) -> Result<KeyRingSnapshot> {
        let _guard = self.fetch_lock.lock().await;
        if let Some(snapshot) = self.snapshot()
            && snapshot.generation != seen_generation
        {
            tracing::debug!(
                seen_generation,
                generation = snapshot.generation,
                "key ring already refreshed by a concurrent caller"
            );
            return Ok(snapshot);
        }
        self.fetch_and_install().await
    }

    /// Drops the cached ring. The next lookup fetches again.
    pub fn invalidate(&self) {
        let evicted = self.slot.write().ring.take();
        if let Some(ring) = evicted {
            tracing::info!(keys = ring.len(), source = ring.source(), "key ring invalidated");
        }
    }

    /// Returns `true` if a ring is cached.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.slot.read().ring.is_some()
    }

    /// Number of keys in the cached ring, `0` when empty.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.slot.read().ring.as_ref().map_or(0, |ring| ring.len())
    }

    /// Number of fetches issued to the source, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Acquire)
    }

    /// Must be called with `fetch_lock` held.
    async fn fetch_and_install(&self) -> Result<KeyRingSnapshot> {
        match self.load().await {
            Ok(ring) => {
                let ring = Arc::new(ring);
                let generation = {
                    let mut slot = self.slot.write();
                    slot.generation += 1;
                    slot.ring = Some(Arc::clone(&ring));
                    slot.generation
                };
                tracing::info!(
                    keys = ring.len(),
                    source = ring.source(),
                    generation,
                    "key ring installed"
                );
                if ring.is_empty() {
                    tracing::warn!(source = ring.source(), "installed key ring has no usable keys");
                }
                Ok(KeyRingSnapshot { ring, generation })
            },
            Err(err) => {
                let cleared = self.slot.write().ring.take().is_some();
                tracing::warn!(error = %err, cleared, "key ring fetch failed");
                Err(err)
            },
        }
    }

    async fn load(&self) -> Result<KeyRing> {
        fail_point!("keyring-before-fetch", |_| {
            Err(AuthError::key_ring_unavailable("injected failure before key ring fetch"))
        });

        self.fetches.fetch_add(1, Ordering::AcqRel);
        match self.source.fetch().await {
            Ok(ring) => Ok(ring),
            Err(err @ AuthError::KeyRingUnavailable { .. }) => Err(err),
            Err(other) => Err(AuthError::key_ring_unavailable_with_source("key ring source failed", other)),
        }
    }
}

impl fmt::Debug for KeyRingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("KeyRingCache")
            .field("ring", &slot.ring)
            .field("generation", &slot.generation)
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{
        keyring::PublishedKey,
        source::MemoryKeyRingSource,
        testutil::{RSA_EXPONENT, RSA_MODULUS_A, RSA_MODULUS_B},
    };

    fn cache_with(keys: Vec<PublishedKey>) -> (Arc<MemoryKeyRingSource>, KeyRingCache) {
        let source = Arc::new(MemoryKeyRingSource::new(keys));
        let cache = KeyRingCache::new(source.clone());
        (source, cache)
    }

    #[tokio::test]
    async fn test_lazy_fill_then_hit() {
        let (source, cache) = cache_with(vec![PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        assert!(!cache.is_populated());
        assert_eq!(cache.key_count(), 0);

        let first = cache.get_or_fetch().await.unwrap();
        let second = cache.get_or_fetch().await.unwrap();

        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 1);
        assert!(cache.is_populated());
        assert_eq!(cache.key_count(), 1);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_empty() {
        let (source, cache) = cache_with(Vec::new());
        source.fail_with("down");

        assert!(matches!(cache.get_or_fetch().await, Err(AuthError::KeyRingUnavailable { .. })));
        assert!(!cache.is_populated());

        source.recover();
        assert!(cache.get_or_fetch().await.is_ok());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_previous_ring() {
        let (source, cache) = cache_with(vec![PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        let seen = cache.get_or_fetch().await.unwrap().generation();

        source.fail_with("down");
        assert!(cache.refresh_after(seen).await.is_err());
        assert!(!cache.is_populated());
    }

    #[tokio::test]
    async fn test_refresh_replaces_whole_ring() {
        let (source, cache) = cache_with(vec![PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        let before = cache.get_or_fetch().await.unwrap();

        source.set_keys(vec![PublishedKey::rsa("b", RSA_MODULUS_B, RSA_EXPONENT)]);
        let after = cache.refresh_after(before.generation()).await.unwrap();

        assert_eq!(after.generation(), before.generation() + 1);
        assert!(after.ring().contains("b"));
        assert!(!after.ring().contains("a"));
        assert!(before.ring().contains("a"), "held snapshots are never mutated");
    }

    #[tokio::test]
    async fn test_refresh_with_stale_generation_reuses_newer_ring() {
        let (source, cache) = cache_with(vec![PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        let seen = cache.get_or_fetch().await.unwrap().generation();
        cache.refresh_after(seen).await.unwrap();
        assert_eq!(source.fetch_count(), 2);

        let reused = cache.refresh_after(seen).await.unwrap();
        assert_eq!(reused.generation(), seen + 1);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (source, cache) = cache_with(vec![PublishedKey::rsa("a", RSA_MODULUS_A, RSA_EXPONENT)]);
        cache.get_or_fetch().await.unwrap();

        cache.invalidate();
        assert!(!cache.is_populated());

        let refilled = cache.get_or_fetch().await.unwrap();
        assert_eq!(refilled.generation(), 2);
        assert_eq!(source.fetch_count(), 2);
    }
}
