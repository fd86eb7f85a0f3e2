//! Bounded manifest cache: the collaborator that decides whether a resolved
//! slice can stay on the short path or must fall back to the proxy.
//!
//! One `ManifestCache` is shared by every resolution in flight. Reads take a
//! brief lock to fetch an `Arc<Manifest>` clone and release it immediately;
//! the manifest itself is never mutated once cached, treated as append-only
//! the way cached storage frames are elsewhere in this workspace.

mod key;

pub use key::CacheKey;

use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use shortpath_core::Manifest;

/// Thread-safe, bounded LRU cache of admitted manifests.
///
/// # Invariants
///
/// Only manifests for which [`Manifest::is_admissible`] returns `true` are
/// ever stored; [`ManifestCache::insert`] silently declines anything else,
/// the same filter the proxy-side cache applies when admitting manifests
/// from reads.
#[derive(Clone)]
pub struct ManifestCache {
    inner: Arc<Mutex<LruCache<CacheKey, Arc<Manifest>>>>,
}

impl ManifestCache {
    /// Create a cache holding at most `capacity` manifests. A `capacity` of
    /// zero is clamped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        const ONE: std::num::NonZeroUsize = std::num::NonZeroUsize::MIN;
        let capacity = std::num::NonZeroUsize::new(capacity).unwrap_or(ONE);
        Self { inner: Arc::new(Mutex::new(LruCache::new(capacity))) }
    }

    /// Look up a cached manifest, promoting it to most-recently-used on hit.
    #[must_use]
    pub fn find(&self, key: &CacheKey) -> Option<Arc<Manifest>> {
        self.inner.lock().get(key).cloned()
    }

    /// Admit `manifest` under `key` if it passes the admission filter.
    ///
    /// Returns `true` if the manifest was cached, `false` if it was declined
    /// (compressed or encrypted manifests never enter the short path).
    pub fn insert(&self, key: CacheKey, manifest: Manifest) -> bool {
        if !manifest.is_admissible() {
            tracing::debug!(object = ?key.object_name, "declining non-admissible manifest");
            return false;
        }
        self.inner.lock().put(key, Arc::new(manifest));
        true
    }

    /// Drop every entry belonging to `namespace_id` (the local counterpart
    /// to a proxy `invalidate_cache` call).
    pub fn invalidate_namespace(&self, namespace_id: u32) {
        let mut guard = self.inner.lock();
        let stale: Vec<CacheKey> =
            guard.iter().filter(|(k, _)| k.namespace_id == namespace_id).map(|(k, _)| k.clone()).collect();
        for key in stale {
            guard.pop(&key);
        }
    }

    /// Remove a single entry, e.g. after a short-path read observes a stale
    /// fragment location.
    pub fn invalidate(&self, key: &CacheKey) {
        self.inner.lock().pop(key);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Resize the cache to hold at most `capacity` entries, evicting the
    /// oldest entries first if the cache is currently larger. A `capacity`
    /// of zero is clamped to one.
    pub fn set_capacity(&self, capacity: usize) {
        const ONE: std::num::NonZeroUsize = std::num::NonZeroUsize::MIN;
        let capacity = std::num::NonZeroUsize::new(capacity).unwrap_or(ONE);
        self.inner.lock().resize(capacity);
    }

    /// Current configured capacity, in entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
