//! Front-facing client (component H): the public read/write/list API.
//!
//! `ShortPathClient` wraps a `ProxyClient` implementation and the short-path
//! machinery built up in the sibling crates: one handle an embedder
//! constructs once and clones freely (every field here is either `Clone` or
//! behind an `Arc`).

/// Short-path executor: OSD grouping, dispatch, and fallback decision.
pub mod executor;

use std::sync::Arc;

use shortpath_cache::{CacheKey, ManifestCache};
use shortpath_core::{
    Assertion, Clock, ConsistentRead, ObjectInfo, ObjectSlices, OsdInfo, ProxyClient, ProxyError,
    ShortPathConfig, ShortPathError, SystemClock, Update, WriteBarrier,
};
use shortpath_osd::{OsdClientPool, OsdRegistry};
use shortpath_resolver::resolve_object_slice;

pub use executor::{execute, ExecutorConfig, FilledSlice};

/// Result of a `read_objects_slices` call.
///
/// The short-path branch carries real byte payloads, because the short path
/// reads them itself. The proxy branch only carries the `ObjectInfo`s the
/// proxy returned alongside its read — delivering the actual byte payload
/// for a proxy-served read is the embedder's concern, since the proxy RPC
/// protocol (including how it streams read data) is explicitly out of
/// scope; this crate only models the shape of what comes back.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Every requested slice was served directly from an OSD.
    ShortPath(Vec<FilledSlice>),
    /// At least one requested slice could not be served on the short path;
    /// the whole batch was sent to the proxy instead.
    Proxy(Vec<ObjectInfo>),
}

/// Deterministically maps a namespace name to the numeric id fragment keys
/// are built with.
///
/// The real proxy hands out namespace ids as part of its (out-of-scope)
/// metadata protocol; since `ProxyClient` only carries namespace names, this
/// crate derives the id from the name with FNV-1a instead of inventing a
/// registration RPC. Stable within a process, which is all a fragment key
/// needs: an OSD never compares keys from two different client processes.
#[must_use]
pub fn namespace_id(namespace: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in namespace.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// The short-path client: holds the manifest cache, OSD registry and
/// connection pool, and a `ProxyClient` to fall back to.
///
/// Cheap to clone: `ManifestCache`, `OsdClientPool` and the `Arc<OsdRegistry>`
/// are all shared handles, so clones can be handed to concurrently-spawned
/// tasks that all talk to the same underlying connections.
pub struct ShortPathClient<P: ProxyClient, C: Clock = SystemClock> {
    proxy: Arc<P>,
    cache: ManifestCache,
    registry: Arc<OsdRegistry<C>>,
    pool: OsdClientPool,
    config: ShortPathConfig,
}

impl<P: ProxyClient, C: Clock> Clone for ShortPathClient<P, C> {
    fn clone(&self) -> Self {
        Self {
            proxy: Arc::clone(&self.proxy),
            cache: self.cache.clone(),
            registry: Arc::clone(&self.registry),
            pool: self.pool.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: ProxyClient> ShortPathClient<P, SystemClock> {
    /// Build a client backed by the production `SystemClock`.
    pub fn new(proxy: P, config: ShortPathConfig) -> Self {
        Self::with_clock(proxy, config, SystemClock)
    }
}

impl<P: ProxyClient, C: Clock> ShortPathClient<P, C> {
    /// Build a client driven by an arbitrary [`Clock`], for deterministic
    /// tests of OSD disqualification windows.
    pub fn with_clock(proxy: P, config: ShortPathConfig, clock: C) -> Self {
        let cache = ManifestCache::new(config.manifest_cache_size);
        Self {
            proxy: Arc::new(proxy),
            cache,
            registry: Arc::new(OsdRegistry::new(clock)),
            pool: OsdClientPool::new(),
            config,
        }
    }

    /// Read a batch of byte ranges across one or more named objects in
    /// `namespace`.
    ///
    /// `consistency = Strict` always delegates to the proxy. Otherwise the
    /// resolver is walked against the manifest cache for every requested
    /// slice; if every slice resolves to a placed fragment, the whole batch
    /// is dispatched through the executor and returned as
    /// [`ReadOutcome::ShortPath`]. Any resolution or executor failure —
    /// a cache miss, a parity hole, a disqualified or unreachable OSD —
    /// escalates the *entire* batch to the proxy (no per-object retry
    /// mixing); manifests the proxy returns are ingested into the cache
    /// before the result is handed back.
    pub async fn read_objects_slices(
        &self,
        namespace: &str,
        requests: &[ObjectSlices],
        consistency: ConsistentRead,
    ) -> Result<ReadOutcome, ProxyError> {
        if matches!(consistency, ConsistentRead::Strict) {
            tracing::debug!(namespace, "strict consistency requested, delegating to proxy");
            return self.read_via_proxy(namespace, requests, consistency).await;
        }

        match self.try_short_path(namespace, requests).await {
            Ok(filled) => {
                tracing::debug!(namespace, sub_reads = filled.len(), "short path served batch");
                Ok(ReadOutcome::ShortPath(filled))
            }
            Err(err) => {
                tracing::debug!(namespace, error = %err, "short path missed, falling back to proxy");
                self.read_via_proxy(namespace, requests, consistency).await
            }
        }
    }

    async fn try_short_path(
        &self,
        namespace: &str,
        requests: &[ObjectSlices],
    ) -> Result<Vec<FilledSlice>, ShortPathError> {
        let namespace_id = namespace_id(namespace);
        let levels = self
            .registry
            .get_alba_levels(self.proxy.as_ref(), namespace)
            .await
            .map_err(|e| ShortPathError::TransportClosed(e.0))?;

        let mut resolved = Vec::new();
        for request in requests {
            for slice in &request.slices {
                let located = resolve_object_slice(
                    &self.cache,
                    &levels,
                    namespace_id,
                    &request.object_name,
                    slice.offset,
                    u64::from(slice.length),
                    slice.target_index,
                )?;
                resolved.extend(located);
            }
        }

        let exec_config = ExecutorConfig {
            request_timeout: self.config.request_timeout,
            disqualification_period: self.config.disqualification_period,
            use_null_io: self.config.use_null_io,
        };
        execute(&self.pool, &self.registry, self.proxy.as_ref(), &resolved, &exec_config).await
    }

    async fn read_via_proxy(
        &self,
        namespace: &str,
        requests: &[ObjectSlices],
        consistency: ConsistentRead,
    ) -> Result<ReadOutcome, ProxyError> {
        let infos = self.proxy.read_objects_slices2(namespace, requests, consistency).await?;
        self.ingest(namespace, &infos);
        Ok(ReadOutcome::Proxy(infos))
    }

    /// Apply a conditional write sequence. Always delegated to the proxy
    /// (the short path never writes); any
    /// manifests returned alongside the result are ingested into the cache.
    pub async fn apply_sequence(
        &self,
        namespace: &str,
        barrier: WriteBarrier,
        asserts: &[Assertion],
        updates: &[Update],
    ) -> Result<Vec<ObjectInfo>, ProxyError> {
        let infos = self.proxy.apply_sequence(namespace, barrier, asserts, updates).await?;
        self.ingest(namespace, &infos);
        Ok(infos)
    }

    /// Object size/checksum lookup, delegated to the proxy.
    pub async fn get_object_info(
        &self,
        namespace: &str,
        object_name: &str,
        consistency: ConsistentRead,
    ) -> Result<(u64, Option<Vec<u8>>), ProxyError> {
        self.proxy.get_object_info(namespace, object_name, consistency).await
    }

    /// Proxy build/version info, delegated as-is.
    pub async fn get_proxy_version(&self) -> Result<(i32, i32, i32, String), ProxyError> {
        self.proxy.get_proxy_version().await
    }

    /// Round-trip latency probe, delegated as-is.
    pub async fn ping(&self, delay: f64) -> Result<f64, ProxyError> {
        self.proxy.ping(delay).await
    }

    /// Drop every cached manifest for `namespace` and tell the proxy to
    /// invalidate its own cache too.
    ///
    /// Distinct from [`ShortPathClient::drop_cache`]: this affects both the
    /// local manifest cache and the proxy's, matching the original's
    /// `invalidate_cache` (as opposed to `drop_cache`, which is proxy-side
    /// only).
    pub async fn invalidate_cache(&self, namespace: &str) -> Result<(), ProxyError> {
        self.cache.invalidate_namespace(namespace_id(namespace));
        self.proxy.invalidate_cache(namespace).await
    }

    /// Tell the proxy to drop its cache for `namespace`, without touching
    /// the local manifest cache.
    pub async fn drop_cache(&self, namespace: &str) -> Result<(), ProxyError> {
        self.proxy.drop_cache(namespace).await
    }

    /// Snapshot of every OSD the registry currently knows about
    /// (`osd_info`/`osd_info2` in the original), for diagnostics and tests.
    #[must_use]
    pub fn osd_snapshot(&self) -> Vec<OsdInfo> {
        self.registry.snapshot()
    }

    /// Current manifest cache occupancy, for diagnostics and tests.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn ingest(&self, namespace: &str, infos: &[ObjectInfo]) {
        let namespace_id = namespace_id(namespace);
        for info in infos {
            let key = CacheKey::new(namespace_id, info.store_id.clone(), info.manifest.name.as_bytes());
            if self.cache.insert(key, info.manifest.clone()) {
                tracing::debug!(namespace, object = %info.manifest.name, "ingested manifest from proxy");
            }
        }
    }
}
