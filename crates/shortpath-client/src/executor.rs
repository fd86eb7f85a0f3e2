//! Short-path executor: groups resolved slices by OSD, dispatches batched
//! reads concurrently, and decides fallback.
//!
//! Built around a connection-fan-out loop: one
//! task per remote peer, joined with a `JoinSet`, any single failure
//! collapsing the whole batch rather than partially applying it — the short
//! path has no notion of a partial read succeeding, the caller always falls
//! back to the proxy for the whole request on any failure.

use std::collections::HashMap;
use std::time::Duration;

use shortpath_core::{Clock, OsdId, ProxyClient, ShortPathError};
use shortpath_osd::{OsdClientPool, OsdRegistry};
use shortpath_proto::fragment_key;
use shortpath_resolver::ResolvedSlice;

/// Knobs the executor needs that are not already captured by the registry or
/// pool it is handed.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Per-OSD-operation I/O deadline.
    pub request_timeout: Duration,
    /// How long a newly-failed OSD is skipped for.
    pub disqualification_period: Duration,
    /// Skip the network entirely and synthesize zeroed payloads (benchmark
    /// mode, `use_null_io`).
    pub use_null_io: bool,
}

/// One filled sub-read: which target buffer it belongs to, where within it,
/// and the bytes read.
#[derive(Debug, Clone)]
pub struct FilledSlice {
    /// Index into the caller's flat target-buffer list.
    pub target_index: usize,
    /// Byte offset within that target buffer.
    pub target_offset: u32,
    /// The bytes read, length matching the resolved slice's `location.length`.
    pub data: Vec<u8>,
}

/// Execute every resolved slice against its OSD, returning the filled data
/// in no particular order — the caller matches each [`FilledSlice`] back to
/// its target buffer via `target_index`/`target_offset`.
///
/// All-or-nothing: a single unplaced fragment (a parity hole the resolver
/// could not avoid, see `ResolvedSlice`) or a single failed OSD read aborts
/// the whole batch before touching any target buffer, and the caller is
/// expected to fall back to the full proxy read for the entire request
/// rather than attempt to patch in a partial result.
pub async fn execute<C: Clock>(
    pool: &OsdClientPool,
    registry: &OsdRegistry<C>,
    proxy: &impl ProxyClient,
    slices: &[ResolvedSlice],
    config: &ExecutorConfig,
) -> Result<Vec<FilledSlice>, ShortPathError> {
    if slices.is_empty() {
        return Ok(Vec::new());
    }
    if slices.iter().any(|s| s.location.fragment_location.is_none()) {
        tracing::debug!("short path declining batch: unplaced fragment in resolved slices");
        return Err(ShortPathError::ManifestMiss("unplaced fragment".into()));
    }

    let by_osd = group_by_osd(slices);

    if by_osd.keys().any(|osd_id| registry.is_unknown(*osd_id)) {
        registry.update(proxy).await.map_err(|e| ShortPathError::TransportClosed(e.0))?;
    }

    if config.use_null_io {
        return Ok(synthesize_null_io(&by_osd));
    }

    dispatch(pool, registry, by_osd, config).await
}

type OsdGroups<'a> = HashMap<OsdId, HashMap<Vec<u8>, Vec<&'a ResolvedSlice>>>;

fn group_by_osd(slices: &[ResolvedSlice]) -> OsdGroups<'_> {
    let mut by_osd: OsdGroups<'_> = HashMap::new();
    for slice in slices {
        // Caller already rejected the whole batch if any location lacks a
        // placement; a `None` here would mean that check was skipped, so
        // skip the slice rather than panic on an invariant someone else
        // owns.
        let Some((osd_id, version_id)) = slice.location.fragment_location else { continue };
        let key = fragment_key(
            slice.location.namespace_id,
            &slice.location.object_id,
            slice.location.chunk_id,
            slice.location.fragment_id,
            version_id,
        );
        by_osd.entry(osd_id).or_default().entry(key).or_default().push(slice);
    }
    by_osd
}

fn synthesize_null_io(by_osd: &OsdGroups<'_>) -> Vec<FilledSlice> {
    by_osd
        .values()
        .flat_map(HashMap::values)
        .flatten()
        .map(|slice| FilledSlice {
            target_index: slice.target_index,
            target_offset: slice.target_offset,
            data: vec![0u8; slice.location.length as usize],
        })
        .collect()
}

async fn dispatch<C: Clock>(
    pool: &OsdClientPool,
    registry: &OsdRegistry<C>,
    by_osd: OsdGroups<'_>,
    config: &ExecutorConfig,
) -> Result<Vec<FilledSlice>, ShortPathError> {
    let mut join_set = tokio::task::JoinSet::new();

    for (osd_id, keys) in by_osd {
        if !registry.is_usable(osd_id) {
            tracing::debug!(osd_id = osd_id.0, "short path skipping disqualified osd, batch falls back");
            return Err(ShortPathError::TransportClosed(format!("osd {} disqualified", osd_id.0)));
        }
        let endpoint = registry
            .endpoint(osd_id)
            .ok_or_else(|| ShortPathError::TransportClosed(format!("osd {} has no known endpoint", osd_id.0)))?;
        let long_id = registry.long_id(osd_id);
        let client = pool.get_or_create(osd_id, &endpoint, long_id.as_deref());
        let timeout = config.request_timeout;

        for (key, items) in keys {
            let client = client.clone();
            let request_slices: Vec<(u64, u32)> =
                items.iter().map(|item| (u64::from(item.location.offset), item.location.length)).collect();
            let meta: Vec<(usize, u32, u32)> =
                items.iter().map(|item| (item.target_index, item.target_offset, item.location.length)).collect();
            join_set.spawn(async move {
                let result = client.partial_get(&key, &request_slices, timeout).await;
                (osd_id, meta, result)
            });
        }
    }

    let mut out = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        let (osd_id, meta, result) =
            joined.map_err(|e| ShortPathError::TransportClosed(format!("executor task panicked: {e}")))?;
        match result {
            Ok(reply) => fill_from_reply(&mut out, &meta, &reply.payload)?,
            Err(err) => {
                if err.disqualifies_osd() {
                    registry.disqualify(osd_id, config.disqualification_period);
                }
                tracing::warn!(osd_id = osd_id.0, error = %err, "short path read failed, falling back to proxy");
                return Err(err);
            }
        }
    }
    Ok(out)
}

fn fill_from_reply(
    out: &mut Vec<FilledSlice>,
    meta: &[(usize, u32, u32)],
    payload: &[u8],
) -> Result<(), ShortPathError> {
    let mut cursor = 0usize;
    for &(target_index, target_offset, length) in meta {
        let end = cursor + length as usize;
        let chunk = payload
            .get(cursor..end)
            .ok_or_else(|| ShortPathError::CorruptFrame("osd reply shorter than requested slices".into()))?;
        out.push(FilledSlice { target_index, target_offset, data: chunk.to_vec() });
        cursor = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use shortpath_core::{
        Assertion, ConsistentRead, Location, ObjectId, ObjectInfo, ObjectSlices, OsdInfo, ProxyError, StoreId,
        Update, VersionId, WriteBarrier,
    };

    #[derive(Clone, Default)]
    struct FakeProxy;

    impl ProxyClient for FakeProxy {
        async fn read_objects_slices2(
            &self,
            _namespace: &str,
            _slices: &[ObjectSlices],
            _consistency: ConsistentRead,
        ) -> Result<Vec<ObjectInfo>, ProxyError> {
            Ok(Vec::new())
        }

        async fn apply_sequence(
            &self,
            _namespace: &str,
            _barrier: WriteBarrier,
            _asserts: &[Assertion],
            _updates: &[Update],
        ) -> Result<Vec<ObjectInfo>, ProxyError> {
            Ok(Vec::new())
        }

        async fn invalidate_cache(&self, _namespace: &str) -> Result<(), ProxyError> {
            Ok(())
        }

        async fn drop_cache(&self, _namespace: &str) -> Result<(), ProxyError> {
            Ok(())
        }

        async fn get_object_info(
            &self,
            _namespace: &str,
            _object_name: &str,
            _consistency: ConsistentRead,
        ) -> Result<(u64, Option<Vec<u8>>), ProxyError> {
            Ok((0, None))
        }

        async fn osd_info(&self) -> Result<Vec<OsdInfo>, ProxyError> {
            Ok(Vec::new())
        }

        async fn alba_levels(&self, _namespace: &str) -> Result<Vec<StoreId>, ProxyError> {
            Ok(Vec::new())
        }

        async fn get_proxy_version(&self) -> Result<(i32, i32, i32, String), ProxyError> {
            Ok((1, 0, 0, "fake".into()))
        }

        async fn ping(&self, delay: f64) -> Result<f64, ProxyError> {
            Ok(delay)
        }
    }

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Instant::now())))
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn slice(target_index: usize, target_offset: u32, osd_id: OsdId, length: u32) -> ResolvedSlice {
        ResolvedSlice {
            target_index,
            target_offset,
            location: Location {
                namespace_id: 1,
                object_id: ObjectId(vec![1, 2, 3]),
                chunk_id: 0,
                fragment_id: 0,
                fragment_location: Some((osd_id, VersionId(0))),
                offset: 0,
                length,
            },
        }
    }

    fn default_config() -> ExecutorConfig {
        ExecutorConfig {
            request_timeout: Duration::from_millis(200),
            disqualification_period: Duration::from_secs(30),
            use_null_io: false,
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let pool = OsdClientPool::new();
        let registry = OsdRegistry::new(ManualClock::new());
        let out = execute(&pool, &registry, &FakeProxy, &[], &default_config()).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn parity_hole_aborts_before_any_dispatch() {
        let pool = OsdClientPool::new();
        let registry = OsdRegistry::new(ManualClock::new());
        let mut missing = slice(0, 0, OsdId(1), 4);
        missing.location.fragment_location = None;
        let err = execute(&pool, &registry, &FakeProxy, &[missing], &default_config()).await.unwrap_err();
        assert!(matches!(err, ShortPathError::ManifestMiss(_)));
    }

    #[tokio::test]
    async fn unknown_osd_is_transport_closed_without_hanging() {
        let pool = OsdClientPool::new();
        let registry = OsdRegistry::new(ManualClock::new());
        let err = execute(&pool, &registry, &FakeProxy, &[slice(0, 0, OsdId(9), 4)], &default_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ShortPathError::TransportClosed(_)));
    }

    #[tokio::test]
    async fn use_null_io_synthesizes_zeroed_payloads_without_network() {
        let pool = OsdClientPool::new();
        let registry = OsdRegistry::new(ManualClock::new());
        let config = ExecutorConfig { use_null_io: true, ..default_config() };
        let out = execute(&pool, &registry, &FakeProxy, &[slice(0, 0, OsdId(1), 4)], &config).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, vec![0u8; 4]);
    }

    #[tokio::test]
    async fn disqualified_osd_is_skipped_without_dispatch() {
        let pool = OsdClientPool::new();
        let registry = OsdRegistry::new(ManualClock::new());
        registry.update_info(OsdId(1), "127.0.0.1:1".into(), None);
        registry.disqualify(OsdId(1), Duration::from_secs(30));

        let err = execute(&pool, &registry, &FakeProxy, &[slice(0, 0, OsdId(1), 4)], &default_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ShortPathError::TransportClosed(_)));
    }

    #[tokio::test]
    async fn connection_failure_disqualifies_the_osd() {
        let pool = OsdClientPool::new();
        let registry = OsdRegistry::new(ManualClock::new());
        registry.update_info(OsdId(1), "127.0.0.1:1".into(), None);

        let config = ExecutorConfig { request_timeout: Duration::from_millis(100), ..default_config() };
        let result = execute(&pool, &registry, &FakeProxy, &[slice(0, 0, OsdId(1), 4)], &config).await;
        assert!(result.is_err());
        assert!(!registry.is_usable(OsdId(1)));
    }
}
