//! OSD registry: tracks the current endpoint and health of every OSD the
//! short path knows about.
//!
//! Mirrors `ConnectionRegistry`'s bidirectional-map shape, adapted to a
//! single map keyed by OSD id since the short path has no equivalent of a
//! room/connection pairing to track both directions of.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use shortpath_core::{Clock, OsdId, OsdInfo, ProxyClient, ProxyError, StoreId};

/// What the registry currently believes about one OSD.
#[derive(Debug, Clone)]
enum Health {
    /// No read has failed against this OSD recently.
    Healthy,
    /// Disqualified until the deadline elapses: a temporary skip after a
    /// failure, not a permanent removal.
    Disqualified(std::time::Instant),
}

#[derive(Debug, Clone)]
struct Entry {
    endpoint: String,
    long_id: Option<String>,
    health: Health,
}

/// Registry of known OSD endpoints and their current health, shared by the
/// executor (to pick which OSDs to skip) and the connection pool (to know
/// where to dial).
pub struct OsdRegistry<C: Clock> {
    clock: C,
    entries: RwLock<HashMap<OsdId, Entry>>,
    /// Cached `get_alba_levels` response per namespace ("caches
    /// the first response").
    alba_levels: RwLock<HashMap<String, Vec<StoreId>>>,
}

impl<C: Clock> OsdRegistry<C> {
    /// Create an empty registry driven by `clock`.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self { clock, entries: RwLock::new(HashMap::new()), alba_levels: RwLock::new(HashMap::new()) }
    }

    /// True iff no record exists for `osd_id` at all (as opposed to known but
    /// disqualified).
    #[must_use]
    pub fn is_unknown(&self, osd_id: OsdId) -> bool {
        !self.entries.read().contains_key(&osd_id)
    }

    /// Re-read OSD connection info from the proxy and merge it into the
    /// registry. Existing health state is preserved for OSDs that were
    /// already known; newly-reported OSDs start healthy.
    pub async fn update(&self, client: &impl ProxyClient) -> Result<(), ProxyError> {
        let osds = client.osd_info().await?;
        for osd in osds {
            self.update_info(osd.osd_id, osd.endpoint, osd.long_id);
        }
        Ok(())
    }

    /// The ordered list of nested store ids for `namespace`, fetched from the
    /// proxy on first call and cached for every call after.
    pub async fn get_alba_levels(
        &self,
        client: &impl ProxyClient,
        namespace: &str,
    ) -> Result<Vec<StoreId>, ProxyError> {
        if let Some(cached) = self.alba_levels.read().get(namespace) {
            return Ok(cached.clone());
        }
        let levels = client.alba_levels(namespace).await?;
        self.alba_levels.write().insert(namespace.to_string(), levels.clone());
        Ok(levels)
    }

    /// Record or refresh an OSD's connection info (from a proxy `osd_info`
    /// response). A newly-seen OSD starts healthy.
    pub fn update_info(&self, osd_id: OsdId, endpoint: String, long_id: Option<String>) {
        let mut entries = self.entries.write();
        entries
            .entry(osd_id)
            .and_modify(|e| {
                e.endpoint.clone_from(&endpoint);
                e.long_id.clone_from(&long_id);
            })
            .or_insert(Entry { endpoint, long_id, health: Health::Healthy });
    }

    /// Current endpoint for `osd_id`, if known.
    #[must_use]
    pub fn endpoint(&self, osd_id: OsdId) -> Option<String> {
        self.entries.read().get(&osd_id).map(|e| e.endpoint.clone())
    }

    /// Long-id expected at `osd_id`, used to validate the handshake.
    #[must_use]
    pub fn long_id(&self, osd_id: OsdId) -> Option<String> {
        self.entries.read().get(&osd_id).and_then(|e| e.long_id.clone())
    }

    /// Mark `osd_id` disqualified for `period`, skipping it in
    /// [`OsdRegistry::is_usable`] until the period elapses.
    pub fn disqualify(&self, osd_id: OsdId, period: Duration) {
        let until = self.clock.now() + period;
        if let Some(entry) = self.entries.write().get_mut(&osd_id) {
            entry.health = Health::Disqualified(until);
            tracing::debug!(osd_id = osd_id.0, ?period, "disqualified osd");
        }
    }

    /// True if `osd_id` is known and not currently disqualified.
    #[must_use]
    pub fn is_usable(&self, osd_id: OsdId) -> bool {
        match self.entries.read().get(&osd_id) {
            None => false,
            Some(entry) => match entry.health {
                Health::Healthy => true,
                Health::Disqualified(until) => self.clock.now() >= until,
            },
        }
    }

    /// Every known OSD id, for diagnostics and tests.
    #[must_use]
    pub fn known_osds(&self) -> Vec<OsdId> {
        self.entries.read().keys().copied().collect()
    }

    /// Snapshot of every known OSD's current connection info (`osd_info` /
    /// `osd_info2` in the original), for diagnostics and tests — not on the
    /// hot path.
    #[must_use]
    pub fn snapshot(&self) -> Vec<OsdInfo> {
        self.entries
            .read()
            .iter()
            .map(|(osd_id, entry)| OsdInfo {
                osd_id: *osd_id,
                endpoint: entry.endpoint.clone(),
                long_id: entry.long_id.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use shortpath_core::{
        Assertion, ConsistentRead, ObjectInfo, ObjectSlices, OsdInfo, Update, WriteBarrier,
    };

    #[derive(Clone, Default)]
    struct FakeProxy {
        osds: Vec<OsdInfo>,
        alba_levels: Vec<StoreId>,
    }

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
            Ok(self.osds.clone())
        }

        async fn alba_levels(&self, _namespace: &str) -> Result<Vec<StoreId>, ProxyError> {
            Ok(self.alba_levels.clone())
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

        fn advance(&self, d: Duration) {
            let mut guard = self.0.lock().unwrap();
            *guard += d;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn unknown_osd_is_not_usable() {
        let registry = OsdRegistry::new(ManualClock::new());
        assert!(!registry.is_usable(OsdId(1)));
    }

    #[test]
    fn known_osd_starts_healthy() {
        let registry = OsdRegistry::new(ManualClock::new());
        registry.update_info(OsdId(1), "127.0.0.1:9000".into(), Some("osd-1".into()));
        assert!(registry.is_usable(OsdId(1)));
        assert_eq!(registry.endpoint(OsdId(1)).as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn disqualification_expires() {
        let clock = ManualClock::new();
        let registry = OsdRegistry::new(clock.clone());
        registry.update_info(OsdId(1), "127.0.0.1:9000".into(), None);

        registry.disqualify(OsdId(1), Duration::from_secs(30));
        assert!(!registry.is_usable(OsdId(1)));

        clock.advance(Duration::from_secs(31));
        assert!(registry.is_usable(OsdId(1)));
    }

    #[test]
    fn is_unknown_distinguishes_missing_from_disqualified() {
        let clock = ManualClock::new();
        let registry = OsdRegistry::new(clock);
        assert!(registry.is_unknown(OsdId(1)));

        registry.update_info(OsdId(1), "127.0.0.1:9000".into(), None);
        registry.disqualify(OsdId(1), Duration::from_secs(30));
        assert!(!registry.is_unknown(OsdId(1)));
        assert!(!registry.is_usable(OsdId(1)));
    }

    #[tokio::test]
    async fn update_merges_proxy_osd_info() {
        let registry = OsdRegistry::new(ManualClock::new());
        let proxy = FakeProxy {
            osds: vec![OsdInfo { osd_id: OsdId(5), endpoint: "10.0.0.5:9000".into(), long_id: Some("osd-5".into()) }],
            ..Default::default()
        };

        registry.update(&proxy).await.unwrap();

        assert!(registry.is_usable(OsdId(5)));
        assert_eq!(registry.endpoint(OsdId(5)).as_deref(), Some("10.0.0.5:9000"));
        assert_eq!(registry.long_id(OsdId(5)).as_deref(), Some("osd-5"));
    }

    #[test]
    fn snapshot_reports_every_known_osd() {
        let registry = OsdRegistry::new(ManualClock::new());
        registry.update_info(OsdId(1), "10.0.0.1:9000".into(), Some("osd-1".into()));
        registry.update_info(OsdId(2), "10.0.0.2:9000".into(), None);

        let mut snapshot = registry.snapshot();
        snapshot.sort_by_key(|info| info.osd_id.0);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].osd_id, OsdId(1));
        assert_eq!(snapshot[0].long_id.as_deref(), Some("osd-1"));
        assert_eq!(snapshot[1].osd_id, OsdId(2));
    }

    #[tokio::test]
    async fn get_alba_levels_caches_first_response() {
        let registry = OsdRegistry::new(ManualClock::new());
        let proxy = FakeProxy { alba_levels: vec![StoreId("level-1".into())], ..Default::default() };

        let first = registry.get_alba_levels(&proxy, "ns").await.unwrap();
        assert_eq!(first, vec![StoreId("level-1".into())]);

        let empty_proxy = FakeProxy::default();
        let second = registry.get_alba_levels(&empty_proxy, "ns").await.unwrap();
        assert_eq!(second, first, "cached response should not be refetched");
    }
}
