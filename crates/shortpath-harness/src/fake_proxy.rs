//! Scriptable fake `ProxyClient`, the test double named in
//! `shortpath_core::interfaces`'s doc comment.

use parking_lot::Mutex;

use shortpath_core::{
    Assertion, ConsistentRead, ObjectInfo, ObjectSlices, OsdInfo, ProxyClient, ProxyError, StoreId,
    Update, WriteBarrier,
};

/// In-memory `ProxyClient` a test configures up front and then asserts
/// against (recorded calls) or is served from (canned responses).
#[derive(Default)]
pub struct FakeProxy {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    osds: Vec<OsdInfo>,
    alba_levels: Vec<StoreId>,
    read_reply: Vec<ObjectInfo>,
    apply_reply: Vec<ObjectInfo>,
    object_info_reply: (u64, Option<Vec<u8>>),
    proxy_version: (i32, i32, i32, String),
    read_calls: u32,
    apply_calls: u32,
    invalidate_calls: Vec<String>,
}

impl FakeProxy {
    /// A fake proxy with no OSDs and empty responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OSD connection-info list returned by `osd_info`.
    pub fn set_osds(&self, osds: Vec<OsdInfo>) {
        self.state.lock().osds = osds;
    }

    /// Set the nested-store id list returned by `alba_levels`.
    pub fn set_alba_levels(&self, levels: Vec<StoreId>) {
        self.state.lock().alba_levels = levels;
    }

    /// Set what `read_objects_slices2` returns on every subsequent call.
    pub fn set_read_reply(&self, infos: Vec<ObjectInfo>) {
        self.state.lock().read_reply = infos;
    }

    /// Set what `apply_sequence` returns on every subsequent call.
    pub fn set_apply_reply(&self, infos: Vec<ObjectInfo>) {
        self.state.lock().apply_reply = infos;
    }

    /// How many times `read_objects_slices2` has been called so far —
    /// lets a scenario test assert the short path, not the proxy, served a
    /// request.
    #[must_use]
    pub fn read_call_count(&self) -> u32 {
        self.state.lock().read_calls
    }

    /// How many times `apply_sequence` has been called so far.
    #[must_use]
    pub fn apply_call_count(&self) -> u32 {
        self.state.lock().apply_calls
    }

    /// Namespaces passed to `invalidate_cache`, in call order.
    #[must_use]
    pub fn invalidate_calls(&self) -> Vec<String> {
        self.state.lock().invalidate_calls.clone()
    }
}

impl ProxyClient for FakeProxy {
    async fn read_objects_slices2(
        &self,
        _namespace: &str,
        _slices: &[ObjectSlices],
        _consistency: ConsistentRead,
    ) -> Result<Vec<ObjectInfo>, ProxyError> {
        let mut state = self.state.lock();
        state.read_calls += 1;
        Ok(state.read_reply.clone())
    }

    async fn apply_sequence(
        &self,
        _namespace: &str,
        _barrier: WriteBarrier,
        _asserts: &[Assertion],
        _updates: &[Update],
    ) -> Result<Vec<ObjectInfo>, ProxyError> {
        let mut state = self.state.lock();
        state.apply_calls += 1;
        Ok(state.apply_reply.clone())
    }

    async fn invalidate_cache(&self, namespace: &str) -> Result<(), ProxyError> {
        self.state.lock().invalidate_calls.push(namespace.to_string());
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
        Ok(self.state.lock().object_info_reply.clone())
    }

    async fn osd_info(&self) -> Result<Vec<OsdInfo>, ProxyError> {
        Ok(self.state.lock().osds.clone())
    }

    async fn alba_levels(&self, _namespace: &str) -> Result<Vec<StoreId>, ProxyError> {
        Ok(self.state.lock().alba_levels.clone())
    }

    async fn get_proxy_version(&self) -> Result<(i32, i32, i32, String), ProxyError> {
        Ok(self.state.lock().proxy_version.clone())
    }

    async fn ping(&self, delay: f64) -> Result<f64, ProxyError> {
        Ok(delay)
    }
}
