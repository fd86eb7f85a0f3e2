//! The proxy boundary: shapes of the messages exchanged with
//! the proxy, without specifying its wire protocol (explicitly out of
//! scope).
//!
//! `ProxyClient` is the collaborator interface the front client falls back
//! to. An embedder supplies a real implementation that speaks the actual
//! proxy RPC protocol; `shortpath-harness` supplies a test double.

use std::future::Future;

use thiserror::Error;

use crate::model::{Manifest, StoreId};

/// One object's worth of requested byte ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSlices {
    pub object_name: String,
    pub slices: Vec<SliceDescriptor>,
}

/// A single `(offset, length)` sub-range within an object, with the index
/// into the caller's flat target-buffer list it should land in.
///
/// The resolver and executor preserve this `target_index` through
/// recursion (see the "arena-free recursion" design note) so parallel
/// per-OSD writes land directly in the caller's buffers with no copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceDescriptor {
    pub offset: u64,
    pub length: u32,
    pub target_index: usize,
}

/// Whether a read must observe the most recent write (bypassing the short
/// path entirely).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistentRead {
    Strict,
    Relaxed,
}

/// Whether a write sequence is applied behind a barrier (proxy-side
/// semantics; the short path never constructs these itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBarrier {
    Yes,
    No,
}

/// A precondition attached to a write sequence, mirroring the original's
/// `sequences::Assert` hierarchy (e.g. `AssertObjectDoesNotExist`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    ObjectDoesNotExist { object_name: String },
    ObjectExists { object_name: String },
}

/// A single step of a write sequence, mirroring the original's
/// `sequences::Update` hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    UploadObject { object_name: String, data: Vec<u8> },
    DeleteObject { object_name: String },
}

/// `object_info` as returned by proxy reads/writes: whether the read was
/// served consistently, which (possibly nested) store produced it, and the
/// manifest to feed back into the cache.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub consistent_read: bool,
    pub store_id: Option<StoreId>,
    pub manifest: Manifest,
}

/// Snapshot of one OSD's connection info, as reported by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdInfo {
    pub osd_id: crate::model::OsdId,
    pub endpoint: String,
    pub long_id: Option<String>,
}

/// Errors from the proxy collaborator. Opaque by design — the proxy wire
/// protocol is out of scope, so this only carries enough to
/// decide whether to retry (handled by the proxy client's own policy,
/// itself out of scope) and to report to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("proxy error: {0}")]
pub struct ProxyError(pub String);

/// The proxy collaborator.
///
/// Every method here exists on the real proxy client; the short path only
/// calls a subset of them directly (`read_objects_slices2`,
/// `apply_sequence`, `invalidate_cache`, `alba_levels`). The rest are
/// included so `ShortPathClient` can offer a full passthrough surface
/// without inventing its own write/list/ping paths.
pub trait ProxyClient: Send + Sync + 'static {
    /// Read slices through the proxy, returning manifests alongside the
    /// data so the caller can opportunistically populate the cache.
    fn read_objects_slices2(
        &self,
        namespace: &str,
        slices: &[ObjectSlices],
        consistency: ConsistentRead,
    ) -> impl Future<Output = Result<Vec<ObjectInfo>, ProxyError>> + Send;

    /// Apply a conditional write sequence.
    fn apply_sequence(
        &self,
        namespace: &str,
        barrier: WriteBarrier,
        asserts: &[Assertion],
        updates: &[Update],
    ) -> impl Future<Output = Result<Vec<ObjectInfo>, ProxyError>> + Send;

    /// Invalidate the proxy's own cache for a namespace (the local manifest
    /// cache invalidation happens separately, in `ShortPathClient`).
    fn invalidate_cache(&self, namespace: &str) -> impl Future<Output = Result<(), ProxyError>> + Send;

    /// Drop the proxy-side cache without affecting the local one.
    fn drop_cache(&self, namespace: &str) -> impl Future<Output = Result<(), ProxyError>> + Send;

    /// Object size and checksum, independent of the short path.
    fn get_object_info(
        &self,
        namespace: &str,
        object_name: &str,
        consistency: ConsistentRead,
    ) -> impl Future<Output = Result<(u64, Option<Vec<u8>>), ProxyError>> + Send;

    /// Current OSD connection-info map.
    fn osd_info(&self) -> impl Future<Output = Result<Vec<OsdInfo>, ProxyError>> + Send;

    /// Ordered list of nested store ids for a namespace (`get_alba_levels`).
    fn alba_levels(&self, namespace: &str) -> impl Future<Output = Result<Vec<StoreId>, ProxyError>> + Send;

    /// Proxy build/version info.
    fn get_proxy_version(&self) -> impl Future<Output = Result<(i32, i32, i32, String), ProxyError>> + Send;

    /// Round-trip latency probe.
    fn ping(&self, delay: f64) -> impl Future<Output = Result<f64, ProxyError>> + Send;
}
