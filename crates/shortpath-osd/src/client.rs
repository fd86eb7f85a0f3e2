//! Per-OSD persistent TCP client and the pool that owns one per OSD id.
//!
//! Connect once, keep the socket, decode length-prefixed frames, speaking
//! the OSD wire protocol over plain TCP. Requests are serialized on one
//! connection instead of multiplexed over several streams — the short path
//! never needs more than one outstanding request per OSD at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;

use shortpath_core::{OsdId, ShortPathError};
use shortpath_proto::osd_wire::{
    GetVersionReply, HandshakeReply, HandshakeRequest, OsdFrame, OsdHeader, OsdOpcode,
    PartialGetReply, PartialGetRequest, SetSlownessRequest,
};

/// Persistent client for a single OSD.
///
/// Holds at most one TCP connection, created lazily on first use and torn
/// down on any I/O error or timeout so the next call reconnects from
/// scratch. The connection is guarded by an async mutex: exactly one
/// request is in flight on a given socket at a time, per the
/// concurrency note; parallelism across OSDs comes from the executor
/// dispatching to distinct clients, not from pipelining one.
pub struct OsdClient {
    osd_id: OsdId,
    endpoint: String,
    expected_long_id: Option<String>,
    conn: AsyncMutex<Option<TcpStream>>,
    next_request_id: AtomicU32,
}

impl OsdClient {
    /// Create a client for `osd_id` at `endpoint`. No connection is opened
    /// yet. `expected_long_id` is asserted against the OSD's handshake
    /// reply on first connect, if set.
    #[must_use]
    pub fn new(osd_id: OsdId, endpoint: String, expected_long_id: Option<String>) -> Self {
        Self {
            osd_id,
            endpoint,
            expected_long_id,
            conn: AsyncMutex::new(None),
            next_request_id: AtomicU32::new(1),
        }
    }

    /// The OSD this client talks to.
    #[must_use]
    pub fn osd_id(&self) -> OsdId {
        self.osd_id
    }

    /// Issue a batched fragment read. `slices` is the `(offset, length)`
    /// list within the fragment named by `key`; replies come back as one
    /// status plus the concatenated payload in request order.
    pub async fn partial_get(
        &self,
        key: &[u8],
        slices: &[(u64, u32)],
        timeout: Duration,
    ) -> Result<PartialGetReply, ShortPathError> {
        let req = PartialGetRequest { fragment_key: key.to_vec(), slices: slices.to_vec() };
        let payload = self.call(OsdOpcode::PartialGet, req.encode(), timeout).await?;
        let reply = PartialGetReply::decode(&payload)?;
        if reply.status != 0 {
            return Err(ShortPathError::OsdReturn(reply.status));
        }
        Ok(reply)
    }

    /// Report observed slowness for this OSD back to it. Administrative;
    /// failures are not fatal to the caller.
    pub async fn set_slowness(&self, slowness: f64, timeout: Duration) -> Result<(), ShortPathError> {
        let req = SetSlownessRequest { slowness };
        self.call(OsdOpcode::SetSlowness, req.encode(), timeout).await?;
        Ok(())
    }

    /// Query the OSD's build version.
    pub async fn get_version(&self, timeout: Duration) -> Result<GetVersionReply, ShortPathError> {
        let payload = self.call(OsdOpcode::GetVersion, Vec::new(), timeout).await?;
        GetVersionReply::decode(&payload).map_err(ShortPathError::from)
    }

    /// Drop the cached connection, if any. The next call reconnects.
    pub async fn disconnect(&self) {
        *self.conn.lock().await = None;
    }

    async fn call(&self, opcode: OsdOpcode, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, ShortPathError> {
        let mut guard = self.conn.lock().await;
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => {
                let mut stream = connect(&self.endpoint, timeout).await?;
                self.handshake(&mut stream, timeout).await?;
                stream
            }
        };

        match round_trip(&mut stream, &self.next_request_id, opcode, payload, timeout).await {
            Ok(reply) => {
                *guard = Some(stream);
                Ok(reply)
            }
            Err(err) => {
                *guard = None;
                Err(err)
            }
        }
    }

    async fn handshake(&self, stream: &mut TcpStream, timeout: Duration) -> Result<(), ShortPathError> {
        let expected = self.expected_long_id.clone().unwrap_or_default();
        let req = HandshakeRequest { expected_long_id: expected };
        let payload =
            round_trip(stream, &self.next_request_id, OsdOpcode::Handshake, req.encode(), timeout).await?;
        let reply = HandshakeReply::decode(&payload)?;
        if let Some(expected) = &self.expected_long_id {
            if &reply.long_id != expected {
                return Err(ShortPathError::WrongOsd {
                    expected: expected.clone(),
                    actual: reply.long_id,
                });
            }
        }
        tracing::debug!(osd_id = self.osd_id.0, long_id = %reply.long_id, "osd handshake ok");
        Ok(())
    }
}

async fn connect(endpoint: &str, timeout: Duration) -> Result<TcpStream, ShortPathError> {
    tokio::time::timeout(timeout, TcpStream::connect(endpoint))
        .await
        .map_err(|_| ShortPathError::Timeout(timeout))?
        .map_err(|e| ShortPathError::TransportClosed(e.to_string()))
}

async fn round_trip(
    stream: &mut TcpStream,
    next_request_id: &AtomicU32,
    opcode: OsdOpcode,
    payload: Vec<u8>,
    timeout: Duration,
) -> Result<Vec<u8>, ShortPathError> {
    let request_id = next_request_id.fetch_add(1, Ordering::Relaxed);
    let frame = OsdFrame::new(opcode, request_id, payload);
    let mut wire = Vec::new();
    frame.encode(&mut wire)?;

    tokio::time::timeout(timeout, async {
        stream.write_all(&wire).await.map_err(|e| ShortPathError::TransportClosed(e.to_string()))?;

        let mut header_buf = [0u8; OsdHeader::SIZE];
        stream
            .read_exact(&mut header_buf)
            .await
            .map_err(|e| ShortPathError::TransportClosed(e.to_string()))?;
        let (payload_size, reply_request_id) = {
            let header = OsdHeader::from_bytes(&header_buf)?;
            (header.payload_size() as usize, header.request_id())
        };
        if reply_request_id != request_id {
            return Err(ShortPathError::CorruptFrame(format!(
                "reply request_id {reply_request_id} does not match request {request_id}"
            )));
        }

        let mut payload_buf = vec![0u8; payload_size];
        stream
            .read_exact(&mut payload_buf)
            .await
            .map_err(|e| ShortPathError::TransportClosed(e.to_string()))?;
        Ok(payload_buf)
    })
    .await
    .map_err(|_| ShortPathError::Timeout(timeout))?
}

/// Pool of per-OSD clients, created lazily on first use.
///
/// Shared by clones of the front client: `Arc`-backed interior mutability,
/// safe to hand out to concurrently-dispatched executor tasks.
#[derive(Clone)]
pub struct OsdClientPool {
    clients: Arc<SyncMutex<HashMap<OsdId, Arc<OsdClient>>>>,
}

impl OsdClientPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self { clients: Arc::new(SyncMutex::new(HashMap::new())) }
    }

    /// Fetch the client for `osd_id`, creating it (but not connecting it)
    /// if this is the first time this OSD is addressed.
    pub fn get_or_create(&self, osd_id: OsdId, endpoint: &str, long_id: Option<&str>) -> Arc<OsdClient> {
        let mut clients = self.clients.lock();
        clients
            .entry(osd_id)
            .or_insert_with(|| {
                Arc::new(OsdClient::new(osd_id, endpoint.to_string(), long_id.map(str::to_string)))
            })
            .clone()
    }

    /// The already-created client for `osd_id`, if any.
    #[must_use]
    pub fn get(&self, osd_id: OsdId) -> Option<Arc<OsdClient>> {
        self.clients.lock().get(&osd_id).cloned()
    }

    /// Drop every client's connection and forget all clients. Used by tests
    /// and by callers tearing down after a namespace invalidation.
    pub fn clear(&self) {
        self.clients.lock().clear();
    }
}

impl Default for OsdClientPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_the_same_client() {
        let pool = OsdClientPool::new();
        let a = pool.get_or_create(OsdId(1), "127.0.0.1:1", None);
        let b = pool.get_or_create(OsdId(1), "127.0.0.1:1", None);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn connect_to_closed_port_times_out_or_refuses() {
        let client = OsdClient::new(OsdId(1), "127.0.0.1:1".to_string(), None);
        let result = client.partial_get(&[0], &[(0, 1)], Duration::from_millis(200)).await;
        assert!(result.is_err());
    }
}
