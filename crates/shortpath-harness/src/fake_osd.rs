//! In-process fake OSD: a real `tokio::net::TcpListener` that speaks the
//! actual wire protocol from `shortpath_proto::osd_wire`, scripted to
//! return canned replies or simulate failures.
//!
//! Grounded in `shortpath-osd::client`'s `round_trip`/`connect` shape, run
//! in reverse: where the client writes a request and reads a reply, this
//! reads a request and writes a reply. Exercising the real socket (instead
//! of an in-memory `ProxyClient` fake) is the point — it is the only way to
//! observe `Timeout`/`TransportClosed`/`WrongOsd` the way the executor
//! actually sees them.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use shortpath_proto::osd_wire::{
    GetVersionReply, HandshakeReply, OsdFrame, OsdHeader, OsdOpcode, PartialGetReply,
};

/// How the fake OSD responds to the next `partial_get` request.
#[derive(Debug, Clone)]
pub enum PartialGetBehavior {
    /// Reply with `status = 0` and this concatenated payload.
    Reply(Vec<u8>),
    /// Reply with this non-zero application status and an empty payload.
    Status(u32),
    /// Drop the connection without replying, as if the OSD crashed
    /// mid-request.
    CloseConnection,
    /// Never reply; the caller's timeout must fire.
    Hang,
}

struct ScriptState {
    long_id: String,
    queue: VecDeque<PartialGetBehavior>,
    default: PartialGetBehavior,
}

/// Scriptable behavior for one fake OSD, shared between the test that
/// configures it and the background task serving connections.
#[derive(Clone)]
pub struct OsdScript(Arc<Mutex<ScriptState>>);

impl OsdScript {
    /// A script that reports `long_id` at handshake and otherwise answers
    /// every `partial_get` with `default`.
    #[must_use]
    pub fn new(long_id: impl Into<String>, default: PartialGetBehavior) -> Self {
        Self(Arc::new(Mutex::new(ScriptState { long_id: long_id.into(), queue: VecDeque::new(), default })))
    }

    /// Queue one `partial_get` behavior, consumed before falling back to
    /// the default. Lets a test model "OSD 10 fails once, then recovers".
    pub fn push_partial_get(&self, behavior: PartialGetBehavior) {
        self.0.lock().queue.push_back(behavior);
    }

    fn long_id(&self) -> String {
        self.0.lock().long_id.clone()
    }

    fn next_partial_get(&self) -> PartialGetBehavior {
        let mut state = self.0.lock();
        state.queue.pop_front().unwrap_or_else(|| state.default.clone())
    }
}

/// A running fake OSD. Dropping it stops accepting new connections and
/// aborts any connections already in flight.
pub struct FakeOsd {
    addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl FakeOsd {
    /// Bind on an ephemeral local port and start serving `script` in the
    /// background.
    pub async fn spawn(script: OsdScript) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let accept_task = tokio::spawn(accept_loop(listener, script));
        Ok(Self { addr, accept_task })
    }

    /// The endpoint string an `OsdClient` would dial to reach this OSD.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for FakeOsd {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(listener: TcpListener, script: OsdScript) {
    loop {
        let Ok((stream, _)) = listener.accept().await else { return };
        tokio::spawn(serve_connection(stream, script.clone()));
    }
}

async fn serve_connection(mut stream: TcpStream, script: OsdScript) {
    loop {
        let Ok(Some(frame)) = read_frame(&mut stream).await else { return };
        let reply_payload = match frame.opcode {
            OsdOpcode::Handshake => HandshakeReply { long_id: script.long_id() }.encode(),
            OsdOpcode::GetVersion => {
                GetVersionReply { major: 1, minor: 0, patch: 0, hash: "fake-osd".into() }.encode()
            }
            OsdOpcode::SetSlowness => Vec::new(),
            OsdOpcode::PartialGet => match script.next_partial_get() {
                PartialGetBehavior::Reply(payload) => PartialGetReply { status: 0, payload }.encode(),
                PartialGetBehavior::Status(status) => {
                    PartialGetReply { status, payload: Vec::new() }.encode()
                }
                PartialGetBehavior::CloseConnection => return,
                PartialGetBehavior::Hang => std::future::pending().await,
            },
        };

        let reply = OsdFrame::new(frame.opcode, frame.request_id, reply_payload);
        let mut wire = Vec::new();
        if reply.encode(&mut wire).is_err() {
            return;
        }
        if stream.write_all(&wire).await.is_err() {
            return;
        }
    }
}

async fn read_frame(stream: &mut TcpStream) -> io::Result<Option<OsdFrame>> {
    let mut header_buf = [0u8; OsdHeader::SIZE];
    match stream.read_exact(&mut header_buf).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let (opcode, request_id, payload_size) = {
        let header = OsdHeader::from_bytes(&header_buf).map_err(io::Error::other)?;
        let opcode = header.opcode().ok_or_else(|| io::Error::other("unrecognized osd opcode"))?;
        (opcode, header.request_id(), header.payload_size() as usize)
    };
    let mut payload = vec![0u8; payload_size];
    stream.read_exact(&mut payload).await?;
    Ok(Some(OsdFrame::new(opcode, request_id, payload)))
}
