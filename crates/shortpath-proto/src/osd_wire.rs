//! OSD request/reply framing and payloads (grounded in the
//! original's `asd_client.h`/`tcp_transport.h`): a small fixed header for
//! O(1) request/response correlation, followed by a payload this module
//! encodes with the primitive codec (the OSD protocol is raw binary, not
//! CBOR — there is no MLS-style structured payload to gain from a
//! serialization crate here).

use bytes::{BufMut, Bytes};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::codec::{Reader, Writer};
use crate::errors::{ProtocolError, Result};

/// Operation identifiers carried in [`OsdHeader::opcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsdOpcode {
    /// Verify the OSD's long-id before any reads are sent on a connection.
    Handshake = 1,
    /// Batched fragment-range read.
    PartialGet = 2,
    /// Report observed slowness for this OSD back to it.
    SetSlowness = 3,
    /// Query the OSD's build version.
    GetVersion = 4,
}

impl OsdOpcode {
    /// Map a raw opcode byte back to its enum value, if recognized.
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Handshake),
            2 => Some(Self::PartialGet),
            3 => Some(Self::SetSlowness),
            4 => Some(Self::GetVersion),
            _ => None,
        }
    }
}

/// Fixed 12-byte header preceding every OSD request/reply payload.
///
/// Magic + version let a misconfigured OSD endpoint fail fast; `request_id`
/// lets the OSD client pool correlate out-of-order replies on a connection
/// that pipelines multiple in-flight reads.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct OsdHeader {
    magic: [u8; 2],
    version: u8,
    opcode: u8,
    request_id: [u8; 4],
    payload_size: [u8; 4],
}

impl OsdHeader {
    /// Serialized size in bytes.
    pub const SIZE: usize = 12;
    /// Protocol magic number ("OS").
    pub const MAGIC: u16 = 0x4F53;
    /// Current protocol version.
    pub const VERSION: u8 = 1;
    /// Largest payload this header can describe (16 MB).
    pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

    /// Build a header for `opcode`/`request_id` with a zeroed payload size
    /// (set later by [`OsdFrame::encode`]).
    #[must_use]
    pub fn new(opcode: OsdOpcode, request_id: u32) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            opcode: opcode as u8,
            request_id: request_id.to_be_bytes(),
            payload_size: [0; 4],
        }
    }

    /// Parse a header from the front of `bytes` without copying.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if u16::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }
        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }
        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }
        Ok(header)
    }

    /// Serialize to the 12-byte wire representation.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// This header's opcode, if recognized.
    #[must_use]
    pub fn opcode(&self) -> Option<OsdOpcode> {
        OsdOpcode::from_u8(self.opcode)
    }

    /// Client-assigned request nonce, for correlating pipelined replies.
    #[must_use]
    pub fn request_id(&self) -> u32 {
        u32::from_be_bytes(self.request_id)
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

/// Header plus raw payload bytes, the unit exchanged over an OSD TCP
/// connection.
#[derive(Debug, Clone)]
pub struct OsdFrame {
    /// Which operation this frame carries.
    pub opcode: OsdOpcode,
    /// Client-assigned request nonce.
    pub request_id: u32,
    /// Encoded request or reply payload.
    pub payload: Bytes,
}

impl OsdFrame {
    /// Wrap an already-encoded payload with its opcode and request id.
    #[must_use]
    pub fn new(opcode: OsdOpcode, request_id: u32, payload: impl Into<Bytes>) -> Self {
        Self { opcode, request_id, payload: payload.into() }
    }

    /// Write header and payload to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > OsdHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: OsdHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }
        let mut header = OsdHeader::new(self.opcode, self.request_id);
        header.payload_size = (self.payload.len() as u32).to_be_bytes();
        dst.put_slice(&header.to_bytes());
        dst.put_slice(&self.payload);
        Ok(())
    }

    /// Parse header and payload from a complete buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = OsdHeader::from_bytes(bytes)?;
        let opcode = header
            .opcode()
            .ok_or(ProtocolError::UnrecognizedTag { field: "osd.opcode", tag: header.opcode })?;
        let request_id = header.request_id();
        let payload_size = header.payload_size() as usize;
        let total = OsdHeader::SIZE + payload_size;
        if bytes.len() < total {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(OsdHeader::SIZE),
            });
        }
        let payload = Bytes::copy_from_slice(&bytes[OsdHeader::SIZE..total]);
        Ok(Self { opcode, request_id, payload })
    }
}

/// `partial_get` request: one fragment key with a batch of `(offset,
/// length)` sub-reads, mirroring `asd_client::partial_get`'s slice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialGetRequest {
    /// Target fragment, as built by `fragment_key`.
    pub fragment_key: Vec<u8>,
    /// `(offset, length)` sub-reads within the fragment.
    pub slices: Vec<(u64, u32)>,
}

impl PartialGetRequest {
    /// Encode to the wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.bytes(&self.fragment_key);
        w.vec(&self.slices, |w, (offset, length)| {
            w.u64(*offset);
            w.u32(*length);
        });
        w.into_vec()
    }

    /// Parse from the wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let fragment_key = r.bytes()?;
        let slices = r.vec(|r| Ok((r.u64()?, r.u32()?)))?;
        Ok(Self { fragment_key, slices })
    }
}

/// `partial_get` reply: a single status for the whole request, followed by
/// the concatenated fragment data for every requested slice in request
/// order (meaningful only when `status == 0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialGetReply {
    /// Application-level status, `0` meaning success.
    pub status: u32,
    /// Concatenated slice data, in request order. Empty when `status != 0`.
    pub payload: Vec<u8>,
}

impl PartialGetReply {
    /// Encode to the wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.status);
        w.bytes(&self.payload);
        w.into_vec()
    }

    /// Parse from the wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let status = r.u32()?;
        let payload = r.bytes()?;
        Ok(Self { status, payload })
    }
}

/// Handshake request carrying the long-id the client expects this OSD to
/// own, so a misrouted TCP connection is caught before any reads are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// The long-id the client expects to find at the other end.
    pub expected_long_id: String,
}

impl HandshakeRequest {
    /// Encode to the wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.string(&self.expected_long_id);
        w.into_vec()
    }

    /// Parse from the wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        Ok(Self { expected_long_id: r.string()? })
    }
}

/// Handshake reply: the OSD's actual long-id, so the caller can compare it
/// to what it expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReply {
    /// The OSD's actual long-id.
    pub long_id: String,
}

impl HandshakeReply {
    /// Encode to the wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.string(&self.long_id);
        w.into_vec()
    }

    /// Parse from the wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        Ok(Self { long_id: r.string()? })
    }
}

/// `set_slowness` request, used by the executor to report a degraded OSD
/// back to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetSlownessRequest {
    /// Observed slowness factor (proportional, not an absolute latency).
    pub slowness: f64,
}

impl SetSlownessRequest {
    /// Encode to the wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.f64(self.slowness);
        w.into_vec()
    }

    /// Parse from the wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        Ok(Self { slowness: r.f64()? })
    }
}

/// `get_version` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetVersionReply {
    /// Major version component.
    pub major: i32,
    /// Minor version component.
    pub minor: i32,
    /// Patch version component.
    pub patch: i32,
    /// Build hash or identifier string.
    pub hash: String,
}

impl GetVersionReply {
    /// Encode to the wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.major as u32);
        w.u32(self.minor as u32);
        w.u32(self.patch as u32);
        w.string(&self.hash);
        w.into_vec()
    }

    /// Parse from the wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        Ok(Self {
            major: r.u32()? as i32,
            minor: r.u32()? as i32,
            patch: r.u32()? as i32,
            hash: r.string()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osd_frame_round_trips() {
        let frame = OsdFrame::new(OsdOpcode::PartialGet, 42, vec![1, 2, 3, 4]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        let decoded = OsdFrame::decode(&wire).unwrap();
        assert_eq!(decoded.opcode, OsdOpcode::PartialGet);
        assert_eq!(decoded.request_id, 42);
        assert_eq!(decoded.payload.as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_truncated_osd_frame() {
        let frame = OsdFrame::new(OsdOpcode::GetVersion, 1, vec![0; 10]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        assert!(matches!(
            OsdFrame::decode(&wire[..wire.len() - 3]),
            Err(ProtocolError::FrameTruncated { .. })
        ));
    }

    #[test]
    fn partial_get_round_trips() {
        let req = PartialGetRequest { fragment_key: vec![9, 8, 7], slices: vec![(0, 4), (4, 8)] };
        let decoded = PartialGetRequest::decode(&req.encode()).unwrap();
        assert_eq!(req, decoded);

        let reply = PartialGetReply { status: 0, payload: vec![1, 2, 3, 4, 5, 6] };
        let decoded_reply = PartialGetReply::decode(&reply.encode()).unwrap();
        assert_eq!(reply, decoded_reply);

        let failed = PartialGetReply { status: 7, payload: vec![] };
        assert_eq!(PartialGetReply::decode(&failed.encode()).unwrap(), failed);
    }

    #[test]
    fn handshake_round_trips() {
        let req = HandshakeRequest { expected_long_id: "osd-1".into() };
        assert_eq!(HandshakeRequest::decode(&req.encode()).unwrap(), req);

        let reply = HandshakeReply { long_id: "osd-1".into() };
        assert_eq!(HandshakeReply::decode(&reply.encode()).unwrap(), reply);
    }
}
