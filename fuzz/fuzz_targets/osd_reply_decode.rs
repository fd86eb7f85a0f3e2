//! Fuzz target for the OSD wire protocol's decode path: `OsdFrame::decode`
//! followed by the payload decoder for whatever opcode the header claims.
//!
//! This is the other half of the trust boundary the short path crosses on
//! every read — `decode_manifest` covers what a proxy/OSD claims an object
//! looks like, this covers what an OSD claims a `partial_get`/handshake/
//! version reply looks like. Neither decode step may panic on arbitrary
//! bytes; a malformed frame or payload is always an `Err`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use shortpath_proto::osd_wire::{GetVersionReply, HandshakeReply, OsdFrame, OsdOpcode, PartialGetReply};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = OsdFrame::decode(data) else { return };
    match frame.opcode {
        OsdOpcode::Handshake => {
            let _ = HandshakeReply::decode(&frame.payload);
        }
        OsdOpcode::PartialGet => {
            let _ = PartialGetReply::decode(&frame.payload);
        }
        OsdOpcode::GetVersion => {
            let _ = GetVersionReply::decode(&frame.payload);
        }
        OsdOpcode::SetSlowness => {}
    }
});
