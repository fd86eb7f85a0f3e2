//! Wire formats for the short-path object store client: the manifest
//! encoding, fragment key construction, and the OSD request/reply protocol.
//!
//! Kept separate from `shortpath-core` because these are encode/decode
//! concerns with their own error variants, not part of the shared
//! vocabulary every other crate builds on.

pub mod codec;
pub mod errors;
pub mod fragment_key;
pub mod manifest_codec;
pub mod osd_wire;

pub use errors::ProtocolError;
pub use fragment_key::{fragment_key, inner_object_name};
pub use manifest_codec::{decode_manifest, encode_manifest};
pub use osd_wire::{
    GetVersionReply, HandshakeReply, HandshakeRequest, OsdFrame, OsdHeader, OsdOpcode,
    PartialGetReply, PartialGetRequest, SetSlownessRequest,
};
