//! Fragment key construction.
//!
//! A fragment key is the opaque identifier the short path hands an OSD to
//! address one fragment. It is built the same way the proxy itself builds
//! keys when writing fragments, so an OSD that only ever sees short-path
//! reads still gets keys indistinguishable from proxy-issued ones.

use crate::codec::Writer;
use shortpath_core::{ObjectId, VersionId};

/// Build the fragment key for `(namespace_id, object_id, chunk_id,
/// fragment_id)` at `version_id`.
///
/// Namespace and chunk/fragment/version numbers are tagged and big-endian so
/// keys for the same object sort by chunk then fragment, matching how the
/// proxy lays fragments out across an OSD's local keyspace.
#[must_use]
pub fn fragment_key(
    namespace_id: u32,
    object_id: &ObjectId,
    chunk_id: u32,
    fragment_id: u32,
    version_id: VersionId,
) -> Vec<u8> {
    let mut w = Writer::new();
    w.u8(b'n');
    w.u32(namespace_id);
    w.u8(b'o');
    w.bytes(object_id.as_bytes());
    w.u32(chunk_id);
    w.u32(fragment_id);
    w.u32(version_id.0);
    w.into_vec()
}

/// Build the canonical name of the inner object a fragment is backed by, for
/// resolving one level deeper into a nested storage stack.
///
/// `object_id | chunk_id | fragment_id`, with the length-prefix word that
/// would otherwise precede `object_id` stripped — the inner object is
/// addressed by this exact byte string, not wrapped in another length
/// prefix.
#[must_use]
pub fn inner_object_name(object_id: &ObjectId, chunk_id: u32, fragment_id: u32) -> Vec<u8> {
    let mut w = Writer::new();
    w.bytes(object_id.as_bytes());
    w.u32(chunk_id);
    w.u32(fragment_id);
    let mut out = w.into_vec();
    out.drain(0..4);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_key_is_deterministic() {
        let object_id = ObjectId(vec![1, 2, 3]);
        let a = fragment_key(7, &object_id, 0, 1, VersionId(0));
        let b = fragment_key(7, &object_id, 0, 1, VersionId(0));
        assert_eq!(a, b);
    }

    #[test]
    fn inner_object_name_is_deterministic_and_distinguishes_fields() {
        let object_id = ObjectId(vec![1, 2, 3]);
        let base = inner_object_name(&object_id, 0, 1);
        assert_eq!(base, inner_object_name(&object_id, 0, 1));
        assert_ne!(base, inner_object_name(&object_id, 1, 1));
        assert_ne!(base, inner_object_name(&object_id, 0, 2));
    }

    #[test]
    fn fragment_key_distinguishes_fields() {
        let object_id = ObjectId(vec![1, 2, 3]);
        let base = fragment_key(7, &object_id, 0, 1, VersionId(0));
        assert_ne!(base, fragment_key(8, &object_id, 0, 1, VersionId(0)));
        assert_ne!(base, fragment_key(7, &object_id, 1, 1, VersionId(0)));
        assert_ne!(base, fragment_key(7, &object_id, 0, 2, VersionId(0)));
        assert_ne!(base, fragment_key(7, &object_id, 0, 1, VersionId(1)));
    }
}
