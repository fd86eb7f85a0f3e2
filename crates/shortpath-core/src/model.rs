//! Object store data model: encoding scheme, manifest, and resolver output.
//!
//! Manifests are immutable once decoded (see the design note on shared,
//! immutable manifests): nothing in this module exposes a setter once a
//! `Manifest` has been constructed by the decoder in `shortpath-proto`.

use std::sync::Arc;

/// Opaque object identifier, used verbatim inside fragment keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId(pub Vec<u8>);

impl ObjectId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Numeric identifier of an OSD, as carried in `fragment_locations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OsdId(pub u32);

/// Fragment version, bumped on repair/rebalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionId(pub u32);

/// Identifier of a (possibly nested) storage backend ("alba id").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreId(pub String);

/// Erasure coding shape: `k` data fragments, `m` parity fragments, word size
/// `w`.
///
/// # Invariants
///
/// `k >= 1`, `m >= 0`. Constructed only by the manifest decoder, which
/// rejects anything violating this via `UnsupportedManifest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingScheme {
    pub k: u32,
    pub m: u32,
    pub w: u8,
}

impl EncodingScheme {
    #[must_use]
    pub fn total_fragments(&self) -> u32 {
        self.k + self.m
    }
}

/// Compression applied to fragment payloads before they were stored.
///
/// The short path only ever accepts `None` manifests for direct reads (see
/// the admission filter on the manifest cache); `Snappy`/`BZip2` manifests
/// are still decoded (so the front client can observe and reject them) but
/// never admitted to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Snappy,
    BZip2,
}

/// Encryption applied to fragment payloads. Only `None` is currently
/// assigned a wire tag beyond the reserved range; any other tag is an
/// `UnsupportedManifest` decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptInfo {
    None,
}

/// Whole-object or per-fragment checksum. The short path never verifies
/// these — they are parsed and carried for completeness
/// so a manifest round-trips losslessly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    None,
    Sha1([u8; 20]),
    Crc32c(u32),
}

/// Placement of a single fragment: which OSD holds it, at which version.
pub type FragmentLocation = Option<(OsdId, VersionId)>;

/// Decoded object manifest.
///
/// Shared, immutable, reference-counted: the cache owns one `Arc`, and every
/// resolution that reads the manifest clones the `Arc` rather than the
/// manifest itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub object_id: ObjectId,
    pub size: u64,
    pub chunk_sizes: Vec<u32>,
    pub encoding_scheme: EncodingScheme,
    pub compression: Compression,
    pub encrypt_info: EncryptInfo,
    /// `[chunk][fragment]`, length `k + m` per chunk.
    pub fragment_locations: Vec<Vec<FragmentLocation>>,
    /// `[chunk][fragment]`, parallel to `fragment_locations`. Not consulted
    /// on the short path.
    pub fragment_checksums: Vec<Vec<Checksum>>,
    /// `[chunk][fragment]`, parallel to `fragment_locations`. Not consulted
    /// on the short path.
    pub fragment_packed_sizes: Vec<Vec<u32>>,
    pub checksum: Checksum,
    pub version_id: u32,
    pub max_disks_per_node: u32,
    pub timestamp: u64,
}

impl Manifest {
    /// True iff this manifest may be admitted to the manifest cache: only non-compressed, non-encrypted manifests
    /// are eligible for the short path.
    #[must_use]
    pub fn is_admissible(&self) -> bool {
        matches!(self.compression, Compression::None) && matches!(self.encrypt_info, EncryptInfo::None)
    }

    /// Index of the chunk containing byte offset `pos`, and that chunk's
    /// starting offset within the object.
    ///
    /// Returns `None` if `pos >= size` (the caller is responsible for the
    /// `OutOfRange` check against the full requested range).
    #[must_use]
    pub fn chunk_at(&self, pos: u64) -> Option<(usize, u64)> {
        let mut total: u64 = 0;
        for (idx, &chunk_size) in self.chunk_sizes.iter().enumerate() {
            let next = total + u64::from(chunk_size);
            if pos < next {
                return Some((idx, total));
            }
            total = next;
        }
        None
    }
}

/// A manifest together with the namespace id used to form fragment keys.
///
/// Fragment keys are namespace-scoped on the wire (see §6), so every
/// resolution needs both the manifest and the numeric namespace id it was
/// fetched under.
#[derive(Debug, Clone)]
pub struct ManifestWithNamespaceId {
    pub namespace_id: u32,
    pub manifest: Arc<Manifest>,
}

/// Output of the slice resolver: one fragment-level sub-read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub namespace_id: u32,
    pub object_id: ObjectId,
    pub chunk_id: u32,
    pub fragment_id: u32,
    pub fragment_location: FragmentLocation,
    /// Byte offset within the target fragment (not the chunk — a fragment
    /// is what an OSD actually addresses).
    pub offset: u32,
    pub length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admissible_requires_no_compression_and_no_encryption() {
        let base = Manifest {
            name: "obj".into(),
            object_id: ObjectId(vec![1, 2, 3]),
            size: 0,
            chunk_sizes: vec![],
            encoding_scheme: EncodingScheme { k: 1, m: 0, w: 1 },
            compression: Compression::None,
            encrypt_info: EncryptInfo::None,
            fragment_locations: vec![],
            fragment_checksums: vec![],
            fragment_packed_sizes: vec![],
            checksum: Checksum::None,
            version_id: 0,
            max_disks_per_node: 0,
            timestamp: 0,
        };
        assert!(base.is_admissible());

        let mut compressed = base.clone();
        compressed.compression = Compression::Snappy;
        assert!(!compressed.is_admissible());
    }

    #[test]
    fn chunk_at_finds_containing_chunk() {
        let mut m = Manifest {
            name: "obj".into(),
            object_id: ObjectId(vec![]),
            size: 1024,
            chunk_sizes: vec![512, 512],
            encoding_scheme: EncodingScheme { k: 2, m: 0, w: 1 },
            compression: Compression::None,
            encrypt_info: EncryptInfo::None,
            fragment_locations: vec![],
            fragment_checksums: vec![],
            fragment_packed_sizes: vec![],
            checksum: Checksum::None,
            version_id: 0,
            max_disks_per_node: 0,
            timestamp: 0,
        };
        assert_eq!(m.chunk_at(0), Some((0, 0)));
        assert_eq!(m.chunk_at(511), Some((0, 0)));
        assert_eq!(m.chunk_at(512), Some((1, 512)));
        assert_eq!(m.chunk_at(1023), Some((1, 512)));
        assert_eq!(m.chunk_at(1024), None);

        m.chunk_sizes = vec![];
        assert_eq!(m.chunk_at(0), None);
    }
}
