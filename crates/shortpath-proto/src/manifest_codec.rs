//! Manifest wire format (grounded in the original's
//! `manifest.cc`): a version byte, a Snappy-compressed body, and inside that
//! body the full field list in a fixed order with layout tags between the
//! fragment-placement vectors.

use shortpath_core::model::{
    Checksum, Compression, EncodingScheme, EncryptInfo, FragmentLocation, Manifest, ObjectId,
    OsdId, VersionId,
};

use crate::codec::{Reader, Writer};
use crate::errors::{ProtocolError, Result};

const MANIFEST_VERSION: u8 = 1;
const ENCODING_SCHEME_VERSION: u8 = 1;
const INNER_VERSION: u8 = 1;
const LAYOUT_TAG: u8 = 1;

fn write_encoding_scheme(w: &mut Writer, es: &EncodingScheme) {
    w.u8(ENCODING_SCHEME_VERSION);
    w.u32(es.k);
    w.u32(es.m);
    w.u8(es.w);
}

fn read_encoding_scheme(r: &mut Reader) -> Result<EncodingScheme> {
    let version = r.u8()?;
    if version != ENCODING_SCHEME_VERSION {
        return Err(ProtocolError::UnrecognizedTag { field: "encoding_scheme.version", tag: version });
    }
    Ok(EncodingScheme { k: r.u32()?, m: r.u32()?, w: r.u8()? })
}

fn write_compression(w: &mut Writer, c: Compression) {
    w.u8(match c {
        Compression::None => 1,
        Compression::Snappy => 2,
        Compression::BZip2 => 3,
    });
}

fn read_compression(r: &mut Reader) -> Result<Compression> {
    match r.u8()? {
        1 => Ok(Compression::None),
        2 => Ok(Compression::Snappy),
        3 => Ok(Compression::BZip2),
        tag => Err(ProtocolError::UnrecognizedTag { field: "compression", tag }),
    }
}

fn write_encrypt_info(w: &mut Writer, e: EncryptInfo) {
    w.u8(match e {
        EncryptInfo::None => 1,
    });
}

fn read_encrypt_info(r: &mut Reader) -> Result<EncryptInfo> {
    match r.u8()? {
        1 => Ok(EncryptInfo::None),
        tag => Err(ProtocolError::UnrecognizedTag { field: "encrypt_info", tag }),
    }
}

fn write_checksum(w: &mut Writer, c: &Checksum) {
    match c {
        Checksum::None => w.u8(1),
        Checksum::Sha1(digest) => {
            w.u8(2);
            w.bytes(digest);
        }
        Checksum::Crc32c(v) => {
            w.u8(3);
            w.u32(*v);
        }
    }
}

fn read_checksum(r: &mut Reader) -> Result<Checksum> {
    match r.u8()? {
        1 => Ok(Checksum::None),
        2 => {
            let raw = r.bytes()?;
            let digest: [u8; 20] = raw
                .try_into()
                .map_err(|v: Vec<u8>| ProtocolError::FieldTruncated { expected: 20, actual: v.len() })?;
            Ok(Checksum::Sha1(digest))
        }
        3 => Ok(Checksum::Crc32c(r.u32()?)),
        tag => Err(ProtocolError::UnrecognizedTag { field: "checksum", tag }),
    }
}

fn write_fragment_location(w: &mut Writer, loc: &FragmentLocation) {
    match loc {
        None => w.u8(0),
        Some((osd, version)) => {
            w.u8(1);
            w.u32(osd.0);
            w.u32(version.0);
        }
    }
}

fn read_fragment_location(r: &mut Reader) -> Result<FragmentLocation> {
    match r.u8()? {
        0 => Ok(None),
        1 => Ok(Some((OsdId(r.u32()?), VersionId(r.u32()?)))),
        tag => Err(ProtocolError::UnrecognizedTag { field: "fragment_location", tag }),
    }
}

/// Serialize a manifest to its wire representation: a version byte followed
/// by a Snappy-compressed body.
#[must_use]
pub fn encode_manifest(mf: &Manifest) -> Vec<u8> {
    let mut body = Writer::new();
    body.string(&mf.name);
    body.bytes(mf.object_id.as_bytes());
    body.vec(&mf.chunk_sizes, |w, v| w.u32(*v));

    body.u8(INNER_VERSION);
    write_encoding_scheme(&mut body, &mf.encoding_scheme);
    write_compression(&mut body, mf.compression);
    write_encrypt_info(&mut body, mf.encrypt_info);
    write_checksum(&mut body, &mf.checksum);
    body.u64(mf.size);

    body.u8(LAYOUT_TAG);
    body.vec(&mf.fragment_locations, |w, chunk| {
        w.vec(chunk, |w, loc| write_fragment_location(w, loc));
    });

    body.u8(LAYOUT_TAG);
    body.vec(&mf.fragment_checksums, |w, chunk| {
        w.vec(chunk, |w, c| write_checksum(w, c));
    });

    body.u8(LAYOUT_TAG);
    body.vec(&mf.fragment_packed_sizes, |w, chunk| {
        w.vec(chunk, |w, v| w.u32(*v));
    });

    body.u32(mf.version_id);
    body.u32(mf.max_disks_per_node);
    body.u64(mf.timestamp);

    let compressed = snap::raw::Encoder::new()
        .compress_vec(&body.into_vec())
        .unwrap_or_default();

    let mut out = Writer::new();
    out.u8(MANIFEST_VERSION);
    out.bytes(&compressed);
    out.into_vec()
}

/// Parse a manifest from its wire representation.
pub fn decode_manifest(bytes: &[u8]) -> Result<Manifest> {
    let mut outer = Reader::new(bytes);
    let version = outer.u8()?;
    if version != MANIFEST_VERSION {
        return Err(ProtocolError::UnrecognizedTag { field: "manifest.version", tag: version });
    }
    let compressed = outer.bytes()?;
    let decompressed = snap::raw::Decoder::new()
        .decompress_vec(&compressed)
        .map_err(|e| ProtocolError::Decompress(e.to_string()))?;

    let mut r = Reader::new(&decompressed);
    let name = r.string()?;
    let object_id = ObjectId(r.bytes()?);
    let chunk_sizes = r.vec(Reader::u32)?;

    let inner_version = r.u8()?;
    if inner_version != INNER_VERSION {
        return Err(ProtocolError::UnrecognizedTag { field: "manifest.inner_version", tag: inner_version });
    }
    let encoding_scheme = read_encoding_scheme(&mut r)?;
    let compression = read_compression(&mut r)?;
    let encrypt_info = read_encrypt_info(&mut r)?;
    let checksum = read_checksum(&mut r)?;
    let size = r.u64()?;

    let layout_tag = r.u8()?;
    if layout_tag != LAYOUT_TAG {
        return Err(ProtocolError::UnrecognizedTag { field: "manifest.layout_tag", tag: layout_tag });
    }
    let fragment_locations = r.vec(|r| r.vec(read_fragment_location))?;

    let layout_tag2 = r.u8()?;
    if layout_tag2 != LAYOUT_TAG {
        return Err(ProtocolError::UnrecognizedTag { field: "manifest.layout_tag2", tag: layout_tag2 });
    }
    let fragment_checksums = r.vec(|r| r.vec(read_checksum))?;

    let layout_tag3 = r.u8()?;
    if layout_tag3 != LAYOUT_TAG {
        return Err(ProtocolError::UnrecognizedTag { field: "manifest.layout_tag3", tag: layout_tag3 });
    }
    let fragment_packed_sizes = r.vec(|r| r.vec(Reader::u32))?;

    let version_id = r.u32()?;
    let max_disks_per_node = r.u32()?;
    let timestamp = r.u64()?;

    Ok(Manifest {
        name,
        object_id,
        size,
        chunk_sizes,
        encoding_scheme,
        compression,
        encrypt_info,
        fragment_locations,
        fragment_checksums,
        fragment_packed_sizes,
        checksum,
        version_id,
        max_disks_per_node,
        timestamp,
    })
}
