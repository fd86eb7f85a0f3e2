//! Slice resolver: translates `(object, offset, length)` requests into
//! fragment-level reads, recursing through nested storage stacks.
//!
//! This crate only reads the manifest cache — it never touches the network.
//! A [`ShortPathError::ManifestMiss`] means "the short path can't serve
//! this," not a bug; the front client is expected to catch it and fall back
//! to the proxy, exactly as the executor's non-zero status does.

use shortpath_cache::{CacheKey, ManifestCache};
use shortpath_core::{Location, Manifest, ShortPathError, StoreId};
use shortpath_proto::inner_object_name;

/// One resolved sub-read: which slot of the caller's flat target-buffer list
/// it belongs to, where within that buffer it lands, and the fragment-level
/// [`Location`] to read it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlice {
    /// Index into the caller's flat target-buffer list (see
    /// `shortpath_core::SliceDescriptor::target_index`).
    pub target_index: usize,
    /// Byte offset within that target buffer where this sub-read's data
    /// belongs.
    pub target_offset: u32,
    /// Where to read the bytes from.
    pub location: Location,
}

/// Resolve `(pos, len)` against a single manifest, with no nested-store
/// recursion.
///
/// Walks chunks in order,
/// within each chunk compute the containing fragment, and emit one
/// [`ResolvedSlice`] per chunk/fragment boundary crossed. A `len` of zero
/// returns an empty vector without inspecting `manifest` further.
pub fn resolve_single_level(
    manifest: &Manifest,
    namespace_id: u32,
    pos: u64,
    len: u64,
    target_index: usize,
) -> Result<Vec<ResolvedSlice>, ShortPathError> {
    if pos.checked_add(len).is_none_or(|end| end > manifest.size) {
        return Err(ShortPathError::OutOfRange { pos, len, size: manifest.size });
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let k = u64::from(manifest.encoding_scheme.k);
    let mut cursor = pos;
    let mut remaining = len;
    let mut target_offset: u32 = 0;
    let mut out = Vec::new();

    while remaining > 0 {
        let (chunk_id, chunk_start) = manifest
            .chunk_at(cursor)
            .ok_or(ShortPathError::OutOfRange { pos, len, size: manifest.size })?;
        let chunk_size = u64::from(manifest.chunk_sizes[chunk_id]);
        let fragment_length = chunk_size / k;
        let pos_in_chunk = cursor - chunk_start;
        let fragment_id = (pos_in_chunk / fragment_length) as u32;
        let pos_in_fragment = pos_in_chunk % fragment_length;
        let available = fragment_length - pos_in_fragment;
        let take = remaining.min(available);

        let fragment_location = manifest.fragment_locations[chunk_id][fragment_id as usize];
        out.push(ResolvedSlice {
            target_index,
            target_offset,
            location: Location {
                namespace_id,
                object_id: manifest.object_id.clone(),
                chunk_id: chunk_id as u32,
                fragment_id,
                fragment_location,
                offset: pos_in_fragment as u32,
                length: take as u32,
            },
        });

        cursor += take;
        remaining -= take;
        target_offset += take as u32;
    }

    Ok(out)
}

/// Resolve `(pos, len)` for `object_name`, recursing through `levels` (the
/// ordered nested-store list from `get_alba_levels`) as needed.
///
/// `levels` empty or single-element means the object is backed directly by
/// physical OSDs: the top-level manifest's locations are returned as-is.
/// With more than one level, a location produced at a non-terminal level is
/// re-keyed to the canonical inner-object name (§6) and resolved again one
/// level deeper, unless its `fragment_location` is `None` (a parity hole
/// can't be recursed into; it is surfaced unchanged so the executor's
/// all-or-nothing check still fires).
///
/// Returns [`ShortPathError::ManifestMiss`] if any manifest needed along the
/// way — at any level — is not cached; the caller is expected to fall back
/// to the proxy for the whole object in that case.
pub fn resolve_object_slice(
    cache: &ManifestCache,
    levels: &[StoreId],
    namespace_id: u32,
    object_name: &str,
    pos: u64,
    len: u64,
    target_index: usize,
) -> Result<Vec<ResolvedSlice>, ShortPathError> {
    resolve_level(cache, levels, 0, namespace_id, None, object_name.as_bytes(), pos, len, target_index)
}

fn resolve_level(
    cache: &ManifestCache,
    levels: &[StoreId],
    level: usize,
    namespace_id: u32,
    store_id: Option<&StoreId>,
    object_name: &[u8],
    pos: u64,
    len: u64,
    target_index: usize,
) -> Result<Vec<ResolvedSlice>, ShortPathError> {
    let key = CacheKey::new(namespace_id, store_id.cloned(), object_name);
    let manifest = cache.find(&key).ok_or_else(|| {
        ShortPathError::ManifestMiss(format!("ns={namespace_id} store={store_id:?} object={key:?}"))
    })?;

    let located = resolve_single_level(&manifest, namespace_id, pos, len, target_index)?;

    let is_terminal_level = levels.is_empty() || level + 1 >= levels.len();
    if is_terminal_level {
        return Ok(located);
    }

    let next_store = &levels[level + 1];
    let mut out = Vec::with_capacity(located.len());
    for item in located {
        let Some(_) = item.location.fragment_location else {
            out.push(item);
            continue;
        };

        let inner_name =
            inner_object_name(&item.location.object_id, item.location.chunk_id, item.location.fragment_id);
        let recursed = resolve_level(
            cache,
            levels,
            level + 1,
            namespace_id,
            Some(next_store),
            &inner_name,
            u64::from(item.location.offset),
            u64::from(item.location.length),
            target_index,
        )?;
        out.extend(recursed.into_iter().map(|mut r| {
            r.target_offset += item.target_offset;
            r
        }));
    }
    Ok(out)
}
