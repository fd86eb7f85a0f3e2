//! Cache key identifying one manifest.

use shortpath_core::StoreId;

/// Identifies a cached manifest: the namespace it was fetched under, the
/// (possibly nested) store that produced it, and the object name.
///
/// `store_id` distinguishes manifests for the same object name fetched via
/// different nested stores, so a multi-level resolution never confuses a
/// parent namespace's cached entry with a child namespace's. `object_name`
/// is a byte string rather than `String`: top-level reads name objects by
/// their human-readable name, but the resolver's nested-store recursion
/// addresses inner objects by a binary inner-object key (§6), which is not
/// guaranteed to be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Namespace the object was fetched under.
    pub namespace_id: u32,
    /// The nested store that produced this manifest, `None` for the top-level store.
    pub store_id: Option<StoreId>,
    /// Object name within the namespace/store.
    pub object_name: Vec<u8>,
}

impl CacheKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(namespace_id: u32, store_id: Option<StoreId>, object_name: impl AsRef<[u8]>) -> Self {
        Self { namespace_id, store_id, object_name: object_name.as_ref().to_vec() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_with_different_store_ids_are_distinct() {
        let a = CacheKey::new(1, Some(StoreId("child-a".into())), "obj");
        let b = CacheKey::new(1, Some(StoreId("child-b".into())), "obj");
        assert_ne!(a, b);
    }

    #[test]
    fn keys_accept_non_utf8_inner_object_names() {
        let inner = vec![0xFF, 0xFE, 0x00, 0x01];
        let key = CacheKey::new(1, Some(StoreId("level-1".into())), &inner);
        assert_eq!(key.object_name, inner);
    }
}
