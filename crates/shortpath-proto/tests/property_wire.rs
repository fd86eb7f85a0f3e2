//! Property tests for the wire codec: manifest round-trips and fragment key
//! determinism, the invariants spec.md §8 calls out alongside the resolver
//! coverage property.

use proptest::prelude::*;
use shortpath_core::model::{Checksum, Compression, EncodingScheme, EncryptInfo, Manifest, ObjectId, OsdId, VersionId};
use shortpath_proto::{decode_manifest, encode_manifest, fragment_key, inner_object_name};

fn arb_fragment_location() -> impl Strategy<Value = Option<(OsdId, VersionId)>> {
    prop_oneof![
        Just(None),
        (0u32..64, 0u32..8).prop_map(|(osd, version)| Some((OsdId(osd), VersionId(version)))),
    ]
}

fn arb_manifest() -> impl Strategy<Value = Manifest> {
    (1u32..=4, 1usize..=3).prop_flat_map(|(k, num_chunks)| {
        let m = 2u32;
        proptest::collection::vec(
            proptest::collection::vec(arb_fragment_location(), (k + m) as usize),
            num_chunks,
        )
        .prop_map(move |fragment_locations| {
            let chunk_sizes: Vec<u32> = fragment_locations.iter().map(|_| k * 4).collect();
            let size = chunk_sizes.iter().map(|&c| u64::from(c)).sum();
            Manifest {
                name: "prop-manifest".into(),
                object_id: ObjectId(vec![1, 2, 3, 4]),
                size,
                chunk_sizes,
                encoding_scheme: EncodingScheme { k, m, w: 1 },
                compression: Compression::None,
                encrypt_info: EncryptInfo::None,
                fragment_locations,
                fragment_checksums: vec![],
                fragment_packed_sizes: vec![],
                checksum: Checksum::None,
                version_id: 1,
                max_disks_per_node: 1,
                timestamp: 0,
            }
        })
    })
}

proptest! {
    #[test]
    fn manifest_round_trips_for_arbitrary_shapes(manifest in arb_manifest()) {
        let wire = encode_manifest(&manifest);
        let decoded = decode_manifest(&wire).unwrap();
        prop_assert_eq!(manifest, decoded);
    }

    #[test]
    fn fragment_key_is_a_pure_function_of_its_inputs(
        namespace_id in 0u32..1000,
        object_id_bytes in proptest::collection::vec(0u8..255, 0..16),
        chunk_id in 0u32..100,
        fragment_id in 0u32..100,
        version_id in 0u32..100,
    ) {
        let object_id = ObjectId(object_id_bytes);
        let a = fragment_key(namespace_id, &object_id, chunk_id, fragment_id, VersionId(version_id));
        let b = fragment_key(namespace_id, &object_id, chunk_id, fragment_id, VersionId(version_id));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn inner_object_name_is_a_pure_function_of_its_inputs(
        object_id_bytes in proptest::collection::vec(0u8..255, 0..16),
        chunk_id in 0u32..100,
        fragment_id in 0u32..100,
    ) {
        let object_id = ObjectId(object_id_bytes);
        let a = inner_object_name(&object_id, chunk_id, fragment_id);
        let b = inner_object_name(&object_id, chunk_id, fragment_id);
        prop_assert_eq!(a, b);
    }
}
