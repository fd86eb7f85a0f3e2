//! Property tests for single-level slice resolution:
//! for any manifest and any in-range `(pos, len)`, the resolver's output
//! covers exactly `[0, len)` of the caller's target buffer, contiguously,
//! and visits `(chunk_id, fragment_id)` pairs in strictly increasing order.

use proptest::prelude::*;
use shortpath_core::model::{Checksum, Compression, EncodingScheme, EncryptInfo, Manifest, ObjectId, OsdId, VersionId};
use shortpath_resolver::resolve_single_level;

fn arb_manifest() -> impl Strategy<Value = Manifest> {
    (1u32..=6, 1usize..=5).prop_flat_map(|(k, num_chunks)| {
        proptest::collection::vec(1u32..=8, num_chunks).prop_map(move |chunk_multiples| {
            let chunk_sizes: Vec<u32> = chunk_multiples.iter().map(|&m| m * k).collect();
            let fragment_locations = chunk_sizes
                .iter()
                .map(|_| (0..k).map(|f| Some((OsdId(f + 1), VersionId(0)))).collect())
                .collect();
            let size = chunk_sizes.iter().map(|&c| u64::from(c)).sum();
            Manifest {
                name: "prop-obj".into(),
                object_id: ObjectId(vec![1, 2, 3]),
                size,
                chunk_sizes,
                encoding_scheme: EncodingScheme { k, m: 0, w: 1 },
                compression: Compression::None,
                encrypt_info: EncryptInfo::None,
                fragment_locations,
                fragment_checksums: vec![],
                fragment_packed_sizes: vec![],
                checksum: Checksum::None,
                version_id: 0,
                max_disks_per_node: 0,
                timestamp: 0,
            }
        })
    })
}

proptest! {
    #[test]
    fn resolution_covers_requested_range_contiguously_and_monotonically(
        manifest in arb_manifest(),
        pos_frac in 0.0f64..1.0,
        len_frac in 0.0f64..1.0,
    ) {
        prop_assume!(manifest.size > 0);
        let pos = ((manifest.size as f64) * pos_frac) as u64;
        let remaining_room = manifest.size - pos;
        let len = ((remaining_room as f64) * len_frac) as u64;

        let out = resolve_single_level(&manifest, 1, pos, len, 0).unwrap();

        let total: u64 = out.iter().map(|r| u64::from(r.location.length)).sum();
        prop_assert_eq!(total, len);

        let mut expected_offset: u32 = 0;
        for r in &out {
            prop_assert_eq!(r.target_offset, expected_offset);
            expected_offset += r.location.length;
        }
        prop_assert_eq!(expected_offset as u64, len);

        let mut last: Option<(u32, u32)> = None;
        for r in &out {
            let key = (r.location.chunk_id, r.location.fragment_id);
            if let Some(prev) = last {
                prop_assert!(prev < key, "locations must visit (chunk, fragment) in strictly increasing order");
            }
            last = Some(key);
        }
    }
}
