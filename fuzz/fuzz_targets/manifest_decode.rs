//! Fuzz target for `decode_manifest`.
//!
//! Every manifest the short path ever reads comes straight off an OSD or
//! proxy reply, so the decoder has to survive arbitrary bytes without
//! panicking: truncated length prefixes, bogus layout tags, Snappy bodies
//! that don't decompress, all of it. The fuzzer should never panic; an
//! invalid manifest is an `Err`, not a crash.

#![no_main]

use libfuzzer_sys::fuzz_target;
use shortpath_proto::decode_manifest;

fuzz_target!(|data: &[u8]| {
    let _ = decode_manifest(data);
});
