#![no_main]

use blockhouse_table::{
    read_footer_from_file, BlockHandle, Footer, MemoryFile,
    BLOCK_BASED_TABLE_MAGIC_NUMBER,
};
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to the footer and handle decoders.
    // Everything must fail cleanly on:
    // - Truncated tails
    // - Legacy/current magic confusion
    // - Endless varints in the handle area
    // - Checksum-type bytes outside the known set
    let mut cursor = data;
    if let Ok(footer) = Footer::decode_from(&mut cursor) {
        // A decoded footer must round-trip
        let mut encoded = Vec::new();
        footer.encode_to(&mut encoded);
        let redecoded = Footer::decode_from(&mut encoded.as_slice()).unwrap();
        assert_eq!(footer, redecoded);
    }

    let mut cursor = data;
    if let Ok(handle) = BlockHandle::decode_from(&mut cursor) {
        let mut encoded = Vec::new();
        handle.encode_to(&mut encoded);
    }

    // The file-level entry point with and without magic enforcement
    let file = MemoryFile::new(Bytes::copy_from_slice(data));
    let _ = read_footer_from_file(&file, data.len() as u64, 0);
    let _ = read_footer_from_file(&file, data.len() as u64, BLOCK_BASED_TABLE_MAGIC_NUMBER);
});
