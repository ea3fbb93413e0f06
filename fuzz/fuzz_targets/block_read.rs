#![no_main]

use blockhouse_table::{
    read_block_contents, uncompress_block_contents, BlockHandle, EngineOptions, Footer,
    MemoryFile, PersistentCacheOptions, ReadOptions, BLOCK_TRAILER_SIZE,
    BLOCK_BASED_TABLE_MAGIC_NUMBER,
};
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Treat the input as a block region: payload + trailer. The pipeline
    // must reject every malformed shape without panicking:
    // - Truncated reads
    // - Checksum garbage
    // - Unknown compression tags
    // - Corrupted compressed payloads for every codec
    if data.len() < BLOCK_TRAILER_SIZE {
        return;
    }
    let payload_len = data.len() - BLOCK_TRAILER_SIZE;

    let file = MemoryFile::new(Bytes::copy_from_slice(data));
    let footer = Footer::new(BLOCK_BASED_TABLE_MAGIC_NUMBER, 2);
    let handle = BlockHandle::new(0, payload_len as u64);

    let mut scratch = vec![0u8; data.len()];
    let _ = read_block_contents(
        &file,
        &footer,
        &ReadOptions::default(),
        &handle,
        &mut scratch,
        &EngineOptions::default(),
        true,
        &[],
        &PersistentCacheOptions::default(),
    );

    // Also hit the decompressor directly with every tag byte the trailer
    // could carry.
    let tag = data[payload_len];
    let _ = uncompress_block_contents(
        &data[..payload_len],
        tag,
        2,
        &[],
        &EngineOptions::default(),
    );
});
