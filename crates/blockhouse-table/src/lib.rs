//! BlockHouse Table Layer
//!
//! This crate implements the block I/O core of the BlockHouse storage
//! engine: everything needed to locate, read, validate, and decompress
//! immutable on-disk blocks from a table file.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────┐
//! │  Table reader    │  (index structures, iterators - above this crate)
//! └────────┬─────────┘
//!          │ BlockHandle
//!          ▼
//! ┌──────────────────┐     ┌─────────────────────┐
//! │  Read pipeline   │ ◄──►│  Persistent cache   │
//! │  (fetch)         │     │  (raw/uncompressed) │
//! └────────┬─────────┘     └─────────────────────┘
//!          │ positional read
//!          ▼
//! ┌──────────────────┐     ┌─────────────────────┐
//! │ RandomAccessFile │     │  Decompressor       │
//! │ (file)           │     │  (compress)         │
//! └──────────────────┘     └─────────────────────┘
//! ```
//!
//! ## Main Components
//!
//! ### Format (`format`)
//! Block handles, the legacy and current footer layouts with silent
//! upconversion, the 5-byte block trailer, and [`read_footer_from_file`]
//! for bootstrapping a table.
//!
//! ### Read pipeline (`fetch`)
//! The three-stage cache-probe → read+checksum → decompress machine, in
//! synchronous and asynchronous drives sharing the same stage methods.
//!
//! ### Decompressor (`compress`)
//! Codec dispatch on the trailer tag (Snappy, Zlib, BZip2, LZ4, LZ4HC,
//! ZSTD) with stable corruption messages for hostile input.
//!
//! ### Persistent cache (`cache`)
//! The raw/uncompressed two-tier cache contract plus a disk-backed LRU
//! implementation.
//!
//! ## Usage Example
//! ```ignore
//! use blockhouse_table::{
//!     read_footer_from_file, read_block_contents,
//!     MemoryFile, ReadOptions, EngineOptions, PersistentCacheOptions,
//!     BLOCK_BASED_TABLE_MAGIC_NUMBER,
//! };
//!
//! let file = MemoryFile::new(table_bytes);
//! let footer = read_footer_from_file(
//!     &file, file.len() as u64, BLOCK_BASED_TABLE_MAGIC_NUMBER)?;
//!
//! let mut scratch = vec![0u8; handle.size() as usize + 5];
//! let contents = read_block_contents(
//!     &file, &footer, &ReadOptions::default(), &handle, &mut scratch,
//!     &EngineOptions::default(), true, &[], &PersistentCacheOptions::default(),
//! )?;
//! ```

pub mod cache;
pub mod compress;
pub mod fetch;
pub mod file;
pub mod format;
pub mod options;
pub mod stats;

pub use cache::{DiskBlockCache, MemoryBlockCache, PersistentCache};
pub use compress::{compress_format_for_version, uncompress_block_contents};
pub use fetch::{read_block_contents, read_block_contents_async, BlockFetcher};
pub use file::{MemoryFile, RandomAccessFile, ReadSlice};
pub use format::{
    read_footer_from_file, read_footer_from_file_async, BlockContents, BlockData, BlockHandle,
    CompressionType, Footer, BLOCK_BASED_TABLE_MAGIC_NUMBER, BLOCK_TRAILER_SIZE,
    LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER, LEGACY_PLAIN_TABLE_MAGIC_NUMBER,
    PLAIN_TABLE_MAGIC_NUMBER,
};
pub use options::{
    should_report_detailed_time, EngineOptions, PersistentCacheOptions, ReadOptions,
};
pub use stats::{Histogram, StatsLevel, Statistics, Ticker};
