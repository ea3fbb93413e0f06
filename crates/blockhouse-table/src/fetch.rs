//! Block Read Pipeline
//!
//! Reading one block is a three-stage state machine:
//!
//! ```text
//! S0: Cache probe
//!     ├─ uncompressed-tier hit ──────────────→ Done (contents ready)
//!     ├─ raw-tier hit ───────────────┐
//!     └─ miss                        │
//!         ↓                          │
//! S1: Disk read + checksum           │
//!     - positional read of           │
//!       handle.size + 5 bytes        │
//!     - length check                 │
//!     - CRC32C / XXH32 verify        │
//!         ↓                          ↓
//! S2: Decompression & cache fill ←───┘
//!     - raw-tier insert (before decompressing)
//!     - codec dispatch on the trailer tag
//!     - borrow-or-copy decision for uncompressed payloads
//!     - uncompressed-tier insert
//!         ↓
//!       Done
//! ```
//!
//! ## Two Drives, One Machine
//! [`read_block_contents`] runs every stage on the caller's stack.
//! [`read_block_contents_async`] is the same machine with exactly one
//! suspension point: the positional read in S1. The stage methods are
//! shared verbatim between the two; only the code that moves between stages
//! differs. In the async drive, every non-`Ok` terminal status produced
//! after the suspension point carries the async-completion bit.
//!
//! ## Cache Error Policy
//! A persistent cache failure must never fail a read: anything other than
//! `NotFound` from a lookup is logged at INFO and treated as a miss.
//! A raw-tier hit is trusted as stored - the trailer checksum is not
//! re-verified on that path.
//!
//! ## Buffer Discipline
//! The caller hands in a scratch buffer of at least `handle.size + 5` bytes
//! and must not touch it until the read completes; the borrow checker
//! enforces exactly that. Returned contents either own their bytes (heap
//! buffer, safe to cache) or borrow a zero-copy view from the reader - never
//! a borrow into scratch.

use std::time::Instant;

use blockhouse_core::checksum::{crc32c_value, unmask_crc32c, xxhash32, ChecksumType};
use blockhouse_core::status::{Result, Status};
use blockhouse_core::varint::decode_fixed32;
use bytes::Bytes;

use crate::compress::uncompress_block_contents;
use crate::file::{RandomAccessFile, ReadSlice};
use crate::format::{BlockContents, BlockHandle, CompressionType, Footer, BLOCK_TRAILER_SIZE};
use crate::options::{EngineOptions, PersistentCacheOptions, ReadOptions};
use crate::stats::Ticker;

/// Outcome of the cache probe (S0).
enum CacheProbe {
    /// Uncompressed-tier hit: the pipeline is done.
    Uncompressed(Bytes),
    /// Raw-tier hit: payload + trailer, ready for S2.
    Raw(Vec<u8>),
    Miss,
}

/// Where the raw block bytes live after S0/S1.
enum RawBlock<'a> {
    /// The read landed in the caller's scratch buffer.
    Scratch(usize),
    /// Zero-copy view into the reader's storage.
    View(&'a [u8]),
    /// Heap buffer handed back by the raw cache tier.
    CacheHeap(Vec<u8>),
}

impl<'a> RawBlock<'a> {
    fn data<'s>(&'s self, scratch: &'s [u8]) -> &'s [u8] {
        match self {
            RawBlock::Scratch(len) => &scratch[..*len],
            RawBlock::View(view) => view,
            RawBlock::CacheHeap(buf) => buf,
        }
    }
}

/// The state object of one block read. All inputs are borrowed for the
/// duration of the read; the drive functions below own the stage
/// transitions.
pub struct BlockFetcher<'a, 'o, F: RandomAccessFile + ?Sized> {
    file: &'a F,
    footer: &'o Footer,
    read_options: &'o ReadOptions,
    handle: BlockHandle,
    options: &'o EngineOptions,
    decompression_requested: bool,
    compression_dict: &'o [u8],
    cache_options: &'o PersistentCacheOptions,
}

impl<'a, 'o, F: RandomAccessFile + ?Sized> BlockFetcher<'a, 'o, F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file: &'a F,
        footer: &'o Footer,
        read_options: &'o ReadOptions,
        handle: &BlockHandle,
        options: &'o EngineOptions,
        decompression_requested: bool,
        compression_dict: &'o [u8],
        cache_options: &'o PersistentCacheOptions,
    ) -> Self {
        BlockFetcher {
            file,
            footer,
            read_options,
            handle: *handle,
            options,
            decompression_requested,
            compression_dict,
            cache_options,
        }
    }

    fn block_size(&self) -> usize {
        self.handle.size() as usize
    }

    fn record_tick(&self, ticker: Ticker, value: u64) {
        if let Some(stats) = self.options.statistics.as_deref() {
            stats.record_tick(ticker, value);
        }
    }

    /// S0: probe the persistent cache. Lookup errors other than `NotFound`
    /// are logged and treated as misses.
    fn check_persistent_cache(&self) -> CacheProbe {
        let Some(cache) = self.cache_options.cache.as_deref() else {
            return CacheProbe::Miss;
        };
        let prefix = self.cache_options.key_prefix.as_str();

        if !cache.is_compressed() {
            match cache.lookup_uncompressed(prefix, &self.handle) {
                Ok(data) => {
                    self.record_tick(Ticker::PersistentCacheHit, 1);
                    return CacheProbe::Uncompressed(data);
                }
                Err(status) if status.is_not_found() => {}
                Err(status) => {
                    tracing::info!(error = %status, "error reading from persistent cache");
                }
            }
            self.record_tick(Ticker::PersistentCacheMiss, 1);
            return CacheProbe::Miss;
        }

        match cache.lookup_raw(
            prefix,
            &self.handle,
            self.block_size() + BLOCK_TRAILER_SIZE,
        ) {
            Ok(buf) => {
                self.record_tick(Ticker::PersistentCacheHit, 1);
                CacheProbe::Raw(buf)
            }
            Err(status) => {
                if !status.is_not_found() {
                    tracing::info!(error = %status, "error reading from persistent cache");
                }
                self.record_tick(Ticker::PersistentCacheMiss, 1);
                CacheProbe::Miss
            }
        }
    }

    /// S1 tail: length and checksum verification, shared by both drives.
    fn verify_block(&self, data: &[u8]) -> Result<()> {
        let n = self.block_size();
        if data.len() != n + BLOCK_TRAILER_SIZE {
            return Err(Status::corruption("truncated block read"));
        }

        if !self.read_options.verify_checksums {
            return Ok(());
        }

        let checksum_start = self
            .options
            .statistics
            .as_ref()
            .map(|_| Instant::now());

        // The checksum covers the payload and the compression tag; the
        // stored value sits in the last 4 trailer bytes.
        let stored = decode_fixed32(&data[n + 1..]);
        let matches = match self.footer.checksum() {
            Some(ChecksumType::Crc32c) => crc32c_value(&data[..n + 1]) == unmask_crc32c(stored),
            Some(ChecksumType::XxHash) => xxhash32(&data[..n + 1], 0) == stored,
            _ => return Err(Status::corruption("unknown checksum type")),
        };

        if let Some(start) = checksum_start {
            self.record_tick(
                Ticker::BlockChecksumTimeNanos,
                start.elapsed().as_nanos() as u64,
            );
        }

        if !matches {
            return Err(Status::corruption("block checksum mismatch"));
        }
        Ok(())
    }

    fn record_read(&self, start: Option<Instant>, bytes_read: usize) {
        if let Some(start) = start {
            self.record_tick(Ticker::BlockReadTimeNanos, start.elapsed().as_nanos() as u64);
        }
        self.record_tick(Ticker::BlockReadCount, 1);
        self.record_tick(Ticker::BlockReadByte, bytes_read as u64);
    }

    /// S1, synchronous drive.
    fn read_and_verify(&self, scratch: &mut [u8]) -> Result<RawBlock<'a>> {
        let want = self.block_size() + BLOCK_TRAILER_SIZE;
        let read_start = self.options.statistics.as_ref().map(|_| Instant::now());

        let file: &'a F = self.file;
        let slice = match file.read_at(self.handle.offset(), want, scratch) {
            Ok(slice) => {
                self.record_read(read_start, slice.len());
                slice
            }
            Err(status) => {
                self.record_read(read_start, 0);
                return Err(status);
            }
        };

        let raw = match slice {
            ReadSlice::Scratch(len) => RawBlock::Scratch(len),
            ReadSlice::View(view) => RawBlock::View(view),
        };
        self.verify_block(raw.data(scratch))?;
        Ok(raw)
    }

    /// S1, asynchronous drive: same as [`Self::read_and_verify`] with the
    /// pipeline's single suspension point at the positional read.
    async fn read_and_verify_async(&self, scratch: &mut [u8]) -> Result<RawBlock<'a>> {
        let want = self.block_size() + BLOCK_TRAILER_SIZE;
        let read_start = self.options.statistics.as_ref().map(|_| Instant::now());

        let file: &'a F = self.file;
        let slice = match file.read_at_async(self.handle.offset(), want, scratch).await {
            Ok(slice) => {
                self.record_read(read_start, slice.len());
                slice
            }
            Err(status) => {
                self.record_read(read_start, 0);
                return Err(status.into_async());
            }
        };

        let raw = match slice {
            ReadSlice::Scratch(len) => RawBlock::Scratch(len),
            ReadSlice::View(view) => RawBlock::View(view),
        };
        self.verify_block(raw.data(scratch)).map_err(Status::into_async)?;
        Ok(raw)
    }

    /// S2: raw-tier cache fill, decompression (or the borrow-or-copy
    /// decision), then uncompressed-tier cache fill.
    fn decompress_and_fill(&self, raw: RawBlock<'a>, scratch: &[u8]) -> Result<BlockContents<'a>> {
        let n = self.block_size();
        let data = raw.data(scratch);
        let tag = data[n];

        if self.read_options.fill_cache {
            if let Some(cache) = self.cache_options.cache.as_deref() {
                if cache.is_compressed() {
                    if let Err(status) = cache.insert_raw(
                        &self.cache_options.key_prefix,
                        &self.handle,
                        &data[..n + BLOCK_TRAILER_SIZE],
                    ) {
                        tracing::info!(error = %status, "error inserting into persistent cache");
                    }
                }
            }
        }

        let decompress_start = self.options.statistics.as_ref().map(|_| Instant::now());

        let contents = if self.decompression_requested && tag != CompressionType::None.tag() {
            uncompress_block_contents(
                &data[..n],
                tag,
                self.footer.version(),
                self.compression_dict,
                self.options,
            )?
        } else {
            let compression = CompressionType::from_tag(tag)
                .ok_or_else(|| Status::corruption("bad block type"))?;
            match raw {
                // The view outlives this read: hand out a borrow.
                RawBlock::View(view) => BlockContents::borrowed(&view[..n], compression),
                // The scratch buffer goes back to the caller: copy out.
                RawBlock::Scratch(_) => {
                    BlockContents::owned(Bytes::copy_from_slice(&scratch[..n]), compression)
                }
                // Already a private heap buffer: drop the trailer and keep it.
                RawBlock::CacheHeap(mut buf) => {
                    buf.truncate(n);
                    BlockContents::owned(Bytes::from(buf), compression)
                }
            }
        };

        if let Some(start) = decompress_start {
            self.record_tick(
                Ticker::BlockDecompressTimeNanos,
                start.elapsed().as_nanos() as u64,
            );
        }

        if self.read_options.fill_cache {
            if let Some(cache) = self.cache_options.cache.as_deref() {
                if !cache.is_compressed() {
                    if let Err(status) = cache.insert_uncompressed(
                        &self.cache_options.key_prefix,
                        &self.handle,
                        contents.data(),
                    ) {
                        tracing::info!(error = %status, "error inserting into persistent cache");
                    }
                }
            }
        }

        Ok(contents)
    }

    /// Drive every stage on the calling task.
    pub fn fetch(&self, scratch: &mut [u8]) -> Result<BlockContents<'a>> {
        match self.check_persistent_cache() {
            CacheProbe::Uncompressed(data) => {
                Ok(BlockContents::owned(data, CompressionType::None))
            }
            CacheProbe::Raw(buf) => self.decompress_and_fill(RawBlock::CacheHeap(buf), &[]),
            CacheProbe::Miss => {
                let raw = self.read_and_verify(scratch)?;
                self.decompress_and_fill(raw, scratch)
            }
        }
    }

    /// Drive the same stages with an asynchronous S1. Terminal error
    /// statuses produced after the suspension point carry the
    /// async-completion bit; cache-hit completions never suspend and do not.
    pub async fn fetch_async(&self, scratch: &mut [u8]) -> Result<BlockContents<'a>> {
        match self.check_persistent_cache() {
            CacheProbe::Uncompressed(data) => {
                Ok(BlockContents::owned(data, CompressionType::None))
            }
            CacheProbe::Raw(buf) => self.decompress_and_fill(RawBlock::CacheHeap(buf), &[]),
            CacheProbe::Miss => {
                let raw = self.read_and_verify_async(scratch).await?;
                self.decompress_and_fill(raw, scratch)
                    .map_err(Status::into_async)
            }
        }
    }
}

/// Read the block at `handle`, synchronously.
///
/// `scratch` must be at least `handle.size + 5` bytes if the file backend
/// fills caller buffers; it is exclusively borrowed until the read returns.
/// With `decompression_requested`, compressed payloads come back
/// decompressed and owned; uncompressed payloads borrow the reader's
/// storage when they can and are copied to the heap when they cannot.
#[allow(clippy::too_many_arguments)]
pub fn read_block_contents<'a, F: RandomAccessFile + ?Sized>(
    file: &'a F,
    footer: &Footer,
    read_options: &ReadOptions,
    handle: &BlockHandle,
    scratch: &mut [u8],
    options: &EngineOptions,
    decompression_requested: bool,
    compression_dict: &[u8],
    cache_options: &PersistentCacheOptions,
) -> Result<BlockContents<'a>> {
    BlockFetcher::new(
        file,
        footer,
        read_options,
        handle,
        options,
        decompression_requested,
        compression_dict,
        cache_options,
    )
    .fetch(scratch)
}

/// Asynchronous form of [`read_block_contents`]: identical stage semantics,
/// with the positional read as the only suspension point.
#[allow(clippy::too_many_arguments)]
pub async fn read_block_contents_async<'a, F: RandomAccessFile + ?Sized>(
    file: &'a F,
    footer: &Footer,
    read_options: &ReadOptions,
    handle: &BlockHandle,
    scratch: &mut [u8],
    options: &EngineOptions,
    decompression_requested: bool,
    compression_dict: &[u8],
    cache_options: &PersistentCacheOptions,
) -> Result<BlockContents<'a>> {
    BlockFetcher::new(
        file,
        footer,
        read_options,
        handle,
        options,
        decompression_requested,
        compression_dict,
        cache_options,
    )
    .fetch_async(scratch)
    .await
}
