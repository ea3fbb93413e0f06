//! Persistent Block Cache
//!
//! A persistent cache keeps table blocks on fast local storage so that a
//! re-read does not have to touch the (slow, possibly remote) table file.
//! It comes in two flavors, and a given cache instance is exactly one of
//! them:
//!
//! - **raw (compressed) mode**: stores the block exactly as it sits on
//!   disk - payload, tag, and checksum (`size + 5` bytes). A hit skips the
//!   file read; decompression still runs.
//! - **uncompressed mode**: stores the decoded payload. A hit skips the
//!   file read *and* decompression.
//!
//! ## Contract
//! `Status::not_found()` is the only non-error miss. Any other lookup error
//! is logged by the pipeline and treated as a miss - a broken cache must
//! never fail a read. Inserts are best-effort.
//!
//! ## DiskBlockCache
//! The bundled implementation stores one file per block under a cache
//! directory, tracks recency with an in-memory LRU, and evicts
//! least-recently-used blocks when a byte budget is exceeded:
//!
//! ```text
//! lookup(prefix, handle)
//!         ↓
//! Check <dir>/<prefix>-<offset>.blk
//!         ↓
//!     EXISTS? ────NO──→ Status::not_found()
//!         │
//!        YES
//!         ↓
//! Read file, bump LRU recency, return bytes
//! ```

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use blockhouse_core::status::{Result, Status};
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;

use crate::format::BlockHandle;

/// The persistent cache contract consumed by the read pipeline.
pub trait PersistentCache: Send + Sync {
    /// `true` if this cache stores raw (still-compressed) blocks.
    fn is_compressed(&self) -> bool;

    /// Look up a decoded payload. Only meaningful on uncompressed caches.
    fn lookup_uncompressed(&self, key_prefix: &str, handle: &BlockHandle) -> Result<Bytes>;

    /// Look up raw block bytes into a fresh buffer of exactly `len` bytes
    /// (`handle.size + BLOCK_TRAILER_SIZE`). Only meaningful on raw caches.
    fn lookup_raw(&self, key_prefix: &str, handle: &BlockHandle, len: usize) -> Result<Vec<u8>>;

    /// Insert raw block bytes (payload + trailer).
    fn insert_raw(&self, key_prefix: &str, handle: &BlockHandle, data: &[u8]) -> Result<()>;

    /// Insert a decoded payload.
    fn insert_uncompressed(
        &self,
        key_prefix: &str,
        handle: &BlockHandle,
        data: &[u8],
    ) -> Result<()>;
}

/// Failures inside the disk cache backend.
#[derive(Debug, Error)]
enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cached block has wrong size: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

impl From<CacheError> for Status {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io(e) => Status::io_error(e.to_string()),
            CacheError::SizeMismatch { .. } => Status::corruption(err.to_string()),
        }
    }
}

struct CacheState {
    /// Recency tracker: cache key → entry size in bytes.
    lru: LruCache<String, u64>,
    current_size: u64,
}

/// Disk-backed LRU persistent cache: one file per block, byte-budget
/// eviction.
pub struct DiskBlockCache {
    cache_dir: PathBuf,
    max_size_bytes: u64,
    compressed: bool,
    state: Mutex<CacheState>,
}

impl DiskBlockCache {
    /// Create a cache rooted at `cache_dir` holding at most `max_size_bytes`
    /// of blocks. `compressed` selects raw vs. uncompressed mode.
    pub fn new<P: AsRef<Path>>(
        cache_dir: P,
        max_size_bytes: u64,
        compressed: bool,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).map_err(CacheError::Io)?;

        // Track up to 16k blocks; enough that the byte budget, not the entry
        // count, is the binding limit.
        let capacity = NonZeroUsize::new(16384).expect("nonzero capacity");

        Ok(DiskBlockCache {
            cache_dir,
            max_size_bytes,
            compressed,
            state: Mutex::new(CacheState {
                lru: LruCache::new(capacity),
                current_size: 0,
            }),
        })
    }

    fn cache_key(key_prefix: &str, handle: &BlockHandle) -> String {
        format!("{}-{}", key_prefix, handle.offset())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.blk"))
    }

    fn lookup(&self, key_prefix: &str, handle: &BlockHandle) -> Result<Vec<u8>> {
        let key = Self::cache_key(key_prefix, handle);
        let path = self.entry_path(&key);

        if !path.exists() {
            return Err(Status::not_found());
        }

        let data = std::fs::read(&path).map_err(CacheError::Io)?;

        // Bump recency
        let mut state = self.state.lock().expect("cache mutex");
        state.lru.get(&key);

        tracing::debug!(key = %key, size = data.len(), "persistent cache hit");
        Ok(data)
    }

    fn insert(&self, key_prefix: &str, handle: &BlockHandle, data: &[u8]) -> Result<()> {
        let key = Self::cache_key(key_prefix, handle);
        let size = data.len() as u64;

        self.evict_if_needed(size)?;

        let path = self.entry_path(&key);
        std::fs::write(&path, data).map_err(CacheError::Io)?;

        let mut state = self.state.lock().expect("cache mutex");
        if let Some(old_size) = state.lru.put(key.clone(), size) {
            state.current_size = state.current_size.saturating_sub(old_size);
        }
        state.current_size += size;

        tracing::debug!(key = %key, size, "cached block");
        Ok(())
    }

    /// Evict least-recently-used blocks until `needed` more bytes fit.
    fn evict_if_needed(&self, needed: u64) -> Result<()> {
        let mut state = self.state.lock().expect("cache mutex");

        while state.current_size + needed > self.max_size_bytes {
            let Some((key, size)) = state.lru.pop_lru() else {
                // Cache is empty but the block still does not fit.
                tracing::warn!(
                    needed,
                    max_size = self.max_size_bytes,
                    "cannot cache: block larger than cache budget"
                );
                break;
            };

            let path = self.entry_path(&key);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(key = %key, error = %e, "failed to delete cached block");
            }

            state.current_size = state.current_size.saturating_sub(size);
            tracing::debug!(key = %key, size, "evicted cached block");
        }

        Ok(())
    }

    /// Current total size of cached blocks, in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.state.lock().expect("cache mutex").current_size
    }
}

impl PersistentCache for DiskBlockCache {
    fn is_compressed(&self) -> bool {
        self.compressed
    }

    fn lookup_uncompressed(&self, key_prefix: &str, handle: &BlockHandle) -> Result<Bytes> {
        self.lookup(key_prefix, handle).map(Bytes::from)
    }

    fn lookup_raw(&self, key_prefix: &str, handle: &BlockHandle, len: usize) -> Result<Vec<u8>> {
        let data = self.lookup(key_prefix, handle)?;
        if data.len() != len {
            return Err(CacheError::SizeMismatch {
                expected: len,
                actual: data.len(),
            }
            .into());
        }
        Ok(data)
    }

    fn insert_raw(&self, key_prefix: &str, handle: &BlockHandle, data: &[u8]) -> Result<()> {
        self.insert(key_prefix, handle, data)
    }

    fn insert_uncompressed(
        &self,
        key_prefix: &str,
        handle: &BlockHandle,
        data: &[u8],
    ) -> Result<()> {
        self.insert(key_prefix, handle, data)
    }
}

/// In-memory cache used by tests and tooling; same contract, no disk.
#[derive(Default)]
pub struct MemoryBlockCache {
    compressed: bool,
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlockCache {
    pub fn new(compressed: bool) -> Self {
        MemoryBlockCache {
            compressed,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistentCache for MemoryBlockCache {
    fn is_compressed(&self) -> bool {
        self.compressed
    }

    fn lookup_uncompressed(&self, key_prefix: &str, handle: &BlockHandle) -> Result<Bytes> {
        let key = DiskBlockCache::cache_key(key_prefix, handle);
        let entries = self.entries.lock().expect("cache mutex");
        match entries.get(&key) {
            Some(data) => Ok(Bytes::copy_from_slice(data)),
            None => Err(Status::not_found()),
        }
    }

    fn lookup_raw(&self, key_prefix: &str, handle: &BlockHandle, len: usize) -> Result<Vec<u8>> {
        let key = DiskBlockCache::cache_key(key_prefix, handle);
        let entries = self.entries.lock().expect("cache mutex");
        match entries.get(&key) {
            Some(data) if data.len() == len => Ok(data.clone()),
            Some(data) => Err(CacheError::SizeMismatch {
                expected: len,
                actual: data.len(),
            }
            .into()),
            None => Err(Status::not_found()),
        }
    }

    fn insert_raw(&self, key_prefix: &str, handle: &BlockHandle, data: &[u8]) -> Result<()> {
        let key = DiskBlockCache::cache_key(key_prefix, handle);
        self.entries
            .lock()
            .expect("cache mutex")
            .insert(key, data.to_vec());
        Ok(())
    }

    fn insert_uncompressed(
        &self,
        key_prefix: &str,
        handle: &BlockHandle,
        data: &[u8],
    ) -> Result<()> {
        self.insert_raw(key_prefix, handle, data)
    }
}
