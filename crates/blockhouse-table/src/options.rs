//! Read and Engine Options
//!
//! Plain option bundles threaded through the read pipeline. `EngineOptions`
//! is immutable for the lifetime of the engine and shared by reference;
//! `ReadOptions` is per-call.

use std::sync::Arc;

use crate::cache::PersistentCache;
use crate::stats::{StatsLevel, Statistics};

/// Per-read knobs.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Verify the trailer checksum of every block read from disk.
    pub verify_checksums: bool,
    /// Insert blocks read from disk into the persistent cache.
    pub fill_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            verify_checksums: true,
            fill_cache: true,
        }
    }
}

/// Immutable engine-wide options: the statistics sink and how much it
/// records. Lives at least as long as any in-flight read.
#[derive(Clone, Default)]
pub struct EngineOptions {
    pub statistics: Option<Arc<Statistics>>,
    pub stats_level: StatsLevel,
}

impl EngineOptions {
    pub fn with_statistics(statistics: Arc<Statistics>, stats_level: StatsLevel) -> Self {
        EngineOptions {
            statistics: Some(statistics),
            stats_level,
        }
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("statistics", &self.statistics.is_some())
            .field("stats_level", &self.stats_level)
            .finish()
    }
}

/// Whether detailed timers should be collected for this engine.
pub fn should_report_detailed_time(options: &EngineOptions) -> bool {
    options.statistics.is_some() && options.stats_level > StatsLevel::ExceptDetailedTimers
}

/// Persistent cache configuration for one table file.
///
/// The key prefix namespaces this file's blocks inside a shared cache; the
/// cache key is `(key_prefix, handle)`.
#[derive(Clone, Default)]
pub struct PersistentCacheOptions {
    pub cache: Option<Arc<dyn PersistentCache>>,
    pub key_prefix: String,
}

impl PersistentCacheOptions {
    pub fn new(cache: Arc<dyn PersistentCache>, key_prefix: impl Into<String>) -> Self {
        PersistentCacheOptions {
            cache: Some(cache),
            key_prefix: key_prefix.into(),
        }
    }
}

impl std::fmt::Debug for PersistentCacheOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCacheOptions")
            .field("cache", &self.cache.is_some())
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}
