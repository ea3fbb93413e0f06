//! Engine Statistics
//!
//! A `Statistics` sink accumulates per-read counters and coarse latency
//! histograms. The engine owns one instance and passes it by reference
//! inside [`crate::options::EngineOptions`]; everything is relaxed atomics,
//! so concurrent reads record without coordination.
//!
//! Detailed timers (decompression latency and sizes) are gated by
//! [`StatsLevel`]: at the default level the pipeline skips the clock reads
//! entirely.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters recorded by the read pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Ticker {
    /// Blocks read from disk (not served by a persistent cache).
    BlockReadCount = 0,
    /// Bytes read from disk, trailer included.
    BlockReadByte,
    /// Nanoseconds spent in positional reads.
    BlockReadTimeNanos,
    /// Nanoseconds spent verifying block checksums.
    BlockChecksumTimeNanos,
    /// Nanoseconds spent in decompression and cache fill.
    BlockDecompressTimeNanos,
    /// Blocks successfully decompressed.
    NumberBlockDecompressed,
    /// Persistent cache lookups that returned a block.
    PersistentCacheHit,
    /// Persistent cache lookups that missed.
    PersistentCacheMiss,
}

const TICKER_COUNT: usize = Ticker::PersistentCacheMiss as usize + 1;

/// Value distributions recorded when detailed timers are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Histogram {
    DecompressionTimesNanos = 0,
    BytesDecompressed,
}

const HISTOGRAM_COUNT: usize = Histogram::BytesDecompressed as usize + 1;

/// How much the engine pays for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StatsLevel {
    /// Tickers only; skip clock reads around decompression.
    #[default]
    ExceptDetailedTimers,
    /// Everything, including per-block decompression timing.
    All,
}

#[derive(Debug, Default)]
struct HistogramData {
    count: AtomicU64,
    sum: AtomicU64,
}

/// A point-in-time view of one histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: u64,
}

impl HistogramSnapshot {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// Atomic statistics sink owned by the engine.
#[derive(Debug, Default)]
pub struct Statistics {
    tickers: [AtomicU64; TICKER_COUNT],
    histograms: [HistogramData; HISTOGRAM_COUNT],
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Add `value` to a ticker.
    pub fn record_tick(&self, ticker: Ticker, value: u64) {
        self.tickers[ticker as usize].fetch_add(value, Ordering::Relaxed);
    }

    /// Record one measurement into a histogram.
    pub fn measure_time(&self, histogram: Histogram, value: u64) {
        let data = &self.histograms[histogram as usize];
        data.count.fetch_add(1, Ordering::Relaxed);
        data.sum.fetch_add(value, Ordering::Relaxed);
    }

    /// Current value of a ticker.
    pub fn ticker(&self, ticker: Ticker) -> u64 {
        self.tickers[ticker as usize].load(Ordering::Relaxed)
    }

    /// Current state of a histogram.
    pub fn histogram(&self, histogram: Histogram) -> HistogramSnapshot {
        let data = &self.histograms[histogram as usize];
        HistogramSnapshot {
            count: data.count.load(Ordering::Relaxed),
            sum: data.sum.load(Ordering::Relaxed),
        }
    }
}
