//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by the buffer pool.
///
/// All fields are atomic so any thread can bump them without a lock;
/// `Relaxed` ordering is enough because the counters are independent and
/// only ever read as an eventually consistent snapshot.
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Fetches satisfied without disk I/O.
    pub cache_hits: AtomicU64,
    /// Fetches that had to load the page from disk.
    pub cache_misses: AtomicU64,
    /// Pages evicted to make room.
    pub evictions: AtomicU64,
    /// Pages read from disk.
    pub pages_read: AtomicU64,
    /// Pages written to disk.
    pub pages_written: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache hit rate in [0.0, 1.0].
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// A non-atomic copy for display and assertions.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`BufferPoolStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
}

impl StatsSnapshot {
    /// Cache hit rate in [0.0, 1.0].
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.hit_rate() * 100.0
        )
    }
}
