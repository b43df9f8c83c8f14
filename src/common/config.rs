//! Configuration constants for probedb.

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems and common database page
/// granularity. Pages are aligned to this value as well, so the storage
/// layer can later move to Direct I/O without relayouting frames.
pub const PAGE_SIZE: usize = 4096;

/// Default number of frames in a buffer pool instance.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default declared slot capacity for a new hash table.
pub const DEFAULT_NUM_BUCKETS: usize = 1024;

/// Maximum number of pages addressable with a u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;
