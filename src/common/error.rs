//! Error types for probedb.

use thiserror::Error;

/// Convenient Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable failure modes of the storage core.
///
/// Capacity exhaustion, in-use conflicts and duplicates are ordinary
/// outcomes a caller is expected to handle; only `Io` carries a condition
/// the storage layer itself cannot recover from.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the disk collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer pool has no free frame and every resident page is pinned.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// Operation requires the page to be unpinned, but it is in use.
    #[error("page {0} is pinned")]
    PagePinned(u32),

    /// Operation requires the page to be resident in the pool.
    #[error("page {0} is not resident in buffer pool")]
    PageNotResident(u32),

    /// Hash table could not place an entry even after growing.
    #[error("hash table is full")]
    HashTableFull,
}
