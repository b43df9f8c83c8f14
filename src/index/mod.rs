//! Index structures built on the buffer pool.
//!
//! - [`key`] - fixed-width key/value encodings, comparators, hashing
//! - [`hash_table`] - the disk-backed linear-probing hash table

pub mod hash_table;
pub mod key;

pub use hash_table::{GenericHashTable, LinearProbeHashTable};
pub use key::{
    Crc32Hasher, GenericComparator, GenericKey, KeyComparator, KeyHasher, OrdComparator, Storable,
};
