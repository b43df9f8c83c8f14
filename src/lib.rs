//! probedb - a storage core with a clock buffer pool and a disk-backed
//! linear-probing hash index.
//!
//! # Architecture
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │              Hash Index (index/)                          │
//! │   LinearProbeHashTable over header + block pages          │
//! └───────────────────────────────────────────────────────────┘
//!                              ↓ page guards
//! ┌───────────────────────────────────────────────────────────┐
//! │              Buffer Pool (buffer/)                        │
//! │   BufferPoolManager + Frame + ClockReplacer + Stats       │
//! └───────────────────────────────────────────────────────────┘
//!                              ↓ whole-page I/O
//! ┌───────────────────────────────────────────────────────────┐
//! │              Storage Layer (storage/)                     │
//! │   DiskManager + Page + hash page layouts                  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The buffer pool stages fixed-size pages between disk and a bounded
//! array of memory frames, handing out pinned RAII guards and writing
//! dirty pages back on eviction. The hash index builds its persistent
//! structure purely out of those guards.
//!
//! # Modules
//! - [`common`] - shared primitives (PageId, FrameId, Rid, Error, config)
//! - [`buffer`] - buffer pool management and eviction policy
//! - [`storage`] - disk I/O and page layouts
//! - [`index`] - the hash index and its key encodings
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use probedb::buffer::BufferPoolManager;
//! use probedb::index::{LinearProbeHashTable, OrdComparator};
//! use probedb::storage::FileDiskManager;
//!
//! let disk = FileDiskManager::create("my_database.db").unwrap();
//! let bpm = Arc::new(BufferPoolManager::new(64, disk));
//!
//! let table: LinearProbeHashTable<i32, i32, _> =
//!     LinearProbeHashTable::new(Arc::clone(&bpm), OrdComparator, 1024).unwrap();
//! table.insert(&1, &10).unwrap();
//! assert_eq!(table.get_value(&1).unwrap(), vec![10]);
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at the crate root.
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result, Rid};

pub use buffer::{BufferPoolManager, BufferPoolStats, PageReadGuard, PageWriteGuard, StatsSnapshot};
pub use index::{GenericHashTable, LinearProbeHashTable};
pub use storage::{DiskManager, FileDiskManager, MemDiskManager};
pub use storage::page::Page;
