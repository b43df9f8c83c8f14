//! Disk managers - whole-page I/O against stable storage.
//!
//! The buffer pool consumes disk storage through the narrow [`DiskManager`]
//! trait: read a page, write a page, nothing else. Page allocation lives in
//! the buffer pool (ids are striped across pool instances), so a disk
//! manager only needs to map page ids to storage offsets.
//!
//! Two implementations:
//! - [`FileDiskManager`] - a single database file, page N at offset
//!   N x PAGE_SIZE
//! - [`MemDiskManager`] - an in-memory map, used as the disk stub in tests

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, Result};

/// Whole-page I/O contract consumed by the buffer pool.
///
/// Both operations transfer exactly [`PAGE_SIZE`] bytes; there is no
/// partial-page I/O. Implementations must tolerate sparse id spaces:
/// striped allocation means instance `k` of `n` only ever touches ids
/// congruent to `k` mod `n`.
pub trait DiskManager: Send {
    /// Fill `buf` with the on-disk bytes of `page_id`.
    ///
    /// A page that has never been written reads back as zeroes.
    ///
    /// # Panics
    /// Implementations may panic if `buf.len() != PAGE_SIZE`.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persist `data` as the bytes of `page_id`.
    ///
    /// # Panics
    /// Implementations may panic if `data.len() != PAGE_SIZE`.
    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()>;
}

/// Disk manager backed by a single database file.
///
/// # File Layout
/// Pages laid out sequentially, page N at offset `N x PAGE_SIZE`:
/// ```text
/// | Page 0 | Page 1 | Page 2 |  ...  | Page N |
/// ```
/// Striped page id allocation can leave holes; reading a hole (or any page
/// past the end of the file) yields zeroed bytes, and writing past the end
/// extends the file.
///
/// # Thread Safety
/// `FileDiskManager` is single-threaded; the buffer pool serializes access.
///
/// # Durability
/// Every write is followed by `fsync()`.
pub struct FileDiskManager {
    file: File,
}

impl FileDiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self { file })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Open an existing database file, or create it if absent.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Total size of the database file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "read buffer must be one page");

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        let file_len = self.file.metadata()?.len();

        if offset >= file_len {
            // Never written: reads back as zeroes.
            buf.fill(0);
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(offset))?;
        if offset + PAGE_SIZE as u64 <= file_len {
            self.file.read_exact(buf)?;
        } else {
            // Torn tail from a partial extension; treat the missing bytes
            // as zeroes.
            let avail = (file_len - offset) as usize;
            self.file.read_exact(&mut buf[..avail])?;
            buf[avail..].fill(0);
        }

        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "write buffer must be one page");

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }
}

/// In-memory disk manager.
///
/// Cloning yields a handle onto the same page map, so a test can move one
/// clone into a buffer pool and keep the other to observe exactly what was
/// written back and when.
#[derive(Clone, Default)]
pub struct MemDiskManager {
    inner: Arc<Mutex<MemDiskState>>,
}

#[derive(Default)]
struct MemDiskState {
    pages: HashMap<PageId, Vec<u8>>,
    writes: u64,
}

impl MemDiskManager {
    /// Create an empty in-memory disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the stored bytes of a page, if it was ever written.
    pub fn page(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.inner.lock().pages.get(&page_id).cloned()
    }

    /// Number of pages that have been written at least once.
    pub fn page_count(&self) -> usize {
        self.inner.lock().pages.len()
    }

    /// Total number of page writes performed.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().writes
    }
}

impl DiskManager for MemDiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "read buffer must be one page");

        let inner = self.inner.lock();
        match inner.pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "write buffer must be one page");

        let mut inner = self.inner.lock();
        inner.pages.insert(page_id, data.to_vec());
        inner.writes += 1;
        Ok(())
    }
}
