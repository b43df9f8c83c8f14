//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the bookkeeping the pool needs:
//! which logical page is loaded, a pin count, and a dirty flag. Frame
//! identity is the index into the pool's frame array; the page occupying
//! it changes over the pool's lifetime.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// The page content lock doubles as the per-page latch callers rely on
/// when mutating page bytes; pin count and dirty flag are separate
/// bookkeeping read under the pool's lock.
pub struct Frame {
    /// The page data, behind the per-page latch.
    page: RwLock<Page>,

    /// Which logical page is loaded, or None if the frame is free.
    page_id: Mutex<Option<PageId>>,

    /// Number of outstanding handles to this frame.
    pin_count: AtomicU32,

    /// Whether the content was modified since it was last flushed.
    is_dirty: AtomicBool,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Acquire the page latch for reading.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire the page latch for writing.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// The logical page currently loaded, if any.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    /// Increment the pin count. Returns the new count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new count.
    ///
    /// # Panics
    /// Panics on underflow: an unpin without a matching pin is a caller
    /// bug, not a runtime condition.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Mark the content as modified. Only cleared by a flush or reset.
    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    /// Reset to the empty state: zeroed content, no page, unpinned, clean.
    pub fn reset(&self) {
        self.page_mut().reset();
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Relaxed);
        self.is_dirty.store(false, Ordering::Relaxed);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
