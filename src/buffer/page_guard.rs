//! RAII guards for page access.
//!
//! [`PageReadGuard`] and [`PageWriteGuard`] are the handles the buffer
//! pool gives out. Each guard holds a pin and the frame's page latch; on
//! drop it releases the latch and unpins the page, so pin/unpin pairs are
//! balanced by construction. A write guard additionally marks the page
//! dirty when it drops.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Shared read access to a page.
///
/// Multiple read guards may exist for the same page at once.
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    latch: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        latch: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            latch,
        }
    }

    /// The logical page this guard pins.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The frame backing the page right now.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.latch
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_frame(self.frame_id, false);
    }
}

/// Exclusive write access to a page.
///
/// The page is marked dirty when the guard drops; the flag is ORed in, so
/// an earlier writer's mark is never lost.
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    latch: RwLockWriteGuard<'a, Page>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        latch: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            latch,
        }
    }

    /// The logical page this guard pins.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The frame backing the page right now.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.latch
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.latch
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_frame(self.frame_id, true);
    }
}
