//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] stages fixed-size pages between a disk
//! collaborator and a bounded array of in-memory frames:
//! - reference-counted access through RAII page guards
//! - automatic dirty write-back on eviction
//! - clock (second-chance) victim selection
//! - instance-striped page id allocation, so sharded pools never collide
//!
//! # Locking
//! One coarse mutex over the pool's bookkeeping (`page_table`, `free_list`,
//! id allocator) is held for the duration of each operation, including the
//! synchronous disk I/O an eviction or miss performs. This serializes all
//! page traffic pool-wide; a known scalability limit, accepted for the
//! simplicity of its invariants. Two locks sit outside the coarse one:
//! the replacer keeps its own internal lock (it must be safe standalone),
//! and each frame's page latch is acquired only *after* the pool lock is
//! released, so a caller blocked on a page latch never stalls unrelated
//! pool traffic.
//!
//! `flush_page` is the one exception to the hold-for-the-duration rule: it
//! pins the target page, releases the pool lock, and only then waits for
//! the page latch. Flushing a page while another thread holds a write
//! guard on it would otherwise deadlock against that thread's next pool
//! call.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::Ordering;

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::replacer::ClockReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Bookkeeping protected by the pool's coarse lock.
struct PoolState {
    /// Maps resident logical pages to the frames holding them.
    page_table: HashMap<PageId, FrameId>,
    /// Frames not holding any logical page.
    free_list: VecDeque<FrameId>,
    /// Next page id this instance will issue (advances by `num_instances`).
    next_page_id: u32,
    /// Deleted page ids, reused before the counter advances.
    freed_page_ids: Vec<PageId>,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Usage
/// ```ignore
/// let disk = FileDiskManager::create("test.db")?;
/// let bpm = BufferPoolManager::new(10, disk);
///
/// let mut guard = bpm.new_page()?;
/// guard.as_mut_slice()[0] = 0xAB;
/// drop(guard); // unpinned, marked dirty
///
/// let guard = bpm.fetch_page_read(page_id)?;
/// let byte = guard.as_slice()[0];
/// ```
pub struct BufferPoolManager {
    /// Fixed frame array, allocated at startup.
    frames: Vec<Frame>,

    /// Coarse lock over the pool's bookkeeping.
    state: Mutex<PoolState>,

    /// Victim selection; internally synchronized.
    replacer: ClockReplacer,

    /// Disk collaborator; whole-page reads and writes only.
    disk: Mutex<Box<dyn DiskManager>>,

    /// Performance counters.
    stats: BufferPoolStats,

    pool_size: usize,
    num_instances: u32,
    instance_index: u32,
}

impl BufferPoolManager {
    /// Create a standalone pool (instance 0 of 1).
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new<D: DiskManager + 'static>(pool_size: usize, disk: D) -> Self {
        Self::new_instance(pool_size, 1, 0, disk)
    }

    /// Create one instance of a sharded pool.
    ///
    /// Instance `k` of `n` issues page ids `k, k+n, k+2n, ...`, so parallel
    /// instances allocate from disjoint id spaces without coordination.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0, `num_instances` is 0, or
    /// `instance_index >= num_instances`.
    pub fn new_instance<D: DiskManager + 'static>(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk: D,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        assert!(num_instances > 0, "num_instances must be > 0");
        assert!(
            instance_index < num_instances,
            "instance_index must be < num_instances"
        );

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: VecDeque<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                next_page_id: instance_index,
                freed_page_ids: Vec::new(),
            }),
            replacer: ClockReplacer::new(pool_size),
            disk: Mutex::new(Box::new(disk)),
            stats: BufferPoolStats::new(),
            pool_size,
            num_instances,
            instance_index,
        }
    }

    // ========================================================================
    // Public API: create, fetch, delete
    // ========================================================================

    /// Allocate a fresh page and return a pinned write guard on it.
    ///
    /// The page's bytes start zeroed. Fails with [`Error::NoFreeFrames`]
    /// when the free list is empty and every resident page is pinned.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let mut state = self.state.lock();
        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = Self::allocate_page_id(&mut state, self.num_instances);

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        drop(state);

        let latch = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, latch))
    }

    /// Fetch a page for shared read access.
    ///
    /// A resident page is pinned without disk I/O; otherwise the page is
    /// loaded into a free or evicted frame. Fails only when no frame can
    /// be obtained.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let latch = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, latch))
    }

    /// Fetch a page for exclusive write access.
    ///
    /// Same residency behavior as [`fetch_page_read`](Self::fetch_page_read);
    /// the guard marks the page dirty when dropped.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let latch = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, latch))
    }

    /// Delete a page from the pool and release its id for reuse.
    ///
    /// Fails with [`Error::PagePinned`] while the page is in use. Deleting
    /// an absent page trivially succeeds. The page is dropped, never
    /// flushed: its bytes are discarded along with its identity.
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id.0));
        }

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);
        state.freed_page_ids.push(page_id);

        Ok(())
    }

    // ========================================================================
    // Public API: flushing
    // ========================================================================

    /// Write a page's bytes to disk if dirty and clear the dirty flag.
    ///
    /// Works regardless of pin state and is idempotent; a clean page is a
    /// no-op. Fails with [`Error::PageNotResident`] if the page is not in
    /// the pool.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        // Pin the frame so the page cannot be evicted or remapped while we
        // wait for its latch outside the pool lock.
        let frame_id = {
            let state = self.state.lock();
            let frame_id = match state.page_table.get(&page_id) {
                Some(&fid) => fid,
                None => return Err(Error::PageNotResident(page_id.0)),
            };
            self.frames[frame_id.0].pin();
            self.replacer.pin(frame_id);
            frame_id
        };

        let result = self.write_back(frame_id, page_id);
        self.unpin_frame(frame_id, false);
        result
    }

    /// Flush every resident page, best-effort.
    ///
    /// Pages that disappear between the snapshot and the flush are skipped;
    /// I/O errors still fail the call.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = {
            let state = self.state.lock();
            state.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            match self.flush_page(page_id) {
                Err(Error::PageNotResident(_)) => {}
                other => other?,
            }
        }
        Ok(())
    }

    // ========================================================================
    // Public API: inspection
    // ========================================================================

    /// Pin count of a resident page, or `None` if not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].pin_count())
    }

    /// Whether a resident page is dirty, or `None` if not resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].is_dirty())
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of frames currently on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of logical pages currently resident.
    pub fn resident_page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Index of this instance within its shard group.
    pub fn instance_index(&self) -> u32 {
        self.instance_index
    }

    /// Performance counters.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    // ========================================================================
    // Internal: guard drop path
    // ========================================================================

    /// Release one pin on a frame, ORing in the dirty flag.
    ///
    /// Called by the page guards on drop. A `false` never clears an
    /// earlier `true`: the dirty flag survives until a flush.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let _state = self.state.lock();
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
    }

    // ========================================================================
    // Internal: fetch and eviction machinery
    // ========================================================================

    /// Pin the frame holding `page_id`, loading the page on a miss.
    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            self.replacer.pin(frame_id);
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(frame_id);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.acquire_frame(&mut state)?;

        let read_result = {
            let frame = &self.frames[frame_id.0];
            let mut page = frame.page_mut();
            self.disk.lock().read_page(page_id, page.as_mut_slice())
        };
        if let Err(e) = read_result {
            // The frame was detached from its old page by acquire_frame;
            // hand it back rather than leaking it.
            state.free_list.push_back(frame_id);
            return Err(e);
        }
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        Ok(frame_id)
    }

    /// Obtain an unmapped frame: free list first, then eviction.
    fn acquire_frame(&self, state: &mut MutexGuard<'_, PoolState>) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = match self.replacer.victim() {
            Some(fid) => fid,
            None => return Err(Error::NoFreeFrames),
        };
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            if let Some(pid) = old_page_id {
                if let Err(e) = self.write_back(frame_id, pid) {
                    // Dirty victim could not be persisted; put it back
                    // under the policy and report the failure.
                    self.replacer.unpin(frame_id);
                    return Err(e);
                }
            }
        }

        if let Some(pid) = old_page_id {
            state.page_table.remove(&pid);
        }
        frame.clear_dirty();
        frame.set_page_id(None);

        Ok(frame_id)
    }

    /// Write a frame's bytes to disk if dirty, clearing the dirty flag.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            let page = frame.page();
            self.disk.lock().write_page(page_id, page.as_slice())?;
            drop(page);

            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    /// Issue a page id: reuse a freed one, else advance the striped counter.
    fn allocate_page_id(state: &mut MutexGuard<'_, PoolState>, num_instances: u32) -> PageId {
        if let Some(page_id) = state.freed_page_ids.pop() {
            return page_id;
        }
        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += num_instances;
        page_id
    }
}
