//! Disk-backed linear-probing hash table.
//!
//! A [`LinearProbeHashTable`] persists its state entirely in buffer-pool
//! pages: one header page (capacity, live count, block id sequence) and N
//! block pages holding the key/value slots. The key's hash selects a home
//! block; probing advances block by block, wrapping around, until the
//! chain terminates at a truly empty slot or every block was visited.
//!
//! # Concurrency
//! A table-wide reader/writer latch lets plain reads, inserts and removes
//! overlap each other (the buffer pool's locking plus each page's own
//! latch protect the actual byte traffic); [`resize`](LinearProbeHashTable::resize)
//! takes the write side and runs exclusively.
//!
//! # Duplicate semantics
//! Only exact (key, value) duplicates are rejected. A key may map to any
//! number of distinct values.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::BufferPoolManager;
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result, Rid};
use crate::index::key::{Crc32Hasher, GenericComparator, GenericKey, KeyComparator, KeyHasher, Storable};
use crate::storage::page::{block_capacity, HashBlockView, HashBlockViewMut, HashHeaderView, HashHeaderViewMut};

/// Outcome of one probe-and-place attempt.
enum InsertOutcome {
    Inserted,
    Duplicate,
    /// Every block along the chain is full; carries the capacity observed,
    /// so the resize can detect it already happened.
    TableFull(usize),
}

/// A persistent hash table over fixed-width keys and values.
pub struct LinearProbeHashTable<K, V, C, H = Crc32Hasher> {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    comparator: C,
    hasher: H,
    /// Table-wide latch: read side for get/insert/remove, write for resize.
    latch: RwLock<()>,
    _marker: PhantomData<(K, V)>,
}

/// The common instantiation: fixed-width byte keys mapping to record ids.
pub type GenericHashTable<const N: usize> =
    LinearProbeHashTable<GenericKey<N>, Rid, GenericComparator<N>>;

impl<K, V, C, H> LinearProbeHashTable<K, V, C, H>
where
    K: Storable,
    V: Storable + PartialEq,
    C: KeyComparator<K>,
    H: KeyHasher<K>,
{
    /// Create a new table with at least `num_buckets` slots.
    ///
    /// Allocates the header page and enough block pages to cover the
    /// requested capacity; the declared capacity is rounded up to whole
    /// blocks.
    pub fn new(bpm: Arc<BufferPoolManager>, comparator: C, num_buckets: usize) -> Result<Self>
    where
        H: Default,
    {
        Self::with_hasher(bpm, comparator, H::default(), num_buckets)
    }

    /// Create a new table with an explicit bucket hasher.
    pub fn with_hasher(
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        hasher: H,
        num_buckets: usize,
    ) -> Result<Self> {
        let slots_per_block = block_capacity::<K, V>(PAGE_SIZE);
        let num_blocks = num_buckets.div_ceil(slots_per_block).max(1);

        let mut header_guard = bpm.new_page()?;
        let header_page_id = header_guard.page_id();

        let mut block_ids = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            block_ids.push(bpm.new_page()?.page_id());
        }

        {
            let mut header = HashHeaderViewMut::new(header_guard.as_mut_slice());
            header.set_num_buckets((num_blocks * slots_per_block) as u32);
            header.set_size(0);
            for &id in &block_ids {
                header.add_block_page_id(id);
            }
        }
        drop(header_guard);

        Ok(Self {
            bpm,
            header_page_id,
            comparator,
            hasher,
            latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    /// Attach to a table previously created on this buffer pool's disk.
    pub fn open(bpm: Arc<BufferPoolManager>, comparator: C, header_page_id: PageId) -> Self
    where
        H: Default,
    {
        Self {
            bpm,
            header_page_id,
            comparator,
            hasher: H::default(),
            latch: RwLock::new(()),
            _marker: PhantomData,
        }
    }

    /// The header page's id; persists table identity across restarts.
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    /// Collect every value stored under `key`.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>> {
        let _read = self.latch.read();

        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let header = HashHeaderView::new(header_guard.as_slice());
        let num_blocks = header.num_blocks() as usize;
        debug_assert!(num_blocks > 0, "hash table has no blocks");

        let home = self.home_block(key, num_blocks);
        let mut values = Vec::new();

        for i in 0..num_blocks {
            let block_id = header.block_page_id((home + i) % num_blocks);
            let guard = self.bpm.fetch_page_read(block_id)?;
            let block = HashBlockView::<K, V>::new(guard.as_slice());

            let scan = block.scan(key, &self.comparator);
            values.extend(scan.values);
            if scan.saw_empty {
                break;
            }
        }

        Ok(values)
    }

    /// Insert a (key, value) pair.
    ///
    /// Returns `Ok(false)` if the exact pair already exists anywhere along
    /// the probe chain. When every block in the chain is full, the table
    /// is resized (doubled) and the insert retried exactly once.
    pub fn insert(&self, key: &K, value: &V) -> Result<bool> {
        let full_capacity = {
            let _read = self.latch.read();
            match self.insert_internal(key, value)? {
                InsertOutcome::Inserted => return Ok(true),
                InsertOutcome::Duplicate => return Ok(false),
                InsertOutcome::TableFull(capacity) => capacity,
            }
        };

        self.resize(full_capacity)?;

        let _read = self.latch.read();
        match self.insert_internal(key, value)? {
            InsertOutcome::Inserted => Ok(true),
            InsertOutcome::Duplicate => Ok(false),
            InsertOutcome::TableFull(_) => Err(Error::HashTableFull),
        }
    }

    /// Remove the exact (key, value) pair, tombstoning its slot.
    ///
    /// Returns `Ok(false)` if the pair was not found. The probe stops at
    /// the first truly empty slot, or after visiting every block.
    pub fn remove(&self, key: &K, value: &V) -> Result<bool> {
        let _read = self.latch.read();

        let removed = {
            let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
            let header = HashHeaderView::new(header_guard.as_slice());
            let num_blocks = header.num_blocks() as usize;
            let home = self.home_block(key, num_blocks);

            let mut removed = false;
            for i in 0..num_blocks {
                let block_id = header.block_page_id((home + i) % num_blocks);
                let mut guard = self.bpm.fetch_page_write(block_id)?;
                let mut block = HashBlockViewMut::<K, V>::new(guard.as_mut_slice());

                let (slot, saw_empty) = block.as_read().locate(key, value, &self.comparator);
                if let Some(slot) = slot {
                    block.remove_at(slot);
                    removed = true;
                    break;
                }
                if saw_empty {
                    break;
                }
            }
            removed
        };

        if removed {
            self.update_size(-1)?;
        }
        Ok(removed)
    }

    /// Double the table's capacity and rehash every live entry.
    ///
    /// Runs exclusively: the write latch blocks until in-flight readers
    /// and writers finish. A no-op if the capacity no longer matches
    /// `old_capacity` (a concurrent insert already grew the table). Old
    /// block pages are deleted without flushing; their live entries are
    /// re-inserted against the new block count first.
    pub fn resize(&self, old_capacity: usize) -> Result<()> {
        let _write = self.latch.write();

        let (current_capacity, old_block_ids) = {
            let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
            let header = HashHeaderView::new(header_guard.as_slice());
            (header.num_buckets() as usize, header.block_page_ids())
        };
        if current_capacity != old_capacity {
            return Ok(());
        }

        let slots_per_block = block_capacity::<K, V>(PAGE_SIZE);
        let new_block_count = old_block_ids.len() * 2;
        let mut new_block_ids = Vec::with_capacity(new_block_count);
        for _ in 0..new_block_count {
            new_block_ids.push(self.bpm.new_page()?.page_id());
        }

        {
            let mut header_guard = self.bpm.fetch_page_write(self.header_page_id)?;
            let mut header = HashHeaderViewMut::new(header_guard.as_mut_slice());
            header.set_num_buckets((new_block_count * slots_per_block) as u32);
            header.set_size(0);
            header.clear_blocks();
            for &id in &new_block_ids {
                header.add_block_page_id(id);
            }
        }

        for &old_id in &old_block_ids {
            let entries: Vec<(K, V)> = {
                let guard = self.bpm.fetch_page_read(old_id)?;
                let block = HashBlockView::<K, V>::new(guard.as_slice());
                (0..block.capacity())
                    .filter(|&i| block.is_readable(i))
                    .map(|i| (block.key_at(i), block.value_at(i)))
                    .collect()
            };

            for (k, v) in entries {
                if let InsertOutcome::TableFull(_) = self.insert_internal(&k, &v)? {
                    return Err(Error::HashTableFull);
                }
            }

            self.bpm.delete_page(old_id)?;
        }

        Ok(())
    }

    /// Approximate number of live entries.
    pub fn get_size(&self) -> Result<usize> {
        let _read = self.latch.read();
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        Ok(HashHeaderView::new(header_guard.as_slice()).size() as usize)
    }

    /// Declared slot capacity.
    pub fn capacity(&self) -> Result<usize> {
        let _read = self.latch.read();
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        Ok(HashHeaderView::new(header_guard.as_slice()).num_buckets() as usize)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn home_block(&self, key: &K, num_blocks: usize) -> usize {
        (self.hasher.hash_key(key) as usize) % num_blocks
    }

    /// Probe-and-place without touching the table latch.
    ///
    /// Two passes over the chain. The first confirms the exact pair is
    /// absent from every visited block and finds the first block with a
    /// free slot; the second places the entry, sliding further along the
    /// chain if a concurrent insert filled the candidate block.
    fn insert_internal(&self, key: &K, value: &V) -> Result<InsertOutcome> {
        let outcome = {
            let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
            let header = HashHeaderView::new(header_guard.as_slice());
            let num_blocks = header.num_blocks() as usize;
            debug_assert!(num_blocks > 0, "hash table has no blocks");
            let home = self.home_block(key, num_blocks);

            let mut first_free = None;
            for i in 0..num_blocks {
                let block_id = header.block_page_id((home + i) % num_blocks);
                let guard = self.bpm.fetch_page_read(block_id)?;
                let block = HashBlockView::<K, V>::new(guard.as_slice());

                let scan = block.scan(key, &self.comparator);
                if scan.values.contains(value) {
                    return Ok(InsertOutcome::Duplicate);
                }
                if first_free.is_none() && block.free_slot().is_some() {
                    first_free = Some(i);
                }
                if scan.saw_empty {
                    break;
                }
            }

            match first_free {
                None => InsertOutcome::TableFull(header.num_buckets() as usize),
                Some(start) => {
                    let mut placed = false;
                    for i in start..num_blocks {
                        let block_id = header.block_page_id((home + i) % num_blocks);
                        let mut guard = self.bpm.fetch_page_write(block_id)?;
                        let mut block = HashBlockViewMut::<K, V>::new(guard.as_mut_slice());

                        if block.insert(key, value, &self.comparator) {
                            placed = true;
                            break;
                        }
                        // A racing insert may have added the same pair.
                        if block.as_read().contains(key, value, &self.comparator) {
                            return Ok(InsertOutcome::Duplicate);
                        }
                    }
                    if placed {
                        InsertOutcome::Inserted
                    } else {
                        InsertOutcome::TableFull(header.num_buckets() as usize)
                    }
                }
            }
        };

        if let InsertOutcome::Inserted = outcome {
            self.update_size(1)?;
        }
        Ok(outcome)
    }

    /// Adjust the header's approximate live-entry count.
    fn update_size(&self, delta: i64) -> Result<()> {
        let mut header_guard = self.bpm.fetch_page_write(self.header_page_id)?;
        let mut header = HashHeaderViewMut::new(header_guard.as_mut_slice());
        let size = header.as_read().size() as i64;
        header.set_size((size + delta).max(0) as u32);
        Ok(())
    }
}
