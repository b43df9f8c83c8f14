//! Header page layout for the linear-probing hash table.
//!
//! The header is the table's entry point: it records the declared slot
//! capacity, an approximate live-entry count and the ordered list of block
//! page ids that hold the actual slots.
//!
//! # Layout (little-endian)
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     num_buckets (declared total slot capacity)
//! 4       4     size (approximate live-entry count)
//! 8       4     num_blocks
//! 12      4*N   block page ids, in probe order
//! ```
//!
//! Rather than reinterpreting page bytes as a struct, access goes through
//! checked view types over the page's byte slice: [`HashHeaderView`] for
//! reads, [`HashHeaderViewMut`] for mutation.

use crate::common::PageId;

const OFFSET_NUM_BUCKETS: usize = 0;
const OFFSET_SIZE: usize = 4;
const OFFSET_NUM_BLOCKS: usize = 8;
const OFFSET_BLOCK_IDS: usize = 12;

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read-only view over a hash table header page.
#[derive(Clone, Copy)]
pub struct HashHeaderView<'a> {
    data: &'a [u8],
}

impl<'a> HashHeaderView<'a> {
    /// Wrap a page's bytes.
    ///
    /// # Panics
    /// Panics if the buffer is too small to hold the fixed fields.
    pub fn new(data: &'a [u8]) -> Self {
        assert!(data.len() >= OFFSET_BLOCK_IDS, "buffer too small for hash header");
        Self { data }
    }

    /// Declared total slot capacity of the table.
    pub fn num_buckets(&self) -> u32 {
        read_u32(self.data, OFFSET_NUM_BUCKETS)
    }

    /// Approximate live-entry count.
    pub fn size(&self) -> u32 {
        read_u32(self.data, OFFSET_SIZE)
    }

    /// Number of block pages backing the table.
    pub fn num_blocks(&self) -> u32 {
        read_u32(self.data, OFFSET_NUM_BLOCKS)
    }

    /// Page id of the block at `index` in probe order.
    ///
    /// # Panics
    /// Panics if `index >= num_blocks()`.
    pub fn block_page_id(&self, index: usize) -> PageId {
        assert!(index < self.num_blocks() as usize, "block index out of range");
        PageId::new(read_u32(self.data, OFFSET_BLOCK_IDS + index * 4))
    }

    /// All block page ids, in probe order.
    pub fn block_page_ids(&self) -> Vec<PageId> {
        (0..self.num_blocks() as usize)
            .map(|i| self.block_page_id(i))
            .collect()
    }

    /// Maximum number of block ids this page can record.
    pub fn max_blocks(&self) -> usize {
        (self.data.len() - OFFSET_BLOCK_IDS) / 4
    }
}

/// Mutable view over a hash table header page.
pub struct HashHeaderViewMut<'a> {
    data: &'a mut [u8],
}

impl<'a> HashHeaderViewMut<'a> {
    /// Wrap a page's bytes for mutation.
    ///
    /// # Panics
    /// Panics if the buffer is too small to hold the fixed fields.
    pub fn new(data: &'a mut [u8]) -> Self {
        assert!(data.len() >= OFFSET_BLOCK_IDS, "buffer too small for hash header");
        Self { data }
    }

    /// Re-borrow as a read-only view.
    pub fn as_read(&self) -> HashHeaderView<'_> {
        HashHeaderView::new(self.data)
    }

    pub fn set_num_buckets(&mut self, num_buckets: u32) {
        write_u32(self.data, OFFSET_NUM_BUCKETS, num_buckets);
    }

    pub fn set_size(&mut self, size: u32) {
        write_u32(self.data, OFFSET_SIZE, size);
    }

    /// Drop all recorded block ids. Used when a resize rewrites the header.
    pub fn clear_blocks(&mut self) {
        write_u32(self.data, OFFSET_NUM_BLOCKS, 0);
    }

    /// Append a block page id to the probe sequence.
    ///
    /// # Panics
    /// Panics if the header page has no room for another id.
    pub fn add_block_page_id(&mut self, page_id: PageId) {
        let n = self.as_read().num_blocks() as usize;
        assert!(n < self.as_read().max_blocks(), "header page full of block ids");

        write_u32(self.data, OFFSET_BLOCK_IDS + n * 4, page_id.0);
        write_u32(self.data, OFFSET_NUM_BLOCKS, (n + 1) as u32);
    }
}
