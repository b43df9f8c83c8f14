//! Integration tests for the buffer pool manager.
//!
//! Cross-component behavior that the per-module unit tests don't cover.

use std::sync::Arc;
use std::thread;

use probedb::buffer::BufferPoolManager;
use probedb::common::PageId;
use probedb::storage::FileDiskManager;
use tempfile::tempdir;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let dm = FileDiskManager::create(dir.path().join("test.db")).unwrap();
    (BufferPoolManager::new(pool_size, dm), dir)
}

/// Data written through guards survives multiple eviction cycles.
#[test]
fn test_data_persistence_across_evictions() {
    let (bpm, _dir) = create_bpm(2);

    let mut page_ids = Vec::new();
    for i in 0u8..5 {
        let mut guard = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = i;
        guard.as_mut_slice()[1] = i.wrapping_mul(3);
        page_ids.push(guard.page_id());
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], i as u8);
        assert_eq!(guard.as_slice()[1], (i as u8).wrapping_mul(3));
    }
}

/// Flush, drop the pool, reopen the file with a fresh pool.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let data = b"persistent!";

    let pid;
    {
        let dm = FileDiskManager::create(&path).unwrap();
        let bpm = BufferPoolManager::new(10, dm);

        let mut guard = bpm.new_page().unwrap();
        pid = guard.page_id();
        guard.as_mut_slice()[..data.len()].copy_from_slice(data);
        drop(guard);

        bpm.flush_all_pages().unwrap();
    }

    {
        let dm = FileDiskManager::open(&path).unwrap();
        let bpm = BufferPoolManager::new(10, dm);

        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(&guard.as_slice()[..data.len()], data);
    }
}

/// Writers on distinct pages make progress concurrently.
#[test]
fn test_concurrent_writers() {
    let (bpm, _dir) = create_bpm(10);
    let bpm = Arc::new(bpm);

    let page_ids: Vec<PageId> = (0..5).map(|_| bpm.new_page().unwrap().page_id()).collect();

    let mut handles = Vec::new();
    for (i, &pid) in page_ids.iter().enumerate() {
        let bpm = Arc::clone(&bpm);
        handles.push(thread::spawn(move || {
            for j in 0..50 {
                let mut guard = bpm.fetch_page_write(pid).unwrap();
                guard.as_mut_slice()[0] = ((i * 50 + j) % 256) as u8;
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    for (i, &pid) in page_ids.iter().enumerate() {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(guard.as_slice()[0], ((i * 50 + 49) % 256) as u8);
    }
}

/// Readers and an evicting writer race without violating pin safety.
#[test]
fn test_concurrent_fetch_with_eviction_pressure() {
    let (bpm, _dir) = create_bpm(4);
    let bpm = Arc::new(bpm);

    // More pages than frames, so fetches constantly evict.
    let page_ids: Vec<PageId> = (0u8..12)
        .map(|i| {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
            guard.page_id()
        })
        .collect();

    let mut handles = Vec::new();
    for t in 0..4 {
        let bpm = Arc::clone(&bpm);
        let page_ids = page_ids.clone();
        handles.push(thread::spawn(move || {
            for round in 0..50 {
                let idx = (t * 7 + round) % page_ids.len();
                let guard = bpm.fetch_page_read(page_ids[idx]).unwrap();
                assert_eq!(guard.as_slice()[0], idx as u8);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // Every pin was returned.
    for &pid in &page_ids {
        if let Some(count) = bpm.get_pin_count(pid) {
            assert_eq!(count, 0);
        }
    }
}

/// Counters reflect the traffic the pool actually served.
#[test]
fn test_stats_accuracy() {
    let (bpm, _dir) = create_bpm(2);

    let pid = bpm.new_page().unwrap().page_id();

    for _ in 0..5 {
        let _ = bpm.fetch_page_read(pid).unwrap();
    }
    assert!(bpm.stats().snapshot().cache_hits >= 5);

    // Force evictions.
    let _ = bpm.new_page().unwrap();
    let _ = bpm.new_page().unwrap();
    assert!(bpm.stats().snapshot().evictions >= 1);
}
