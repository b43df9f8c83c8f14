//! Clock (second-chance) replacement policy.
//!
//! The clock replacer approximates LRU with a single reference bit per
//! frame. A sweep cursor walks the frame array circularly: an evictable
//! frame with its reference bit set gets a second chance (the bit is
//! cleared), an evictable frame with the bit clear becomes the victim.
//! Every reference bit is cleared at most once per revolution, so a sweep
//! always terminates once any frame is evictable.

use parking_lot::Mutex;

use crate::common::FrameId;

/// Second-chance eviction policy over a fixed set of frames.
///
/// Thread safety: all four operations serialize behind an internal lock,
/// so the replacer is safe to use standalone even though the buffer pool
/// already serializes its calls.
pub struct ClockReplacer {
    state: Mutex<ClockState>,
}

struct ClockState {
    /// Whether each frame may be chosen as a victim (pin count is zero).
    evictable: Vec<bool>,
    /// Second-chance reference bits, independent of evictability.
    reference: Vec<bool>,
    /// Sweep cursor; persists between victim searches.
    hand: usize,
    /// Count of evictable frames.
    live: usize,
}

impl ClockReplacer {
    /// Create a replacer tracking `capacity` frames, all initially pinned.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replacer capacity must be > 0");
        Self {
            state: Mutex::new(ClockState {
                evictable: vec![false; capacity],
                reference: vec![false; capacity],
                hand: 0,
                live: 0,
            }),
        }
    }

    /// Mark a frame as in use: not evictable, reference bit cleared.
    ///
    /// Idempotent if the frame is already pinned.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if state.evictable[frame_id.0] {
            state.evictable[frame_id.0] = false;
            state.live -= 1;
        }
        state.reference[frame_id.0] = false;
    }

    /// Mark a frame as a candidate for eviction, granting it one second
    /// chance by setting its reference bit.
    ///
    /// Idempotent if the frame is already evictable.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if !state.evictable[frame_id.0] {
            state.evictable[frame_id.0] = true;
            state.live += 1;
        }
        state.reference[frame_id.0] = true;
    }

    /// Select and claim a victim frame.
    ///
    /// Returns `None` when no frame is evictable. Otherwise the chosen
    /// frame is marked non-evictable and the cursor advances past it.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        if state.live == 0 {
            return None;
        }

        let capacity = state.evictable.len();
        let mut i = state.hand;
        loop {
            if state.evictable[i] {
                if state.reference[i] {
                    state.reference[i] = false;
                } else {
                    state.evictable[i] = false;
                    state.live -= 1;
                    state.hand = (i + 1) % capacity;
                    return Some(FrameId::new(i));
                }
            }
            i = (i + 1) % capacity;
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().live
    }
}
