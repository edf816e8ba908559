//! Seqlock Ring Implementation
//!
//! Single serialized writer, any number of readers. Each slot carries its
//! own sequence counter (odd while a write is in flight), so `latest()`
//! never returns a torn sample even when the writer laps a stalled reader.

use crate::Sample;
use std::cell::UnsafeCell;
use std::hint;
use std::ptr;
use std::sync::atomic::{fence, AtomicU32, AtomicUsize, Ordering};

/// Default ring capacity (256 samples = ~2.5 s at 100 Hz)
pub const DEFAULT_CAPACITY: usize = 256;

struct Slot {
    /// Sequence counter: odd while the writer is inside the slot
    seq: AtomicU32,
    value: UnsafeCell<Sample>,
}

impl Slot {
    fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            value: UnsafeCell::new(Sample::default()),
        }
    }
}

/// Lock-free overwrite ring for conditioned samples.
///
/// Pushes must be serialized by the caller (the acquisition pipeline holds
/// its filter guard across each push); reads need no coordination at all.
pub struct SampleRing {
    slots: Box<[Slot]>,
    capacity: usize,
    /// Monotonic count of completed pushes; next write lands at `cursor % capacity`
    cursor: AtomicUsize,
}

impl SampleRing {
    /// Create a ring with the given capacity.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        let slots: Vec<Slot> = (0..capacity).map(|_| Slot::new()).collect();
        Self {
            slots: slots.into_boxed_slice(),
            capacity,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Create a ring with the default capacity (256 samples).
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Push a sample, overwriting the oldest slot when the ring has wrapped.
    ///
    /// Callers must ensure pushes never run concurrently.
    pub fn push(&self, sample: Sample) {
        let n = self.cursor.load(Ordering::Relaxed);
        let slot = &self.slots[n % self.capacity];

        let seq = slot.seq.load(Ordering::Relaxed);
        slot.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        // SAFETY: pushes are serialized, and the odd sequence value above
        // sends concurrent readers into their retry loop.
        unsafe {
            ptr::write(slot.value.get(), sample);
        }

        slot.seq.store(seq.wrapping_add(2), Ordering::Release);
        self.cursor.store(n + 1, Ordering::Release);
    }

    /// Most recent completed sample, or `None` before the first push.
    ///
    /// Never blocks and never returns a half-written sample; a reader that
    /// races the writer on a wrapped slot simply retries.
    pub fn latest(&self) -> Option<Sample> {
        let n = self.cursor.load(Ordering::Acquire);
        if n == 0 {
            return None;
        }
        Some(self.read_slot((n - 1) % self.capacity))
    }

    fn read_slot(&self, idx: usize) -> Sample {
        let slot = &self.slots[idx];
        loop {
            let seq1 = slot.seq.load(Ordering::Acquire);
            if seq1 & 1 != 0 {
                hint::spin_loop();
                continue;
            }
            // SAFETY: torn reads are detected (not prevented) by the
            // sequence check below; `Sample` is `Copy` so the read itself
            // touches no shared ownership.
            let value = unsafe { ptr::read_volatile(slot.value.get()) };
            fence(Ordering::Acquire);
            let seq2 = slot.seq.load(Ordering::Relaxed);
            if seq1 == seq2 {
                return value;
            }
            hint::spin_loop();
        }
    }

    /// Number of samples currently readable.
    pub fn len(&self) -> usize {
        self.cursor.load(Ordering::Acquire).min(self.capacity)
    }

    /// True before the first push.
    pub fn is_empty(&self) -> bool {
        self.cursor.load(Ordering::Acquire) == 0
    }

    /// Ring capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total samples pushed since creation (for statistics).
    pub fn total_pushed(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

// SAFETY: slot data is published via per-slot sequence counters and the
// cursor's Release/Acquire pair; the single-writer requirement is documented
// on `push`.
unsafe impl Send for SampleRing {}
unsafe impl Sync for SampleRing {}
