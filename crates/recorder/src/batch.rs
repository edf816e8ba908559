//! Write Batch
//!
//! Fixed-capacity staging buffer between the acquisition loop and the
//! volume. One flush empties the whole batch into the session file.

use sample_ring::Sample;

/// Batch capacity: one second of samples at the converter's top rate
pub const BATCH_CAPACITY: usize = 860;

/// Encode one sample as a recording line.
pub fn encode_line(sample: &Sample) -> String {
    format!(
        "{}; {:.1}; {:.1}; {:.1}\n",
        sample.timestamp_ms, sample.ch0_mv, sample.ch1_mv, sample.ch2_mv
    )
}

/// Staging buffer for samples awaiting a flush.
pub struct WriteBatch {
    samples: Vec<Sample>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(BATCH_CAPACITY),
        }
    }

    /// Stage a sample.
    ///
    /// Returns true when the batch is full and needs a flush; a push into
    /// an already-full batch drops the sample (the ring cache still holds
    /// it for live reads).
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.samples.len() < BATCH_CAPACITY {
            self.samples.push(sample);
        }
        self.samples.len() >= BATCH_CAPACITY
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= BATCH_CAPACITY
    }

    /// Iterate the staged samples in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Drop all staged samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}
