//! Sample Ring Cache
//!
//! Fixed-capacity overwrite ring holding the most recent conditioned
//! samples for non-blocking live reads.

mod ring;

pub use ring::{SampleRing, DEFAULT_CAPACITY};

use serde::{Deserialize, Serialize};

/// One conditioned acquisition cycle: three single-ended channel voltages
/// in millivolts plus a monotonic millisecond timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_ms: u32,
    pub ch0_mv: f32,
    pub ch1_mv: f32,
    pub ch2_mv: f32,
}
