//! Fixed-Rate Acquisition Loop
//!
//! Owns the periodic read-filter-publish cycle on a dedicated OS thread,
//! plus the shared run-state flags the command surface toggles.

mod controls;
mod pipeline;
mod sampler;

pub use controls::Controls;
pub use pipeline::Pipeline;
pub use sampler::{Sampler, SamplerConfig};

/// Acquisition cadence, independent of the converter's native data rate
pub const OUTPUT_RATE_HZ: f64 = 100.0;
