//! Signal Conditioning
//!
//! Exponential moving-average filters applied to raw channel voltages
//! before they reach the ring cache and the write batch.

mod ema;

pub use ema::{Ema, FilterBank};

/// Default smoothing factor for the acquisition path
pub const EMA_ALPHA: f32 = 0.25;
