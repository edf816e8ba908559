//! Exponential Moving Average

use crate::EMA_ALPHA;

/// Single-channel exponential moving average.
///
/// The first sample seeds the state directly, so the output never ramps up
/// from an artificial zero.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f32,
    state: Option<f32>,
}

impl Ema {
    /// Create a filter with the given smoothing factor
    pub fn new(alpha: f32) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "alpha must be in (0, 1]");
        Self { alpha, state: None }
    }

    /// Add a value and get the filtered output
    pub fn apply(&mut self, value: f32) -> f32 {
        let next = match self.state {
            None => value,
            Some(state) => state + self.alpha * (value - state),
        };
        self.state = Some(next);
        next
    }

    /// Current filter state, if primed
    pub fn value(&self) -> Option<f32> {
        self.state
    }

    /// Clear the state; the next sample seeds again
    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for Ema {
    fn default() -> Self {
        Self::new(EMA_ALPHA)
    }
}

/// EMA bank for the three acquisition channels.
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    channels: [Ema; 3],
}

impl FilterBank {
    pub fn new(alpha: f32) -> Self {
        Self {
            channels: [Ema::new(alpha), Ema::new(alpha), Ema::new(alpha)],
        }
    }

    /// Condition one acquisition cycle worth of raw voltages.
    pub fn apply(&mut self, raw: [f32; 3]) -> [f32; 3] {
        [
            self.channels[0].apply(raw[0]),
            self.channels[1].apply(raw[1]),
            self.channels[2].apply(raw[2]),
        ]
    }

    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.reset();
        }
    }
}
