//! Shared Run-State Flags

use std::sync::atomic::{AtomicBool, Ordering};

/// Cross-context acquisition switches.
///
/// Toggled from the command dispatcher and read every tick by the
/// acquisition thread; atomics keep both sides wait-free. Eventual
/// consistency is fine here: a tick that races a toggle lands one sample
/// early or late, nothing more.
#[derive(Debug)]
pub struct Controls {
    sampling: AtomicBool,
}

impl Controls {
    /// Flags in their boot state: sampling enabled.
    pub fn new() -> Self {
        Self {
            sampling: AtomicBool::new(true),
        }
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling.load(Ordering::Acquire)
    }

    /// Set the sampling flag, returning the previous state.
    pub fn set_sampling(&self, enabled: bool) -> bool {
        self.sampling.swap(enabled, Ordering::AcqRel)
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new()
    }
}
