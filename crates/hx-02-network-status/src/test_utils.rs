//! Test doubles for the outbound ports.

use crate::ports::outbound::{ConnectedHook, TimeSource};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Time source that returns whatever it was last set to.
#[derive(Debug)]
pub struct FixedTimeSource {
    millis: AtomicU64,
}

impl FixedTimeSource {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Counts how often the connected hook fired.
#[derive(Debug, Default)]
pub struct CountingHook {
    fired: AtomicUsize,
}

impl CountingHook {
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl ConnectedHook for CountingHook {
    fn on_connected(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}
