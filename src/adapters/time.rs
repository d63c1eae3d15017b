//! Millisecond clock adapters.
//!
//! - [`SystemClock`]: `std::time::Instant` since construction; the host
//!   stand-in for a board's boot-relative tick counter.
//! - [`ManualClock`]: advanced by hand.  Used by simulations and tests
//!   to drive debounce windows and polled timers deterministically.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::ports::Clock;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    /// Milliseconds since construction (wraps at `u32::MAX`).
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Shared, hand-driven clock.  Clones observe the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: u32) {
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| Some(t.wrapping_add(ms)));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Acquire)
    }
}
