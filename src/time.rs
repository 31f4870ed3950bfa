//! Microsecond timebase used by the debouncers.
//!
//! Every debounce and acceleration window in the crate is measured against a
//! [`Clock`], never waited on. Production code uses [`MonotonicClock`]; tests
//! and benches drive a [`ManualClock`] so tick spacing is exact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// First reading of a fresh [`MonotonicClock`]. Timestamp 0 means "no
/// previous transition" to the debouncers, so real readings never start there.
pub const MONOTONIC_START_US: u64 = 1_000_000;

/// Monotonic microsecond clock source.
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        MONOTONIC_START_US + self.origin.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock for deterministic timing.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now: AtomicU64::new(start_us),
        }
    }

    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::Release);
    }

    /// Move the clock forward and return the new reading.
    pub fn advance(&self, delta_us: u64) -> u64 {
        self.now.fetch_add(delta_us, Ordering::AcqRel) + delta_us
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
