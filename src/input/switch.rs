//! Momentary switch debouncer.
//!
//! Presses are debounced against the last release with a hard floor: a press
//! edge that arrives less than [`DEBOUNCE_FLOOR_US`] after the previous
//! committed transition is thrown away and the switch keeps its old level.
//! Releases always commit and timestamp the start of the next measurement, so
//! the duration recorded on the following press is the time the contact
//! spent released.
//!
//! All fields are atomics: edges for one index arrive from a single context,
//! while the application reads and clears the duration from another.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::EdgeOutcome;
use crate::{time::Clock, DEBOUNCE_FLOOR_US};

pub const RELEASED: u8 = 0;
pub const PRESSED: u8 = 1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchConfig {
    /// Hardware pin, opaque to the debouncer. Pins at or above
    /// [`EXPANDER_BASE_PIN`](crate::EXPANDER_BASE_PIN) are polled.
    pub pin: u32,
}

impl SwitchConfig {
    pub fn new(pin: u32) -> Self {
        Self { pin }
    }
}

#[derive(Debug, Default)]
pub struct Switch {
    enabled: AtomicBool,
    pin: AtomicU32,
    status: AtomicU8,
    last_transition_us: AtomicU64,
    held_duration_us: AtomicU32,
}

impl Switch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the switch on `pin` and reset its debounce state.
    pub fn configure(&self, config: &SwitchConfig) {
        self.pin.store(config.pin, Ordering::Relaxed);
        self.status.store(RELEASED, Ordering::Relaxed);
        self.last_transition_us.store(0, Ordering::Relaxed);
        self.held_duration_us.store(0, Ordering::Relaxed);
        self.enabled.store(true, Ordering::Release);
    }

    /// Feed a freshly sampled logical level.
    pub fn on_edge<C: Clock + ?Sized>(&self, raw_level: u8, clock: &C) -> EdgeOutcome {
        if !self.is_enabled() {
            return EdgeOutcome::Ignored;
        }
        let level = if raw_level == RELEASED { RELEASED } else { PRESSED };
        if level == self.status.load(Ordering::Acquire) {
            return EdgeOutcome::Ignored;
        }

        let now = clock.now_us();
        let last = self.last_transition_us.load(Ordering::Relaxed);

        if level == PRESSED {
            let delta = now.saturating_sub(last);
            if delta < DEBOUNCE_FLOOR_US {
                return EdgeOutcome::Debounced;
            }
            if last > 0 {
                self.held_duration_us
                    .store(delta.min(u32::MAX as u64) as u32, Ordering::Release);
            }
            self.status.store(PRESSED, Ordering::Release);
        } else {
            self.last_transition_us.store(now, Ordering::Relaxed);
            self.status.store(RELEASED, Ordering::Release);
        }
        EdgeOutcome::Changed
    }

    /// One-shot read of the last measured duration.
    pub fn read_and_clear_duration(&self) -> u32 {
        self.held_duration_us.swap(0, Ordering::AcqRel)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn pin(&self) -> u32 {
        self.pin.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> u8 {
        self.status.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn armed() -> Switch {
        let switch = Switch::new();
        switch.configure(&SwitchConfig::new(4));
        switch
    }

    #[test]
    fn disabled_switch_ignores_edges() {
        let switch = Switch::new();
        let clock = ManualClock::new(50_000);
        assert_eq!(switch.on_edge(PRESSED, &clock), EdgeOutcome::Ignored);
        assert_eq!(switch.status(), RELEASED);
    }

    #[test]
    fn repeated_level_is_idempotent() {
        let switch = armed();
        let clock = ManualClock::new(50_000);

        assert_eq!(switch.on_edge(RELEASED, &clock), EdgeOutcome::Ignored);
        assert_eq!(switch.on_edge(RELEASED, &clock), EdgeOutcome::Ignored);

        assert_eq!(switch.on_edge(PRESSED, &clock), EdgeOutcome::Changed);
        clock.advance(10);
        assert_eq!(switch.on_edge(PRESSED, &clock), EdgeOutcome::Ignored);
        assert_eq!(switch.on_edge(PRESSED, &clock), EdgeOutcome::Ignored);
        assert_eq!(switch.status(), PRESSED);
    }

    #[test]
    fn press_inside_floor_is_discarded() {
        let switch = armed();
        let clock = ManualClock::new(50_000);

        switch.on_edge(PRESSED, &clock);
        clock.advance(20_000);
        switch.on_edge(RELEASED, &clock);

        for _ in 0..5 {
            clock.advance(150);
            assert_eq!(switch.on_edge(PRESSED, &clock), EdgeOutcome::Debounced);
            assert_eq!(switch.status(), RELEASED);
        }
        assert_eq!(switch.read_and_clear_duration(), 0);
    }

    #[test]
    fn press_records_time_since_release_once() {
        let switch = armed();
        let clock = ManualClock::new(10_000);

        // First press has no prior release to measure against
        switch.on_edge(PRESSED, &clock);
        assert_eq!(switch.read_and_clear_duration(), 0);

        clock.advance(5_000);
        switch.on_edge(RELEASED, &clock);
        clock.advance(750_000);
        assert_eq!(switch.on_edge(PRESSED, &clock), EdgeOutcome::Changed);

        assert_eq!(switch.read_and_clear_duration(), 750_000);
        assert_eq!(switch.read_and_clear_duration(), 0);
    }

    #[test]
    fn release_has_no_floor() {
        let switch = armed();
        let clock = ManualClock::new(10_000);
        switch.on_edge(PRESSED, &clock);
        clock.advance(1);
        assert_eq!(switch.on_edge(RELEASED, &clock), EdgeOutcome::Changed);
        assert_eq!(switch.status(), RELEASED);
    }

    #[test]
    fn nonzero_levels_read_as_pressed() {
        let switch = armed();
        let clock = ManualClock::new(10_000);
        assert_eq!(switch.on_edge(7, &clock), EdgeOutcome::Changed);
        assert_eq!(switch.status(), PRESSED);
    }

    #[test]
    fn reconfigure_resets_state() {
        let switch = armed();
        let clock = ManualClock::new(10_000);
        switch.on_edge(PRESSED, &clock);
        switch.configure(&SwitchConfig::new(101));
        assert_eq!(switch.status(), RELEASED);
        assert_eq!(switch.pin(), 101);
    }
}
