use crate::{time::Clock, DEBOUNCE_FLOOR_US, TICKS_PER_DETENT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::EdgeOutcome;

/*
Quadrature Decoding
===================

An encoder drives two contacts, A and B, a quarter cycle apart. Sampling both
gives a 2-bit code `(a << 1) | b`. Concatenating the previous code with the
current one gives a 4-bit transition `sum = (last << 2) | now`:

    clockwise (up)         00→10  10→11  11→01  01→00
                           0b0010 0b1011 0b1101 0b0100

    counter-clockwise      00→01  01→11  11→10  10→00
                           0b0001 0b0111 0b1110 0b1000

Anything else is a repeat or a skipped state and carries no motion. Each valid
transition is one tick; one mechanical detent is TICKS_PER_DETENT ticks.


Continuous Mode (step == 0)
---------------------------

The encoder accumulates sub-detent ticks in `subvalue` and exposes
`value = subvalue / TICKS_PER_DETENT`. The last four tick intervals are kept
in `dtus`, and their mean together with the current interval selects how many
ticks a transition is worth:

    avg < 10ms   → TICKS_PER_DETENT      (fast spin: one detent per tick)
    avg < 30ms   → TICKS_PER_DETENT / 2
    otherwise    → 1                     (slow: fine resolution)

Going up rounds the visible value down, going down rounds it up, so the
visible value always moves in the direction of rotation.


Stepped Mode (step > 0)
-----------------------

No accumulation, no debounce: every tick moves `value` by `step`, as long as
the result stays inside 0..=max_value.
*/

/// Number of past tick intervals averaged by the acceleration policy.
pub const INTERVAL_HISTORY: usize = 4;

const FAST_AVG_US: u64 = 10_000;
const MEDIUM_AVG_US: u64 = 30_000;

/// Highest MIDI channel accepted by [`Encoder::configure`].
pub const MAX_MIDI_CHANNEL: u8 = 15;
/// Highest controller number accepted by [`Encoder::configure`].
pub const MAX_MIDI_CONTROLLER: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Resolve a quadrature transition into a direction.
#[inline]
pub fn decode(last_encoded: u8, encoded: u8) -> Option<Direction> {
    let sum = ((last_encoded & 0b11) << 2) | (encoded & 0b11);
    match sum {
        0b1101 | 0b0100 | 0b0010 | 0b1011 => Some(Direction::Up),
        0b1110 | 0b0111 | 0b0001 | 0b1000 => Some(Direction::Down),
        _ => None,
    }
}

/// Ticks credited per transition for a given average interval.
#[inline]
pub fn acceleration(avg_us: u64) -> u32 {
    if avg_us < FAST_AVG_US {
        TICKS_PER_DETENT
    } else if avg_us < MEDIUM_AVG_US {
        TICKS_PER_DETENT / 2
    } else {
        1
    }
}

/// Setup parameters for one encoder.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub pin_a: u32,
    pub pin_b: u32,
    pub midi_chan: u8,
    /// Controller number; 0 disables MIDI output.
    pub midi_ctrl: u8,
    /// OSC address, used only when `midi_ctrl == 0`.
    pub osc_path: Option<String>,
    pub value: u32,
    pub max_value: u32,
    /// 0 selects continuous mode with acceleration.
    pub step: u32,
}

impl EncoderConfig {
    /// Encoder that sends Control-Change messages, full 0-127 range.
    pub fn midi(pin_a: u32, pin_b: u32, midi_chan: u8, midi_ctrl: u8) -> Self {
        Self {
            pin_a,
            pin_b,
            midi_chan,
            midi_ctrl,
            osc_path: None,
            value: 0,
            max_value: 127,
            step: 0,
        }
    }

    /// Encoder that sends OSC messages to `path`.
    pub fn osc(pin_a: u32, pin_b: u32, path: impl Into<String>) -> Self {
        Self {
            pin_a,
            pin_b,
            midi_chan: 0,
            midi_ctrl: 0,
            osc_path: Some(path.into()),
            value: 0,
            max_value: 127,
            step: 0,
        }
    }

    pub fn value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    pub fn max_value(mut self, max_value: u32) -> Self {
        self.max_value = max_value;
        self
    }

    pub fn step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }
}

/// Per-encoder decoder state.
///
/// Plain data: the owning [`Panel`](crate::panel::Panel) serialises access.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    enabled: bool,
    pin_a: u32,
    pin_b: u32,
    last_encoded: u8,
    last_pin_states: Option<(u8, u8)>,
    dtus: [u64; INTERVAL_HISTORY],
    tick_timestamp_us: u64,
    subvalue: u32,
    max_subvalue: u32,
    value: u32,
    max_value: u32,
    step: u32,
    midi_chan: u8,
    midi_ctrl: u8,
    osc_path: Option<String>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a configuration. Returns `true` when edge sensing has to be
    /// (re)armed on the hardware side: the encoder was disabled or its pins
    /// changed.
    pub fn configure(&mut self, config: &EncoderConfig) -> bool {
        self.midi_chan = if config.midi_chan > MAX_MIDI_CHANNEL {
            0
        } else {
            config.midi_chan
        };
        self.midi_ctrl = if config.midi_ctrl > MAX_MIDI_CONTROLLER {
            1
        } else {
            config.midi_ctrl
        };
        self.osc_path = config.osc_path.clone().filter(|p| !p.is_empty());
        self.step = config.step;

        let value = config.value.min(config.max_value);
        self.value = value;
        self.max_value = config.max_value;
        if config.step > 0 {
            self.subvalue = 0;
            self.max_subvalue = 0;
        } else {
            self.subvalue = value.saturating_mul(TICKS_PER_DETENT);
            self.max_subvalue = config.max_value.saturating_mul(TICKS_PER_DETENT);
        }

        let rearm = !self.enabled || self.pin_a != config.pin_a || self.pin_b != config.pin_b;
        if rearm {
            self.enabled = true;
            self.pin_a = config.pin_a;
            self.pin_b = config.pin_b;
            self.last_encoded = 0;
            self.last_pin_states = None;
            self.tick_timestamp_us = 0;
        }
        rearm
    }

    /// Feed the current levels of both contacts.
    ///
    /// Returns [`EdgeOutcome::Changed`] when the visible value moved and a
    /// message has to be dispatched.
    pub fn on_edge<C: Clock + ?Sized>(&mut self, a: u8, b: u8, clock: &C) -> EdgeOutcome {
        if !self.enabled {
            return EdgeOutcome::Ignored;
        }

        let encoded = ((a & 1) << 1) | (b & 1);
        let direction = decode(self.last_encoded, encoded);
        self.last_encoded = encoded;

        let Some(direction) = direction else {
            return EdgeOutcome::Ignored;
        };

        if self.step == 0 {
            self.tick_continuous(direction, clock.now_us())
        } else {
            self.tick_stepped(direction)
        }
    }

    fn tick_continuous(&mut self, direction: Direction, now: u64) -> EdgeOutcome {
        let delta = now.saturating_sub(self.tick_timestamp_us);
        if delta < DEBOUNCE_FLOOR_US {
            return EdgeOutcome::Debounced;
        }

        let window: u64 = self.dtus.iter().sum();
        let avg = (delta + window) / (INTERVAL_HISTORY as u64 + 1);
        self.dtus.rotate_left(1);
        self.dtus[INTERVAL_HISTORY - 1] = delta;

        let increment = acceleration(avg);
        let value = match direction {
            Direction::Up => {
                self.subvalue = self.subvalue.saturating_add(increment).min(self.max_subvalue);
                self.subvalue / TICKS_PER_DETENT
            }
            Direction::Down => {
                self.subvalue = self.subvalue.saturating_sub(increment);
                self.subvalue.div_ceil(TICKS_PER_DETENT)
            }
        };
        self.tick_timestamp_us = now;

        if value != self.value {
            self.value = value;
            EdgeOutcome::Changed
        } else {
            EdgeOutcome::Accepted
        }
    }

    fn tick_stepped(&mut self, direction: Direction) -> EdgeOutcome {
        let last_value = self.value;
        self.value = self.value.min(self.max_value);
        match direction {
            Direction::Up if self.max_value - self.value >= self.step => self.value += self.step,
            Direction::Down if self.value >= self.step => self.value -= self.step,
            _ => {}
        }

        if self.value != last_value {
            EdgeOutcome::Changed
        } else {
            EdgeOutcome::Accepted
        }
    }

    /// Like [`on_edge`](Self::on_edge) for sources that deliver whole bank
    /// reads: only acts when either contact differs from the cached pair.
    pub fn on_pin_states<C: Clock + ?Sized>(&mut self, a: u8, b: u8, clock: &C) -> EdgeOutcome {
        let states = (a & 1, b & 1);
        if self.last_pin_states == Some(states) {
            return EdgeOutcome::Ignored;
        }
        let outcome = self.on_edge(states.0, states.1, clock);
        self.last_pin_states = Some(states);
        outcome
    }

    /// Authoritative set from the application. The caller always dispatches
    /// afterwards, changed or not.
    pub fn set_value(&mut self, v: u32) {
        if self.step == 0 {
            self.subvalue = v.saturating_mul(TICKS_PER_DETENT).min(self.max_subvalue);
            self.value = self.subvalue / TICKS_PER_DETENT;
        } else {
            self.value = v.min(self.max_value);
        }
    }

    /// Mirror an inbound Control-Change. Bypasses decoding and clamping and
    /// never dispatches.
    pub fn apply_echo(&mut self, data: u8) {
        self.value = data as u32;
        self.subvalue = data as u32 * TICKS_PER_DETENT;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pins(&self) -> (u32, u32) {
        (self.pin_a, self.pin_b)
    }

    /// Contact levels cached by the last bank or poll read.
    pub fn last_pin_states(&self) -> Option<(u8, u8)> {
        self.last_pin_states
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn subvalue(&self) -> u32 {
        self.subvalue
    }

    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    pub fn max_subvalue(&self) -> u32 {
        self.max_subvalue
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn midi_chan(&self) -> u8 {
        self.midi_chan
    }

    pub fn midi_ctrl(&self) -> u8 {
        self.midi_ctrl
    }

    pub fn osc_path(&self) -> Option<&str> {
        self.osc_path.as_deref()
    }
}
