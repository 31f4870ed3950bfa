//! MIDI transport between the control contexts and the realtime callback.
//!
//! Two byte rings of fixed 3-byte records cross the realtime boundary:
//!
//! ```text
//!   edge / app contexts ── MidiSender ──► out ring ──► RealtimeBridge ──► output port
//!   input port ──► RealtimeBridge ──► in ring ──► MidiReceiver ── application
//!                        │
//!                        ├─ CC  → encoder echo
//!                        └─ PC  → EventSender ──► event ring ──► EventReceiver ── application
//! ```
//!
//! All three rings are `rtrb` single-producer/single-consumer buffers: the realtime
//! side never blocks, allocates or logs. Anything it has to drop is counted in
//! [`FaultCounters`] and reported later from a non-realtime context.

/// Realtime drain/scan step.
pub mod bridge;
/// Returned-event ring consumed by the application.
pub mod events;
/// Producer/consumer handles of the byte rings.
pub mod ring;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use bridge::{MidiOutputPort, RealtimeBridge};
pub use events::{event_ring, EventReceiver, EventSender};
pub use ring::{MidiReceiver, MidiSender};

use crate::{DEFAULT_EVENT_SLOTS, DEFAULT_RING_BYTES};

/// Bytes per stored message, whatever its wire length.
pub const RECORD_LEN: usize = 3;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Capacity of each byte ring.
    pub ring_bytes: usize,
    /// Slots in the returned-event ring.
    pub event_slots: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ring_bytes: DEFAULT_RING_BYTES,
            event_slots: DEFAULT_EVENT_SLOTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Less than one record of free space in the outbound ring.
    Overflow,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Overflow => write!(f, "outbound MIDI ring is full"),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Output,
    Input,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Output => write!(f, "output"),
            PortDirection::Input => write!(f, "input"),
        }
    }
}

/// Fatal condition for one realtime period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// More messages than the period has frames.
    TooManyEvents {
        direction: PortDirection,
        budget: usize,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::TooManyEvents { direction, budget } => write!(
                f,
                "too many MIDI {} events for a period of {} frames",
                direction, budget
            ),
        }
    }
}

impl std::error::Error for ProcessError {}

/// Drop and overload counters shared by every transport handle.
#[derive(Debug, Default)]
pub struct FaultCounters {
    output_overflows: AtomicU64,
    input_drops: AtomicU64,
    event_drops: AtomicU64,
    overloaded_periods: AtomicU64,
}

/// Point-in-time copy of [`FaultCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultSnapshot {
    pub output_overflows: u64,
    pub input_drops: u64,
    pub event_drops: u64,
    pub overloaded_periods: u64,
}

impl FaultCounters {
    pub(crate) fn output_overflow(&self) {
        self.output_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn input_drop(&self) {
        self.input_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_drop(&self) {
        self.event_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn overloaded_period(&self) {
        self.overloaded_periods.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            output_overflows: self.output_overflows.load(Ordering::Relaxed),
            input_drops: self.input_drops.load(Ordering::Relaxed),
            event_drops: self.event_drops.load(Ordering::Relaxed),
            overloaded_periods: self.overloaded_periods.load(Ordering::Relaxed),
        }
    }
}

impl FaultSnapshot {
    /// Counts accumulated since `earlier`.
    pub fn since(&self, earlier: &FaultSnapshot) -> FaultSnapshot {
        FaultSnapshot {
            output_overflows: self.output_overflows.saturating_sub(earlier.output_overflows),
            input_drops: self.input_drops.saturating_sub(earlier.input_drops),
            event_drops: self.event_drops.saturating_sub(earlier.event_drops),
            overloaded_periods: self.overloaded_periods.saturating_sub(earlier.overloaded_periods),
        }
    }

    pub fn is_clean(&self) -> bool {
        *self == FaultSnapshot::default()
    }

    /// Log every non-zero counter at warn level.
    pub fn log(&self) {
        if self.output_overflows > 0 {
            log::warn!("dropped {} outbound MIDI messages: ring full", self.output_overflows);
        }
        if self.input_drops > 0 {
            log::warn!("dropped {} inbound MIDI messages: input ring full", self.input_drops);
        }
        if self.event_drops > 0 {
            log::warn!("dropped {} returned events: event ring full", self.event_drops);
        }
        if self.overloaded_periods > 0 {
            log::error!(
                "{} realtime periods overloaded with MIDI events",
                self.overloaded_periods
            );
        }
    }
}
