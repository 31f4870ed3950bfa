//! Edge decoding for the physical controls.
//!
//! The debouncers and decoders here only see logical levels and a clock.
//! Where the levels come from (a GPIO interrupt, an expander bank read, the
//! poll loop, the keyboard emulator) is the business of an edge source talking
//! to the [`EdgeSink`] interface.

/// Quadrature decoder with acceleration.
pub mod encoder;
/// Fixed-interval sampling of expander pins.
pub mod poll;
/// Edge-source and hardware-binding traits.
pub mod source;
/// Press/release debouncer.
pub mod switch;

pub use encoder::{Encoder, EncoderConfig};
pub use poll::{PinReader, PollConfig, Poller};
pub use source::{EdgeSink, NoBinding, PinBinding};
pub use switch::{Switch, SwitchConfig};

/// What an edge notification did to the addressed control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeOutcome {
    /// Out of range, disabled, unchanged level or no quadrature motion.
    Ignored,
    /// Inside the debounce floor; the transition was discarded.
    Debounced,
    /// State advanced but the visible value did not change.
    Accepted,
    /// The visible value or level changed.
    Changed,
}
