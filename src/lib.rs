pub mod dispatch; // MIDI CC / OSC output per encoder change
pub mod input; // Switch debouncing and quadrature decoding
pub mod io;
pub mod panel; // Control tables and wiring
pub mod time;
pub mod transport; // Realtime MIDI rings

/// Raw quadrature ticks per mechanical detent.
pub const TICKS_PER_DETENT: u32 = 4;
/// Minimum spacing between accepted transitions.
pub const DEBOUNCE_FLOOR_US: u64 = 1_000;

pub const MAX_SWITCHES: usize = 8;
pub const MAX_ENCODERS: usize = 8;

/// First pin number of the I/O expander; lower pins are direct GPIO.
pub const EXPANDER_BASE_PIN: u32 = 100;

pub const DEFAULT_RING_BYTES: usize = 768;
pub const DEFAULT_EVENT_SLOTS: usize = 256;
