use super::EdgeOutcome;

/// Entry points every hardware edge source reports into.
///
/// Direct-GPIO interrupts report per-pin levels; expander interrupts report a
/// whole 8-bit bank. The decoding core behind this trait is the same in both
/// cases.
pub trait EdgeSink {
    /// A switch line changed (or was re-sampled).
    fn report_switch_level(&self, index: usize, level: u8) -> EdgeOutcome;

    /// An encoder contact changed; both levels are sampled.
    fn report_encoder_levels(&self, index: usize, a: u8, b: u8) -> EdgeOutcome;

    /// A full bank read from an I/O expander.
    fn report_bank_snapshot(&self, bank: u8, register: u8);
}

/// Hardware side of the pin setup: called when a control needs edge sensing
/// (re)armed. Register programming lives behind this trait.
pub trait PinBinding: Send + Sync {
    fn arm_switch(&self, index: usize, pin: u32);

    fn arm_encoder(&self, index: usize, pin_a: u32, pin_b: u32);
}

/// Binding for setups where edges are fed by hand (tests, the emulator).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBinding;

impl PinBinding for NoBinding {
    fn arm_switch(&self, _index: usize, _pin: u32) {}

    fn arm_encoder(&self, _index: usize, _pin_a: u32, _pin_b: u32) {}
}

/// Pin range `(first, last)` covered by expander bank `bank`.
#[inline]
pub fn bank_pins(bank: u8) -> (u32, u32) {
    let first = crate::EXPANDER_BASE_PIN + 8 * bank as u32;
    (first, first + 7)
}

/// Level of `pin` inside a bank register whose first pin is `first`.
#[inline]
pub fn bank_bit(register: u8, first: u32, pin: u32) -> u8 {
    (register >> (pin - first)) & 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banks_cover_eight_pins() {
        assert_eq!(bank_pins(0), (100, 107));
        assert_eq!(bank_pins(1), (108, 115));
    }

    #[test]
    fn bits_are_read_relative_to_bank() {
        let register = 0b1000_0101;
        assert_eq!(bank_bit(register, 108, 108), 1);
        assert_eq!(bank_bit(register, 108, 109), 0);
        assert_eq!(bank_bit(register, 108, 110), 1);
        assert_eq!(bank_bit(register, 108, 115), 1);
    }
}
