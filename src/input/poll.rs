//! Poll loop for controls wired to a non-interrupt expander.
//!
//! Every `interval` the loop re-samples each enabled switch and encoder whose
//! pins sit at or above [`EXPANDER_BASE_PIN`](crate::EXPANDER_BASE_PIN) and
//! feeds the levels through the same entry points the interrupt path uses.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{panel::Panel, EXPANDER_BASE_PIN, MAX_ENCODERS, MAX_SWITCHES};

use super::EdgeSink;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Reads one logical pin level from the expander.
pub trait PinReader: Send {
    fn read_pin(&mut self, pin: u32) -> u8;
}

impl<F> PinReader for F
where
    F: FnMut(u32) -> u8 + Send,
{
    fn read_pin(&mut self, pin: u32) -> u8 {
        self(pin)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// One sweep over every polled control.
pub fn poll_once<R: PinReader + ?Sized>(panel: &Panel, reader: &mut R) {
    for index in 0..MAX_SWITCHES {
        let Some(pin) = panel.switch_pin(index) else {
            continue;
        };
        if pin < EXPANDER_BASE_PIN {
            continue;
        }
        let level = reader.read_pin(pin);
        panel.report_switch_level(index, level);
    }

    for index in 0..MAX_ENCODERS {
        let Some((pin_a, pin_b)) = panel.encoder_pins(index) else {
            continue;
        };
        if pin_a < EXPANDER_BASE_PIN || pin_b < EXPANDER_BASE_PIN {
            continue;
        }
        let a = reader.read_pin(pin_a);
        let b = reader.read_pin(pin_b);
        panel.sample_encoder_pins(index, a, b);
    }
}

/// Background poll thread. Stops and joins when dropped.
pub struct Poller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<R>(panel: Arc<Panel>, mut reader: R, config: PollConfig) -> io::Result<Self>
    where
        R: PinReader + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let interval = config.interval();

        let handle = thread::Builder::new().name("knobwire-poll".into()).spawn({
            let stop = stop.clone();
            move || {
                while !stop.load(Ordering::Acquire) {
                    poll_once(&panel, &mut reader);
                    thread::sleep(interval);
                }
            }
        })?;

        log::info!("expander poll thread started ({}ms interval)", config.interval_ms);
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("expander poll thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::{EncoderConfig, SwitchConfig},
        panel::PanelConfig,
        time::ManualClock,
    };

    #[test]
    fn only_expander_pins_are_polled() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = PanelConfig::default()
            .switch(SwitchConfig::new(5))
            .switch(SwitchConfig::new(EXPANDER_BASE_PIN + 3));
        let (panel, _bridge, _inbound, _events) = Panel::builder(config).clock(clock).open().unwrap();

        let mut seen = Vec::new();
        let mut reader = |pin: u32| {
            seen.push(pin);
            1
        };
        poll_once(&panel, &mut reader);

        assert_eq!(seen, vec![EXPANDER_BASE_PIN + 3]);
        assert_eq!(panel.switch_status(0), Some(0));
        assert_eq!(panel.switch_status(1), Some(1));
    }

    #[test]
    fn polled_encoder_decodes() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = PanelConfig::default().encoder(
            EncoderConfig::midi(EXPANDER_BASE_PIN, EXPANDER_BASE_PIN + 1, 0, 20).value(10),
        );
        let (panel, _bridge, _inbound, _events) = Panel::builder(config).clock(clock.clone()).open().unwrap();

        // One clockwise cycle, one transition per sweep
        for levels in [(1u8, 0u8), (1, 1), (0, 1), (0, 0)] {
            clock.advance(50_000);
            let mut reader = |pin: u32| if pin == EXPANDER_BASE_PIN { levels.0 } else { levels.1 };
            poll_once(&panel, &mut reader);
            // A repeated sweep with unchanged pins is a no-op
            poll_once(&panel, &mut reader);
        }
        assert_eq!(panel.get_value(0), 11);
    }

    #[test]
    fn poller_thread_stops_on_drop() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = PanelConfig::default().switch(SwitchConfig::new(EXPANDER_BASE_PIN));
        let (panel, _bridge, _inbound, _events) = Panel::builder(config).clock(clock).open().unwrap();

        let poller = Poller::spawn(panel.clone(), |_pin: u32| 1u8, PollConfig { interval_ms: 1 }).unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(poller);
        assert_eq!(panel.switch_status(0), Some(1));
    }
}
