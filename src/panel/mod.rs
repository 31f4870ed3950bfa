//! The control panel: fixed switch and encoder tables plus the wiring between
//! edge decoding, dispatch and the transport.
//!
//! # Example
//!
//! ```ignore
//! use knobwire::{input::EncoderConfig, panel::{Panel, PanelConfig}};
//!
//! let config = PanelConfig::default().encoder(EncoderConfig::midi(2, 3, 1, 10));
//! let (panel, bridge, inbound, events) = Panel::builder(config).open()?;
//! // hand `bridge` to the audio callback, `inbound` and `events` to the application
//! panel.set_value(0, 64);
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use spin::{Mutex, MutexGuard};

use crate::{
    dispatch::{DispatchError, Dispatcher, OscSink},
    input::{
        source::{bank_bit, bank_pins},
        EdgeOutcome, EdgeSink, Encoder, EncoderConfig, NoBinding, PinBinding, PollConfig, Switch,
        SwitchConfig,
    },
    time::{Clock, MonotonicClock},
    transport::{
        event_ring, ring::byte_ring, BridgeConfig, EventReceiver, FaultCounters, FaultSnapshot,
        MidiReceiver, MidiSender, RealtimeBridge,
    },
    MAX_ENCODERS, MAX_SWITCHES,
};

/// Marker for "no echo waiting" in [`EncoderSlot::pending_echo`].
const NO_ECHO: u32 = u32::MAX;
const BINDING_ENABLED: u32 = 1 << 16;

#[inline]
fn binding_key(channel: u8, controller: u8) -> u32 {
    BINDING_ENABLED | (channel as u32) << 8 | controller as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Switch,
    Encoder,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Switch => write!(f, "switch"),
            ControlKind::Encoder => write!(f, "encoder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelError {
    /// Index outside the fixed table.
    OutOfRange { kind: ControlKind, index: usize },
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::OutOfRange { kind, index } => {
                let max = match kind {
                    ControlKind::Switch => MAX_SWITCHES,
                    ControlKind::Encoder => MAX_ENCODERS,
                };
                write!(f, "{} index {} out of range (max {})", kind, index, max - 1)
            }
        }
    }
}

impl std::error::Error for PanelError {}

/// Everything needed to open a panel. Controls are configured in table order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelConfig {
    pub bridge: BridgeConfig,
    pub poll: PollConfig,
    pub switches: Vec<SwitchConfig>,
    pub encoders: Vec<EncoderConfig>,
}

impl PanelConfig {
    pub fn switch(mut self, switch: SwitchConfig) -> Self {
        self.switches.push(switch);
        self
    }

    pub fn encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoders.push(encoder);
        self
    }

    pub fn bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

/// Copy of an encoder's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSnapshot {
    pub value: u32,
    pub subvalue: u32,
    pub max_value: u32,
    pub step: u32,
    pub midi_chan: u8,
    pub midi_ctrl: u8,
}

struct EncoderSlot {
    state: Mutex<Encoder>,
    /// Enabled flag, channel and controller packed for lock-free echo matching.
    binding: AtomicU32,
    /// Echo value parked by the realtime side while the encoder was busy.
    pending_echo: AtomicU32,
}

impl EncoderSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(Encoder::new()),
            binding: AtomicU32::new(0),
            pending_echo: AtomicU32::new(NO_ECHO),
        }
    }

    /// Spin for the encoder and apply any echo parked while it was held.
    fn lock(&self) -> MutexGuard<'_, Encoder> {
        let mut encoder = self.state.lock();
        let pending = self.pending_echo.swap(NO_ECHO, Ordering::AcqRel);
        if pending != NO_ECHO {
            encoder.apply_echo(pending as u8);
        }
        encoder
    }
}

pub struct PanelBuilder {
    config: PanelConfig,
    clock: Option<Arc<dyn Clock>>,
    binding: Option<Box<dyn PinBinding>>,
    osc: Option<Box<dyn OscSink>>,
}

impl PanelBuilder {
    /// Time source for debouncing; defaults to [`MonotonicClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Hardware pin setup; defaults to [`NoBinding`].
    pub fn binding(mut self, binding: Box<dyn PinBinding>) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn osc(mut self, sink: Box<dyn OscSink>) -> Self {
        self.osc = Some(sink);
        self
    }

    /// Build the panel and split off the realtime handle and the two
    /// application receivers (forwarded MIDI, returned events).
    pub fn open(self) -> Result<(Arc<Panel>, RealtimeBridge, MidiReceiver, EventReceiver), PanelError> {
        let PanelBuilder {
            config,
            clock,
            binding,
            osc,
        } = self;

        if config.switches.len() > MAX_SWITCHES {
            return Err(PanelError::OutOfRange {
                kind: ControlKind::Switch,
                index: MAX_SWITCHES,
            });
        }
        if config.encoders.len() > MAX_ENCODERS {
            return Err(PanelError::OutOfRange {
                kind: ControlKind::Encoder,
                index: MAX_ENCODERS,
            });
        }

        let faults = Arc::new(FaultCounters::default());
        let (out_producer, out_consumer) = byte_ring(config.bridge.ring_bytes);
        let (in_producer, in_consumer) = byte_ring(config.bridge.ring_bytes);
        let (event_sender, event_receiver) = event_ring(config.bridge.event_slots);

        let panel = Arc::new(Panel {
            switches: std::array::from_fn(|_| Switch::new()),
            encoders: std::array::from_fn(|_| EncoderSlot::new()),
            clock: clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            binding: binding.unwrap_or_else(|| Box::new(NoBinding)),
            dispatcher: Dispatcher::new(MidiSender::new(out_producer, faults.clone()), osc),
            faults: faults.clone(),
        });

        for (index, switch) in config.switches.iter().enumerate() {
            panel.configure_switch(index, switch)?;
        }
        for (index, encoder) in config.encoders.iter().enumerate() {
            panel.configure_encoder(index, encoder)?;
        }

        log::info!(
            "panel open: {} switches, {} encoders, {} byte rings, {} event slots",
            config.switches.len(),
            config.encoders.len(),
            config.bridge.ring_bytes,
            config.bridge.event_slots
        );

        let bridge = RealtimeBridge::new(
            out_consumer,
            in_producer,
            event_sender,
            panel.clone(),
            faults,
        );
        Ok((panel, bridge, MidiReceiver::new(in_consumer), event_receiver))
    }
}

/// Arena owning every switch and encoder. Shared behind an `Arc` by the edge
/// sources, the application and the realtime bridge.
pub struct Panel {
    switches: [Switch; MAX_SWITCHES],
    encoders: [EncoderSlot; MAX_ENCODERS],
    clock: Arc<dyn Clock>,
    binding: Box<dyn PinBinding>,
    dispatcher: Dispatcher,
    faults: Arc<FaultCounters>,
}

impl Panel {
    pub fn builder(config: PanelConfig) -> PanelBuilder {
        PanelBuilder {
            config,
            clock: None,
            binding: None,
            osc: None,
        }
    }

    pub fn configure_switch(&self, index: usize, config: &SwitchConfig) -> Result<(), PanelError> {
        let switch = self.switches.get(index).ok_or(PanelError::OutOfRange {
            kind: ControlKind::Switch,
            index,
        })?;
        switch.configure(config);
        self.binding.arm_switch(index, config.pin);
        log::debug!("switch {} on pin {}", index, config.pin);
        Ok(())
    }

    /// Configure encoder `index`. The new value is not dispatched.
    pub fn configure_encoder(&self, index: usize, config: &EncoderConfig) -> Result<(), PanelError> {
        let slot = self.encoders.get(index).ok_or(PanelError::OutOfRange {
            kind: ControlKind::Encoder,
            index,
        })?;

        let mut encoder = slot.lock();
        let rearm = encoder.configure(config);
        slot.binding
            .store(binding_key(encoder.midi_chan(), encoder.midi_ctrl()), Ordering::Release);
        drop(encoder);

        if rearm {
            self.binding.arm_encoder(index, config.pin_a, config.pin_b);
        }
        log::debug!(
            "encoder {} on pins {}/{}: chan {} ctrl {} step {}",
            index,
            config.pin_a,
            config.pin_b,
            config.midi_chan,
            config.midi_ctrl,
            config.step
        );
        Ok(())
    }

    /// Feed a bank read from an I/O expander.
    pub fn bank_snapshot(&self, bank: u8, register: u8) {
        let (first, last) = bank_pins(bank);
        let in_bank = |pin: u32| (first..=last).contains(&pin);

        for (index, slot) in self.encoders.iter().enumerate() {
            let mut encoder = slot.lock();
            if !encoder.is_enabled() {
                continue;
            }
            let (pin_a, pin_b) = encoder.pins();
            if !in_bank(pin_a) && !in_bank(pin_b) {
                continue;
            }
            // A contact wired outside this bank keeps its cached level
            let (cached_a, cached_b) = encoder.last_pin_states().unwrap_or((0, 0));
            let a = if in_bank(pin_a) { bank_bit(register, first, pin_a) } else { cached_a };
            let b = if in_bank(pin_b) { bank_bit(register, first, pin_b) } else { cached_b };
            log::trace!("bank {} reg {:08b}: encoder {} a={} b={}", bank, register, index, a, b);
            if encoder.on_pin_states(a, b, &*self.clock) == EdgeOutcome::Changed {
                self.dispatch_locked(index, &encoder);
            }
        }

        for switch in &self.switches {
            if !switch.is_enabled() || !in_bank(switch.pin()) {
                continue;
            }
            let level = bank_bit(register, first, switch.pin());
            if level != switch.status() {
                switch.on_edge(level, &*self.clock);
            }
        }
    }

    /// Poll-path entry for encoders: only acts when a contact level differs
    /// from the previous sample.
    pub fn sample_encoder_pins(&self, index: usize, a: u8, b: u8) -> EdgeOutcome {
        let Some(slot) = self.encoders.get(index) else {
            return EdgeOutcome::Ignored;
        };
        let mut encoder = slot.lock();
        let outcome = encoder.on_pin_states(a, b, &*self.clock);
        if outcome == EdgeOutcome::Changed {
            self.dispatch_locked(index, &encoder);
        }
        outcome
    }

    /// Microseconds the switch spent released before its last press, then
    /// zero until the next press. Out-of-range indices read as zero.
    pub fn read_and_clear_duration(&self, index: usize) -> u32 {
        self.switches
            .get(index)
            .map_or(0, |switch| switch.read_and_clear_duration())
    }

    /// Debounced level of an enabled switch.
    pub fn switch_status(&self, index: usize) -> Option<u8> {
        self.switches
            .get(index)
            .filter(|switch| switch.is_enabled())
            .map(|switch| switch.status())
    }

    pub fn switch_pin(&self, index: usize) -> Option<u32> {
        self.switches
            .get(index)
            .filter(|switch| switch.is_enabled())
            .map(|switch| switch.pin())
    }

    pub fn encoder_pins(&self, index: usize) -> Option<(u32, u32)> {
        let encoder = self.encoders.get(index)?.lock();
        encoder.is_enabled().then(|| encoder.pins())
    }

    /// Current value of encoder `index`; zero when out of range.
    pub fn get_value(&self, index: usize) -> u32 {
        self.encoders
            .get(index)
            .map_or(0, |slot| slot.lock().value())
    }

    /// Set encoder `index` from the application. Always dispatches, even when
    /// the clamped value equals the old one. Out-of-range indices are ignored.
    pub fn set_value(&self, index: usize, value: u32) {
        let Some(slot) = self.encoders.get(index) else {
            log::debug!("set_value on encoder {} ignored: out of range", index);
            return;
        };
        let mut encoder = slot.lock();
        if !encoder.is_enabled() {
            return;
        }
        encoder.set_value(value);
        self.dispatch_locked(index, &encoder);
    }

    /// Re-send the current value of encoder `index`.
    pub fn dispatch(&self, index: usize) -> Result<(), DispatchError> {
        let Some(slot) = self.encoders.get(index) else {
            return Ok(());
        };
        let encoder = slot.lock();
        self.dispatcher.dispatch(&encoder)
    }

    pub fn encoder_snapshot(&self, index: usize) -> Option<EncoderSnapshot> {
        let encoder = self.encoders.get(index)?.lock();
        encoder.is_enabled().then(|| EncoderSnapshot {
            value: encoder.value(),
            subvalue: encoder.subvalue(),
            max_value: encoder.max_value(),
            step: encoder.step(),
            midi_chan: encoder.midi_chan(),
            midi_ctrl: encoder.midi_ctrl(),
        })
    }

    /// Mirror an inbound Control-Change onto every enabled encoder bound to
    /// `channel`/`controller`. Called from the realtime context: never spins.
    pub(crate) fn echo_control_change(&self, channel: u8, controller: u8, value: u8) {
        let key = binding_key(channel, controller);
        for slot in &self.encoders {
            if slot.binding.load(Ordering::Acquire) != key {
                continue;
            }
            match slot.state.try_lock() {
                Some(mut encoder) => {
                    encoder.apply_echo(value);
                    slot.pending_echo.store(NO_ECHO, Ordering::Release);
                }
                None => slot.pending_echo.store(value as u32, Ordering::Release),
            }
        }
    }

    fn dispatch_locked(&self, index: usize, encoder: &Encoder) {
        if let Err(e) = self.dispatcher.dispatch(encoder) {
            log::warn!("encoder {}: {}", index, e);
        }
    }

    pub fn send_control_change(&self, channel: u8, controller: u8, value: u8) -> Result<(), DispatchError> {
        self.dispatcher.send_control_change(channel, controller, value)
    }

    pub fn send_program_change(&self, channel: u8, program: u8) -> Result<(), DispatchError> {
        self.dispatcher.send_program_change(channel, program)
    }

    pub fn send_rpn(&self, channel: u8, rpn: u16, data: u16) -> Result<(), DispatchError> {
        self.dispatcher.send_rpn(channel, rpn, data)
    }

    pub fn set_osc_sink(&self, sink: Option<Box<dyn OscSink>>) {
        self.dispatcher.set_osc_sink(sink);
    }

    /// Bytes waiting in the outbound ring.
    pub fn queued_outbound(&self) -> usize {
        self.dispatcher.queued_bytes()
    }

    pub fn faults(&self) -> FaultSnapshot {
        self.faults.snapshot()
    }

    /// Log whatever went wrong since `last` and advance it.
    pub fn report_faults(&self, last: &mut FaultSnapshot) {
        let now = self.faults.snapshot();
        now.since(last).log();
        *last = now;
    }
}

impl EdgeSink for Panel {
    fn report_switch_level(&self, index: usize, level: u8) -> EdgeOutcome {
        match self.switches.get(index) {
            Some(switch) => switch.on_edge(level, &*self.clock),
            None => EdgeOutcome::Ignored,
        }
    }

    fn report_encoder_levels(&self, index: usize, a: u8, b: u8) -> EdgeOutcome {
        let Some(slot) = self.encoders.get(index) else {
            return EdgeOutcome::Ignored;
        };
        let mut encoder = slot.lock();
        let outcome = encoder.on_edge(a, b, &*self.clock);
        if outcome == EdgeOutcome::Changed {
            self.dispatch_locked(index, &encoder);
        }
        outcome
    }

    fn report_bank_snapshot(&self, bank: u8, register: u8) {
        self.bank_snapshot(bank, register);
    }
}
