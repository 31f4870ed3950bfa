//! Outbound messages for encoder value changes.
//!
//! Each encoder talks on exactly one channel. A non-zero controller number
//! selects MIDI Control-Change; otherwise an OSC path, if any, is used. Coarse
//! encoders (`step >= 8`) behave like toggles and send booleans over OSC.

/// OSC payloads and the UDP sink.
pub mod osc;

use std::fmt;

use spin::Mutex;

use crate::{
    input::Encoder,
    io::midi::MidiEvent,
    transport::{MidiSender, TransportError},
};

pub use osc::{OscError, OscSink, OscValue, UdpOscSink};

/// Step at or above which an OSC encoder sends booleans.
pub const TOGGLE_STEP: u32 = 8;
/// OSC booleans read as `true` from this value up.
pub const TOGGLE_THRESHOLD: u32 = 64;

/// RPN number that resets the parameter selection (MSB and LSB 0x7F).
pub const NULL_RPN: u16 = 0x3FFF;

const CC_RPN_MSB: u8 = 0x65;
const CC_RPN_LSB: u8 = 0x64;
const CC_DATA_MSB: u8 = 0x06;
const CC_DATA_LSB: u8 = 0x26;

/// Where an encoder's current value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    Osc {
        path: &'a str,
        value: OscValue,
    },
}

/// Pick the single outbound message for `encoder`, if it has a destination.
pub fn route(encoder: &Encoder) -> Option<Route<'_>> {
    if encoder.midi_ctrl() > 0 {
        return Some(Route::ControlChange {
            channel: encoder.midi_chan(),
            controller: encoder.midi_ctrl(),
            value: (encoder.value() & 0x7F) as u8,
        });
    }

    let path = encoder.osc_path()?;
    let value = if encoder.step() >= TOGGLE_STEP {
        OscValue::Bool(encoder.value() >= TOGGLE_THRESHOLD)
    } else {
        OscValue::Int(encoder.value().min(i32::MAX as u32) as i32)
    };
    Some(Route::Osc { path, value })
}

#[derive(Debug)]
pub enum DispatchError {
    Midi(TransportError),
    Osc(OscError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Midi(e) => write!(f, "MIDI dispatch failed: {}", e),
            DispatchError::Osc(e) => write!(f, "OSC dispatch failed: {}", e),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<TransportError> for DispatchError {
    fn from(error: TransportError) -> Self {
        DispatchError::Midi(error)
    }
}

impl From<OscError> for DispatchError {
    fn from(error: OscError) -> Self {
        DispatchError::Osc(error)
    }
}

/// Owns the outbound MIDI producer and the optional OSC sink.
///
/// Several non-realtime contexts dispatch concurrently, so both ends sit in
/// spin mutexes; the ring itself stays single-producer.
pub struct Dispatcher {
    midi: Mutex<MidiSender>,
    osc: Mutex<Option<Box<dyn OscSink>>>,
}

impl Dispatcher {
    pub(crate) fn new(midi: MidiSender, osc: Option<Box<dyn OscSink>>) -> Self {
        Self {
            midi: Mutex::new(midi),
            osc: Mutex::new(osc),
        }
    }

    /// Emit the message for `encoder`'s current value. Encoders with no
    /// destination, or OSC encoders while no sink is attached, send nothing.
    pub fn dispatch(&self, encoder: &Encoder) -> Result<(), DispatchError> {
        match route(encoder) {
            Some(Route::ControlChange {
                channel,
                controller,
                value,
            }) => self.send_control_change(channel, controller, value),
            Some(Route::Osc { path, value }) => {
                if let Some(sink) = self.osc.lock().as_mut() {
                    sink.send(path, value)?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn send_control_change(&self, channel: u8, controller: u8, value: u8) -> Result<(), DispatchError> {
        let record = MidiEvent::ControlChange {
            channel,
            controller,
            value,
        }
        .to_record();
        self.midi.lock().enqueue_outbound(record)?;
        Ok(())
    }

    pub fn send_program_change(&self, channel: u8, program: u8) -> Result<(), DispatchError> {
        let record = MidiEvent::ProgramChange { channel, program }.to_record();
        self.midi.lock().enqueue_outbound(record)?;
        Ok(())
    }

    /// Registered Parameter Number write: parameter select, then 14-bit data
    /// unless `rpn` is the null RPN. Stops at the first failed send.
    pub fn send_rpn(&self, channel: u8, rpn: u16, data: u16) -> Result<(), DispatchError> {
        self.send_control_change(channel, CC_RPN_MSB, ((rpn >> 7) & 0x7F) as u8)?;
        self.send_control_change(channel, CC_RPN_LSB, (rpn & 0x7F) as u8)?;
        if rpn & NULL_RPN != NULL_RPN {
            self.send_control_change(channel, CC_DATA_MSB, ((data >> 7) & 0x7F) as u8)?;
            self.send_control_change(channel, CC_DATA_LSB, (data & 0x7F) as u8)?;
        }
        Ok(())
    }

    /// Attach or replace the OSC sink.
    pub fn set_osc_sink(&self, sink: Option<Box<dyn OscSink>>) {
        *self.osc.lock() = sink;
    }

    pub fn queued_bytes(&self) -> usize {
        self.midi.lock().queued_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::EncoderConfig,
        transport::{ring::byte_ring, FaultCounters},
    };
    use std::sync::{Arc, Mutex};

    fn encoder(config: EncoderConfig) -> Encoder {
        let mut enc = Encoder::new();
        enc.configure(&config);
        enc
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<(String, OscValue)>>>);

    impl OscSink for SharedSink {
        fn send(&mut self, path: &str, value: OscValue) -> Result<(), OscError> {
            self.0.lock().unwrap().push((path.to_string(), value));
            Ok(())
        }
    }

    fn dispatcher(osc: Option<Box<dyn OscSink>>) -> (Dispatcher, rtrb::Consumer<u8>) {
        let (producer, consumer) = byte_ring(96);
        let sender = MidiSender::new(producer, Arc::new(FaultCounters::default()));
        (Dispatcher::new(sender, osc), consumer)
    }

    fn drain(consumer: &mut rtrb::Consumer<u8>) -> Vec<u8> {
        let mut bytes = Vec::new();
        while let Ok(byte) = consumer.pop() {
            bytes.push(byte);
        }
        bytes
    }

    #[test]
    fn midi_takes_priority_over_osc() {
        let mut config = EncoderConfig::midi(2, 3, 4, 74).value(200).max_value(300);
        config.osc_path = Some("/ignored".into());
        let enc = encoder(config);
        assert_eq!(
            route(&enc),
            Some(Route::ControlChange {
                channel: 4,
                controller: 74,
                value: (200 & 0x7F) as u8
            })
        );
    }

    #[test]
    fn coarse_osc_encoders_send_booleans() {
        let enc = encoder(EncoderConfig::osc(2, 3, "/fx/on").step(64).value(64));
        assert_eq!(
            route(&enc),
            Some(Route::Osc {
                path: "/fx/on",
                value: OscValue::Bool(true)
            })
        );
        let enc = encoder(EncoderConfig::osc(2, 3, "/fx/on").step(8).value(63));
        assert_eq!(
            route(&enc),
            Some(Route::Osc {
                path: "/fx/on",
                value: OscValue::Bool(false)
            })
        );
    }

    #[test]
    fn fine_osc_encoders_send_integers() {
        let enc = encoder(EncoderConfig::osc(2, 3, "/vol").step(7).value(9));
        assert_eq!(
            route(&enc),
            Some(Route::Osc {
                path: "/vol",
                value: OscValue::Int(9)
            })
        );
    }

    #[test]
    fn no_destination_routes_nowhere() {
        let mut config = EncoderConfig::midi(2, 3, 0, 0);
        config.osc_path = Some(String::new());
        assert_eq!(route(&encoder(config)), None);
    }

    #[test]
    fn dispatch_enqueues_control_change() {
        let (dispatcher, mut consumer) = dispatcher(None);
        let enc = encoder(EncoderConfig::midi(2, 3, 1, 10).value(5));
        dispatcher.dispatch(&enc).unwrap();
        assert_eq!(drain(&mut consumer), vec![0xB1, 10, 5]);
    }

    #[test]
    fn dispatch_sends_osc_through_sink() {
        let sink = SharedSink::default();
        let (dispatcher, mut consumer) = dispatcher(Some(Box::new(sink.clone())));
        let enc = encoder(EncoderConfig::osc(2, 3, "/vol").value(12));
        dispatcher.dispatch(&enc).unwrap();

        assert!(drain(&mut consumer).is_empty());
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            &[("/vol".to_string(), OscValue::Int(12))]
        );
    }

    #[test]
    fn osc_without_sink_is_silent() {
        let (dispatcher, mut consumer) = dispatcher(None);
        let enc = encoder(EncoderConfig::osc(2, 3, "/vol").value(12));
        dispatcher.dispatch(&enc).unwrap();
        assert!(drain(&mut consumer).is_empty());
    }

    #[test]
    fn rpn_sends_select_and_data() {
        let (dispatcher, mut consumer) = dispatcher(None);
        dispatcher.send_rpn(0, 0x0000, 0x0102).unwrap();
        assert_eq!(
            drain(&mut consumer),
            vec![0xB0, 0x65, 0x00, 0xB0, 0x64, 0x00, 0xB0, 0x06, 0x02, 0xB0, 0x26, 0x02]
        );
    }

    #[test]
    fn null_rpn_skips_data() {
        let (dispatcher, mut consumer) = dispatcher(None);
        dispatcher.send_rpn(3, NULL_RPN, 99).unwrap();
        assert_eq!(drain(&mut consumer), vec![0xB3, 0x65, 0x7F, 0xB3, 0x64, 0x7F]);
    }

    #[test]
    fn program_change_record_is_padded() {
        let (dispatcher, mut consumer) = dispatcher(None);
        dispatcher.send_program_change(2, 40).unwrap();
        assert_eq!(drain(&mut consumer), vec![0xC2, 40, 0]);
    }
}
