//! Channel-voice MIDI messages as they cross the transport rings.
//!
//! The rings store every message as a fixed 3-byte record; the real wire
//! length is recovered from the status nibble.

pub const CONTROL_CHANGE: u8 = 0xB;
pub const PROGRAM_CHANGE: u8 = 0xC;
pub const CHANNEL_PRESSURE: u8 = 0xD;

/// A raw 3-byte record as stored in the byte rings.
pub type MidiRecord = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
}

/// Number of bytes a message occupies on the wire, derived from its status byte.
///
/// Program-change and channel-pressure carry a single data byte, everything
/// else is treated as a 3-byte message.
#[inline]
pub fn message_len(status: u8) -> usize {
    match status >> 4 {
        PROGRAM_CHANGE | CHANNEL_PRESSURE => 2,
        _ => 3,
    }
}

/// Pack up to three bytes little-endian into the returned-event format
/// `status | data1 << 8 | data2 << 16`. Missing bytes count as zero.
#[inline]
pub fn pack(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(3)
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (8 * i))
}

impl MidiEvent {
    /// Parse a channel-voice message. Running status and system messages are
    /// not supported.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        let channel = status & 0x0F;
        let data1 = bytes.get(1).copied().unwrap_or(0) & 0x7F;
        let data2 = bytes.get(2).copied().unwrap_or(0) & 0x7F;

        let event = match status >> 4 {
            0x8 => MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: data2,
            },
            // Note-on with zero velocity is a note-off by convention
            0x9 if data2 == 0 => MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: 0,
            },
            0x9 => MidiEvent::NoteOn {
                channel,
                key: data1,
                velocity: data2,
            },
            CONTROL_CHANGE => MidiEvent::ControlChange {
                channel,
                controller: data1,
                value: data2,
            },
            PROGRAM_CHANGE => MidiEvent::ProgramChange {
                channel,
                program: data1,
            },
            CHANNEL_PRESSURE => MidiEvent::ChannelPressure {
                channel,
                pressure: data1,
            },
            0xE => MidiEvent::PitchBend {
                channel,
                value: (((data2 as i16) << 7) | data1 as i16) - 8192,
            },
            _ => return None,
        };
        Some(event)
    }

    /// Decode an event previously packed with [`pack`].
    pub fn from_packed(packed: u32) -> Option<Self> {
        let bytes = packed.to_le_bytes();
        Self::from_bytes(&bytes[..3])
    }

    /// Encode into the fixed 3-byte ring record. Unused bytes are zero.
    pub fn to_record(self) -> MidiRecord {
        match self {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => [0x90 | (channel & 0x0F), key & 0x7F, velocity & 0x7F],
            MidiEvent::NoteOff {
                channel,
                key,
                velocity,
            } => [0x80 | (channel & 0x0F), key & 0x7F, velocity & 0x7F],
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            MidiEvent::PitchBend { channel, value } => {
                let raw = (value.clamp(-8192, 8191) + 8192) as u16;
                [0xE0 | (channel & 0x0F), (raw & 0x7F) as u8, (raw >> 7) as u8]
            }
            MidiEvent::ProgramChange { channel, program } => {
                [0xC0 | (channel & 0x0F), program & 0x7F, 0]
            }
            MidiEvent::ChannelPressure { channel, pressure } => {
                [0xD0 | (channel & 0x0F), pressure & 0x7F, 0]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_change_is_two_bytes_on_the_wire() {
        assert_eq!(message_len(0xC3), 2);
        assert_eq!(message_len(0xD0), 2);
        assert_eq!(message_len(0xB1), 3);
        assert_eq!(message_len(0x90), 3);
    }

    #[test]
    fn pack_matches_returned_event_layout() {
        assert_eq!(pack(&[0xC3, 0x05, 0x00]), 0x0005C3);
        assert_eq!(pack(&[0xC3, 0x05]), 0x0005C3);
        assert_eq!(pack(&[0xB0, 0x07, 0x7F]), 0x7F07B0);
    }

    #[test]
    fn packed_program_change_decodes() {
        assert_eq!(
            MidiEvent::from_packed(0x0005C3),
            Some(MidiEvent::ProgramChange {
                channel: 3,
                program: 5
            })
        );
    }

    #[test]
    fn control_change_record() {
        let record = MidiEvent::ControlChange {
            channel: 1,
            controller: 10,
            value: 200,
        }
        .to_record();
        assert_eq!(record, [0xB1, 10, 200 & 0x7F]);
    }

    #[test]
    fn zero_velocity_note_on_reads_as_note_off() {
        assert_eq!(
            MidiEvent::from_bytes(&[0x92, 60, 0]),
            Some(MidiEvent::NoteOff {
                channel: 2,
                key: 60,
                velocity: 0
            })
        );
    }

    #[test]
    fn pitch_bend_centre() {
        let record = MidiEvent::PitchBend {
            channel: 0,
            value: 0,
        }
        .to_record();
        assert_eq!(record, [0xE0, 0x00, 0x40]);
        assert_eq!(
            MidiEvent::from_bytes(&record),
            Some(MidiEvent::PitchBend {
                channel: 0,
                value: 0
            })
        );
    }

    #[test]
    fn system_messages_are_rejected() {
        assert_eq!(MidiEvent::from_bytes(&[0xF8]), None);
        assert_eq!(MidiEvent::from_bytes(&[]), None);
    }
}
