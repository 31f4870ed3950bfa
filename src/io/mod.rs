// Purpose - MIDI wire formats

pub mod midi;
