use std::sync::Arc;

use rtrb::{Consumer, Producer};

use super::{EventSender, FaultCounters, PortDirection, ProcessError, RECORD_LEN};
use crate::{
    io::midi::{self, MidiRecord, CONTROL_CHANGE, PROGRAM_CHANGE},
    panel::Panel,
};

/// Hardware MIDI output for one realtime period.
pub trait MidiOutputPort {
    /// Emit one message at event slot `index` (0-based within the period).
    fn write_event(&mut self, index: usize, bytes: &[u8]);
}

impl<P: MidiOutputPort + ?Sized> MidiOutputPort for &mut P {
    fn write_event(&mut self, index: usize, bytes: &[u8]) {
        (**self).write_event(index, bytes)
    }
}

/// The realtime end of the transport. Owned by the audio callback.
///
/// [`process`](Self::process) must be called once per period. It never
/// blocks, allocates or logs.
pub struct RealtimeBridge {
    outbound: Consumer<u8>,
    inbound: Producer<u8>,
    events: EventSender,
    panel: Arc<Panel>,
    faults: Arc<FaultCounters>,
}

impl RealtimeBridge {
    pub(crate) fn new(
        outbound: Consumer<u8>,
        inbound: Producer<u8>,
        events: EventSender,
        panel: Arc<Panel>,
        faults: Arc<FaultCounters>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            events,
            panel,
            faults,
        }
    }

    /// Run one period of `nframes` frames.
    ///
    /// Drains every queued outbound record into `output`, then scans `input`.
    /// `nframes` is the message budget in both directions; exceeding it is
    /// fatal for the period and the rest of the period's work is skipped.
    pub fn process<'a, P, I>(&mut self, nframes: usize, input: I, output: &mut P) -> Result<(), ProcessError>
    where
        P: MidiOutputPort + ?Sized,
        I: IntoIterator<Item = &'a [u8]>,
    {
        let result = self
            .drain_outbound(nframes, output)
            .and_then(|()| self.scan_inbound(nframes, input));
        if result.is_err() {
            self.faults.overloaded_period();
        }
        result
    }

    fn drain_outbound<P>(&mut self, nframes: usize, output: &mut P) -> Result<(), ProcessError>
    where
        P: MidiOutputPort + ?Sized,
    {
        let available = self.outbound.slots();
        let whole = available - available % RECORD_LEN;
        if whole == 0 {
            return Ok(());
        }
        let Ok(chunk) = self.outbound.read_chunk(whole) else {
            return Ok(());
        };

        let mut result = Ok(());
        {
            let (first, second) = chunk.as_slices();
            let mut bytes = first.iter().chain(second).copied();
            let mut emitted = 0usize;
            while let (Some(status), Some(data1), Some(data2)) = (bytes.next(), bytes.next(), bytes.next()) {
                if emitted >= nframes {
                    result = Err(ProcessError::TooManyEvents {
                        direction: PortDirection::Output,
                        budget: nframes,
                    });
                    break;
                }
                let record: MidiRecord = [status, data1, data2];
                output.write_event(emitted, &record[..midi::message_len(status)]);
                emitted += 1;
            }
        }
        // Every drained record is consumed, emitted or not
        chunk.commit_all();
        result
    }

    fn scan_inbound<'a, I>(&mut self, nframes: usize, input: I) -> Result<(), ProcessError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        for (index, message) in input.into_iter().enumerate() {
            if index >= nframes {
                return Err(ProcessError::TooManyEvents {
                    direction: PortDirection::Input,
                    budget: nframes,
                });
            }
            let Some(&status) = message.first() else {
                continue;
            };
            let data1 = message.get(1).copied().unwrap_or(0);
            let data2 = message.get(2).copied().unwrap_or(0);

            match status >> 4 {
                CONTROL_CHANGE => {
                    self.panel.echo_control_change(status & 0x0F, data1, data2);
                }
                PROGRAM_CHANGE => {
                    if !self.events.push(midi::pack(message)) {
                        self.faults.event_drop();
                    }
                }
                _ => continue,
            }

            self.forward([status, data1, data2]);
        }
        Ok(())
    }

    fn forward(&mut self, record: MidiRecord) {
        match self.inbound.write_chunk_uninit(RECORD_LEN) {
            Ok(chunk) => {
                chunk.fill_from_iter(record);
            }
            Err(_) => self.faults.input_drop(),
        }
    }
}
