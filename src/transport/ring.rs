use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use super::{FaultCounters, TransportError, RECORD_LEN};
use crate::io::midi::MidiRecord;

/// Producer half of the outbound ring.
pub struct MidiSender {
    producer: Producer<u8>,
    faults: Arc<FaultCounters>,
}

/// Consumer half of the inbound ring, read by the application.
pub struct MidiReceiver {
    consumer: Consumer<u8>,
}

/// Create a byte ring of `capacity` bytes and its two ends.
pub(crate) fn byte_ring(capacity: usize) -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::<u8>::new(capacity.max(RECORD_LEN))
}

impl MidiSender {
    pub(crate) fn new(producer: Producer<u8>, faults: Arc<FaultCounters>) -> Self {
        Self { producer, faults }
    }

    /// Append one record, all three bytes or nothing.
    pub fn enqueue_outbound(&mut self, record: MidiRecord) -> Result<(), TransportError> {
        match self.producer.write_chunk_uninit(RECORD_LEN) {
            Ok(chunk) => {
                chunk.fill_from_iter(record);
                Ok(())
            }
            Err(_) => {
                self.faults.output_overflow();
                Err(TransportError::Overflow)
            }
        }
    }

    /// Bytes waiting for the realtime drain.
    pub fn queued_bytes(&self) -> usize {
        self.producer.buffer().capacity() - self.producer.slots()
    }
}

impl MidiReceiver {
    pub(crate) fn new(consumer: Consumer<u8>) -> Self {
        Self { consumer }
    }

    /// Take the oldest inbound record.
    pub fn read_inbound(&mut self) -> Option<MidiRecord> {
        let chunk = self.consumer.read_chunk(RECORD_LEN).ok()?;
        let mut record = [0u8; RECORD_LEN];
        let (first, second) = chunk.as_slices();
        for (dst, src) in record.iter_mut().zip(first.iter().chain(second)) {
            *dst = *src;
        }
        chunk.commit_all();
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(capacity: usize) -> (MidiSender, Consumer<u8>, Arc<FaultCounters>) {
        let faults = Arc::new(FaultCounters::default());
        let (producer, consumer) = byte_ring(capacity);
        (MidiSender::new(producer, faults.clone()), consumer, faults)
    }

    #[test]
    fn records_are_written_whole() {
        let (mut tx, mut rx, _) = sender(9);
        tx.enqueue_outbound([0xB0, 1, 2]).unwrap();
        assert_eq!(tx.queued_bytes(), 3);

        let chunk = rx.read_chunk(3).unwrap();
        assert_eq!(chunk.as_slices().0, &[0xB0, 1, 2]);
        chunk.commit_all();
    }

    #[test]
    fn overflow_leaves_ring_untouched() {
        // 8 bytes hold two records with 2 bytes to spare
        let (mut tx, mut rx, faults) = sender(8);
        tx.enqueue_outbound([0xB0, 1, 1]).unwrap();
        tx.enqueue_outbound([0xB0, 2, 2]).unwrap();
        assert_eq!(tx.enqueue_outbound([0xB0, 3, 3]), Err(TransportError::Overflow));
        assert_eq!(tx.queued_bytes(), 6);
        assert_eq!(faults.snapshot().output_overflows, 1);

        let mut drained = Vec::new();
        while let Ok(byte) = rx.pop() {
            drained.push(byte);
        }
        assert_eq!(drained, vec![0xB0, 1, 1, 0xB0, 2, 2]);
    }

    #[test]
    fn receiver_reads_records_across_wrap() {
        let (mut producer, consumer) = byte_ring(4);
        let mut rx = MidiReceiver::new(consumer);

        for round in 0..5u8 {
            for byte in [0xC0, round, 0] {
                producer.push(byte).unwrap();
            }
            assert_eq!(rx.read_inbound(), Some([0xC0, round, 0]));
            assert_eq!(rx.read_inbound(), None);
        }
    }
}
