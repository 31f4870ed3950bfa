//! Returned-event ring.
//!
//! Packed MIDI events written by the realtime bridge and drained by the
//! application, over an `rtrb` ring of `u32`. A ring of `N` slots holds at
//! most `N - 1` events. When full, the newest event is dropped and the
//! buffered ones are kept.

use rtrb::{Consumer, Producer, RingBuffer};

/// Realtime end, owned by the bridge.
pub struct EventSender {
    producer: Producer<u32>,
}

/// Application end.
pub struct EventReceiver {
    consumer: Consumer<u32>,
}

/// Create a returned-event ring of `slots` entries (usable capacity
/// `slots - 1`). Fewer than two slots are rounded up to two.
pub fn event_ring(slots: usize) -> (EventSender, EventReceiver) {
    let (producer, consumer) = RingBuffer::<u32>::new(slots.max(2) - 1);
    (EventSender { producer }, EventReceiver { consumer })
}

impl EventSender {
    /// Store an event. Returns `false` and drops it when the ring is full.
    pub fn push(&mut self, event: u32) -> bool {
        self.producer.push(event).is_ok()
    }
}

impl EventReceiver {
    /// Take the oldest event, packed as `status | data1 << 8 | data2 << 16`.
    pub fn pop(&mut self) -> Option<u32> {
        self.consumer.pop().ok()
    }
}

impl Iterator for EventReceiver {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order() {
        let (mut tx, mut rx) = event_ring(4);
        assert!(tx.push(1));
        assert!(tx.push(2));
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), Some(2));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn full_ring_keeps_oldest() {
        let (mut tx, rx) = event_ring(4);
        assert!(tx.push(10));
        assert!(tx.push(20));
        assert!(tx.push(30));
        assert!(!tx.push(40));

        assert_eq!(rx.collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[test]
    fn wraps_around() {
        let (mut tx, mut rx) = event_ring(3);
        for round in 0..10u32 {
            assert!(tx.push(round * 2));
            assert!(tx.push(round * 2 + 1));
            assert!(!tx.push(99));
            assert_eq!(rx.pop(), Some(round * 2));
            assert_eq!(rx.pop(), Some(round * 2 + 1));
            assert_eq!(rx.pop(), None);
        }
    }

    #[test]
    fn tiny_rings_are_rounded_up() {
        let (mut tx, _rx) = event_ring(0);
        assert!(tx.push(7));
        assert!(!tx.push(8));
    }

    #[test]
    fn cross_thread_order_is_preserved() {
        let (mut tx, mut rx) = event_ring(16);
        let writer = thread::spawn(move || {
            for event in 0..1_000u32 {
                while !tx.push(event) {
                    thread::yield_now();
                }
            }
        });

        let mut expected = 0u32;
        while expected < 1_000 {
            match rx.pop() {
                Some(event) => {
                    assert_eq!(event, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        writer.join().unwrap();
    }
}
