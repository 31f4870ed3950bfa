//! Benchmarks for the realtime bridge and the returned-event ring.

use std::{hint::black_box, sync::Arc};

use criterion::{BenchmarkId, Criterion};
use knobwire::{
    input::EncoderConfig,
    panel::{Panel, PanelConfig},
    time::ManualClock,
    transport::{event_ring, BridgeConfig, MidiOutputPort},
};

use crate::PERIOD_SIZES;

/// Output port that only counts bytes.
struct NullPort(usize);

impl MidiOutputPort for NullPort {
    fn write_event(&mut self, _index: usize, bytes: &[u8]) {
        self.0 += bytes.len();
    }
}

pub fn bench_period(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport/period");

    for &frames in PERIOD_SIZES {
        // Enough ring space for a full period in each direction
        let config = PanelConfig::default()
            .bridge(BridgeConfig {
                ring_bytes: frames * 3,
                event_slots: frames + 1,
            })
            .encoder(EncoderConfig::midi(2, 3, 0, 10))
            .encoder(EncoderConfig::midi(4, 5, 0, 11));
        let (panel, mut bridge, mut inbound, mut events) = Panel::builder(config)
            .clock(Arc::new(ManualClock::new(1_000_000)))
            .open()
            .expect("panel opens");
        let mut port = NullPort(0);

        group.bench_with_input(BenchmarkId::new("drain", frames), &frames, |b, &frames| {
            b.iter(|| {
                for value in 0..frames {
                    let _ = panel.send_control_change(0, 1, (value & 0x7F) as u8);
                }
                bridge
                    .process(frames, std::iter::empty::<&[u8]>(), &mut port)
                    .expect("within budget")
            })
        });

        let messages: Vec<[u8; 3]> = (0..frames)
            .map(|i| match i % 3 {
                0 => [0xB0, 10, (i & 0x7F) as u8],
                1 => [0xC0, (i & 0x7F) as u8, 0],
                _ => [0x90, 60, 100],
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("scan", frames), &frames, |b, &frames| {
            b.iter(|| {
                let input = messages.iter().map(|m| &m[..]);
                bridge
                    .process(frames, black_box(input), &mut port)
                    .expect("within budget");
                while inbound.read_inbound().is_some() {}
                events.by_ref().for_each(drop);
            })
        });
    }

    group.finish();
}

pub fn bench_event_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport/events");

    let (mut sender, mut receiver) = event_ring(256);
    group.bench_function("push_pop", |b| {
        b.iter(|| {
            for event in 0..128u32 {
                sender.push(black_box(event));
            }
            for event in receiver.by_ref() {
                black_box(event);
            }
        })
    });

    group.finish();
}
