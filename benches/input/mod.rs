//! Benchmarks for the edge decoders.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use knobwire::{
    input::{Encoder, EncoderConfig, Switch, SwitchConfig},
    time::ManualClock,
};

/// Clockwise Gray cycle, one detent.
const UP: [(u8, u8); 4] = [(1, 0), (1, 1), (0, 1), (0, 0)];

pub fn bench_encoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("input/encoder");

    // Tick spacing selects the acceleration band
    for gap_us in [2_000u64, 20_000, 50_000] {
        let clock = ManualClock::new(1_000_000);
        let mut encoder = Encoder::new();
        encoder.configure(&EncoderConfig::midi(2, 3, 0, 1).max_value(16_383));

        group.bench_with_input(BenchmarkId::new("continuous", gap_us), &gap_us, |b, &gap| {
            b.iter(|| {
                for (a, bit) in UP {
                    clock.advance(gap);
                    black_box(encoder.on_edge(black_box(a), black_box(bit), &clock));
                }
                // Keep away from the clamp
                encoder.set_value(8_000);
            })
        });
    }

    let clock = ManualClock::new(1_000_000);
    let mut encoder = Encoder::new();
    encoder.configure(&EncoderConfig::midi(2, 3, 0, 1).step(1).max_value(u32::MAX));
    group.bench_function("stepped", |b| {
        b.iter(|| {
            for (a, bit) in UP {
                black_box(encoder.on_edge(black_box(a), black_box(bit), &clock));
            }
        })
    });

    group.finish();
}

pub fn bench_switch(c: &mut Criterion) {
    let mut group = c.benchmark_group("input/switch");

    let clock = ManualClock::new(1_000_000);
    let switch = Switch::new();
    switch.configure(&SwitchConfig::new(4));

    group.bench_function("press_release", |b| {
        b.iter(|| {
            clock.advance(5_000);
            black_box(switch.on_edge(1, &clock));
            clock.advance(5_000);
            black_box(switch.on_edge(0, &clock));
            black_box(switch.read_and_clear_duration())
        })
    });

    group.bench_function("bounce", |b| {
        b.iter(|| {
            clock.advance(100);
            black_box(switch.on_edge(black_box(1), &clock))
        })
    });

    group.finish();
}
