//! Benchmarks for edge decoding and the realtime MIDI period.
//!
//! Run with: cargo bench
//!
//! The realtime bridge runs once per audio period and must finish well inside
//! the period deadline. Reference timing at 48kHz sample rate:
//!   - 64 frames  = 1.33ms deadline
//!   - 128 frames = 2.67ms deadline
//!   - 256 frames = 5.33ms deadline
//!   - 512 frames = 10.67ms deadline
//!
//! Benchmark groups:
//!   - input/*      Quadrature decoding and switch debouncing
//!   - transport/*  Outbound drain, inbound scan and the event ring

use criterion::{criterion_group, criterion_main};

mod input;
mod transport;

/// Common audio period sizes, used as the per-period message budget.
pub const PERIOD_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Edge decoding
    input::bench_encoder,
    input::bench_switch,
    // Realtime transport
    transport::bench_period,
    transport::bench_event_ring,
);
criterion_main!(benches);
