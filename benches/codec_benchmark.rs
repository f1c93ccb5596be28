//! Benchmarks for the LIN codec and receive path.
//!
//! Run with: cargo bench --bench codec_benchmark

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lin_master::{
    LinConfig, LinMaster, ReceiveParser, SimulatedBus, checksum, protected_id, verify,
};

const PAYLOAD: [u8; 8] = [0xAB, 0x84, 0x1E, 0xF4, 0x2E, 0x84, 0x7A, 0x55];

fn bench_codec(c: &mut Criterion) {
    c.bench_function("protected_id/all", |b| {
        b.iter(|| {
            let mut acc = 0u8;
            for id in 0..=63u8 {
                acc ^= protected_id(black_box(id));
            }
            acc
        })
    });

    c.bench_function("checksum/8_bytes", |b| {
        b.iter(|| checksum(black_box(0xE2), black_box(&PAYLOAD)))
    });

    c.bench_function("verify/8_bytes", |b| {
        b.iter(|| verify(black_box(0x22), black_box(&PAYLOAD), black_box(0x18)))
    });
}

fn bench_parser(c: &mut Criterion) {
    let pid = protected_id(0x22);
    let mut stream = vec![0x12, 0x34, 0x00, 0x55, pid];
    stream.extend_from_slice(&PAYLOAD);
    stream.push(checksum(pid, &PAYLOAD));

    c.bench_function("parser/noisy_full_frame", |b| {
        b.iter(|| {
            let mut parser = ReceiveParser::new();
            for &byte in black_box(&stream) {
                parser.push(byte);
            }
            parser.finish()
        })
    });
}

fn bench_transaction(c: &mut Criterion) {
    let mut bus = SimulatedBus::new(19_200);
    bus.add_slave_response(0x22, &PAYLOAD);
    let mut master = LinMaster::new(bus, LinConfig::default()).unwrap();

    c.bench_function("master/request_frame_simulated", |b| {
        b.iter(|| {
            master.transport_mut().clear_events();
            master.request_frame(black_box(0x22)).unwrap()
        })
    });

    c.bench_function("master/send_frame_simulated", |b| {
        b.iter(|| {
            master.transport_mut().clear_events();
            master.send_frame(black_box(0x10), black_box(&PAYLOAD)).unwrap()
        })
    });
}

criterion_group!(benches, bench_codec, bench_parser, bench_transaction);
criterion_main!(benches);
